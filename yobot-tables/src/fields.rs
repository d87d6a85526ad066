//! Logical → physical field name translation

use crate::error::{AccessorError, AccessorResult};
use crate::table_map::TableConfig;
use crate::{FieldMode, Fields};

/// Translate logical field keys into physical Airtable field names
///
/// Returns a new map; `data` is left untouched. Keys without a configured
/// translation pass through unchanged in [`FieldMode::Permissive`] and are
/// rejected in [`FieldMode::Strict`]. When a pass-through key collides with a
/// translated name, the translated value wins.
pub fn map_fields(
    logical_name: &str,
    config: &TableConfig,
    data: &Fields,
    mode: FieldMode,
) -> AccessorResult<Fields> {
    let mut mapped = Fields::new();
    let mut passthrough = Vec::new();

    for (key, value) in data {
        match config.physical_field(key) {
            Some(physical) => {
                mapped.insert(physical.to_string(), value.clone());
            }
            None if mode == FieldMode::Strict => {
                return Err(AccessorError::Configuration(format!(
                    "unknown field '{}' for table '{}'",
                    key, logical_name
                )));
            }
            None => passthrough.push((key, value)),
        }
    }

    for (key, value) in passthrough {
        if mapped.contains_key(key.as_str()) {
            tracing::warn!(
                table = %logical_name,
                field = %key,
                "Untranslated field collides with a translated field name; keeping translated value"
            );
            continue;
        }
        mapped.insert(key.clone(), value.clone());
    }

    Ok(mapped)
}

/// Translate a single logical field key (used for `fields[]` and `sort`)
pub fn map_field_name<'a>(
    logical_name: &str,
    config: &'a TableConfig,
    key: &'a str,
    mode: FieldMode,
) -> AccessorResult<&'a str> {
    match config.physical_field(key) {
        Some(physical) => Ok(physical),
        None if mode == FieldMode::Strict => Err(AccessorError::Configuration(format!(
            "unknown field '{}' for table '{}'",
            key, logical_name
        ))),
        None => Ok(key),
    }
}
