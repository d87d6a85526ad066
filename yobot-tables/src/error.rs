//! Accessor error taxonomy
//!
//! Every upstream failure names the logical table and the operation that
//! failed. Transport failures (no response at all) are kept apart from
//! responses with an error status.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for accessor operations
pub type AccessorResult<T> = Result<T, AccessorError>;

/// Record operation that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    BatchCreate,
    Update,
    Get,
    List,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::BatchCreate => "batch create",
            Operation::Update => "update",
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl Operation {
    /// Whether repeating the request after an unknown outcome is safe
    ///
    /// Creates are not: a timed-out or 5xx POST may still have been applied.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Operation::Create | Operation::BatchCreate)
    }
}

/// Table accessor errors
#[derive(Debug, Error)]
pub enum AccessorError {
    /// Unknown logical table or field, or an invalid table map
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential rejected (HTTP 401/403)
    #[error("Authentication rejected for '{table}' ({operation}), HTTP {status}: {body}")]
    Authentication {
        table: String,
        operation: Operation,
        status: u16,
        body: String,
    },

    /// Airtable throttled the request (HTTP 429)
    #[error("Rate limited on '{table}' ({operation}): {body}")]
    RateLimited {
        table: String,
        operation: Operation,
        body: String,
        /// Value of the Retry-After header, when sent
        retry_after: Option<Duration>,
    },

    /// Any other non-2xx response
    #[error("Remote error on '{table}' ({operation}), HTTP {status}: {body}")]
    Remote {
        table: String,
        operation: Operation,
        status: u16,
        body: String,
    },

    /// No response within the per-request timeout
    #[error("Request to '{table}' ({operation}) timed out after {timeout:?}")]
    Timeout {
        table: String,
        operation: Operation,
        timeout: Duration,
    },

    /// Connection could not be established or was dropped
    #[error("Connection error on '{table}' ({operation}): {message}")]
    Connection {
        table: String,
        operation: Operation,
        message: String,
        /// Failed while connecting, so the request never reached Airtable
        connect_failed: bool,
    },

    /// 2xx response whose body is not the expected JSON
    #[error("Malformed response from '{table}' ({operation}), HTTP {status}: {message}")]
    Decode {
        table: String,
        operation: Operation,
        status: u16,
        message: String,
    },
}

impl AccessorError {
    /// HTTP status of the upstream response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            AccessorError::Authentication { status, .. }
            | AccessorError::Remote { status, .. }
            | AccessorError::Decode { status, .. } => Some(*status),
            AccessorError::RateLimited { .. } => Some(429),
            AccessorError::Configuration(_)
            | AccessorError::Timeout { .. }
            | AccessorError::Connection { .. } => None,
        }
    }

    /// Logical table the failed request targeted
    pub fn table(&self) -> Option<&str> {
        match self {
            AccessorError::Configuration(_) => None,
            AccessorError::Authentication { table, .. }
            | AccessorError::RateLimited { table, .. }
            | AccessorError::Remote { table, .. }
            | AccessorError::Timeout { table, .. }
            | AccessorError::Connection { table, .. }
            | AccessorError::Decode { table, .. } => Some(table.as_str()),
        }
    }

    /// Transient failures worth another attempt
    ///
    /// Throttling and failed connects never reached the table, so they are
    /// always retryable. Timeouts, dropped connections and 5xx responses
    /// leave the outcome unknown and are retryable only for idempotent
    /// operations. Configuration, credential, decode and other 4xx failures
    /// repeat identically.
    pub fn is_retryable(&self) -> bool {
        match self {
            AccessorError::RateLimited { .. }
            | AccessorError::Connection {
                connect_failed: true,
                ..
            } => true,
            AccessorError::Timeout { operation, .. }
            | AccessorError::Connection { operation, .. } => operation.is_idempotent(),
            AccessorError::Remote {
                status, operation, ..
            } => *status >= 500 && operation.is_idempotent(),
            AccessorError::Configuration(_)
            | AccessorError::Authentication { .. }
            | AccessorError::Decode { .. } => false,
        }
    }

    pub(crate) fn from_transport(
        table: &str,
        operation: Operation,
        timeout: Duration,
        err: reqwest::Error,
    ) -> Self {
        if err.is_timeout() {
            AccessorError::Timeout {
                table: table.to_string(),
                operation,
                timeout,
            }
        } else {
            AccessorError::Connection {
                table: table.to_string(),
                operation,
                connect_failed: err.is_connect(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn from_status(
        table: &str,
        operation: Operation,
        status: u16,
        body: String,
        retry_after: Option<Duration>,
    ) -> Self {
        let table = table.to_string();
        match status {
            401 | 403 => AccessorError::Authentication {
                table,
                operation,
                status,
                body,
            },
            429 => AccessorError::RateLimited {
                table,
                operation,
                body,
                retry_after,
            },
            _ => AccessorError::Remote {
                table,
                operation,
                status,
                body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = AccessorError::from_status("leads", Operation::Create, 401, "no".into(), None);
        assert!(matches!(err, AccessorError::Authentication { status: 401, .. }));

        let err = AccessorError::from_status("leads", Operation::Create, 403, "no".into(), None);
        assert!(matches!(err, AccessorError::Authentication { status: 403, .. }));

        let err = AccessorError::from_status(
            "leads",
            Operation::List,
            429,
            "slow down".into(),
            Some(Duration::from_secs(30)),
        );
        assert!(matches!(
            err,
            AccessorError::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(30)
        ));
        assert_eq!(err.status(), Some(429));

        let err = AccessorError::from_status("leads", Operation::Update, 422, "bad".into(), None);
        assert!(matches!(err, AccessorError::Remote { status: 422, .. }));
    }

    #[test]
    fn test_retryable() {
        let remote = |status| AccessorError::Remote {
            table: "t".into(),
            operation: Operation::Get,
            status,
            body: String::new(),
        };
        assert!(remote(500).is_retryable());
        assert!(remote(503).is_retryable());
        assert!(!remote(404).is_retryable());
        assert!(!remote(422).is_retryable());

        assert!(AccessorError::Timeout {
            table: "t".into(),
            operation: Operation::List,
            timeout: Duration::from_secs(1),
        }
        .is_retryable());
        assert!(!AccessorError::Configuration("unknown table".into()).is_retryable());
        assert!(!AccessorError::from_status("t", Operation::Get, 401, String::new(), None)
            .is_retryable());
    }

    #[test]
    fn test_unknown_outcome_not_retried_for_creates() {
        let timeout = |operation| AccessorError::Timeout {
            table: "leads".into(),
            operation,
            timeout: Duration::from_secs(1),
        };
        let dropped = |operation, connect_failed| AccessorError::Connection {
            table: "leads".into(),
            operation,
            message: "connection reset".into(),
            connect_failed,
        };

        for operation in [Operation::Create, Operation::BatchCreate] {
            assert!(!operation.is_idempotent());
            assert!(!timeout(operation).is_retryable());
            assert!(!dropped(operation, false).is_retryable());
            assert!(!AccessorError::from_status("leads", operation, 503, String::new(), None)
                .is_retryable());

            // Never reached Airtable
            assert!(dropped(operation, true).is_retryable());
            assert!(AccessorError::from_status("leads", operation, 429, String::new(), None)
                .is_retryable());
        }

        for operation in [Operation::Update, Operation::Get, Operation::List, Operation::Delete] {
            assert!(timeout(operation).is_retryable());
            assert!(dropped(operation, false).is_retryable());
        }
    }

    #[test]
    fn test_display_names_table_and_operation() {
        let err = AccessorError::from_status("leads", Operation::Update, 404, "NOT_FOUND".into(), None);
        let message = err.to_string();
        assert!(message.contains("'leads'"));
        assert!(message.contains("update"));
        assert!(message.contains("404"));
        assert_eq!(err.table(), Some("leads"));
    }
}
