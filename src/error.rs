use thiserror::Error;

/// Errors produced by the aggregate engine and the domain layer riding on it.
///
/// `AggregateNotFound` is a control-flow signal: command handlers treat it as
/// "safe to create" when probing a stream before a creation command. The
/// `InvalidAggregate*` and `InvalidEventType` variants indicate data
/// integrity or schema problems and are never retried.
#[derive(Error, Debug)]
pub enum EsError {
    #[error("invalid aggregate")]
    InvalidAggregate,

    #[error("invalid aggregate id")]
    InvalidAggregateId,

    #[error("invalid event version")]
    InvalidEventVersion,

    #[error("invalid event type: {0}")]
    InvalidEventType(String),

    #[error("already exists")]
    AlreadyExists,

    #[error("aggregate not found")]
    AggregateNotFound,

    #[error(
        "concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    Concurrency {
        aggregate_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("command validation failed for aggregate {aggregate_id}: {reason}")]
    CommandValidation {
        aggregate_id: String,
        reason: String,
    },

    #[error("unable to fit device: form factor {form_factor}{}", display_elevation(.elevation))]
    UnableToFitDevice {
        form_factor: usize,
        elevation: Option<usize>,
    },

    #[error("failed to deserialize event payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("event store operation failed: {0}")]
    Store(#[from] anyhow::Error),
}

fn display_elevation(elevation: &Option<usize>) -> String {
    match elevation {
        Some(el) => format!(", elevation {el}"),
        None => String::new(),
    }
}

/// Result alias within the library.
pub type Result<T, E = EsError> = std::result::Result<T, E>;
