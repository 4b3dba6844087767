/// Error types for the dstore client
use std::error::Error as StdError;
use thiserror::Error;
use tonic::{Code, Status};

/// Type-erased failure carried as the cause of a transaction error
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Validation failure raised before any RPC was issued
    #[error(transparent)]
    Core(#[from] dstore_core::Error),

    /// The RPC stub failed; the status is passed through untouched
    #[error("{}", .0.message())]
    Rpc(Status),

    /// The service answered with something that violates the protocol
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        ClientError::Rpc(status)
    }
}

impl ClientError {
    /// Returns a stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Core(e) => e.code(),
            ClientError::Rpc(status) => rpc_code(status.code()),
            ClientError::Protocol(_) => "PROTOCOL_VIOLATION",
            ClientError::Transaction(_) => "TRANSACTION_FAILED",
        }
    }

    /// Whether a caller could reasonably retry the operation.
    ///
    /// Only transient transport failures qualify. The client itself never
    /// retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Rpc(status) => matches!(
                status.code(),
                Code::Unavailable | Code::DeadlineExceeded | Code::Aborted | Code::ResourceExhausted
            ),
            ClientError::Core(_) => false,
            ClientError::Protocol(_) => false,
            ClientError::Transaction(_) => false,
        }
    }

    /// The RPC status, if this error came from the stub
    pub fn status(&self) -> Option<&Status> {
        match self {
            ClientError::Rpc(status) => Some(status),
            _ => None,
        }
    }
}

fn rpc_code(code: Code) -> &'static str {
    match code {
        Code::NotFound => "NOT_FOUND",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Unavailable => "UNAVAILABLE",
        Code::DeadlineExceeded => "TIMEOUT",
        Code::Internal => "INTERNAL_ERROR",
        Code::DataLoss => "DATA_CORRUPTION",
        Code::Aborted => "ABORTED",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::Unauthenticated => "UNAUTHENTICATED",
        Code::Cancelled => "CANCELLED",
        _ => "UNKNOWN",
    }
}

/// A transaction that could not be committed.
///
/// The original failure is never dropped: it is the source of `Aborted`, and
/// the source of the rollback failure in `RollbackFailed`.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction failed to commit.")]
    Aborted {
        #[source]
        cause: BoxError,
    },

    #[error("Transaction failed to commit and rollback.")]
    RollbackFailed {
        #[source]
        rollback: RollbackError,
    },
}

impl TransactionError {
    /// The failure that triggered the rollback
    pub fn original(&self) -> &(dyn StdError + Send + Sync + 'static) {
        match self {
            TransactionError::Aborted { cause } => cause.as_ref(),
            TransactionError::RollbackFailed { rollback } => rollback.original(),
        }
    }

    pub fn rollback_error(&self) -> Option<&RollbackError> {
        match self {
            TransactionError::Aborted { .. } => None,
            TransactionError::RollbackFailed { rollback } => Some(rollback),
        }
    }
}

/// Rollback failure, chained onto the failure that made the rollback necessary
#[derive(Error, Debug)]
#[error("{}", .status.message())]
pub struct RollbackError {
    status: Status,
    #[source]
    cause: BoxError,
}

impl RollbackError {
    pub fn new(status: Status, cause: BoxError) -> Self {
        Self { status, cause }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn original(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}
