use http::StatusCode;
use sea_orm::error::{DbErr, SqlErr};
use sea_orm::TransactionError;

/// Error taxonomy for the dealership core.
///
/// Every rejected mutation maps to exactly one named rule; only
/// `DatabaseError` carries an opaque infrastructure failure upward.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Already sold: {0}")]
    AlreadySold(String),

    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Negative stock: {0}")]
    NegativeStock(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
}

impl ServiceError {
    /// Re-maps a store-level unique-constraint violation to the business
    /// outcome the fast-path check would have reported. The unique index is
    /// the authoritative guard; the in-pipeline existence check only avoids
    /// a round trip in the common case.
    pub fn from_unique_violation(err: DbErr, conflict: ServiceError) -> ServiceError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => conflict,
            _ => ServiceError::DatabaseError(err),
        }
    }

    /// Returns the HTTP status code for this error.
    /// Single source of truth for the transport-facing mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateKey(_) | Self::AlreadySold(_) | Self::ConcurrentModification(_) => {
                StatusCode::CONFLICT
            }
            Self::KeyMismatch(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NegativeStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Message suitable for transport responses. Infrastructure failures
    /// return a generic message to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db) => ServiceError::DatabaseError(db),
            TransactionError::Transaction(service) => service,
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::DuplicateKey("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::AlreadySold("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ConcurrentModification("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::KeyMismatch("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::NegativeStock("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_database_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("connection string leaked".into()));
        assert_eq!(err.response_message(), "Database error");

        let err = ServiceError::NotFound("Veículo não encontrado".into());
        assert!(err.response_message().contains("Veículo não encontrado"));
    }

    #[test]
    fn non_unique_db_error_stays_opaque() {
        let err = DbErr::Custom("timeout".into());
        let mapped =
            ServiceError::from_unique_violation(err, ServiceError::DuplicateKey("dup".into()));
        assert!(matches!(mapped, ServiceError::DatabaseError(_)));
    }
}
