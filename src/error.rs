use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write (second active session/break,
    /// shift still referenced, ...).
    #[error("{0}")]
    Conflict(String),

    /// The ledger changed between the caller's read and the locked write.
    #[error("{0}")]
    StaleState(String),

    /// A daily break cap was reached by the time the write was locked.
    #[error("{0}")]
    LimitReached(String),

    /// A stored value could not be decoded into the domain type.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Rejections surfaced to the caller. Everything but `Store` is an expected
/// business-rule violation.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    SequenceViolation(String),

    #[error("{0}")]
    AllowanceExceeded(String),

    #[error("{0}")]
    DuplicateActiveState(String),

    #[error("No employee profile")]
    NoEmployeeProfile,

    #[error("No shift assigned to employee {0}")]
    ShiftNotAssigned(u64),

    #[error("Shift {0} not found")]
    ShiftNotFound(u64),

    #[error("Invalid shift: {0}")]
    InvalidShift(String),

    #[error("Shift {0} is still assigned to employees")]
    ShiftInUse(u64),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(StoreError),
}

impl AttendanceError {
    pub fn sequence(message: impl Into<String>) -> Self {
        Self::SequenceViolation(message.into())
    }

    pub fn allowance(message: impl Into<String>) -> Self {
        Self::AllowanceExceeded(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateActiveState(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SequenceViolation(_) => "sequence_violation",
            Self::AllowanceExceeded(_) => "allowance_exceeded",
            Self::DuplicateActiveState(_) => "duplicate_active_state",
            Self::NoEmployeeProfile => "no_employee_profile",
            Self::ShiftNotAssigned(_) => "shift_not_assigned",
            Self::ShiftNotFound(_) => "shift_not_found",
            Self::InvalidShift(_) => "invalid_shift",
            Self::ShiftInUse(_) => "shift_in_use",
            Self::Forbidden(_) => "forbidden",
            Self::Store(_) => "internal",
        }
    }
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::DuplicateActiveState(message),
            StoreError::StaleState(message) => Self::SequenceViolation(message),
            StoreError::LimitReached(message) => Self::AllowanceExceeded(message),
            other => Self::Store(other),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::SequenceViolation(_) | Self::AllowanceExceeded(_) | Self::InvalidShift(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::DuplicateActiveState(_) | Self::ShiftInUse(_) => StatusCode::CONFLICT,
            Self::NoEmployeeProfile | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ShiftNotAssigned(_) | Self::ShiftNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Store(e) => {
                tracing::error!(error = %e, "Attendance store failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "message": message,
            "kind": self.kind(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_map_to_rejections() {
        let err: AttendanceError = StoreError::Conflict("already clocked in".into()).into();
        assert!(matches!(err, AttendanceError::DuplicateActiveState(ref m) if m == "already clocked in"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: AttendanceError = StoreError::StaleState("not clocked in".into()).into();
        assert!(matches!(err, AttendanceError::SequenceViolation(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn corrupt_rows_are_internal_errors() {
        let err: AttendanceError = StoreError::Corrupt("break_type 'x'".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind(), "internal");
    }

    #[test]
    fn allowance_rejection_is_bad_request() {
        let err = AttendanceError::allowance("paid allowance exhausted");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind(), "allowance_exceeded");

        let err: AttendanceError =
            StoreError::LimitReached("unpaid break limit of 1 per day reached".into()).into();
        assert!(matches!(err, AttendanceError::AllowanceExceeded(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
