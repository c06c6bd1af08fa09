use crate::error::AttendanceError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Caller identity, placed in request extensions by the auth middleware and
/// passed explicitly into every service call.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AttendanceError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AttendanceError::Forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), AttendanceError> {
        if self.role.is_hr_or_admin() {
            Ok(())
        } else {
            Err(AttendanceError::Forbidden("HR/Admin only"))
        }
    }

    /// The employee record behind this login.
    pub fn require_employee(&self) -> Result<u64, AttendanceError> {
        self.employee_id.ok_or(AttendanceError::NoEmployeeProfile)
    }
}
