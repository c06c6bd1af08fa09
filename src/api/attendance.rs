use crate::{
    auth::auth::AuthUser,
    error::AttendanceError,
    model::{
        attendance::AttendanceSnapshot,
        break_entry::{BreakEntry, BreakType},
        work_session::WorkSession,
    },
    services::{AttendanceService, ShiftCatalog},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct StartBreakRequest {
    #[schema(example = "paid")]
    pub break_type: BreakType,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    #[schema(example = "Clocked in successfully")]
    pub message: String,
    pub session: WorkSession,
}

#[derive(Serialize, ToSchema)]
pub struct BreakResponse {
    #[schema(example = "Break started")]
    pub message: String,
    #[serde(rename = "break")]
    pub entry: BreakEntry,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Calendar day to read; defaults to the current day
    #[param(value_type = Option<String>, format = "date", example = "2026-01-05")]
    pub date: Option<NaiveDate>,
}

/// Clock in
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    responses(
        (status = 200, description = "Clocked in successfully", body = SessionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 409, description = "Already clocked in", body = Object, example = json!({
            "message": "already clocked in",
            "kind": "duplicate_active_state"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    attendance: web::Data<AttendanceService>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = auth.require_employee()?;
    let session = attendance.clock_in(employee_id).await?;

    Ok(HttpResponse::Ok().json(SessionResponse {
        message: "Clocked in successfully".to_string(),
        session,
    }))
}

/// Clock out
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out successfully", body = SessionResponse),
        (status = 400, description = "Not clocked in, or a break is still running", body = Object, example = json!({
            "message": "must end break first",
            "kind": "sequence_violation"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    attendance: web::Data<AttendanceService>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = auth.require_employee()?;
    let session = attendance.clock_out(employee_id).await?;

    Ok(HttpResponse::Ok().json(SessionResponse {
        message: "Clocked out successfully".to_string(),
        session,
    }))
}

/// Start a break
#[utoipa::path(
    post,
    path = "/api/attendance/break/start",
    request_body = StartBreakRequest,
    responses(
        (status = 200, description = "Break started", body = BreakResponse),
        (status = 400, description = "Out of sequence or allowance exhausted", body = Object, example = json!({
            "message": "paid allowance exhausted",
            "kind": "allowance_exceeded"
        })),
        (status = 404, description = "No shift assigned"),
        (status = 409, description = "Already on a break"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn start_break(
    auth: AuthUser,
    attendance: web::Data<AttendanceService>,
    shifts: web::Data<ShiftCatalog>,
    payload: web::Json<StartBreakRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = auth.require_employee()?;
    let shift = shifts.assigned_shift(employee_id).await?;
    let entry = attendance
        .start_break(employee_id, &shift, payload.break_type)
        .await?;

    Ok(HttpResponse::Ok().json(BreakResponse {
        message: "Break started".to_string(),
        entry,
    }))
}

/// End the running break
#[utoipa::path(
    post,
    path = "/api/attendance/break/end",
    responses(
        (status = 200, description = "Break ended and classified", body = BreakResponse),
        (status = 400, description = "Not currently on a break", body = Object, example = json!({
            "message": "not currently on a break",
            "kind": "sequence_violation"
        })),
        (status = 404, description = "No shift assigned"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn end_break(
    auth: AuthUser,
    attendance: web::Data<AttendanceService>,
    shifts: web::Data<ShiftCatalog>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = auth.require_employee()?;
    let shift = shifts.assigned_shift(employee_id).await?;
    let entry = attendance.end_break(employee_id, &shift).await?;

    Ok(HttpResponse::Ok().json(BreakResponse {
        message: "Break ended".to_string(),
        entry,
    }))
}

/// Own attendance status for the current day
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    responses(
        (status = 200, description = "Current status and required logout", body = AttendanceSnapshot),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_status(
    auth: AuthUser,
    attendance: web::Data<AttendanceService>,
    shifts: web::Data<ShiftCatalog>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = auth.require_employee()?;
    let shift = shifts.shift_for_employee(employee_id).await?;
    let snapshot = attendance
        .status(employee_id, None, shift.as_ref())
        .await?;

    Ok(HttpResponse::Ok().json(snapshot))
}

/// Attendance status of any employee (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        StatusQuery
    ),
    responses(
        (status = 200, description = "Status for the requested day", body = AttendanceSnapshot),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn employee_status(
    auth: AuthUser,
    attendance: web::Data<AttendanceService>,
    shifts: web::Data<ShiftCatalog>,
    path: web::Path<u64>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let shift = shifts.shift_for_employee(employee_id).await?;
    let snapshot = attendance
        .status(employee_id, query.date, shift.as_ref())
        .await?;

    Ok(HttpResponse::Ok().json(snapshot))
}
