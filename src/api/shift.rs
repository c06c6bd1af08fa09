use crate::{
    auth::auth::AuthUser,
    error::AttendanceError,
    model::shift::{Shift, ShiftDefinition, ShiftKind},
    services::ShiftCatalog,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ShiftPayload {
    #[schema(example = "Day shift")]
    pub name: String,
    pub kind: ShiftKind,
    #[schema(example = "10:00:00", format = "time", value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(example = "19:00:00", format = "time", value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    /// Flexible shifts only
    #[schema(example = json!(null))]
    pub required_duration_hours: Option<f64>,
    #[schema(example = 30)]
    pub paid_break_allowance_minutes: i64,
}

impl ShiftPayload {
    fn into_definition(self) -> Result<ShiftDefinition, AttendanceError> {
        ShiftDefinition::from_parts(
            &self.name,
            self.kind,
            self.start_time,
            self.end_time,
            self.required_duration_hours,
            self.paid_break_allowance_minutes,
        )
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShiftResponse {
    pub id: u64,
    pub name: String,
    pub kind: ShiftKind,
    #[schema(format = "time", value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(format = "time", value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    pub required_duration_hours: Option<f64>,
    /// Nominal working hours; fixed shifts crossing midnight wrap around
    #[schema(example = 9.0)]
    pub duration_hours: f64,
    pub paid_break_allowance_minutes: i64,
}

impl From<&Shift> for ShiftResponse {
    fn from(shift: &Shift) -> Self {
        let d = &shift.definition;
        Self {
            id: shift.id,
            name: d.name.clone(),
            kind: d.kind(),
            start_time: d.start_time(),
            end_time: d.end_time(),
            required_duration_hours: d.required_duration_hours(),
            duration_hours: d.duration_hours(),
            paid_break_allowance_minutes: d.paid_break_allowance_minutes,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AssignShiftRequest {
    /// `null` clears the assignment
    #[schema(example = 1)]
    pub shift_id: Option<u64>,
}

/// List shifts
#[utoipa::path(
    get,
    path = "/api/shift",
    responses(
        (status = 200, description = "All shift definitions", body = [ShiftResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn list_shifts(
    _auth: AuthUser,
    shifts: web::Data<ShiftCatalog>,
) -> Result<HttpResponse, AttendanceError> {
    let data: Vec<ShiftResponse> = shifts.list().await?.iter().map(ShiftResponse::from).collect();
    Ok(HttpResponse::Ok().json(data))
}

/// Get shift by id
#[utoipa::path(
    get,
    path = "/api/shift/{id}",
    params(
        ("id", Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift found", body = ShiftResponse),
        (status = 404, description = "Shift not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn get_shift(
    _auth: AuthUser,
    shifts: web::Data<ShiftCatalog>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AttendanceError> {
    let shift = shifts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ShiftResponse::from(&shift)))
}

/// Create shift (Admin)
#[utoipa::path(
    post,
    path = "/api/shift",
    request_body = ShiftPayload,
    responses(
        (status = 201, description = "Shift created", body = ShiftResponse),
        (status = 400, description = "Invalid shift definition", body = Object, example = json!({
            "message": "Invalid shift: fixed shifts require start_time and end_time",
            "kind": "invalid_shift"
        })),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn create_shift(
    auth: AuthUser,
    shifts: web::Data<ShiftCatalog>,
    payload: web::Json<ShiftPayload>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require_admin()?;

    let definition = payload.into_inner().into_definition()?;
    let shift = shifts.create(definition).await?;

    Ok(HttpResponse::Created().json(ShiftResponse::from(&shift)))
}

/// Replace shift definition (Admin)
#[utoipa::path(
    put,
    path = "/api/shift/{id}",
    params(
        ("id", Path, description = "Shift ID")
    ),
    request_body = ShiftPayload,
    responses(
        (status = 200, description = "Shift updated", body = ShiftResponse),
        (status = 400, description = "Invalid shift definition"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Shift not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn update_shift(
    auth: AuthUser,
    shifts: web::Data<ShiftCatalog>,
    path: web::Path<u64>,
    payload: web::Json<ShiftPayload>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require_admin()?;

    let definition = payload.into_inner().into_definition()?;
    let shift = shifts.update(path.into_inner(), definition).await?;

    Ok(HttpResponse::Ok().json(ShiftResponse::from(&shift)))
}

/// Delete shift (Admin)
#[utoipa::path(
    delete,
    path = "/api/shift/{id}",
    params(
        ("id", Path, description = "Shift ID")
    ),
    responses(
        (status = 200, description = "Shift deleted", body = Object, example = json!({
            "message": "Shift deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Shift not found"),
        (status = 409, description = "Shift still assigned to employees")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn delete_shift(
    auth: AuthUser,
    shifts: web::Data<ShiftCatalog>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require_admin()?;

    shifts.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Shift deleted" })))
}

/// Assign or clear an employee's shift (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/shift",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = AssignShiftRequest,
    responses(
        (status = 200, description = "Assignment updated", body = Object, example = json!({
            "message": "Shift assigned",
            "employee_id": 42,
            "shift": null
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Shift not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn assign_shift(
    auth: AuthUser,
    shifts: web::Data<ShiftCatalog>,
    path: web::Path<u64>,
    payload: web::Json<AssignShiftRequest>,
) -> Result<HttpResponse, AttendanceError> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let shift = shifts.assign(employee_id, payload.shift_id).await?;
    info!(
        by = %auth.username,
        user_id = auth.user_id,
        employee_id,
        shift_id = ?payload.shift_id,
        "Shift assignment changed"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Shift assigned",
        "employee_id": employee_id,
        "shift": shift.as_ref().map(ShiftResponse::from),
    })))
}
