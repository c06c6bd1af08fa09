use crate::api::attendance::{BreakResponse, SessionResponse, StartBreakRequest};
use crate::api::shift::{AssignShiftRequest, ShiftPayload, ShiftResponse};
use crate::model::attendance::{AttendanceSnapshot, AttendanceStatus};
use crate::model::break_entry::{BreakEntry, BreakType};
use crate::model::shift::ShiftKind;
use crate::model::work_session::WorkSession;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Shift-aware attendance tracking

Employees clock in and out (several sessions per day are allowed) and take
paid or unpaid breaks. Every day is evaluated against the employee's shift.

### Rules
- Arriving after a fixed shift's start pushes the required logout by the same amount
- A break is classified when it ends: while paid allowance remains it closes
  as paid and only the minutes beyond the allowance are penalty, whatever
  type was requested
- Once the allowance is used up, every further break closes as unpaid and
  counts in full as penalty
- Paid breaks cannot start after the allowance is used up, and breaks
  requested as unpaid are limited per day
- Penalties extend the required logout minute for minute

### Security
Every endpoint needs a **JWT Bearer** access token. Shift writes are
**Admin** only; assignments and other employees' status need **HR** or **Admin**.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::start_break,
        crate::api::attendance::end_break,
        crate::api::attendance::my_status,
        crate::api::attendance::employee_status,

        crate::api::shift::list_shifts,
        crate::api::shift::get_shift,
        crate::api::shift::create_shift,
        crate::api::shift::update_shift,
        crate::api::shift::delete_shift,
        crate::api::shift::assign_shift
    ),
    components(
        schemas(
            StartBreakRequest,
            SessionResponse,
            BreakResponse,
            AttendanceSnapshot,
            AttendanceStatus,
            WorkSession,
            BreakEntry,
            BreakType,
            ShiftKind,
            ShiftPayload,
            ShiftResponse,
            AssignShiftRequest
        )
    ),
    tags(
        (name = "Attendance", description = "Clock-in, break and status APIs"),
        (name = "Shift", description = "Shift catalog and assignment APIs"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
