use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One clock-in/clock-out pair. `end_time == None` means the session is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkSession {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub attendance_day_id: u64,

    #[schema(example = "2026-01-05T10:15:00", value_type = String, format = "date-time")]
    pub start_time: NaiveDateTime,

    #[schema(example = "2026-01-05T19:15:00", value_type = Option<String>, format = "date-time", nullable = true)]
    pub end_time: Option<NaiveDateTime>,
}

impl WorkSession {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}
