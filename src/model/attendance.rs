use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::break_entry::BreakEntry;
use super::work_session::WorkSession;

/// One row per (employee, calendar date); the accumulators only ever grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceDay {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,

    pub total_work_minutes: i64,
    pub total_break_minutes: i64,
    pub penalty_minutes: i64,
}

impl AttendanceDay {
    pub fn new(id: u64, employee_id: u64, date: NaiveDate) -> Self {
        Self {
            id,
            employee_id,
            date,
            total_work_minutes: 0,
            total_break_minutes: 0,
            penalty_minutes: 0,
        }
    }
}

/// Derived from the ledgers on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    NotClockedIn,
    ClockedIn,
    OnBreak,
    ClockedOut,
}

/// An attendance day together with its session and break ledgers,
/// both ordered by start time.
#[derive(Debug, Clone, PartialEq)]
pub struct DayLedger {
    pub day: AttendanceDay,
    pub sessions: Vec<WorkSession>,
    pub breaks: Vec<BreakEntry>,
}

impl DayLedger {
    pub fn active_session(&self) -> Option<&WorkSession> {
        self.sessions.iter().find(|s| s.is_active())
    }

    pub fn active_break(&self) -> Option<&BreakEntry> {
        self.breaks.iter().find(|b| b.is_active())
    }

    /// Start of the day's first work session.
    pub fn first_clock_in(&self) -> Option<NaiveDateTime> {
        self.sessions.iter().map(|s| s.start_time).min()
    }

    pub fn status(&self) -> AttendanceStatus {
        if self.active_break().is_some() {
            AttendanceStatus::OnBreak
        } else if self.active_session().is_some() {
            AttendanceStatus::ClockedIn
        } else if self.sessions.is_empty() {
            AttendanceStatus::NotClockedIn
        } else {
            AttendanceStatus::ClockedOut
        }
    }
}

impl AttendanceStatus {
    pub fn of(ledger: Option<&DayLedger>) -> Self {
        ledger.map_or(AttendanceStatus::NotClockedIn, DayLedger::status)
    }
}

/// Read model returned by the status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSnapshot {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,

    pub status: AttendanceStatus,

    #[schema(example = 1, nullable = true)]
    pub shift_id: Option<u64>,

    #[schema(example = "2026-01-05T10:15:00", value_type = Option<String>, format = "date-time", nullable = true)]
    pub first_clock_in: Option<NaiveDateTime>,

    #[schema(example = "2026-01-05T19:15:00", value_type = Option<String>, format = "date-time", nullable = true)]
    pub required_logout: Option<NaiveDateTime>,

    #[schema(example = 15)]
    pub lateness_minutes: i64,

    pub total_work_minutes: i64,
    pub total_break_minutes: i64,
    pub penalty_minutes: i64,
    pub paid_break_minutes_taken: i64,

    #[schema(example = 10, nullable = true)]
    pub remaining_paid_allowance_minutes: Option<i64>,

    pub sessions: Vec<WorkSession>,
    pub breaks: Vec<BreakEntry>,
}
