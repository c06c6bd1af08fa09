use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BreakType {
    Paid,
    Unpaid,
}

impl BreakType {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BreakEntry {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub attendance_day_id: u64,

    /// Type the employee asked for when the break started.
    pub requested_type: BreakType,

    /// Classification; equals `requested_type` until the break is closed.
    pub break_type: BreakType,

    #[schema(example = "2026-01-05T13:00:00", value_type = String, format = "date-time")]
    pub start_time: NaiveDateTime,

    #[schema(example = "2026-01-05T13:20:00", value_type = Option<String>, format = "date-time", nullable = true)]
    pub end_time: Option<NaiveDateTime>,

    #[schema(example = 20, nullable = true)]
    pub duration_minutes: Option<i64>,

    #[schema(example = 0)]
    pub penalty_minutes: i64,

    pub is_penalty: bool,
}

impl BreakEntry {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Closed and classified as paid.
    pub fn is_closed_paid(&self) -> bool {
        !self.is_active() && self.break_type == BreakType::Paid
    }
}

/// Daily caps a new break must fit under. Checked once against the ledger
/// snapshot and again by the store inside its write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakLimits {
    pub paid_allowance_minutes: i64,
    pub unpaid_daily_limit: u32,
}

impl BreakLimits {
    /// Rejection message when a break of `requested` type may not start on
    /// a day holding `breaks`.
    pub fn check(&self, breaks: &[BreakEntry], requested: BreakType) -> Result<(), String> {
        match requested {
            BreakType::Paid => {
                let taken: i64 = breaks
                    .iter()
                    .filter(|b| b.is_closed_paid())
                    .filter_map(|b| b.duration_minutes)
                    .sum();
                if taken >= self.paid_allowance_minutes {
                    return Err("paid allowance exhausted".to_string());
                }
            }
            BreakType::Unpaid => {
                let taken = breaks
                    .iter()
                    .filter(|b| b.requested_type == BreakType::Unpaid)
                    .count();
                if taken >= self.unpaid_daily_limit as usize {
                    return Err(format!(
                        "unpaid break limit of {} per day reached",
                        self.unpaid_daily_limit
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Outcome of closing a break, ready to be written to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakClosure {
    pub end_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub break_type: BreakType,
    pub penalty_minutes: i64,
}

impl BreakClosure {
    pub fn is_penalty(&self) -> bool {
        self.penalty_minutes > 0
    }

    pub fn apply(&self, entry: &mut BreakEntry) {
        entry.end_time = Some(self.end_time);
        entry.duration_minutes = Some(self.duration_minutes);
        entry.break_type = self.break_type;
        entry.penalty_minutes = self.penalty_minutes;
        entry.is_penalty = self.is_penalty();
    }
}
