use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

use crate::error::AttendanceError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, IntoStaticStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShiftKind {
    Fixed,
    Flexible,
}

impl ShiftKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShiftSchedule {
    /// Clock-time window; `end_time < start_time` means the shift crosses midnight.
    Fixed {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    /// Required duration counted from whenever the employee clocks in.
    Flexible { required_duration_hours: f64 },
}

/// A validated shift. Build one through [`ShiftDefinition::from_parts`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftDefinition {
    pub name: String,
    pub schedule: ShiftSchedule,
    pub paid_break_allowance_minutes: i64,
}

/// A shift as stored in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub id: u64,
    pub definition: ShiftDefinition,
}

impl ShiftDefinition {
    pub fn fixed(name: &str, start_time: NaiveTime, end_time: NaiveTime, allowance: i64) -> Self {
        Self {
            name: name.to_string(),
            schedule: ShiftSchedule::Fixed {
                start_time,
                end_time,
            },
            paid_break_allowance_minutes: allowance,
        }
    }

    pub fn flexible(name: &str, required_duration_hours: f64, allowance: i64) -> Self {
        Self {
            name: name.to_string(),
            schedule: ShiftSchedule::Flexible {
                required_duration_hours,
            },
            paid_break_allowance_minutes: allowance,
        }
    }

    /// Validates flat shift fields and builds the matching schedule.
    pub fn from_parts(
        name: &str,
        kind: ShiftKind,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
        required_duration_hours: Option<f64>,
        paid_break_allowance_minutes: i64,
    ) -> Result<Self, AttendanceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::InvalidShift("name must not be empty".into()));
        }
        if paid_break_allowance_minutes < 0 {
            return Err(AttendanceError::InvalidShift(
                "paid_break_allowance_minutes must not be negative".into(),
            ));
        }

        let definition = match kind {
            ShiftKind::Fixed => {
                let (Some(start), Some(end)) = (start_time, end_time) else {
                    return Err(AttendanceError::InvalidShift(
                        "fixed shifts require start_time and end_time".into(),
                    ));
                };
                if required_duration_hours.is_some() {
                    return Err(AttendanceError::InvalidShift(
                        "fixed shifts derive their duration from start_time and end_time".into(),
                    ));
                }
                if start == end {
                    return Err(AttendanceError::InvalidShift(
                        "start_time and end_time must differ".into(),
                    ));
                }
                Self::fixed(name, start, end, paid_break_allowance_minutes)
            }
            ShiftKind::Flexible => {
                if start_time.is_some() || end_time.is_some() {
                    return Err(AttendanceError::InvalidShift(
                        "flexible shifts must not set start_time or end_time".into(),
                    ));
                }
                let hours = required_duration_hours.ok_or_else(|| {
                    AttendanceError::InvalidShift(
                        "flexible shifts require required_duration_hours".into(),
                    )
                })?;
                if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
                    return Err(AttendanceError::InvalidShift(
                        "required_duration_hours must be within (0, 24]".into(),
                    ));
                }
                Self::flexible(name, hours, paid_break_allowance_minutes)
            }
        };

        Ok(definition)
    }

    pub fn kind(&self) -> ShiftKind {
        match self.schedule {
            ShiftSchedule::Fixed { .. } => ShiftKind::Fixed,
            ShiftSchedule::Flexible { .. } => ShiftKind::Flexible,
        }
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        match self.schedule {
            ShiftSchedule::Fixed { start_time, .. } => Some(start_time),
            ShiftSchedule::Flexible { .. } => None,
        }
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        match self.schedule {
            ShiftSchedule::Fixed { end_time, .. } => Some(end_time),
            ShiftSchedule::Flexible { .. } => None,
        }
    }

    pub fn required_duration_hours(&self) -> Option<f64> {
        match self.schedule {
            ShiftSchedule::Fixed { .. } => None,
            ShiftSchedule::Flexible {
                required_duration_hours,
            } => Some(required_duration_hours),
        }
    }

    /// Nominal working time in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        match self.schedule {
            ShiftSchedule::Fixed {
                start_time,
                end_time,
            } => {
                let mut span = end_time.signed_duration_since(start_time);
                if end_time < start_time {
                    span += Duration::hours(24);
                }
                span.num_minutes()
            }
            ShiftSchedule::Flexible {
                required_duration_hours,
            } => (required_duration_hours * 60.0).round() as i64,
        }
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes() as f64 / 60.0
    }
}
