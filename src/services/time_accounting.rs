//! Pure time arithmetic for attendance days.
//!
//! Every function here is side-effect free: callers load a [`DayLedger`],
//! ask the engine what is allowed or what a close produces, then persist.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AttendanceError;
use crate::model::attendance::DayLedger;
use crate::model::break_entry::{BreakClosure, BreakEntry, BreakLimits, BreakType};
use crate::model::shift::{ShiftDefinition, ShiftSchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPolicy {
    /// How many breaks requested as unpaid an employee may start per day.
    pub unpaid_daily_limit: u32,
}

impl BreakPolicy {
    pub fn limits(&self, shift: &ShiftDefinition) -> BreakLimits {
        BreakLimits {
            paid_allowance_minutes: shift.paid_break_allowance_minutes,
            unpaid_daily_limit: self.unpaid_daily_limit,
        }
    }
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            unpaid_daily_limit: 1,
        }
    }
}

/// Whole minutes from `start` to `end`, rounded half up, never negative.
///
/// This is the only minute conversion used for lateness, break and session
/// durations.
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let seconds = end.signed_duration_since(start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + 30) / 60
}

/// Nominal start and end of a fixed shift on `date`. The end moves to the
/// next day when the shift crosses midnight.
pub fn nominal_window(
    start_time: NaiveTime,
    end_time: NaiveTime,
    date: NaiveDate,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(start_time);
    let mut end = date.and_time(end_time);
    if end_time < start_time {
        end += Duration::days(1);
    }
    (start, end)
}

/// Calendar date the shift worked by `clock_in` started on. A clock-in past
/// midnight but before the end of an overnight shift belongs to the shift
/// that began the evening before.
pub fn shift_date(start_time: NaiveTime, end_time: NaiveTime, clock_in: NaiveDateTime) -> NaiveDate {
    let date = clock_in.date();
    if end_time < start_time && clock_in.time() < end_time {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Minutes the clock-in is past the nominal start. Always 0 for flexible shifts.
pub fn lateness_minutes(shift: &ShiftDefinition, clock_in: NaiveDateTime) -> i64 {
    match shift.schedule {
        ShiftSchedule::Fixed {
            start_time,
            end_time,
        } => {
            let date = shift_date(start_time, end_time, clock_in);
            let (nominal_start, _) = nominal_window(start_time, end_time, date);
            minutes_between(nominal_start, clock_in)
        }
        ShiftSchedule::Flexible { .. } => 0,
    }
}

/// When the employee may leave, or `None` before the first clock-in.
///
/// `penalty_minutes_so_far` is the day's break-penalty accumulator; lateness
/// is derived here from `clock_in` and must not be included in it.
pub fn compute_required_logout(
    shift: &ShiftDefinition,
    clock_in: Option<NaiveDateTime>,
    penalty_minutes_so_far: i64,
) -> Option<NaiveDateTime> {
    let clock_in = clock_in?;
    let penalty = Duration::minutes(penalty_minutes_so_far.max(0));

    let logout = match shift.schedule {
        ShiftSchedule::Fixed {
            start_time,
            end_time,
        } => {
            let date = shift_date(start_time, end_time, clock_in);
            let (_, nominal_end) = nominal_window(start_time, end_time, date);
            nominal_end + Duration::minutes(lateness_minutes(shift, clock_in)) + penalty
        }
        ShiftSchedule::Flexible { .. } => {
            clock_in + Duration::minutes(shift.duration_minutes()) + penalty
        }
    };

    Some(logout)
}

/// Sum of durations of closed breaks classified as paid.
pub fn paid_minutes_taken(breaks: &[BreakEntry]) -> i64 {
    breaks
        .iter()
        .filter(|b| b.is_closed_paid())
        .filter_map(|b| b.duration_minutes)
        .sum()
}

/// Paid allowance left before the active break is counted. May be negative
/// once overage has been booked as paid time.
pub fn remaining_paid_allowance(shift: &ShiftDefinition, breaks: &[BreakEntry]) -> i64 {
    shift.paid_break_allowance_minutes - paid_minutes_taken(breaks)
}

/// Checks whether a break of `requested` type may start now and hands back
/// the day it would be recorded on.
pub fn admit_break<'a>(
    ledger: Option<&'a DayLedger>,
    shift: &ShiftDefinition,
    requested: BreakType,
    policy: &BreakPolicy,
) -> Result<&'a DayLedger, AttendanceError> {
    let ledger = ledger.ok_or_else(|| AttendanceError::sequence("must clock in first"))?;

    if ledger.active_session().is_none() {
        return Err(AttendanceError::sequence("must be in an active session"));
    }
    if ledger.active_break().is_some() {
        return Err(AttendanceError::duplicate("already on a break"));
    }

    policy
        .limits(shift)
        .check(&ledger.breaks, requested)
        .map_err(AttendanceError::AllowanceExceeded)?;

    Ok(ledger)
}

/// Classifies the active break as of `now`.
///
/// The classification depends only on the paid allowance still available,
/// not on the type requested at start: with allowance left the break is paid
/// and only the overage is penalty, otherwise the whole break is penalty.
pub fn close_break(
    ledger: &DayLedger,
    shift: &ShiftDefinition,
    now: NaiveDateTime,
) -> Result<(u64, BreakClosure), AttendanceError> {
    let active = ledger
        .active_break()
        .ok_or_else(|| AttendanceError::sequence("not currently on a break"))?;

    let elapsed = minutes_between(active.start_time, now);
    let remaining = remaining_paid_allowance(shift, &ledger.breaks);

    let (break_type, penalty_minutes) = if remaining > 0 {
        (BreakType::Paid, (elapsed - remaining).max(0))
    } else {
        (BreakType::Unpaid, elapsed)
    };

    Ok((
        active.id,
        BreakClosure {
            end_time: now,
            duration_minutes: elapsed,
            break_type,
            penalty_minutes,
        },
    ))
}

/// Validates a clock-out and returns the session to close with its worked minutes.
pub fn close_session(
    ledger: &DayLedger,
    now: NaiveDateTime,
) -> Result<(u64, i64), AttendanceError> {
    let session = ledger
        .active_session()
        .ok_or_else(|| AttendanceError::sequence("not clocked in"))?;

    if ledger.active_break().is_some() {
        return Err(AttendanceError::sequence("must end break first"));
    }

    Ok((session.id, minutes_between(session.start_time, now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceDay;
    use crate::model::work_session::WorkSession;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn office_shift() -> ShiftDefinition {
        ShiftDefinition::fixed("office", t(10, 0), t(19, 0), 30)
    }

    fn clocked_in_ledger(start: NaiveDateTime) -> DayLedger {
        DayLedger {
            day: AttendanceDay::new(1, 7, start.date()),
            sessions: vec![WorkSession {
                id: 1,
                attendance_day_id: 1,
                start_time: start,
                end_time: None,
            }],
            breaks: vec![],
        }
    }

    fn closed_break(id: u64, break_type: BreakType, minutes: i64) -> BreakEntry {
        BreakEntry {
            id,
            attendance_day_id: 1,
            requested_type: break_type,
            break_type,
            start_time: at(12, 0),
            end_time: Some(at(12, 0) + Duration::minutes(minutes)),
            duration_minutes: Some(minutes),
            penalty_minutes: 0,
            is_penalty: false,
        }
    }

    fn open_break(id: u64, requested: BreakType, start: NaiveDateTime) -> BreakEntry {
        BreakEntry {
            id,
            attendance_day_id: 1,
            requested_type: requested,
            break_type: requested,
            start_time: start,
            end_time: None,
            duration_minutes: None,
            penalty_minutes: 0,
            is_penalty: false,
        }
    }

    #[test]
    fn minutes_round_to_nearest() {
        let start = at(10, 0);
        assert_eq!(minutes_between(start, start + Duration::seconds(29)), 0);
        assert_eq!(minutes_between(start, start + Duration::seconds(30)), 1);
        assert_eq!(minutes_between(start, start + Duration::seconds(20 * 60 + 29)), 20);
        assert_eq!(minutes_between(start, start - Duration::minutes(5)), 0);
    }

    #[test]
    fn on_time_fixed_shift_logs_out_at_nominal_end() {
        let shift = office_shift();
        assert_eq!(compute_required_logout(&shift, Some(at(10, 0)), 0), Some(at(19, 0)));
    }

    #[test]
    fn early_arrival_does_not_shorten_the_day() {
        let shift = office_shift();
        assert_eq!(lateness_minutes(&shift, at(9, 40)), 0);
        assert_eq!(compute_required_logout(&shift, Some(at(9, 40)), 0), Some(at(19, 0)));
    }

    #[test]
    fn lateness_and_penalty_push_fixed_logout() {
        let shift = office_shift();
        assert_eq!(compute_required_logout(&shift, Some(at(10, 15)), 0), Some(at(19, 15)));
        assert_eq!(compute_required_logout(&shift, Some(at(10, 15)), 15), Some(at(19, 30)));
    }

    #[test]
    fn fixed_logout_is_monotonic_in_lateness_and_penalty() {
        let shift = office_shift();
        let mut previous = None;
        for late in 0..120 {
            let logout = compute_required_logout(&shift, Some(at(10, 0) + Duration::minutes(late)), 0);
            assert!(logout >= previous);
            previous = logout;
        }

        let mut previous = None;
        for penalty in 0..120 {
            let logout = compute_required_logout(&shift, Some(at(10, 20)), penalty);
            assert!(logout >= previous);
            previous = logout;
        }
    }

    #[test]
    fn overnight_fixed_shift_ends_next_day() {
        let shift = ShiftDefinition::fixed("night", t(22, 0), t(6, 0), 30);
        let clock_in = at(22, 5);
        let expected = NaiveDate::from_ymd_opt(2026, 1, 6)
            .unwrap()
            .and_hms_opt(6, 5, 0)
            .unwrap();
        assert_eq!(compute_required_logout(&shift, Some(clock_in), 0), Some(expected));
    }

    #[test]
    fn late_clock_in_after_midnight_counts_against_previous_evening() {
        let shift = ShiftDefinition::fixed("night", t(22, 0), t(6, 0), 30);
        let next = |h, m| {
            NaiveDate::from_ymd_opt(2026, 1, 6)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };

        assert_eq!(shift_date(t(22, 0), t(6, 0), next(0, 30)), day());
        assert_eq!(lateness_minutes(&shift, next(0, 30)), 150);
        assert_eq!(
            compute_required_logout(&shift, Some(next(0, 30)), 10),
            Some(next(8, 40))
        );

        // after the shift's end the clock-in opens a new evening
        assert_eq!(shift_date(t(22, 0), t(6, 0), next(6, 0)), next(0, 0).date());
        assert_eq!(lateness_minutes(&shift, at(21, 40)), 0);
    }

    #[test]
    fn flexible_logout_is_clock_in_plus_duration_plus_penalty() {
        let shift = ShiftDefinition::flexible("flex", 9.0, 30);
        assert_eq!(compute_required_logout(&shift, Some(at(8, 0)), 0), Some(at(17, 0)));

        for (start, penalty) in [(at(6, 0), 0), (at(8, 17), 12), (at(11, 3), 45)] {
            let logout = compute_required_logout(&shift, Some(start), penalty).unwrap();
            assert_eq!(minutes_between(start, logout), 9 * 60 + penalty);
        }
    }

    #[test]
    fn no_clock_in_means_not_calculable() {
        assert_eq!(compute_required_logout(&office_shift(), None, 10), None);
    }

    #[test]
    fn break_requires_clock_in_and_active_session() {
        let shift = office_shift();
        let policy = BreakPolicy::default();

        let err = admit_break(None, &shift, BreakType::Paid, &policy).unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "must clock in first"));

        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.sessions[0].end_time = Some(at(12, 0));
        let err = admit_break(Some(&ledger), &shift, BreakType::Paid, &policy).unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(_)));
    }

    #[test]
    fn second_concurrent_break_is_rejected() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(open_break(1, BreakType::Paid, at(12, 0)));
        let err = admit_break(Some(&ledger), &office_shift(), BreakType::Unpaid, &BreakPolicy::default())
            .unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateActiveState(_)));
    }

    #[test]
    fn paid_break_rejected_iff_allowance_used() {
        let shift = office_shift();
        let policy = BreakPolicy::default();

        for (taken, admitted) in [(0, true), (29, true), (30, false), (45, false)] {
            let mut ledger = clocked_in_ledger(at(10, 0));
            if taken > 0 {
                ledger.breaks.push(closed_break(1, BreakType::Paid, taken));
            }
            let result = admit_break(Some(&ledger), &shift, BreakType::Paid, &policy);
            assert_eq!(result.is_ok(), admitted, "taken = {taken}");
        }
    }

    #[test]
    fn unpaid_breaks_do_not_consume_paid_allowance_check() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(closed_break(1, BreakType::Unpaid, 60));
        let admitted =
            admit_break(Some(&ledger), &office_shift(), BreakType::Paid, &BreakPolicy::default())
                .unwrap();
        assert_eq!(admitted.day.id, ledger.day.id);
    }

    #[test]
    fn unpaid_limit_counts_requested_type() {
        let shift = office_shift();
        let mut ledger = clocked_in_ledger(at(10, 0));
        let mut reclassified = closed_break(1, BreakType::Paid, 10);
        reclassified.requested_type = BreakType::Unpaid;
        ledger.breaks.push(reclassified);

        let err = admit_break(Some(&ledger), &shift, BreakType::Unpaid, &BreakPolicy::default())
            .unwrap_err();
        assert!(matches!(err, AttendanceError::AllowanceExceeded(ref m) if m.contains("1 per day")));

        let relaxed = BreakPolicy {
            unpaid_daily_limit: 2,
        };
        assert!(admit_break(Some(&ledger), &shift, BreakType::Unpaid, &relaxed).is_ok());
    }

    #[test]
    fn break_within_allowance_is_paid_without_penalty() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(open_break(4, BreakType::Paid, at(13, 0)));

        let (id, closure) = close_break(&ledger, &office_shift(), at(13, 20)).unwrap();
        assert_eq!(id, 4);
        assert_eq!(closure.duration_minutes, 20);
        assert_eq!(closure.break_type, BreakType::Paid);
        assert_eq!(closure.penalty_minutes, 0);
        assert!(!closure.is_penalty());
    }

    #[test]
    fn overage_beyond_remaining_allowance_is_penalty() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(closed_break(1, BreakType::Paid, 20));
        ledger.breaks.push(open_break(2, BreakType::Paid, at(15, 0)));

        let (_, closure) = close_break(&ledger, &office_shift(), at(15, 25)).unwrap();
        assert_eq!(closure.break_type, BreakType::Paid);
        assert_eq!(closure.penalty_minutes, 15);
    }

    #[test]
    fn exhausted_allowance_makes_whole_break_penalty() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(closed_break(1, BreakType::Paid, 30));
        ledger.breaks.push(open_break(2, BreakType::Unpaid, at(16, 0)));

        let (_, closure) = close_break(&ledger, &office_shift(), at(16, 12)).unwrap();
        assert_eq!(closure.break_type, BreakType::Unpaid);
        assert_eq!(closure.penalty_minutes, 12);
        assert!(closure.is_penalty());
    }

    #[test]
    fn unpaid_request_is_reclassified_as_paid_while_allowance_remains() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(open_break(1, BreakType::Unpaid, at(14, 0)));

        let (_, closure) = close_break(&ledger, &office_shift(), at(14, 10)).unwrap();
        assert_eq!(closure.break_type, BreakType::Paid);
        assert_eq!(closure.penalty_minutes, 0);
    }

    #[test]
    fn ending_without_active_break_is_sequence_violation() {
        let ledger = clocked_in_ledger(at(10, 0));
        let err = close_break(&ledger, &office_shift(), at(11, 0)).unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "not currently on a break"));
    }

    #[test]
    fn clock_out_requires_session_and_no_break() {
        let mut ledger = clocked_in_ledger(at(10, 0));
        ledger.breaks.push(open_break(1, BreakType::Paid, at(12, 0)));
        let err = close_session(&ledger, at(12, 5)).unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "must end break first"));

        ledger.breaks.clear();
        assert_eq!(close_session(&ledger, at(19, 0)).unwrap(), (1, 540));

        ledger.sessions[0].end_time = Some(at(19, 0));
        let err = close_session(&ledger, at(19, 1)).unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "not clocked in"));
    }
}
