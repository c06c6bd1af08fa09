use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use super::time_accounting::{self, BreakPolicy};
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceSnapshot, AttendanceStatus, DayLedger};
use crate::model::break_entry::{BreakEntry, BreakType};
use crate::model::shift::Shift;
use crate::model::work_session::WorkSession;
use crate::store::AttendanceStore;
use crate::utils::clock::Clock;

/// Clock-in, break and clock-out operations for one employee at a time.
///
/// Each operation reads the day ledger, validates against the time
/// accounting rules and performs a single atomic store write last, so a
/// rejection never touches the aggregate.
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    policy: BreakPolicy,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>, policy: BreakPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// The day an operation applies to: the latest day still holding an open
    /// session (an overnight session belongs to the day it started), else
    /// the calendar day of `today`.
    async fn current_ledger(
        &self,
        employee_id: u64,
        today: NaiveDate,
    ) -> Result<Option<DayLedger>, AttendanceError> {
        if let Some(ledger) = self.store.find_active_day(employee_id).await? {
            return Ok(Some(ledger));
        }
        Ok(self.store.find_day(employee_id, today).await?)
    }

    #[instrument(name = "attendance_clock_in", skip(self))]
    pub async fn clock_in(&self, employee_id: u64) -> Result<WorkSession, AttendanceError> {
        let now = self.clock.now();

        if let Some(active) = self.store.find_active_day(employee_id).await? {
            info!(day = %active.day.date, "Rejected: already clocked in");
            return Err(AttendanceError::duplicate("already clocked in"));
        }

        let day = self.store.find_or_create_day(employee_id, now.date()).await?;
        let session = self.store.open_session(day.id, now).await?;

        info!(day = %day.date, session_id = session.id, "Clocked in");
        Ok(session)
    }

    #[instrument(name = "attendance_clock_out", skip(self))]
    pub async fn clock_out(&self, employee_id: u64) -> Result<WorkSession, AttendanceError> {
        let now = self.clock.now();
        let ledger = self
            .current_ledger(employee_id, now.date())
            .await?
            .ok_or_else(|| AttendanceError::sequence("not clocked in"))?;

        let (session_id, worked_minutes) =
            time_accounting::close_session(&ledger, now).inspect_err(|e| info!(%e, "Rejected"))?;

        let session = self
            .store
            .close_session(ledger.day.id, session_id, now, worked_minutes)
            .await?;

        info!(session_id, worked_minutes, "Clocked out");
        Ok(session)
    }

    #[instrument(name = "attendance_start_break", skip(self, shift), fields(shift_id = shift.id))]
    pub async fn start_break(
        &self,
        employee_id: u64,
        shift: &Shift,
        break_type: BreakType,
    ) -> Result<BreakEntry, AttendanceError> {
        let now = self.clock.now();
        let ledger = self.current_ledger(employee_id, now.date()).await?;

        let day = time_accounting::admit_break(
            ledger.as_ref(),
            &shift.definition,
            break_type,
            &self.policy,
        )
        .inspect_err(|e| info!(%e, "Rejected"))?;

        let limits = self.policy.limits(&shift.definition);
        let entry = self
            .store
            .open_break(day.day.id, break_type, limits, now)
            .await
            .inspect_err(|e| info!(%e, "Rejected on write"))?;

        info!(break_id = entry.id, "Break started");
        Ok(entry)
    }

    #[instrument(name = "attendance_end_break", skip(self, shift), fields(shift_id = shift.id))]
    pub async fn end_break(
        &self,
        employee_id: u64,
        shift: &Shift,
    ) -> Result<BreakEntry, AttendanceError> {
        let now = self.clock.now();
        let ledger = self
            .current_ledger(employee_id, now.date())
            .await?
            .ok_or_else(|| AttendanceError::sequence("not currently on a break"))?;

        let (break_id, closure) = time_accounting::close_break(&ledger, &shift.definition, now)
            .inspect_err(|e| info!(%e, "Rejected"))?;

        let entry = self.store.close_break(ledger.day.id, break_id, &closure).await?;

        info!(
            break_id,
            duration_minutes = closure.duration_minutes,
            break_type = %closure.break_type,
            penalty_minutes = closure.penalty_minutes,
            "Break ended"
        );
        Ok(entry)
    }

    /// Read-only view of a day. Without `date` this is the current day as
    /// used by the mutating operations. Nothing is written.
    #[instrument(name = "attendance_status", skip(self, shift))]
    pub async fn status(
        &self,
        employee_id: u64,
        date: Option<NaiveDate>,
        shift: Option<&Shift>,
    ) -> Result<AttendanceSnapshot, AttendanceError> {
        let today = self.clock.now().date();
        let ledger = match date {
            Some(date) => self.store.find_day(employee_id, date).await?,
            None => self.current_ledger(employee_id, today).await?,
        };

        let snapshot = snapshot(employee_id, date.unwrap_or(today), ledger.as_ref(), shift);
        debug!(status = ?snapshot.status, required_logout = ?snapshot.required_logout, "Status read");
        Ok(snapshot)
    }
}

fn snapshot(
    employee_id: u64,
    fallback_date: NaiveDate,
    ledger: Option<&DayLedger>,
    shift: Option<&Shift>,
) -> AttendanceSnapshot {
    let first_clock_in = ledger.and_then(DayLedger::first_clock_in);
    let penalty_minutes = ledger.map_or(0, |l| l.day.penalty_minutes);
    let breaks = ledger.map(|l| l.breaks.as_slice()).unwrap_or_default();

    let required_logout = shift.and_then(|s| {
        time_accounting::compute_required_logout(&s.definition, first_clock_in, penalty_minutes)
    });
    let lateness_minutes = match (shift, first_clock_in) {
        (Some(s), Some(clock_in)) => time_accounting::lateness_minutes(&s.definition, clock_in),
        _ => 0,
    };

    AttendanceSnapshot {
        employee_id,
        date: ledger.map_or(fallback_date, |l| l.day.date),
        status: AttendanceStatus::of(ledger),
        shift_id: shift.map(|s| s.id),
        first_clock_in,
        required_logout,
        lateness_minutes,
        total_work_minutes: ledger.map_or(0, |l| l.day.total_work_minutes),
        total_break_minutes: ledger.map_or(0, |l| l.day.total_break_minutes),
        penalty_minutes,
        paid_break_minutes_taken: time_accounting::paid_minutes_taken(breaks),
        remaining_paid_allowance_minutes: shift
            .map(|s| time_accounting::remaining_paid_allowance(&s.definition, breaks).max(0)),
        sessions: ledger.map(|l| l.sessions.clone()).unwrap_or_default(),
        breaks: breaks.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::shift::ShiftDefinition;
    use crate::store::MemoryStore;
    use crate::utils::clock::ManualClock;
    use chrono::{NaiveDateTime, NaiveTime};

    const EMPLOYEE: u64 = 42;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn office_shift() -> Shift {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        Shift {
            id: 1,
            definition: ShiftDefinition::fixed("office", t(10), t(19), 30),
        }
    }

    fn flexible_shift() -> Shift {
        Shift {
            id: 2,
            definition: ShiftDefinition::flexible("flex", 9.0, 30),
        }
    }

    fn service(start: NaiveDateTime) -> (AttendanceService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let service = AttendanceService::new(
            Arc::new(MemoryStore::default()),
            clock.clone(),
            BreakPolicy::default(),
        );
        (service, clock)
    }

    async fn take_break(
        service: &AttendanceService,
        clock: &ManualClock,
        shift: &Shift,
        break_type: BreakType,
        minutes: i64,
    ) -> BreakEntry {
        service.start_break(EMPLOYEE, shift, break_type).await.unwrap();
        clock.advance_minutes(minutes);
        service.end_break(EMPLOYEE, shift).await.unwrap()
    }

    #[actix_web::test]
    async fn late_arrival_pushes_required_logout() {
        let shift = office_shift();
        let (service, _clock) = service(at(10, 15));

        service.clock_in(EMPLOYEE).await.unwrap();
        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();

        assert_eq!(status.status, AttendanceStatus::ClockedIn);
        assert_eq!(status.lateness_minutes, 15);
        assert_eq!(status.required_logout, Some(at(19, 15)));
    }

    #[actix_web::test]
    async fn breaks_within_and_beyond_allowance() {
        let shift = office_shift();
        let (service, clock) = service(at(10, 15));
        service.clock_in(EMPLOYEE).await.unwrap();

        clock.set(at(13, 0));
        let first = take_break(&service, &clock, &shift, BreakType::Paid, 20).await;
        assert_eq!(first.break_type, BreakType::Paid);
        assert_eq!(first.penalty_minutes, 0);

        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.penalty_minutes, 0);
        assert_eq!(status.required_logout, Some(at(19, 15)));
        assert_eq!(status.remaining_paid_allowance_minutes, Some(10));

        clock.set(at(16, 0));
        let second = take_break(&service, &clock, &shift, BreakType::Paid, 25).await;
        assert_eq!(second.break_type, BreakType::Paid);
        assert_eq!(second.penalty_minutes, 15);
        assert!(second.is_penalty);

        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.penalty_minutes, 15);
        assert_eq!(status.total_break_minutes, 45);
        assert_eq!(status.required_logout, Some(at(19, 30)));
        assert_eq!(status.remaining_paid_allowance_minutes, Some(0));

        let err = service
            .start_break(EMPLOYEE, &shift, BreakType::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::AllowanceExceeded(_)));
    }

    #[actix_web::test]
    async fn flexible_shift_counts_from_clock_in() {
        let shift = flexible_shift();
        let (service, _clock) = service(at(8, 0));
        service.clock_in(EMPLOYEE).await.unwrap();

        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.required_logout, Some(at(17, 0)));
        assert_eq!(status.lateness_minutes, 0);
    }

    #[actix_web::test]
    async fn second_unpaid_break_is_rejected() {
        for shift in [office_shift(), flexible_shift()] {
            let (service, clock) = service(at(10, 0));
            service.clock_in(EMPLOYEE).await.unwrap();

            clock.set(at(12, 0));
            take_break(&service, &clock, &shift, BreakType::Unpaid, 5).await;

            let err = service
                .start_break(EMPLOYEE, &shift, BreakType::Unpaid)
                .await
                .unwrap_err();
            assert!(matches!(err, AttendanceError::AllowanceExceeded(_)));
        }
    }

    #[actix_web::test]
    async fn break_after_allowance_is_entirely_penalty() {
        let shift = office_shift();
        let (service, clock) = service(at(10, 0));
        service.clock_in(EMPLOYEE).await.unwrap();

        clock.set(at(12, 0));
        take_break(&service, &clock, &shift, BreakType::Paid, 30).await;

        clock.set(at(15, 0));
        let unpaid = take_break(&service, &clock, &shift, BreakType::Unpaid, 12).await;
        assert_eq!(unpaid.requested_type, BreakType::Unpaid);
        assert_eq!(unpaid.break_type, BreakType::Unpaid);
        assert_eq!(unpaid.penalty_minutes, 12);

        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.required_logout, Some(at(19, 12)));
    }

    #[actix_web::test]
    async fn sequence_rules_are_enforced() {
        let shift = office_shift();
        let (service, clock) = service(at(10, 0));

        let err = service.start_break(EMPLOYEE, &shift, BreakType::Paid).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "must clock in first"));
        let err = service.end_break(EMPLOYEE, &shift).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(_)));
        let err = service.clock_out(EMPLOYEE).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "not clocked in"));

        service.clock_in(EMPLOYEE).await.unwrap();
        let err = service.clock_in(EMPLOYEE).await.unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateActiveState(_)));

        service.start_break(EMPLOYEE, &shift, BreakType::Paid).await.unwrap();
        let err = service.start_break(EMPLOYEE, &shift, BreakType::Paid).await.unwrap_err();
        assert!(matches!(err, AttendanceError::DuplicateActiveState(_)));
        let err = service.clock_out(EMPLOYEE).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "must end break first"));

        clock.advance_minutes(10);
        service.end_break(EMPLOYEE, &shift).await.unwrap();
        clock.set(at(19, 0));
        service.clock_out(EMPLOYEE).await.unwrap();

        let err = service.start_break(EMPLOYEE, &shift, BreakType::Paid).await.unwrap_err();
        assert!(matches!(err, AttendanceError::SequenceViolation(ref m) if m == "must be in an active session"));
    }

    #[actix_web::test]
    async fn clock_out_then_back_in_reopens_the_day() {
        let shift = office_shift();
        let (service, clock) = service(at(10, 0));

        service.clock_in(EMPLOYEE).await.unwrap();
        clock.set(at(13, 0));
        service.clock_out(EMPLOYEE).await.unwrap();

        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.status, AttendanceStatus::ClockedOut);
        assert_eq!(status.total_work_minutes, 180);

        clock.set(at(14, 0));
        service.clock_in(EMPLOYEE).await.unwrap();
        clock.set(at(19, 0));
        service.clock_out(EMPLOYEE).await.unwrap();

        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.sessions.len(), 2);
        assert_eq!(status.total_work_minutes, 480);
        assert_eq!(status.first_clock_in, Some(at(10, 0)));
        assert_eq!(status.required_logout, Some(at(19, 0)));
    }

    #[actix_web::test]
    async fn overnight_session_closes_after_midnight() {
        let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        let shift = Shift {
            id: 3,
            definition: ShiftDefinition::fixed("night", t(22), t(6), 30),
        };
        let (service, clock) = service(at(22, 0));
        service.clock_in(EMPLOYEE).await.unwrap();

        let next_morning = at(6, 0) + chrono::Duration::days(1);
        clock.set(next_morning);
        let status = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(status.date, at(0, 0).date());
        assert_eq!(status.required_logout, Some(next_morning));

        let session = service.clock_out(EMPLOYEE).await.unwrap();
        assert_eq!(session.end_time, Some(next_morning));
    }

    #[actix_web::test]
    async fn status_reads_are_stable() {
        let shift = office_shift();
        let (service, clock) = service(at(10, 5));
        service.clock_in(EMPLOYEE).await.unwrap();
        clock.set(at(12, 0));
        service.start_break(EMPLOYEE, &shift, BreakType::Paid).await.unwrap();

        let first = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        let second = service.status(EMPLOYEE, None, Some(&shift)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, AttendanceStatus::OnBreak);
    }

    #[actix_web::test]
    async fn status_without_shift_or_clock_in() {
        let (service, _clock) = service(at(9, 0));

        let status = service.status(EMPLOYEE, None, None).await.unwrap();
        assert_eq!(status.status, AttendanceStatus::NotClockedIn);
        assert_eq!(status.date, at(0, 0).date());
        assert!(status.required_logout.is_none());
        assert!(status.remaining_paid_allowance_minutes.is_none());

        service.clock_in(EMPLOYEE).await.unwrap();
        let status = service.status(EMPLOYEE, None, None).await.unwrap();
        assert_eq!(status.status, AttendanceStatus::ClockedIn);
        assert!(status.required_logout.is_none());
    }
}
