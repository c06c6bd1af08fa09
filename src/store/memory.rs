use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{AttendanceStore, ShiftStore};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceDay, DayLedger};
use crate::model::break_entry::{BreakClosure, BreakEntry, BreakLimits, BreakType};
use crate::model::shift::{Shift, ShiftDefinition};
use crate::model::work_session::WorkSession;

/// Process-local store with the same uniqueness rules as the MySQL schema.
///
/// Employees are implicit: any id may clock in or be assigned a shift, and
/// only assigned employees have an entry in `employee_shifts`.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    days: Vec<AttendanceDay>,
    sessions: Vec<WorkSession>,
    breaks: Vec<BreakEntry>,
    shifts: BTreeMap<u64, ShiftDefinition>,
    employee_shifts: HashMap<u64, u64>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ledger(&self, day: &AttendanceDay) -> DayLedger {
        let mut sessions: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| s.attendance_day_id == day.id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.start_time, s.id));

        let mut breaks: Vec<_> = self
            .breaks
            .iter()
            .filter(|b| b.attendance_day_id == day.id)
            .cloned()
            .collect();
        breaks.sort_by_key(|b| (b.start_time, b.id));

        DayLedger {
            day: day.clone(),
            sessions,
            breaks,
        }
    }

    fn day_mut(&mut self, day_id: u64) -> Result<&mut AttendanceDay, StoreError> {
        self.days
            .iter_mut()
            .find(|d| d.id == day_id)
            .ok_or_else(|| StoreError::StaleState("attendance day not found".into()))
    }

    fn has_active_session(&self, day_id: u64) -> bool {
        self.sessions
            .iter()
            .any(|s| s.attendance_day_id == day_id && s.is_active())
    }

    fn has_active_break(&self, day_id: u64) -> bool {
        self.breaks
            .iter()
            .any(|b| b.attendance_day_id == day_id && b.is_active())
    }
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("attendance store poisoned")
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<DayLedger>, StoreError> {
        let state = self.lock();
        Ok(state
            .days
            .iter()
            .find(|d| d.employee_id == employee_id && d.date == date)
            .map(|d| state.ledger(d)))
    }

    async fn find_active_day(&self, employee_id: u64) -> Result<Option<DayLedger>, StoreError> {
        let state = self.lock();
        Ok(state
            .days
            .iter()
            .filter(|d| d.employee_id == employee_id && state.has_active_session(d.id))
            .max_by_key(|d| d.date)
            .map(|d| state.ledger(d)))
    }

    async fn find_or_create_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<AttendanceDay, StoreError> {
        let mut state = self.lock();
        if let Some(day) = state
            .days
            .iter()
            .find(|d| d.employee_id == employee_id && d.date == date)
        {
            return Ok(day.clone());
        }

        let day = AttendanceDay::new(state.next_id(), employee_id, date);
        state.days.push(day.clone());
        Ok(day)
    }

    async fn open_session(
        &self,
        day_id: u64,
        start_time: NaiveDateTime,
    ) -> Result<WorkSession, StoreError> {
        let mut state = self.lock();
        state.day_mut(day_id)?;
        if state.has_active_session(day_id) {
            return Err(StoreError::Conflict("already clocked in".into()));
        }

        let session = WorkSession {
            id: state.next_id(),
            attendance_day_id: day_id,
            start_time,
            end_time: None,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn close_session(
        &self,
        day_id: u64,
        session_id: u64,
        end_time: NaiveDateTime,
        worked_minutes: i64,
    ) -> Result<WorkSession, StoreError> {
        let mut state = self.lock();
        if state.has_active_break(day_id) {
            return Err(StoreError::StaleState("must end break first".into()));
        }

        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.attendance_day_id == day_id && s.is_active())
            .ok_or_else(|| StoreError::StaleState("not clocked in".into()))?;
        session.end_time = Some(end_time);
        let session = session.clone();

        state.day_mut(day_id)?.total_work_minutes += worked_minutes;
        Ok(session)
    }

    async fn open_break(
        &self,
        day_id: u64,
        requested: BreakType,
        limits: BreakLimits,
        start_time: NaiveDateTime,
    ) -> Result<BreakEntry, StoreError> {
        let mut state = self.lock();
        state.day_mut(day_id)?;
        if !state.has_active_session(day_id) {
            return Err(StoreError::StaleState("must be in an active session".into()));
        }
        if state.has_active_break(day_id) {
            return Err(StoreError::Conflict("already on a break".into()));
        }
        let day_breaks: Vec<_> = state
            .breaks
            .iter()
            .filter(|b| b.attendance_day_id == day_id)
            .cloned()
            .collect();
        limits
            .check(&day_breaks, requested)
            .map_err(StoreError::LimitReached)?;

        let entry = BreakEntry {
            id: state.next_id(),
            attendance_day_id: day_id,
            requested_type: requested,
            break_type: requested,
            start_time,
            end_time: None,
            duration_minutes: None,
            penalty_minutes: 0,
            is_penalty: false,
        };
        state.breaks.push(entry.clone());
        Ok(entry)
    }

    async fn close_break(
        &self,
        day_id: u64,
        break_id: u64,
        closure: &BreakClosure,
    ) -> Result<BreakEntry, StoreError> {
        let mut state = self.lock();
        let entry = state
            .breaks
            .iter_mut()
            .find(|b| b.id == break_id && b.attendance_day_id == day_id && b.is_active())
            .ok_or_else(|| StoreError::StaleState("not currently on a break".into()))?;
        closure.apply(entry);
        let entry = entry.clone();

        let day = state.day_mut(day_id)?;
        day.total_break_minutes += closure.duration_minutes;
        day.penalty_minutes += closure.penalty_minutes;
        Ok(entry)
    }
}

#[async_trait]
impl ShiftStore for MemoryStore {
    async fn list_shifts(&self) -> Result<Vec<Shift>, StoreError> {
        let state = self.lock();
        Ok(state
            .shifts
            .iter()
            .map(|(id, definition)| Shift {
                id: *id,
                definition: definition.clone(),
            })
            .collect())
    }

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>, StoreError> {
        let state = self.lock();
        Ok(state.shifts.get(&id).map(|definition| Shift {
            id,
            definition: definition.clone(),
        }))
    }

    async fn insert_shift(&self, definition: &ShiftDefinition) -> Result<Shift, StoreError> {
        let mut state = self.lock();
        let id = state.next_id();
        state.shifts.insert(id, definition.clone());
        Ok(Shift {
            id,
            definition: definition.clone(),
        })
    }

    async fn update_shift(
        &self,
        id: u64,
        definition: &ShiftDefinition,
    ) -> Result<Option<Shift>, StoreError> {
        let mut state = self.lock();
        Ok(state.shifts.get_mut(&id).map(|current| {
            *current = definition.clone();
            Shift {
                id,
                definition: definition.clone(),
            }
        }))
    }

    async fn delete_shift(&self, id: u64) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.employee_shifts.values().any(|s| *s == id) {
            return Err(StoreError::Conflict(format!("shift {id} is still assigned")));
        }
        Ok(state.shifts.remove(&id).is_some())
    }

    async fn count_shift_references(&self, id: u64) -> Result<i64, StoreError> {
        let state = self.lock();
        Ok(state
            .employee_shifts
            .values()
            .filter(|s| **s == id)
            .count() as i64)
    }

    async fn shift_for_employee(&self, employee_id: u64) -> Result<Option<Shift>, StoreError> {
        let state = self.lock();
        let Some(shift_id) = state.employee_shifts.get(&employee_id).copied() else {
            return Ok(None);
        };
        Ok(state.shifts.get(&shift_id).map(|definition| Shift {
            id: shift_id,
            definition: definition.clone(),
        }))
    }

    async fn assign_shift(
        &self,
        employee_id: u64,
        shift_id: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        match shift_id {
            Some(id) => {
                if !state.shifts.contains_key(&id) {
                    return Err(StoreError::StaleState(format!("shift {id} not found")));
                }
                state.employee_shifts.insert(employee_id, id);
            }
            None => {
                state.employee_shifts.remove(&employee_id);
            }
        }
        Ok(())
    }
}
