use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::StoreError;
use crate::model::attendance::{AttendanceDay, DayLedger};
use crate::model::break_entry::{BreakClosure, BreakEntry, BreakLimits, BreakType};
use crate::model::shift::{Shift, ShiftDefinition};
use crate::model::work_session::WorkSession;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Session and break ledgers plus the daily aggregate.
///
/// Every mutating call is atomic and re-checks the ledger state it depends on:
/// a second active session or break fails with [`StoreError::Conflict`], a
/// precondition that no longer holds fails with [`StoreError::StaleState`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<DayLedger>, StoreError>;

    /// Most recent day of the employee that still has an open work session.
    async fn find_active_day(&self, employee_id: u64) -> Result<Option<DayLedger>, StoreError>;

    async fn find_or_create_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<AttendanceDay, StoreError>;

    async fn open_session(
        &self,
        day_id: u64,
        start_time: NaiveDateTime,
    ) -> Result<WorkSession, StoreError>;

    /// Closes the session and adds `worked_minutes` to the day total.
    async fn close_session(
        &self,
        day_id: u64,
        session_id: u64,
        end_time: NaiveDateTime,
        worked_minutes: i64,
    ) -> Result<WorkSession, StoreError>;

    /// Opens a break after re-checking `limits` against the day's breaks
    /// under the write lock; a cap already reached fails with
    /// [`StoreError::LimitReached`].
    async fn open_break(
        &self,
        day_id: u64,
        requested: BreakType,
        limits: BreakLimits,
        start_time: NaiveDateTime,
    ) -> Result<BreakEntry, StoreError>;

    /// Writes the closure and adds its duration and penalty to the day totals.
    async fn close_break(
        &self,
        day_id: u64,
        break_id: u64,
        closure: &BreakClosure,
    ) -> Result<BreakEntry, StoreError>;
}

/// Shift catalog and the employee → shift assignments.
#[async_trait]
pub trait ShiftStore: Send + Sync {
    async fn list_shifts(&self) -> Result<Vec<Shift>, StoreError>;

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>, StoreError>;

    async fn insert_shift(&self, definition: &ShiftDefinition) -> Result<Shift, StoreError>;

    async fn update_shift(
        &self,
        id: u64,
        definition: &ShiftDefinition,
    ) -> Result<Option<Shift>, StoreError>;

    /// `Ok(false)` when the shift does not exist; [`StoreError::Conflict`]
    /// while an employee still references it.
    async fn delete_shift(&self, id: u64) -> Result<bool, StoreError>;

    async fn count_shift_references(&self, id: u64) -> Result<i64, StoreError>;

    async fn shift_for_employee(&self, employee_id: u64) -> Result<Option<Shift>, StoreError>;

    /// Points the employee at `shift_id`, or removes the assignment with
    /// `None`. Employees need no prior record. A shift that does not exist
    /// fails with [`StoreError::Conflict`] or [`StoreError::StaleState`].
    async fn assign_shift(&self, employee_id: u64, shift_id: Option<u64>)
    -> Result<(), StoreError>;
}
