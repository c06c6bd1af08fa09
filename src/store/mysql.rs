use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::debug;

use super::{AttendanceStore, ShiftStore};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceDay, DayLedger};
use crate::model::break_entry::{BreakClosure, BreakEntry, BreakLimits, BreakType};
use crate::model::shift::{Shift, ShiftDefinition, ShiftKind};
use crate::model::work_session::WorkSession;

const DAY_COLUMNS: &str =
    "id, employee_id, date, total_work_minutes, total_break_minutes, penalty_minutes";
const SESSION_COLUMNS: &str = "id, attendance_day_id, start_time, end_time";
const BREAK_COLUMNS: &str = "id, attendance_day_id, requested_type, break_type, start_time, \
     end_time, duration_minutes, penalty_minutes, is_penalty";
const SHIFT_COLUMNS: &str = "id, name, kind, start_time, end_time, required_duration_hours, \
     paid_break_allowance_minutes";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn ledger(&self, day: AttendanceDay) -> Result<DayLedger, StoreError> {
        let sessions = sqlx::query_as::<_, WorkSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions \
             WHERE attendance_day_id = ? ORDER BY start_time, id"
        ))
        .bind(day.id)
        .fetch_all(&self.pool)
        .await?;

        let breaks = decode_breaks(
            sqlx::query_as::<_, BreakRow>(&day_breaks_sql())
                .bind(day.id)
                .fetch_all(&self.pool)
                .await?,
        )?;

        Ok(DayLedger {
            day,
            sessions,
            breaks,
        })
    }
}

/// `break_entries` row; the type columns are stored as text.
#[derive(FromRow)]
struct BreakRow {
    id: u64,
    attendance_day_id: u64,
    requested_type: String,
    break_type: String,
    start_time: NaiveDateTime,
    end_time: Option<NaiveDateTime>,
    duration_minutes: Option<i64>,
    penalty_minutes: i64,
    is_penalty: bool,
}

impl TryFrom<BreakRow> for BreakEntry {
    type Error = StoreError;

    fn try_from(row: BreakRow) -> Result<Self, Self::Error> {
        Ok(BreakEntry {
            id: row.id,
            attendance_day_id: row.attendance_day_id,
            requested_type: parse_break_type(&row.requested_type)?,
            break_type: parse_break_type(&row.break_type)?,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_minutes: row.duration_minutes,
            penalty_minutes: row.penalty_minutes,
            is_penalty: row.is_penalty,
        })
    }
}

fn day_breaks_sql() -> String {
    format!(
        "SELECT {BREAK_COLUMNS} FROM break_entries \
         WHERE attendance_day_id = ? ORDER BY start_time, id"
    )
}

fn decode_breaks(rows: Vec<BreakRow>) -> Result<Vec<BreakEntry>, StoreError> {
    rows.into_iter().map(BreakEntry::try_from).collect()
}

fn parse_break_type(raw: &str) -> Result<BreakType, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown break type {raw:?}")))
}

#[derive(FromRow)]
struct ShiftRow {
    id: u64,
    name: String,
    kind: String,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    required_duration_hours: Option<f64>,
    paid_break_allowance_minutes: i64,
}

impl TryFrom<ShiftRow> for Shift {
    type Error = StoreError;

    fn try_from(row: ShiftRow) -> Result<Self, Self::Error> {
        let kind: ShiftKind = row
            .kind
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("unknown shift kind {:?}", row.kind)))?;

        let definition = ShiftDefinition::from_parts(
            &row.name,
            kind,
            row.start_time,
            row.end_time,
            row.required_duration_hours,
            row.paid_break_allowance_minutes,
        )
        .map_err(|e| StoreError::Corrupt(format!("shift {}: {e}", row.id)))?;

        Ok(Shift {
            id: row.id,
            definition,
        })
    }
}

/// Duplicate-key (and other integrity) failures surface as SQLSTATE 23000.
fn is_integrity_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

fn conflict_or_database(err: sqlx::Error, message: &str) -> StoreError {
    if is_integrity_violation(&err) {
        StoreError::Conflict(message.to_string())
    } else {
        StoreError::Database(err)
    }
}

/// Locks the day row for the rest of the transaction.
async fn lock_day(tx: &mut Transaction<'_, MySql>, day_id: u64) -> Result<(), StoreError> {
    sqlx::query_scalar::<_, u64>("SELECT id FROM attendance_days WHERE id = ? FOR UPDATE")
        .bind(day_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::StaleState("attendance day not found".into()))?;
    Ok(())
}

async fn count_active(
    tx: &mut Transaction<'_, MySql>,
    table: &str,
    day_id: u64,
) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {table} WHERE attendance_day_id = ? AND end_time IS NULL"
    ))
    .bind(day_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count)
}

fn shift_binds(
    definition: &ShiftDefinition,
) -> (
    &str,
    &'static str,
    Option<NaiveTime>,
    Option<NaiveTime>,
    Option<f64>,
    i64,
) {
    (
        definition.name.as_str(),
        definition.kind().as_str(),
        definition.start_time(),
        definition.end_time(),
        definition.required_duration_hours(),
        definition.paid_break_allowance_minutes,
    )
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn find_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<DayLedger>, StoreError> {
        let day = sqlx::query_as::<_, AttendanceDay>(&format!(
            "SELECT {DAY_COLUMNS} FROM attendance_days WHERE employee_id = ? AND date = ?"
        ))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match day {
            Some(day) => Ok(Some(self.ledger(day).await?)),
            None => Ok(None),
        }
    }

    async fn find_active_day(&self, employee_id: u64) -> Result<Option<DayLedger>, StoreError> {
        let day = sqlx::query_as::<_, AttendanceDay>(
            r#"
            SELECT d.id, d.employee_id, d.date,
                   d.total_work_minutes, d.total_break_minutes, d.penalty_minutes
            FROM attendance_days d
            JOIN work_sessions s ON s.attendance_day_id = d.id AND s.end_time IS NULL
            WHERE d.employee_id = ?
            ORDER BY d.date DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        match day {
            Some(day) => Ok(Some(self.ledger(day).await?)),
            None => Ok(None),
        }
    }

    async fn find_or_create_day(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<AttendanceDay, StoreError> {
        // concurrent first clock-ins collapse onto the unique (employee_id, date) key
        sqlx::query(
            r#"
            INSERT INTO attendance_days (employee_id, date)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        let day = sqlx::query_as::<_, AttendanceDay>(&format!(
            "SELECT {DAY_COLUMNS} FROM attendance_days WHERE employee_id = ? AND date = ?"
        ))
        .bind(employee_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(day)
    }

    async fn open_session(
        &self,
        day_id: u64,
        start_time: NaiveDateTime,
    ) -> Result<WorkSession, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_day(&mut tx, day_id).await?;

        if count_active(&mut tx, "work_sessions", day_id).await? > 0 {
            return Err(StoreError::Conflict("already clocked in".into()));
        }

        let result =
            sqlx::query("INSERT INTO work_sessions (attendance_day_id, start_time) VALUES (?, ?)")
                .bind(day_id)
                .bind(start_time)
                .execute(&mut *tx)
                .await
                .map_err(|e| conflict_or_database(e, "already clocked in"))?;

        tx.commit().await?;
        debug!(day_id, session_id = result.last_insert_id(), "Work session opened");

        Ok(WorkSession {
            id: result.last_insert_id(),
            attendance_day_id: day_id,
            start_time,
            end_time: None,
        })
    }

    async fn close_session(
        &self,
        day_id: u64,
        session_id: u64,
        end_time: NaiveDateTime,
        worked_minutes: i64,
    ) -> Result<WorkSession, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_day(&mut tx, day_id).await?;

        if count_active(&mut tx, "break_entries", day_id).await? > 0 {
            return Err(StoreError::StaleState("must end break first".into()));
        }

        let updated = sqlx::query(
            r#"
            UPDATE work_sessions
            SET end_time = ?
            WHERE id = ? AND attendance_day_id = ? AND end_time IS NULL
            "#,
        )
        .bind(end_time)
        .bind(session_id)
        .bind(day_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::StaleState("not clocked in".into()));
        }

        sqlx::query(
            "UPDATE attendance_days SET total_work_minutes = total_work_minutes + ? WHERE id = ?",
        )
        .bind(worked_minutes)
        .bind(day_id)
        .execute(&mut *tx)
        .await?;

        let session = sqlx::query_as::<_, WorkSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM work_sessions WHERE id = ?"
        ))
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }

    async fn open_break(
        &self,
        day_id: u64,
        requested: BreakType,
        limits: BreakLimits,
        start_time: NaiveDateTime,
    ) -> Result<BreakEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_day(&mut tx, day_id).await?;

        if count_active(&mut tx, "work_sessions", day_id).await? == 0 {
            return Err(StoreError::StaleState("must be in an active session".into()));
        }
        if count_active(&mut tx, "break_entries", day_id).await? > 0 {
            return Err(StoreError::Conflict("already on a break".into()));
        }

        // a break closed after the caller's read still counts
        let breaks = decode_breaks(
            sqlx::query_as::<_, BreakRow>(&day_breaks_sql())
                .bind(day_id)
                .fetch_all(&mut *tx)
                .await?,
        )?;
        limits
            .check(&breaks, requested)
            .map_err(StoreError::LimitReached)?;

        let result = sqlx::query(
            r#"
            INSERT INTO break_entries (attendance_day_id, requested_type, break_type, start_time)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(day_id)
        .bind(requested.as_str())
        .bind(requested.as_str())
        .bind(start_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, "already on a break"))?;

        tx.commit().await?;

        Ok(BreakEntry {
            id: result.last_insert_id(),
            attendance_day_id: day_id,
            requested_type: requested,
            break_type: requested,
            start_time,
            end_time: None,
            duration_minutes: None,
            penalty_minutes: 0,
            is_penalty: false,
        })
    }

    async fn close_break(
        &self,
        day_id: u64,
        break_id: u64,
        closure: &BreakClosure,
    ) -> Result<BreakEntry, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_day(&mut tx, day_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE break_entries
            SET end_time = ?, duration_minutes = ?, break_type = ?,
                penalty_minutes = ?, is_penalty = ?
            WHERE id = ? AND attendance_day_id = ? AND end_time IS NULL
            "#,
        )
        .bind(closure.end_time)
        .bind(closure.duration_minutes)
        .bind(closure.break_type.as_str())
        .bind(closure.penalty_minutes)
        .bind(closure.is_penalty())
        .bind(break_id)
        .bind(day_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::StaleState("not currently on a break".into()));
        }

        sqlx::query(
            r#"
            UPDATE attendance_days
            SET total_break_minutes = total_break_minutes + ?,
                penalty_minutes = penalty_minutes + ?
            WHERE id = ?
            "#,
        )
        .bind(closure.duration_minutes)
        .bind(closure.penalty_minutes)
        .bind(day_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, BreakRow>(&format!(
            "SELECT {BREAK_COLUMNS} FROM break_entries WHERE id = ?"
        ))
        .bind(break_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        BreakEntry::try_from(row)
    }
}

#[async_trait]
impl ShiftStore for MySqlStore {
    async fn list_shifts(&self) -> Result<Vec<Shift>, StoreError> {
        sqlx::query_as::<_, ShiftRow>(&format!("SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY id"))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Shift::try_from)
            .collect()
    }

    async fn get_shift(&self, id: u64) -> Result<Option<Shift>, StoreError> {
        sqlx::query_as::<_, ShiftRow>(&format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Shift::try_from)
            .transpose()
    }

    async fn insert_shift(&self, definition: &ShiftDefinition) -> Result<Shift, StoreError> {
        let (name, kind, start, end, hours, allowance) = shift_binds(definition);

        let result = sqlx::query(
            r#"
            INSERT INTO shifts
            (name, kind, start_time, end_time, required_duration_hours, paid_break_allowance_minutes)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(kind)
        .bind(start)
        .bind(end)
        .bind(hours)
        .bind(allowance)
        .execute(&self.pool)
        .await?;

        Ok(Shift {
            id: result.last_insert_id(),
            definition: definition.clone(),
        })
    }

    async fn update_shift(
        &self,
        id: u64,
        definition: &ShiftDefinition,
    ) -> Result<Option<Shift>, StoreError> {
        if self.get_shift(id).await?.is_none() {
            return Ok(None);
        }

        let (name, kind, start, end, hours, allowance) = shift_binds(definition);

        sqlx::query(
            r#"
            UPDATE shifts
            SET name = ?, kind = ?, start_time = ?, end_time = ?,
                required_duration_hours = ?, paid_break_allowance_minutes = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(kind)
        .bind(start)
        .bind(end)
        .bind(hours)
        .bind(allowance)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Some(Shift {
            id,
            definition: definition.clone(),
        }))
    }

    async fn delete_shift(&self, id: u64) -> Result<bool, StoreError> {
        // employee_shifts.shift_id is ON DELETE RESTRICT
        let result = sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "shift is still assigned"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_shift_references(&self, id: u64) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee_shifts WHERE shift_id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn shift_for_employee(&self, employee_id: u64) -> Result<Option<Shift>, StoreError> {
        sqlx::query_as::<_, ShiftRow>(
            r#"
            SELECT s.id, s.name, s.kind, s.start_time, s.end_time,
                   s.required_duration_hours, s.paid_break_allowance_minutes
            FROM employee_shifts e
            JOIN shifts s ON s.id = e.shift_id
            WHERE e.employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Shift::try_from)
        .transpose()
    }

    async fn assign_shift(
        &self,
        employee_id: u64,
        shift_id: Option<u64>,
    ) -> Result<(), StoreError> {
        match shift_id {
            Some(shift_id) => {
                // an unknown shift_id trips the foreign key
                sqlx::query(
                    r#"
                    INSERT INTO employee_shifts (employee_id, shift_id)
                    VALUES (?, ?)
                    ON DUPLICATE KEY UPDATE shift_id = VALUES(shift_id)
                    "#,
                )
                .bind(employee_id)
                .bind(shift_id)
                .execute(&self.pool)
                .await
                .map_err(|e| conflict_or_database(e, "shift not found"))?;
            }
            None => {
                sqlx::query("DELETE FROM employee_shifts WHERE employee_id = ?")
                    .bind(employee_id)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }
}
