use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{AttendanceError, StoreError};
use crate::model::shift::{Shift, ShiftDefinition};
use crate::store::ShiftStore;

/// Admin-maintained shift definitions and employee assignments.
pub struct ShiftCatalog {
    store: Arc<dyn ShiftStore>,
}

impl ShiftCatalog {
    pub fn new(store: Arc<dyn ShiftStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Shift>, AttendanceError> {
        Ok(self.store.list_shifts().await?)
    }

    pub async fn get(&self, id: u64) -> Result<Shift, AttendanceError> {
        self.store
            .get_shift(id)
            .await?
            .ok_or(AttendanceError::ShiftNotFound(id))
    }

    #[instrument(name = "shift_create", skip(self, definition), fields(name = %definition.name))]
    pub async fn create(&self, definition: ShiftDefinition) -> Result<Shift, AttendanceError> {
        let shift = self.store.insert_shift(&definition).await?;
        info!(shift_id = shift.id, kind = %definition.kind(), "Shift created");
        Ok(shift)
    }

    #[instrument(name = "shift_update", skip(self, definition))]
    pub async fn update(
        &self,
        id: u64,
        definition: ShiftDefinition,
    ) -> Result<Shift, AttendanceError> {
        let shift = self
            .store
            .update_shift(id, &definition)
            .await?
            .ok_or(AttendanceError::ShiftNotFound(id))?;
        info!("Shift updated");
        Ok(shift)
    }

    /// Refuses while any employee still references the shift.
    #[instrument(name = "shift_delete", skip(self))]
    pub async fn delete(&self, id: u64) -> Result<(), AttendanceError> {
        let references = self.store.count_shift_references(id).await?;
        if references > 0 {
            info!(references, "Rejected: shift still assigned");
            return Err(AttendanceError::ShiftInUse(id));
        }

        match self.store.delete_shift(id).await {
            Ok(true) => {
                info!("Shift deleted");
                Ok(())
            }
            Ok(false) => Err(AttendanceError::ShiftNotFound(id)),
            // assigned between the count and the delete
            Err(StoreError::Conflict(_)) => Err(AttendanceError::ShiftInUse(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Points the employee at `shift_id`, or clears the assignment with `None`.
    #[instrument(name = "shift_assign", skip(self))]
    pub async fn assign(
        &self,
        employee_id: u64,
        shift_id: Option<u64>,
    ) -> Result<Option<Shift>, AttendanceError> {
        let shift = match shift_id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };

        match self.store.assign_shift(employee_id, shift_id).await {
            Ok(()) => {}
            // deleted between the lookup and the write
            Err(StoreError::Conflict(_) | StoreError::StaleState(_)) => {
                return Err(AttendanceError::ShiftNotFound(shift_id.unwrap_or_default()));
            }
            Err(e) => return Err(e.into()),
        }

        info!("Shift assigned");
        Ok(shift)
    }

    pub async fn shift_for_employee(&self, employee_id: u64) -> Result<Option<Shift>, AttendanceError> {
        Ok(self.store.shift_for_employee(employee_id).await?)
    }

    /// Like [`Self::shift_for_employee`] but a missing assignment is a rejection.
    pub async fn assigned_shift(&self, employee_id: u64) -> Result<Shift, AttendanceError> {
        self.shift_for_employee(employee_id)
            .await?
            .ok_or(AttendanceError::ShiftNotAssigned(employee_id))
    }
}
