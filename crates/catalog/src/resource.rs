//! Resource trait: what the generic CRUD surface needs to know about an entity.

use serde::Serialize;

use libris_core::Entity;

use crate::form::Form;

/// Validated fields of a resource's form.
pub type FieldsOf<R> = <<R as Resource>::Form as Form>::Fields;

/// An entity exposed through the generic create/read/update/delete endpoints.
pub trait Resource: Entity + Clone + Send + Sync + 'static {
    /// Input schema used by both create and update.
    type Form: Form;

    /// Public serialization view.
    type View: Serialize + Send;

    /// Singular name used in logs.
    const LABEL: &'static str;

    /// Plain-text body returned when listing finds nothing.
    const EMPTY_LIST_MESSAGE: &'static str;

    /// Current field values, as the starting point of a partial update.
    fn form_data(&self) -> <Self::Form as Form>::Data;

    /// Overwrite the mutable fields with validated values.
    fn apply(&mut self, fields: FieldsOf<Self>);

    fn view(&self) -> Self::View;
}
