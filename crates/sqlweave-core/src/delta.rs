//! Sparse property changes for partial updates.

use crate::error::Result;
use crate::metadata::{Entity, ObjectInfo};
use crate::value::Value;

/// A set of `(property, new value)` changes for one row, identified by its
/// identifier. Executing a delta issues an UPDATE naming only those columns.
///
/// ```ignore
/// let mut delta = ObjectDelta::new::<Customer>(42_i64);
/// delta.add_change("name", "Fred Flintstone")?;
/// session.update_delta(&cx, &delta).await;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDelta {
    info: &'static ObjectInfo,
    identifier: Value,
    changes: Vec<(String, Value)>,
}

impl ObjectDelta {
    /// Start an empty delta for the row of `T` with `identifier`.
    pub fn new<T: Entity>(identifier: impl Into<Value>) -> Self {
        Self {
            info: T::object_info(),
            identifier: identifier.into(),
            changes: Vec::new(),
        }
    }

    /// Record a change. Changing the same property twice keeps the last value.
    ///
    /// Fails with a configuration error if `property` is not a mapped property
    /// of the type.
    pub fn add_change(&mut self, property: &str, value: impl Into<Value>) -> Result<()> {
        let (_, column) = self.info.column_for_property(property)?;
        let property = column.property_name.clone();
        let value = value.into();
        match self.changes.iter_mut().find(|(p, _)| *p == property) {
            Some(existing) => existing.1 = value,
            None => self.changes.push((property, value)),
        }
        Ok(())
    }

    /// Metadata of the target type.
    pub fn object_info(&self) -> &'static ObjectInfo {
        self.info
    }

    /// Identifier of the target row.
    pub fn identifier(&self) -> &Value {
        &self.identifier
    }

    /// Changes in the order they were first added.
    pub fn changes(&self) -> &[(String, Value)] {
        &self.changes
    }

    /// True if no change has been recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
