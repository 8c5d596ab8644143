//! Dirty-field tracking.

/// Ordered set of locally modified fields.
///
/// Fields are kept in the order they were first modified. Marking a field
/// twice keeps its original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyFields<F> {
    fields: Vec<F>,
}

impl<F: Copy + PartialEq> DirtyFields<F> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Records a modified field.
    pub fn mark(&mut self, field: F) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Returns true if the field was modified.
    pub fn contains(&self, field: F) -> bool {
        self.fields.contains(&field)
    }

    /// Returns the modified fields in modification order.
    pub fn fields(&self) -> &[F] {
        &self.fields
    }

    /// Returns the number of modified fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if nothing was modified.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Forgets all modifications.
    pub fn clear(&mut self) {
        self.fields.clear();
    }
}

impl<F: Copy + PartialEq> Default for DirtyFields<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_modification_order() {
        let mut dirty = DirtyFields::new();
        dirty.mark('b');
        dirty.mark('a');
        dirty.mark('b');

        assert_eq!(dirty.fields(), &['b', 'a']);
        assert_eq!(dirty.len(), 2);
        assert!(dirty.contains('a'));
        assert!(!dirty.contains('c'));
    }

    #[test]
    fn clear() {
        let mut dirty = DirtyFields::new();
        dirty.mark(1u8);
        dirty.clear();
        assert!(dirty.is_empty());
    }
}
