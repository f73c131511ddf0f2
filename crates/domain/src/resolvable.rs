/// Reference that is either a bare `{type, id}` pair or a looked-up entity.
///
/// Resolution is the only transition between the two states and the result
/// is kept for the lifetime of the value.
#[derive(Debug, Clone)]
pub enum Resolvable<R, E> {
    /// Reference that has not been looked up yet.
    Unresolved(R),
    /// Reference together with the entity it points to.
    Resolved {
        /// Stored reference.
        reference: R,
        /// Entity loaded for the reference.
        entity: E,
    },
}

impl<R, E> Resolvable<R, E> {
    /// Returns the stored reference.
    #[must_use]
    pub fn reference(&self) -> &R {
        match self {
            Self::Unresolved(reference) | Self::Resolved { reference, .. } => reference,
        }
    }

    /// Returns the resolved entity, if any.
    #[must_use]
    pub fn entity(&self) -> Option<&E> {
        match self {
            Self::Unresolved(_) => None,
            Self::Resolved { entity, .. } => Some(entity),
        }
    }

    /// Returns whether the entity has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

impl<R: Clone, E> Resolvable<R, E> {
    /// Attaches the resolved entity, replacing any previous one.
    pub fn resolve_with(&mut self, entity: E) {
        let reference = self.reference().clone();
        *self = Self::Resolved { reference, entity };
    }
}

impl<R: PartialEq, E> PartialEq for Resolvable<R, E> {
    fn eq(&self, other: &Self) -> bool {
        self.reference() == other.reference()
    }
}

impl<R: Eq, E> Eq for Resolvable<R, E> {}

#[cfg(test)]
mod tests {
    use super::Resolvable;

    #[test]
    fn resolution_keeps_reference_and_equality() {
        let mut value: Resolvable<&str, u32> = Resolvable::Unresolved("a");
        let other: Resolvable<&str, u32> = Resolvable::Unresolved("a");
        assert!(!value.is_resolved());

        value.resolve_with(7);
        assert!(value.is_resolved());
        assert_eq!(value.entity(), Some(&7));
        assert_eq!(*value.reference(), "a");
        assert_eq!(value, other);
    }
}
