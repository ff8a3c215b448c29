//! Ordered declaration chains.
//!
//! A chain lists the annotations that apply to an element in proximity
//! order: the element's own declarations first, then those of each ancestor,
//! most-derived to least-derived. Within one level annotations are ordered by
//! their declaration position.

use crate::model::{ControllerId, SecurityAnnotation, declares_both};

/// Annotations contributed by one type in the hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclarationLevel {
    owner: ControllerId,
    annotations: Vec<SecurityAnnotation>,
}

impl DeclarationLevel {
    #[must_use]
    pub fn owner(&self) -> &ControllerId {
        &self.owner
    }

    #[must_use]
    pub fn annotations(&self) -> &[SecurityAnnotation] {
        &self.annotations
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeclarationChain {
    levels: Vec<DeclarationLevel>,
}

impl DeclarationChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next, less-derived level.
    pub fn push_level(&mut self, owner: ControllerId, annotations: &[SecurityAnnotation]) {
        let mut annotations = annotations.to_vec();
        annotations.sort_by_key(SecurityAnnotation::position);
        self.levels.push(DeclarationLevel { owner, annotations });
    }

    #[must_use]
    pub fn levels(&self) -> &[DeclarationLevel] {
        &self.levels
    }

    /// Every annotation in proximity order.
    pub fn annotations(&self) -> impl Iterator<Item = &SecurityAnnotation> {
        self.levels.iter().flat_map(|level| level.annotations.iter())
    }

    /// Annotations declared on the element itself.
    #[must_use]
    pub fn own(&self) -> &[SecurityAnnotation] {
        if let Some(level) = self.levels.first() {
            &level.annotations
        } else {
            &[]
        }
    }

    /// Both postures declared directly on the element.
    #[must_use]
    pub fn has_own_conflict(&self) -> bool {
        declares_both(self.own())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations().next().is_none()
    }
}
