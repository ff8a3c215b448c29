//! The scanned module: every controller type and its declared actions.
//!
//! The catalog is the only source of metadata the resolver and the checks
//! see. It answers the questions a reflection-based scanner would ask of a
//! compiled module: which controllers exist, which public actions each one
//! declares, and in which order annotations apply to an element.

use std::collections::{BTreeMap, BTreeSet};

use crate::chain::DeclarationChain;
use crate::error::CatalogError;
use crate::model::{ActionDescriptor, ControllerDescriptor, ControllerId};

#[derive(Clone, Debug, Default)]
pub struct ControllerCatalog {
    controllers: BTreeMap<ControllerId, ControllerDescriptor>,
}

impl ControllerCatalog {
    /// Build a catalog from scanned controllers.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::DuplicateController`] if two descriptors share an identity
    /// - [`CatalogError::UnknownBase`] if a base link points outside the catalog
    /// - [`CatalogError::InheritanceCycle`] if base links loop
    pub fn new(
        controllers: impl IntoIterator<Item = ControllerDescriptor>,
    ) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for controller in controllers {
            if map.contains_key(controller.id()) {
                return Err(CatalogError::DuplicateController(controller.id().clone()));
            }
            map.insert(controller.id().clone(), controller);
        }

        for controller in map.values() {
            if let Some(base) = controller.base()
                && !map.contains_key(base)
            {
                return Err(CatalogError::UnknownBase {
                    controller: controller.id().clone(),
                    base: base.clone(),
                });
            }
        }

        for id in map.keys() {
            let mut seen = BTreeSet::new();
            let mut current = Some(id);
            while let Some(step) = current {
                if !seen.insert(step) {
                    return Err(CatalogError::InheritanceCycle(step.clone()));
                }
                current = map.get(step).and_then(ControllerDescriptor::base);
            }
        }

        tracing::debug!(controllers = map.len(), "controller catalog built");
        Ok(Self { controllers: map })
    }

    /// All controllers, ordered by identity.
    pub fn controllers(&self) -> impl Iterator<Item = &ControllerDescriptor> {
        self.controllers.values()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ControllerDescriptor> {
        self.controllers.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.controllers.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// The controller followed by each of its bases, most-derived first.
    pub fn lineage<'a>(
        &'a self,
        start: &'a ControllerDescriptor,
    ) -> impl Iterator<Item = &'a ControllerDescriptor> + 'a {
        std::iter::successors(Some(start), move |c| {
            c.base().and_then(|base| self.controllers.get(base))
        })
    }

    /// Identities of every controller some other controller derives from.
    #[must_use]
    pub fn base_ids(&self) -> BTreeSet<&ControllerId> {
        self.controllers
            .values()
            .filter_map(ControllerDescriptor::base)
            .collect()
    }

    /// Public actions declared on `id` itself.
    pub fn public_actions<'a>(
        &'a self,
        id: &str,
    ) -> impl Iterator<Item = &'a ActionDescriptor> + use<'a> {
        self.get(id)
            .into_iter()
            .flat_map(ControllerDescriptor::public_actions)
    }

    /// Declaration chain of a controller: itself, then every base.
    #[must_use]
    pub fn controller_chain(&self, id: &str) -> Option<DeclarationChain> {
        let start = self.get(id)?;
        let mut chain = DeclarationChain::new();
        for controller in self.lineage(start) {
            chain.push_level(controller.id().clone(), controller.annotations());
        }
        Some(chain)
    }

    /// The action followed by every base method it overrides.
    ///
    /// Walks up while the current method is marked as an override, picking
    /// the nearest ancestor that declares a method of the same name.
    #[must_use]
    pub fn action_lineage<'a>(
        &'a self,
        owner: &'a ControllerDescriptor,
        action: &'a ActionDescriptor,
    ) -> Vec<(&'a ControllerDescriptor, &'a ActionDescriptor)> {
        let mut lineage = vec![(owner, action)];
        let (mut current_owner, mut current) = (owner, action);
        while current.is_override() {
            let overridden = self
                .lineage(current_owner)
                .skip(1)
                .find_map(|ancestor| ancestor.action(current.name()).map(|a| (ancestor, a)));
            let Some((ancestor, base_action)) = overridden else {
                break;
            };
            lineage.push((ancestor, base_action));
            current_owner = ancestor;
            current = base_action;
        }
        lineage
    }

    /// Declaration chain of an action: its own annotations, then those of
    /// each method it overrides.
    #[must_use]
    pub fn action_chain(
        &self,
        owner: &ControllerDescriptor,
        action: &ActionDescriptor,
    ) -> DeclarationChain {
        let mut chain = DeclarationChain::new();
        for (controller, declared) in self.action_lineage(owner, action) {
            chain.push_level(controller.id().clone(), declared.annotations());
        }
        chain
    }

    /// An action is exposed when it or any method it overrides carries a verb.
    #[must_use]
    pub fn is_http_exposed(&self, owner: &ControllerDescriptor, action: &ActionDescriptor) -> bool {
        self.action_lineage(owner, action)
            .iter()
            .any(|(_, declared)| !declared.http_verbs().is_empty())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::{AnnotationKind, HttpVerb, SecurityAnnotation};

    fn id(name: &str) -> ControllerId {
        ControllerId::new(name).unwrap()
    }

    fn hierarchy() -> ControllerCatalog {
        let base = ControllerDescriptor::named("Api.OrdersBase")
            .unwrap()
            .mark_abstract()
            .with_annotation(AnnotationKind::Authorize)
            .with_action(
                ActionDescriptor::new("List")
                    .unwrap()
                    .with_http_verb(HttpVerb::Get)
                    .with_annotation(AnnotationKind::AllowAnonymous),
            );
        let derived = ControllerDescriptor::named("Api.Orders")
            .unwrap()
            .with_base(id("Api.OrdersBase"))
            .with_annotation(AnnotationKind::AllowAnonymous)
            .with_action(ActionDescriptor::new("List").unwrap().overriding())
            .with_action(ActionDescriptor::new("Create").unwrap());
        ControllerCatalog::new([derived, base]).unwrap()
    }

    #[test]
    fn duplicate_controllers_are_rejected() {
        let a = ControllerDescriptor::named("Api.A").unwrap();
        let err = ControllerCatalog::new([a.clone(), a]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateController(id("Api.A")));
    }

    #[test]
    fn unknown_base_is_rejected() {
        let a = ControllerDescriptor::named("Api.A")
            .unwrap()
            .with_base(id("Api.Missing"));
        let err = ControllerCatalog::new([a]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownBase { .. }));
    }

    #[test]
    fn inheritance_cycle_is_rejected() {
        let a = ControllerDescriptor::named("Api.A")
            .unwrap()
            .with_base(id("Api.B"));
        let b = ControllerDescriptor::named("Api.B")
            .unwrap()
            .with_base(id("Api.A"));
        let err = ControllerCatalog::new([a, b]).unwrap_err();
        assert!(matches!(err, CatalogError::InheritanceCycle(_)));
    }

    #[test]
    fn controller_chain_lists_self_before_base() {
        let catalog = hierarchy();
        let chain = catalog.controller_chain("Api.Orders").unwrap();

        let owners: Vec<_> = chain.levels().iter().map(|l| l.owner().as_str()).collect();
        assert_eq!(owners, vec!["Api.Orders", "Api.OrdersBase"]);

        let kinds: Vec<_> = chain.annotations().map(SecurityAnnotation::kind).collect();
        assert_eq!(
            kinds,
            vec![AnnotationKind::AllowAnonymous, AnnotationKind::Authorize]
        );
    }

    #[test]
    fn override_inherits_annotations_and_exposure() {
        let catalog = hierarchy();
        let owner = catalog.get("Api.Orders").unwrap();
        let list = owner.action("List").unwrap();

        let chain = catalog.action_chain(owner, list);
        assert!(chain.own().is_empty());
        assert_eq!(chain.levels().len(), 2);
        assert!(catalog.is_http_exposed(owner, list));

        let create = owner.action("Create").unwrap();
        assert!(!catalog.is_http_exposed(owner, create));
        assert_eq!(catalog.action_chain(owner, create).levels().len(), 1);
    }

    #[test]
    fn base_ids_collects_derived_from_controllers() {
        let catalog = hierarchy();
        let bases: Vec<_> = catalog.base_ids().into_iter().map(ControllerId::as_str).collect();
        assert_eq!(bases, vec!["Api.OrdersBase"]);
        assert_eq!(catalog.public_actions("Api.Orders").count(), 2);
        assert_eq!(catalog.public_actions("Api.Unknown").count(), 0);
    }
}
