//! Posture resolution.
//!
//! ## Rule
//!
//! Walk the declaration chain in proximity order and take the first security
//! annotation encountered:
//!
//! | chain (self first)                 | posture      |
//! |------------------------------------|--------------|
//! | `[Authorize]`, ...                 | `Authorized` |
//! | `[AllowAnonymous]`, `[Authorize]`  | `Anonymous`  |
//! | empty                              | `Unspecified`|
//!
//! A derived declaration overrides an inherited one; the absence of a
//! derived declaration lets the base declaration through. When both kinds
//! sit on one element the earlier position wins, so resolution stays
//! deterministic while the checks report the conflict.
//!
//! Actions whose own chain is empty take the posture of their controller.

use std::collections::BTreeMap;

use crate::catalog::ControllerCatalog;
use crate::model::{
    ActionDescriptor, ControllerDescriptor, ControllerId, Posture, SecurityAnnotation, Visibility,
    declares_both,
};

/// Resolve an ordered annotation sequence to a posture.
#[must_use]
pub fn resolve<'a, I>(annotations: I) -> Posture
where
    I: IntoIterator<Item = &'a SecurityAnnotation>,
{
    annotations
        .into_iter()
        .next()
        .map_or(Posture::Unspecified, |first| first.kind().posture())
}

/// Resolved posture of a controller, or `None` if it is not in the catalog.
#[must_use]
pub fn resolve_controller(catalog: &ControllerCatalog, id: &str) -> Option<Posture> {
    catalog
        .controller_chain(id)
        .map(|chain| resolve(chain.annotations()))
}

/// Resolved posture of an action declared on `controller`.
///
/// Returns `None` if either the controller or the action is unknown.
#[must_use]
pub fn resolve_action(catalog: &ControllerCatalog, controller: &str, action: &str) -> Option<Posture> {
    let owner = catalog.get(controller)?;
    let declared = owner.action(action)?;
    let controller_posture = resolve_controller(catalog, controller)?;
    Some(effective_action_posture(
        resolve(catalog.action_chain(owner, declared).annotations()),
        controller_posture,
    ))
}

fn effective_action_posture(declared: Posture, controller: Posture) -> Posture {
    if declared.is_specified() {
        declared
    } else {
        controller
    }
}

/// Resolution result for one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAction {
    name: String,
    declared: Posture,
    posture: Posture,
    exposed: bool,
    visibility: Visibility,
    is_override: bool,
    conflict: bool,
}

impl ResolvedAction {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Posture from the action's own chain, ignoring its controller.
    #[must_use]
    pub fn declared(&self) -> Posture {
        self.declared
    }

    /// Posture after falling back to the controller.
    #[must_use]
    pub fn posture(&self) -> Posture {
        self.posture
    }

    #[must_use]
    pub fn is_http_exposed(&self) -> bool {
        self.exposed
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    #[must_use]
    pub fn is_override(&self) -> bool {
        self.is_override
    }

    /// Both postures declared directly on the action.
    #[must_use]
    pub fn has_conflict(&self) -> bool {
        self.conflict
    }
}

/// Resolution result for one controller and its declared actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedController {
    id: ControllerId,
    posture: Posture,
    is_abstract: bool,
    declares_posture: bool,
    conflict: bool,
    actions: Vec<ResolvedAction>,
}

impl ResolvedController {
    #[must_use]
    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    #[must_use]
    pub fn posture(&self) -> Posture {
        self.posture
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// The controller itself carries at least one security annotation.
    #[must_use]
    pub fn declares_posture(&self) -> bool {
        self.declares_posture
    }

    /// Both postures declared directly on the controller.
    #[must_use]
    pub fn has_conflict(&self) -> bool {
        self.conflict
    }

    #[must_use]
    pub fn actions(&self) -> &[ResolvedAction] {
        &self.actions
    }

    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ResolvedAction> {
        self.actions.iter().find(|a| a.name() == name)
    }
}

/// Postures of every controller and action in a catalog, computed once.
#[derive(Clone, Debug, Default)]
pub struct PostureSnapshot {
    controllers: BTreeMap<ControllerId, ResolvedController>,
}

impl PostureSnapshot {
    #[must_use]
    pub fn build(catalog: &ControllerCatalog) -> Self {
        let controllers = catalog
            .controllers()
            .map(|controller| {
                let resolved = resolve_descriptor(catalog, controller);
                (resolved.id.clone(), resolved)
            })
            .collect();
        Self { controllers }
    }

    pub fn controllers(&self) -> impl Iterator<Item = &ResolvedController> {
        self.controllers.values()
    }

    /// Non-abstract controllers: the ones that are routed.
    pub fn concrete_controllers(&self) -> impl Iterator<Item = &ResolvedController> {
        self.controllers.values().filter(|c| !c.is_abstract())
    }

    #[must_use]
    pub fn controller(&self, id: &str) -> Option<&ResolvedController> {
        self.controllers.get(id)
    }
}

fn resolve_descriptor(
    catalog: &ControllerCatalog,
    controller: &ControllerDescriptor,
) -> ResolvedController {
    let posture = catalog
        .controller_chain(controller.id().as_str())
        .map_or(Posture::Unspecified, |chain| resolve(chain.annotations()));

    let actions = controller
        .actions()
        .iter()
        .map(|action| resolve_declared_action(catalog, controller, action, posture))
        .collect();

    tracing::debug!(controller = %controller.id(), %posture, "controller posture resolved");

    ResolvedController {
        id: controller.id().clone(),
        posture,
        is_abstract: controller.is_abstract(),
        declares_posture: !controller.annotations().is_empty(),
        conflict: declares_both(controller.annotations()),
        actions,
    }
}

fn resolve_declared_action(
    catalog: &ControllerCatalog,
    owner: &ControllerDescriptor,
    action: &ActionDescriptor,
    controller_posture: Posture,
) -> ResolvedAction {
    let chain = catalog.action_chain(owner, action);
    let declared = resolve(chain.annotations());
    ResolvedAction {
        name: action.name().to_owned(),
        declared,
        posture: effective_action_posture(declared, controller_posture),
        exposed: catalog.is_http_exposed(owner, action),
        visibility: action.visibility(),
        is_override: action.is_override(),
        conflict: chain.has_own_conflict(),
    }
}
