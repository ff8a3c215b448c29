//! Static descriptors of controllers, their action methods and the security
//! annotations declared on them.
//!
//! Descriptors only record what is declared on an element itself. Inherited
//! declarations are assembled on demand by the catalog into a
//! [`DeclarationChain`](crate::chain::DeclarationChain).

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Fully-qualified controller name, e.g. `Api.Controllers.OrdersController`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControllerId(String);

impl ControllerId {
    /// Create a controller identity.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::BlankIdentity`] if `name` is empty or whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::BlankIdentity { what: "controller" });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Type name without its namespace.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(self.0.as_str())
    }
}

impl TryFrom<String> for ControllerId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ControllerId> for String {
    fn from(id: ControllerId) -> Self {
        id.0
    }
}

impl Borrow<str> for ControllerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved authorization requirement of a controller or action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Authorized,
    Anonymous,
    Unspecified,
}

impl Posture {
    #[must_use]
    pub fn is_specified(self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorized => f.write_str("authorized"),
            Self::Anonymous => f.write_str("anonymous"),
            Self::Unspecified => f.write_str("unspecified"),
        }
    }
}

/// The two mutually exclusive security annotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Authorize,
    AllowAnonymous,
}

impl AnnotationKind {
    /// Posture this annotation selects when it wins resolution.
    #[must_use]
    pub fn posture(self) -> Posture {
        match self {
            Self::Authorize => Posture::Authorized,
            Self::AllowAnonymous => Posture::Anonymous,
        }
    }

    #[must_use]
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Authorize => "[Authorize]",
            Self::AllowAnonymous => "[AllowAnonymous]",
        }
    }
}

/// A security annotation together with its declaration position on the
/// element that carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SecurityAnnotation {
    kind: AnnotationKind,
    position: usize,
}

impl SecurityAnnotation {
    #[must_use]
    pub fn new(kind: AnnotationKind, position: usize) -> Self {
        Self { kind, position }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Returns `true` when both annotation kinds are declared in `annotations`.
#[must_use]
pub fn declares_both(annotations: &[SecurityAnnotation]) -> bool {
    let has = |kind| annotations.iter().any(|a| a.kind() == kind);
    has(AnnotationKind::Authorize) && has(AnnotationKind::AllowAnonymous)
}

/// HTTP verb annotation that exposes an action as an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

/// Declared accessibility of an action method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Internal,
    Private,
}

/// An action method declared directly on a controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionDescriptor {
    name: String,
    annotations: Vec<SecurityAnnotation>,
    http_verbs: Vec<HttpVerb>,
    visibility: Visibility,
    is_override: bool,
}

impl ActionDescriptor {
    /// Create a public, non-override action without annotations.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::BlankIdentity`] if `name` is empty or whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::BlankIdentity { what: "action" });
        }
        Ok(Self {
            name,
            annotations: Vec::new(),
            http_verbs: Vec::new(),
            visibility: Visibility::Public,
            is_override: false,
        })
    }

    /// Append a security annotation after the ones already declared.
    #[must_use]
    pub fn with_annotation(mut self, kind: AnnotationKind) -> Self {
        let position = self.annotations.len();
        self.annotations.push(SecurityAnnotation::new(kind, position));
        self
    }

    #[must_use]
    pub fn with_http_verb(mut self, verb: HttpVerb) -> Self {
        self.http_verbs.push(verb);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark the action as overriding a base controller method of the same name.
    #[must_use]
    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn annotations(&self) -> &[SecurityAnnotation] {
        &self.annotations
    }

    #[must_use]
    pub fn http_verbs(&self) -> &[HttpVerb] {
        &self.http_verbs
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub fn is_override(&self) -> bool {
        self.is_override
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// A controller type as seen by the scanner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerDescriptor {
    id: ControllerId,
    annotations: Vec<SecurityAnnotation>,
    base: Option<ControllerId>,
    is_abstract: bool,
    actions: Vec<ActionDescriptor>,
}

impl ControllerDescriptor {
    /// Create a concrete controller deriving directly from the framework base.
    #[must_use]
    pub fn new(id: ControllerId) -> Self {
        Self {
            id,
            annotations: Vec::new(),
            base: None,
            is_abstract: false,
            actions: Vec::new(),
        }
    }

    /// Shorthand for `ControllerDescriptor::new(ControllerId::new(name)?)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::BlankIdentity`] if `name` is empty or whitespace.
    pub fn named(name: impl Into<String>) -> Result<Self, ModelError> {
        ControllerId::new(name).map(Self::new)
    }

    /// Append a security annotation after the ones already declared.
    #[must_use]
    pub fn with_annotation(mut self, kind: AnnotationKind) -> Self {
        let position = self.annotations.len();
        self.annotations.push(SecurityAnnotation::new(kind, position));
        self
    }

    #[must_use]
    pub fn with_base(mut self, base: ControllerId) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn mark_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: ActionDescriptor) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    #[must_use]
    pub fn annotations(&self) -> &[SecurityAnnotation] {
        &self.annotations
    }

    #[must_use]
    pub fn base(&self) -> Option<&ControllerId> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Every action declared on this type, whatever its visibility.
    #[must_use]
    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    /// Public actions declared on this type only.
    pub fn public_actions(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter().filter(|a| a.is_public())
    }

    /// First declared action named `name`.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.name() == name)
    }
}

/// The element a finding or an acknowledgement refers to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    Controller {
        controller: ControllerId,
    },
    Action {
        controller: ControllerId,
        action: String,
    },
}

impl Subject {
    #[must_use]
    pub fn controller(controller: ControllerId) -> Self {
        Self::Controller { controller }
    }

    #[must_use]
    pub fn action(controller: ControllerId, action: impl Into<String>) -> Self {
        Self::Action {
            controller,
            action: action.into(),
        }
    }

    /// Controller the subject belongs to.
    #[must_use]
    pub fn controller_id(&self) -> &ControllerId {
        match self {
            Self::Controller { controller } | Self::Action { controller, .. } => controller,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller { controller } => write!(f, "{controller}"),
            Self::Action { controller, action } => write!(f, "{controller}.{action}"),
        }
    }
}
