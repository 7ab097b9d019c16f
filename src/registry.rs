//! Name-to-handler dispatch table.
//!
//! Registration happens once at process start; lookups only borrow after
//! that, so one registry serves any number of request-handling threads.
//!
//! Registry Invariant: the registry is a single source of truth. Construct it
//! once at the entrypoint (or use [`BUILTIN`]) and pass it by reference to the
//! driver. Never construct a local/hidden registry per request.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::context::ExpansionContext;
use crate::errors::{unspanned, ErrorKind, ErrorReporting, GraftError, SourceContext};
use crate::syntax::{Accessor, Expression, Invocation, Member, Site, SyntaxNode};

/// What a transformation produces and where it may be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpansionKind {
    FreestandingExpression,
    FreestandingDeclaration,
    AttachedAccessor,
    AttachedMember,
    AttachedPeer,
}

impl ExpansionKind {
    /// Human form for dispatch diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::FreestandingExpression => "a freestanding expression",
            Self::FreestandingDeclaration => "a freestanding declaration",
            Self::AttachedAccessor => "an attached accessor",
            Self::AttachedMember => "an attached member",
            Self::AttachedPeer => "an attached peer",
        }
    }

    /// Whether requests of this kind stand alone rather than decorate an
    /// existing declaration.
    pub fn is_freestanding(&self) -> bool {
        matches!(
            self,
            Self::FreestandingExpression | Self::FreestandingDeclaration
        )
    }
}

/// Success payload of a handler, matched to its declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    /// One expression to splice at the request site.
    Expression(Expression),
    /// One or more declarations, freestanding or peer.
    Declarations(Vec<SyntaxNode>),
    /// Accessors to attach to the request's binding.
    Accessors(Vec<Accessor>),
    /// Members to add to or rewrite in the request's container.
    Members(Vec<Member>),
}

impl Expansion {
    /// Renders the payload into host-boundary fragments, one string per
    /// produced node.
    pub fn into_fragments(self) -> Vec<String> {
        match self {
            Self::Expression(expression) => vec![expression.text],
            Self::Declarations(declarations) => {
                declarations.iter().map(SyntaxNode::render).collect()
            }
            Self::Accessors(accessors) => accessors.iter().map(Accessor::render).collect(),
            Self::Members(members) => members.iter().map(Member::render).collect(),
        }
    }
}

/// Handler signature: read the invocation and site, synthesize new nodes.
/// The site is borrowed shared, so a handler cannot mutate its input tree.
pub type ExpandFn = fn(&Invocation, &Site, &mut ExpansionContext) -> Result<Expansion, GraftError>;

/// A registered transformation: declared kind, entry point, capabilities.
#[derive(Debug, Clone, Copy)]
pub struct HandlerDef {
    pub kind: ExpansionKind,
    pub expand: ExpandFn,
    /// Container requests re-apply this transformation to each qualifying
    /// member instead of requiring a single-binding site.
    pub propagates_member_attribute: bool,
}

/// Immutable-after-startup dispatch table.
#[derive(Debug, Default)]
pub struct Registry {
    handlers: HashMap<String, HandlerDef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`. Each name is single-use for the
    /// lifetime of the registry.
    pub fn register(&mut self, name: &str, def: HandlerDef) -> Result<(), GraftError> {
        if self.handlers.contains_key(name) {
            let source = SourceContext::fallback("registry");
            return Err(source.report(
                ErrorKind::DuplicateName {
                    name: name.to_string(),
                },
                unspanned(),
            ));
        }
        self.handlers.insert(name.to_string(), def);
        Ok(())
    }

    /// Looks up `name`, reporting the miss against the caller's source
    /// context so the diagnostic points at the failing request.
    pub fn lookup(
        &self,
        name: &str,
        reporter: &impl ErrorReporting,
    ) -> Result<&HandlerDef, GraftError> {
        self.handlers
            .get(name)
            .ok_or_else(|| reporter.unknown_transformation(name, unspanned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Builds and returns a fully populated registry with all standard
    /// transformations registered.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::expanders::register_builtin_expanders(&mut registry)
            .unwrap(); // builtin names are distinct by construction
        registry
    }
}

/// Shared builtin registry for call sites that need a `'static` borrow.
pub static BUILTIN: Lazy<Registry> = Lazy::new(Registry::builtin);
