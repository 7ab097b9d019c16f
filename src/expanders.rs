//! # Graft Standard Transformation Library
//!
//! The six builtin handlers, one worked example of each expansion pattern
//! the engine supports. `freestanding` holds the expression and declaration
//! producers, `attached` the binding- and container-directed producers, and
//! `fold` the integer constant folder the binary renderer depends on.

pub mod attached;
pub mod fold;
pub mod freestanding;

use crate::context::ExpansionContext;
use crate::errors::{to_source_span, ErrorReporting, GraftError};
use crate::registry::{ExpansionKind, HandlerDef, Registry};
use crate::syntax::{Invocation, SyntaxNode};

// ---
// Registry
// ---

/// Registers all standard transformations in the given registry.
pub fn register_builtin_expanders(registry: &mut Registry) -> Result<(), GraftError> {
    // Freestanding producers
    registry.register(
        "echo",
        HandlerDef {
            kind: ExpansionKind::FreestandingExpression,
            expand: freestanding::expand_echo,
            propagates_member_attribute: false,
        },
    )?;
    registry.register(
        "binary",
        HandlerDef {
            kind: ExpansionKind::FreestandingExpression,
            expand: freestanding::expand_binary,
            propagates_member_attribute: false,
        },
    )?;
    registry.register(
        "constant",
        HandlerDef {
            kind: ExpansionKind::FreestandingDeclaration,
            expand: freestanding::expand_constant,
            propagates_member_attribute: false,
        },
    )?;

    // Attached producers
    registry.register(
        "interface",
        HandlerDef {
            kind: ExpansionKind::AttachedPeer,
            expand: attached::expand_interface,
            propagates_member_attribute: false,
        },
    )?;
    registry.register(
        "backed",
        HandlerDef {
            kind: ExpansionKind::AttachedAccessor,
            expand: attached::expand_backed,
            propagates_member_attribute: true,
        },
    )?;
    registry.register(
        "describe",
        HandlerDef {
            kind: ExpansionKind::AttachedMember,
            expand: attached::expand_describe,
            propagates_member_attribute: false,
        },
    )?;

    Ok(())
}

// ---
// Shared argument helpers
// ---

/// The first argument of `invocation`, or `MissingArgument`. Handlers that
/// take one argument read only the first and ignore any extras.
pub(crate) fn single_argument<'a>(
    invocation: &'a Invocation,
    ctx: &ExpansionContext,
) -> Result<&'a SyntaxNode, GraftError> {
    invocation.arguments.first().ok_or_else(|| {
        ctx.missing_argument(ctx.request_name(), to_source_span(invocation.span))
    })
}
