//! Driver / plugin boundary: the only part of the engine that talks to the
//! external host.
//!
//! A request arrives as named text fragments plus a declared kind. The
//! driver parses the pieces, dispatches through the registry, invokes the
//! handler once, and renders the result. Expansion is one-shot and
//! deterministic: no retries, no partial fragments. Every failure folds into
//! a structured response, so one malformed request cannot take down a
//! process serving others.

use serde::{Deserialize, Serialize};

use crate::context::ExpansionContext;
use crate::errors::{unspanned, ErrorReporting, GraftError, SourceContext};
use crate::registry::{ExpansionKind, HandlerDef, Registry};
use crate::syntax::parser::{parse_argument, parse_site};
use crate::syntax::{Invocation, Marker, Span};

/// One expansion request as received from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionRequest {
    pub request_name: String,
    pub kind: ExpansionKind,
    /// Source text of the site the request is attached to; for freestanding
    /// requests, the text at the invocation position.
    pub site: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// The host-facing response: fragments on success, a structured error
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpansionResponse {
    Success {
        fragments: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Failure {
        error_kind: String,
        message: String,
    },
}

/// Expands one request against `registry`, producing rendered fragments.
///
/// Steps, in order: parse raw arguments, look up the handler, verify the
/// supplied kind, parse the site, invoke. The first failure wins and
/// surfaces unchanged.
pub fn expand(registry: &Registry, request: &ExpansionRequest) -> Result<Vec<String>, GraftError> {
    let source = SourceContext::from_fragment(
        format!("request:{}", request.request_name),
        request.site.clone(),
    );
    let mut ctx = ExpansionContext::new(source, request.request_name.as_str());

    let mut arguments = Vec::with_capacity(request.arguments.len());
    for (index, raw) in request.arguments.iter().enumerate() {
        let argument_source = SourceContext::from_fragment(
            format!("request:{}:arg{}", request.request_name, index),
            raw.clone(),
        );
        arguments.push(parse_argument(raw, &argument_source)?);
    }

    let handler = registry.lookup(&request.request_name, &ctx)?;
    check_kind(handler, request, &ctx)?;

    let site = parse_site(&request.site, ctx.source())?;
    let marker = if handler.kind.is_freestanding() {
        Marker::Hash
    } else {
        Marker::At
    };
    let invocation = Invocation {
        marker,
        name: request.request_name.clone(),
        arguments,
        span: Span::default(),
    };

    let expansion = (handler.expand)(&invocation, &site, &mut ctx)?;
    Ok(expansion.into_fragments())
}

/// Supplied kind must match the declared kind, with one carve-out: a
/// member-kind request may reach a propagating accessor handler. That is the
/// container path of member-attribute propagation.
fn check_kind(
    handler: &HandlerDef,
    request: &ExpansionRequest,
    ctx: &ExpansionContext,
) -> Result<(), GraftError> {
    if request.kind == handler.kind {
        return Ok(());
    }
    if handler.propagates_member_attribute
        && handler.kind == ExpansionKind::AttachedAccessor
        && request.kind == ExpansionKind::AttachedMember
    {
        return Ok(());
    }
    Err(ctx.kind_mismatch(
        &request.request_name,
        handler.kind.describe(),
        request.kind.describe(),
        unspanned(),
    ))
}

/// Expands one request, folding any failure into the response shape.
pub fn process(registry: &Registry, request: &ExpansionRequest) -> ExpansionResponse {
    match expand(registry, request) {
        Ok(fragments) => ExpansionResponse::Success { fragments },
        Err(error) => ExpansionResponse::Failure {
            error_kind: error.code().to_string(),
            message: error.to_string(),
        },
    }
}

/// Wire entry point: decode a JSON request, expand it, encode the response.
/// Decode failures use the same response shape as engine failures.
pub fn process_json(registry: &Registry, request_json: &str) -> String {
    let response = match serde_json::from_str::<ExpansionRequest>(request_json) {
        Ok(request) => process(registry, &request),
        Err(decode_error) => {
            let source = SourceContext::from_fragment("request", request_json);
            let error =
                source.malformed_syntax("request", &decode_error.to_string(), unspanned());
            ExpansionResponse::Failure {
                error_kind: error.code().to_string(),
                message: error.to_string(),
            }
        }
    };
    serde_json::to_string(&response).unwrap() // string-only payload always serializes
}
