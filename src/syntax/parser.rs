//! Graft Parser - Clean, Minimal Implementation
//!
//! Converts request fragment text into syntax nodes with source span tracking.
//! This parser is purely syntactic - no name resolution, no expansion logic.

use crate::errors::{to_source_span, unspanned, ErrorReporting, GraftError, SourceContext};
use crate::syntax::{
    Accessor, AccessorBlock, AccessorKind, BindingKeyword, ContainerKeyword,
    DeclarationContainer, Expression, FunctionSignature, Invocation, Marker, Member, Segment,
    Site, Span, StringLiteral, SyntaxNode, TypeAnnotation, VariableBinding,
};
use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
pub(crate) struct GraftParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse an opaque expression. The node text is the input trimmed of
/// exterior whitespace; interior spacing is preserved exactly.
pub fn parse_expression(text: &str, source: &SourceContext) -> Result<Expression, GraftError> {
    let pair = parse_entry(Rule::expression_input, text, "expression", source)?;
    Ok(make_expression(&pair))
}

/// Parse a double-quoted string literal into its segments.
pub fn parse_string_literal(
    text: &str,
    source: &SourceContext,
) -> Result<StringLiteral, GraftError> {
    let pair = parse_entry(Rule::string_input, text, "string literal", source)?;
    Ok(build_string_literal(pair))
}

/// Parse one request argument. A fragment that is entirely a string literal
/// becomes a `StringLiteral` node; anything else stays an opaque expression.
pub fn parse_argument(text: &str, source: &SourceContext) -> Result<SyntaxNode, GraftError> {
    let pair = parse_entry(Rule::argument_input, text, "argument", source)?;
    Ok(build_argument(pair))
}

/// Parse a class-like declaration with its member list.
pub fn parse_container(
    text: &str,
    source: &SourceContext,
) -> Result<DeclarationContainer, GraftError> {
    let pair = parse_entry(Rule::container_input, text, "declaration", source)?;
    build_container(pair, source)
}

/// Parse a single `var`/`let` binding.
pub fn parse_binding(text: &str, source: &SourceContext) -> Result<VariableBinding, GraftError> {
    let pair = parse_entry(Rule::binding_input, text, "variable binding", source)?;
    build_binding(pair, source)
}

/// Parse an `@name(...)` or `#name(...)` invocation marker.
pub fn parse_invocation(text: &str, source: &SourceContext) -> Result<Invocation, GraftError> {
    let pair = parse_entry(Rule::invocation_input, text, "invocation", source)?;
    build_invocation(pair, source)
}

/// Classify and parse the site text of a request.
///
/// A fragment whose leading declaration keyword is `class`/`struct` must
/// parse fully as a container, and `var`/`let` as a binding; either failure
/// is a malformed-syntax error, not a silent downgrade to expression.
/// Everything else is kept as an opaque expression.
pub fn parse_site(text: &str, source: &SourceContext) -> Result<Site, GraftError> {
    if text.trim().is_empty() {
        return Err(source.malformed_syntax("site", "empty fragment", unspanned()));
    }
    match leading_declaration_keyword(text) {
        Some("class") | Some("struct") => Ok(Site::Container(parse_container(text, source)?)),
        Some("var") | Some("let") => Ok(Site::Binding(parse_binding(text, source)?)),
        _ => Ok(Site::Expression(parse_expression(text, source)?)),
    }
}

// ============================================================================
// SITE CLASSIFICATION
// ============================================================================

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "internal",
    "fileprivate",
    "open",
    "static",
    "final",
    "override",
];

/// First declaration keyword of the fragment, looking past attribute words
/// and modifiers. Decides which grammar entry the site text must satisfy.
fn leading_declaration_keyword(text: &str) -> Option<&'static str> {
    for word in text.split_whitespace() {
        if word.starts_with('@') || MODIFIERS.contains(&word) {
            continue;
        }
        return match word {
            "class" => Some("class"),
            "struct" => Some("struct"),
            "var" => Some("var"),
            "let" => Some("let"),
            _ => None,
        };
    }
    None
}

// ============================================================================
// ENTRY HANDLING
// ============================================================================

/// Run a whole-input entry rule and unwrap down to the construct pair.
fn parse_entry<'a>(
    rule: Rule,
    text: &'a str,
    construct: &str,
    source: &SourceContext,
) -> Result<Pair<'a, Rule>, GraftError> {
    if text.trim().is_empty() {
        return Err(source.malformed_syntax(construct, "empty fragment", unspanned()));
    }

    let mut pairs = GraftParser::parse(rule, text)
        .map_err(|e| convert_parse_error(e, construct, source))?;

    let entry = pairs.next().unwrap(); // pest guarantees the entry rule exists
    let inner = entry.into_inner().next().unwrap(); // entry rules wrap exactly one construct
    Ok(inner)
}

// ============================================================================
// NODE BUILDERS
// ============================================================================

/// Build an opaque expression from any raw-capture pair, trimming exterior
/// whitespace and narrowing the span to the kept text.
fn make_expression(pair: &Pair<Rule>) -> Expression {
    let full = pair.as_str();
    let trimmed = full.trim();
    let start = pair.as_span().start() + (full.len() - full.trim_start().len());
    Expression {
        text: trimmed.to_string(),
        span: Span {
            start,
            end: start + trimmed.len(),
        },
    }
}

fn build_argument(pair: Pair<Rule>) -> SyntaxNode {
    let inner = pair.into_inner().next().unwrap(); // argument wraps exactly one alternative
    match inner.as_rule() {
        Rule::string_literal => SyntaxNode::StringLiteral(build_string_literal(inner)),
        _ => SyntaxNode::Expression(make_expression(&inner)),
    }
}

fn build_string_literal(pair: Pair<Rule>) -> StringLiteral {
    let span = get_span(&pair);
    let mut segments = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::text_run => segments.push(Segment::Text(part.as_str().to_string())),
            Rule::interpolation => {
                let text = part.into_inner().next().unwrap(); // interpolation wraps interp_text
                segments.push(Segment::Interpolation(Expression {
                    text: text.as_str().to_string(),
                    span: get_span(&text),
                }));
            }
            _ => {}
        }
    }

    StringLiteral { segments, span }
}

fn build_container(
    pair: Pair<Rule>,
    source: &SourceContext,
) -> Result<DeclarationContainer, GraftError> {
    let span = get_span(&pair);
    let mut attributes = Vec::new();
    let mut modifiers = Vec::new();
    let mut keyword = ContainerKeyword::Class;
    let mut name = String::new();
    let mut members = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::attribute => attributes.push(build_invocation(part, source)?),
            Rule::modifier => modifiers.push(part.as_str().to_string()),
            Rule::container_kw => {
                keyword = match part.as_str() {
                    "struct" => ContainerKeyword::Struct,
                    _ => ContainerKeyword::Class,
                }
            }
            Rule::identifier => name = part.as_str().to_string(),
            Rule::member => members.push(build_member(part, source)?),
            _ => {}
        }
    }

    Ok(DeclarationContainer {
        attributes,
        modifiers,
        keyword,
        name,
        members,
        span,
    })
}

fn build_member(pair: Pair<Rule>, source: &SourceContext) -> Result<Member, GraftError> {
    let inner = pair.into_inner().next().unwrap(); // member wraps exactly one alternative
    match inner.as_rule() {
        Rule::binding => Ok(Member::Variable(build_binding(inner, source)?)),
        Rule::function => Ok(Member::Function(build_function(inner, source)?)),
        rule => Err(source.malformed_syntax(
            "member",
            &format!("unsupported rule: {:?}", rule),
            to_source_span(get_span(&inner)),
        )),
    }
}

fn build_binding(pair: Pair<Rule>, source: &SourceContext) -> Result<VariableBinding, GraftError> {
    let span = get_span(&pair);
    let mut attributes = Vec::new();
    let mut modifiers = Vec::new();
    let mut keyword = BindingKeyword::Var;
    let mut name = String::new();
    let mut annotation = None;
    let mut initializer = None;
    let mut accessors = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::attribute => attributes.push(build_invocation(part, source)?),
            Rule::modifier => modifiers.push(part.as_str().to_string()),
            Rule::binding_keyword => {
                keyword = match part.as_str() {
                    "let" => BindingKeyword::Let,
                    _ => BindingKeyword::Var,
                }
            }
            Rule::identifier => name = part.as_str().to_string(),
            Rule::type_ref => annotation = Some(build_type_ref(&part)),
            Rule::init_text => initializer = Some(make_expression(&part)),
            Rule::accessor_block => accessors = Some(build_accessor_block(part, source)?),
            _ => {}
        }
    }

    Ok(VariableBinding {
        attributes,
        modifiers,
        keyword,
        name,
        annotation,
        initializer,
        accessors,
        span,
    })
}

fn build_function(
    pair: Pair<Rule>,
    source: &SourceContext,
) -> Result<FunctionSignature, GraftError> {
    let span = get_span(&pair);
    let mut attributes = Vec::new();
    let mut modifiers = Vec::new();
    let mut name = String::new();
    let mut parameters = String::new();
    let mut return_type = None;
    let mut body = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::attribute => attributes.push(build_invocation(part, source)?),
            Rule::modifier => modifiers.push(part.as_str().to_string()),
            Rule::identifier => name = part.as_str().to_string(),
            Rule::param_text => parameters = part.as_str().trim().to_string(),
            Rule::type_ref => return_type = Some(build_type_ref(&part)),
            Rule::brace_blob => {
                body = Some(Expression {
                    text: part.as_str().to_string(),
                    span: get_span(&part),
                })
            }
            _ => {}
        }
    }

    Ok(FunctionSignature {
        attributes,
        modifiers,
        name,
        parameters,
        return_type,
        body,
        span,
    })
}

fn build_type_ref(pair: &Pair<Rule>) -> TypeAnnotation {
    let span = get_span(pair);
    let text = pair.as_str();
    match text.strip_suffix('?') {
        Some(inner) => TypeAnnotation {
            name: inner.to_string(),
            optional: true,
            span,
        },
        None => TypeAnnotation {
            name: text.to_string(),
            optional: false,
            span,
        },
    }
}

fn build_accessor_block(
    pair: Pair<Rule>,
    source: &SourceContext,
) -> Result<AccessorBlock, GraftError> {
    let inner = pair.into_inner().next().unwrap(); // accessor_block wraps exactly one alternative

    match inner.as_rule() {
        Rule::accessor_list_block => {
            let mut accessors = Vec::new();
            for accessor in inner.into_inner() {
                let mut parts = accessor.into_inner();
                let kind = parts.next().unwrap(); // accessor opens with its kind keyword
                let body = parts.next().unwrap(); // and always carries a braced body
                accessors.push(Accessor {
                    kind: match kind.as_str() {
                        "set" => AccessorKind::Set,
                        _ => AccessorKind::Get,
                    },
                    body: Expression {
                        text: body.as_str().to_string(),
                        span: get_span(&body),
                    },
                });
            }
            Ok(AccessorBlock::Accessors(accessors))
        }

        Rule::computed_block => {
            let value = inner.into_inner().next().unwrap(); // computed_block wraps computed_value
            let value = value.into_inner().next().unwrap(); // which wraps one alternative
            let node = match value.as_rule() {
                Rule::string_literal => SyntaxNode::StringLiteral(build_string_literal(value)),
                _ => SyntaxNode::Expression(make_expression(&value)),
            };
            Ok(AccessorBlock::Computed(Box::new(node)))
        }

        Rule::verbatim_block => {
            let blob = inner.into_inner().next().unwrap(); // verbatim_block wraps brace_blob
            Ok(AccessorBlock::Verbatim(Expression {
                text: blob.as_str().to_string(),
                span: get_span(&blob),
            }))
        }

        rule => Err(source.malformed_syntax(
            "accessor block",
            &format!("unsupported rule: {:?}", rule),
            to_source_span(get_span(&inner)),
        )),
    }
}

fn build_invocation(pair: Pair<Rule>, source: &SourceContext) -> Result<Invocation, GraftError> {
    let span = get_span(&pair);
    let mut marker = Marker::At;
    let mut name = String::new();
    let mut arguments = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::marker => {
                marker = match part.as_str() {
                    "#" => Marker::Hash,
                    _ => Marker::At,
                }
            }
            Rule::identifier => name = part.as_str().to_string(),
            Rule::call_args => {
                for argument in part.into_inner() {
                    arguments.push(build_argument(argument));
                }
            }
            rule => {
                return Err(source.malformed_syntax(
                    "invocation",
                    &format!("unsupported rule: {:?}", rule),
                    to_source_span(get_span(&part)),
                ))
            }
        }
    }

    Ok(Invocation {
        marker,
        name,
        arguments,
        span,
    })
}

// ============================================================================
// UTILITIES
// ============================================================================

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_parse_error(error: Error<Rule>, construct: &str, source: &SourceContext) -> GraftError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };

    // Simple error message improvement
    let detail = if error.to_string().contains("expected ')'") {
        "missing closing parenthesis"
    } else if error.to_string().contains("expected '}'") {
        "missing closing brace"
    } else if error.to_string().contains("expected '\"'") {
        "missing closing quote"
    } else {
        "syntax error"
    };

    source.malformed_syntax(construct, detail, to_source_span(span))
}
