//! Freestanding producers: expression and declaration synthesis with no
//! attachment site. Requests reach these handlers with an opaque expression
//! site (the text at the invocation position), which none of them read.

use crate::context::ExpansionContext;
use crate::errors::{to_source_span, ErrorReporting, GraftError};
use crate::expanders::{fold, single_argument};
use crate::registry::Expansion;
use crate::syntax::{
    BindingKeyword, Expression, Invocation, Site, Span, StringLiteral, SyntaxNode,
    VariableBinding,
};

// ---
// echo
// ---

/// Expands `#echo(x + y)` to `(x + y, "x + y")`.
///
/// The literal half holds the argument's source text exactly as written,
/// spacing included, captured before any further processing. Embedded quotes
/// and interpolation delimiters are escaped into the literal so the spelling
/// survives uninterpreted.
pub fn expand_echo(
    invocation: &Invocation,
    _site: &Site,
    ctx: &mut ExpansionContext,
) -> Result<Expansion, GraftError> {
    let argument = single_argument(invocation, ctx)?;
    let text = argument.render();
    let spelling = StringLiteral::plain(&text);
    Ok(Expansion::Expression(Expression::new(format!(
        "({}, {})",
        text,
        spelling.render()
    ))))
}

// ---
// binary
// ---

/// Expands `#binary(1000)` to `"1111101000"`.
///
/// The argument must fold to an integer at expansion time. The output is the
/// base-2 text with no leading zeros; negative values carry a leading `-`.
pub fn expand_binary(
    invocation: &Invocation,
    _site: &Site,
    ctx: &mut ExpansionContext,
) -> Result<Expansion, GraftError> {
    let argument = single_argument(invocation, ctx)?;
    let value = fold::fold_integer(argument, ctx)?;
    Ok(Expansion::Expression(Expression::new(
        StringLiteral::plain(&binary_text(value)).render(),
    )))
}

fn binary_text(value: i64) -> String {
    if value < 0 {
        format!("-{:b}", value.unsigned_abs())
    } else {
        format!("{:b}", value)
    }
}

// ---
// constant
// ---

/// Expands `#constant("env")` to `public static var env = "env"`.
///
/// The argument must be a plain string literal: its text becomes both the
/// declared name and the bound value. Interpolated literals are rejected
/// because the name must be known at expansion time.
pub fn expand_constant(
    invocation: &Invocation,
    _site: &Site,
    ctx: &mut ExpansionContext,
) -> Result<Expansion, GraftError> {
    let argument = single_argument(invocation, ctx)?;
    let literal = argument.as_string_literal().ok_or_else(|| {
        ctx.argument_not_string_literal(ctx.request_name(), to_source_span(argument.span()))
    })?;
    let name = literal.literal_text().ok_or_else(|| {
        ctx.argument_not_string_literal(ctx.request_name(), to_source_span(argument.span()))
    })?;

    let declaration = VariableBinding {
        attributes: vec![],
        modifiers: vec!["public".to_string(), "static".to_string()],
        keyword: BindingKeyword::Var,
        name: name.clone(),
        annotation: None,
        initializer: Some(Expression::new(StringLiteral::plain(&name).render())),
        accessors: None,
        span: Span::default(),
    };
    Ok(Expansion::Declarations(vec![SyntaxNode::Binding(
        declaration,
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::syntax::parser::parse_argument;
    use crate::syntax::Marker;

    fn request(name: &str, raw_arguments: &[&str]) -> (Invocation, Site, ExpansionContext) {
        let source = SourceContext::from_fragment(format!("request:{}", name), "");
        let arguments = raw_arguments
            .iter()
            .map(|raw| parse_argument(raw, &source).unwrap())
            .collect();
        let invocation = Invocation {
            marker: Marker::Hash,
            name: name.to_string(),
            arguments,
            span: Span::default(),
        };
        let site = Site::Expression(Expression::new(""));
        let ctx = ExpansionContext::new(source, name);
        (invocation, site, ctx)
    }

    fn expect_expression(expansion: Expansion) -> String {
        match expansion {
            Expansion::Expression(expression) => expression.text,
            other => panic!("expected an expression payload, got {:?}", other),
        }
    }

    #[test]
    fn echo_pairs_value_with_its_spelling() {
        let (invocation, site, mut ctx) = request("echo", &["x + y"]);
        let out = expand_echo(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(expect_expression(out), "(x + y, \"x + y\")");
    }

    #[test]
    fn echo_preserves_tight_spacing() {
        let (invocation, site, mut ctx) = request("echo", &["a+b"]);
        let out = expand_echo(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(expect_expression(out), "(a+b, \"a+b\")");
    }

    #[test]
    fn echo_escapes_captured_quotes_and_interpolation() {
        let (invocation, site, mut ctx) = request("echo", &["\"x: \\(x)\""]);
        let out = expand_echo(&invocation, &site, &mut ctx).unwrap();
        // Value half keeps the literal; spelling half escapes it.
        assert_eq!(
            expect_expression(out),
            "(\"x: \\(x)\", \"\\\"x: \\\\(x)\\\"\")"
        );
    }

    #[test]
    fn echo_without_arguments_is_missing_argument() {
        let (invocation, site, mut ctx) = request("echo", &[]);
        let err = expand_echo(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::missing_argument");
    }

    #[test]
    fn binary_renders_base_two() {
        let (invocation, site, mut ctx) = request("binary", &["1000"]);
        let out = expand_binary(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(expect_expression(out), "\"1111101000\"");
    }

    #[test]
    fn binary_folds_constant_expressions() {
        let (invocation, site, mut ctx) = request("binary", &["(2 + 2) * 2"]);
        let out = expand_binary(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(expect_expression(out), "\"1000\"");
    }

    #[test]
    fn binary_negative_value_keeps_leading_sign() {
        let (invocation, site, mut ctx) = request("binary", &["-5"]);
        let out = expand_binary(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(expect_expression(out), "\"-101\"");
    }

    #[test]
    fn binary_rejects_non_integer_arguments() {
        let (invocation, site, mut ctx) = request("binary", &["count"]);
        let err = expand_binary(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::not_an_integer");
    }

    #[test]
    fn constant_declares_name_and_value_from_the_literal() {
        let (invocation, site, mut ctx) = request("constant", &["\"env\""]);
        let out = expand_constant(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec!["public static var env = \"env\"".to_string()]
        );
    }

    #[test]
    fn constant_rejects_interpolated_literals() {
        let (invocation, site, mut ctx) = request("constant", &["\"env_\\(stage)\""]);
        let err = expand_constant(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::argument_not_string_literal");
    }

    #[test]
    fn constant_rejects_non_literal_arguments() {
        let (invocation, site, mut ctx) = request("constant", &["name"]);
        let err = expand_constant(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::argument_not_string_literal");
    }
}
