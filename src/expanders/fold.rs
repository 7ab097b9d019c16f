//! Integer constant folding for arguments that must be known at expansion
//! time.
//!
//! The folder reuses the engine grammar's integer sub-language: literals in
//! decimal, hex (`0x`), binary (`0b`), and octal (`0o`) form with `_`
//! separators, unary sign, parentheses, and `+ - * / %` with the usual
//! precedence. Anything else is `NotAnInteger`. Folding runs before any
//! compiled output exists, so there is no runtime to fall back to.

use miette::SourceSpan;
use pest::iterators::Pair;
use pest::Parser;

use crate::context::ExpansionContext;
use crate::errors::{to_source_span, ErrorReporting, GraftError};
use crate::syntax::parser::{GraftParser, Rule};
use crate::syntax::SyntaxNode;

/// Folds `argument` to an integer constant, or reports why it cannot be.
pub fn fold_integer(argument: &SyntaxNode, ctx: &ExpansionContext) -> Result<i64, GraftError> {
    let expression = match argument {
        SyntaxNode::Expression(expression) => expression,
        other => {
            return Err(ctx.not_an_integer(
                ctx.request_name(),
                &format!("found a {}", other.shape_name()),
                to_source_span(other.span()),
            ))
        }
    };

    let span = to_source_span(expression.span);
    let mut pairs = GraftParser::parse(Rule::integer_input, &expression.text).map_err(|_| {
        ctx.not_an_integer(
            ctx.request_name(),
            &format!("'{}' is not an integer constant expression", expression.text),
            span,
        )
    })?;
    let entry = pairs.next().unwrap(); // pest guarantees the entry rule exists
    let expr = entry.into_inner().next().unwrap(); // integer_input wraps int_expr
    eval_expr(expr, ctx, span)
}

fn eval_expr(
    pair: Pair<Rule>,
    ctx: &ExpansionContext,
    span: SourceSpan,
) -> Result<i64, GraftError> {
    let mut inner = pair.into_inner();
    let mut value = eval_term(inner.next().unwrap(), ctx, span)?; // grammar guarantees a first term

    while let Some(op) = inner.next() {
        let rhs = eval_term(inner.next().unwrap(), ctx, span)?; // operators always have a right side
        value = match op.as_str() {
            "+" => value.checked_add(rhs),
            _ => value.checked_sub(rhs),
        }
        .ok_or_else(|| overflow_error(ctx, span))?;
    }

    Ok(value)
}

fn eval_term(
    pair: Pair<Rule>,
    ctx: &ExpansionContext,
    span: SourceSpan,
) -> Result<i64, GraftError> {
    let mut inner = pair.into_inner();
    let mut value = eval_factor(inner.next().unwrap(), ctx, span)?; // grammar guarantees a first factor

    while let Some(op) = inner.next() {
        let rhs = eval_factor(inner.next().unwrap(), ctx, span)?; // operators always have a right side
        if rhs == 0 && (op.as_str() == "/" || op.as_str() == "%") {
            return Err(ctx.not_an_integer(
                ctx.request_name(),
                "division by zero while folding",
                span,
            ));
        }
        value = match op.as_str() {
            "*" => value.checked_mul(rhs),
            "/" => value.checked_div(rhs),
            _ => value.checked_rem(rhs),
        }
        .ok_or_else(|| overflow_error(ctx, span))?;
    }

    Ok(value)
}

fn eval_factor(
    pair: Pair<Rule>,
    ctx: &ExpansionContext,
    span: SourceSpan,
) -> Result<i64, GraftError> {
    let mut negations = 0usize;
    let mut value = None;

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::unary_op => {
                if part.as_str() == "-" {
                    negations += 1;
                }
            }
            Rule::int_literal => value = Some(parse_literal(&part, ctx, span)?),
            Rule::int_expr => value = Some(eval_expr(part, ctx, span)?),
            _ => {}
        }
    }

    let value = value.unwrap(); // grammar guarantees exactly one primary
    if negations % 2 == 1 {
        value.checked_neg().ok_or_else(|| overflow_error(ctx, span))
    } else {
        Ok(value)
    }
}

fn parse_literal(
    pair: &Pair<Rule>,
    ctx: &ExpansionContext,
    span: SourceSpan,
) -> Result<i64, GraftError> {
    let text = pair.as_str().replace('_', "");
    let parsed = if let Some(digits) = text.strip_prefix("0x") {
        i64::from_str_radix(digits, 16)
    } else if let Some(digits) = text.strip_prefix("0b") {
        i64::from_str_radix(digits, 2)
    } else if let Some(digits) = text.strip_prefix("0o") {
        i64::from_str_radix(digits, 8)
    } else {
        text.parse::<i64>()
    };

    parsed.map_err(|_| {
        ctx.not_an_integer(
            ctx.request_name(),
            &format!("literal '{}' does not fit a 64-bit integer", pair.as_str()),
            span,
        )
    })
}

fn overflow_error(ctx: &ExpansionContext, span: SourceSpan) -> GraftError {
    ctx.not_an_integer(ctx.request_name(), "arithmetic overflow while folding", span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::syntax::Expression;

    fn fold(text: &str) -> Result<i64, GraftError> {
        let ctx = ExpansionContext::new(SourceContext::from_fragment("test", text), "binary");
        let node = SyntaxNode::Expression(Expression::new(text));
        fold_integer(&node, &ctx)
    }

    #[test]
    fn literals_fold_in_every_radix() {
        assert_eq!(fold("1000").unwrap(), 1000);
        assert_eq!(fold("0xFF").unwrap(), 255);
        assert_eq!(fold("0b1010").unwrap(), 10);
        assert_eq!(fold("0o17").unwrap(), 15);
        assert_eq!(fold("1_000_000").unwrap(), 1_000_000);
    }

    #[test]
    fn precedence_and_grouping_hold() {
        assert_eq!(fold("2 + 3 * 4").unwrap(), 14);
        assert_eq!(fold("(2 + 3) * 4").unwrap(), 20);
        assert_eq!(fold("20 / 4 % 3").unwrap(), 2);
    }

    #[test]
    fn unary_signs_stack() {
        assert_eq!(fold("-5").unwrap(), -5);
        assert_eq!(fold("--5").unwrap(), 5);
        assert_eq!(fold("4 + -4").unwrap(), 0);
    }

    #[test]
    fn division_by_zero_is_reported() {
        let err = fold("1 / 0").unwrap_err();
        assert_eq!(err.code(), "graft::expand::not_an_integer");
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let err = fold("9223372036854775807 + 1").unwrap_err();
        assert_eq!(err.code(), "graft::expand::not_an_integer");
    }

    #[test]
    fn identifiers_do_not_fold() {
        assert!(fold("count + 1").is_err());
    }

    #[test]
    fn string_literal_arguments_do_not_fold() {
        let text = "\"1000\"";
        let ctx = ExpansionContext::new(SourceContext::from_fragment("test", text), "binary");
        let source = ctx.source().clone();
        let node = crate::syntax::parser::parse_argument(text, &source).unwrap();
        let err = fold_integer(&node, &ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::not_an_integer");
    }
}
