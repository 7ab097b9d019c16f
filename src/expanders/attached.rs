//! Attached producers: transformations that read the declaration they
//! decorate and synthesize peers, members, or accessor bodies for it.
//! The site is read-only; every output is a newly built node.

use crate::context::ExpansionContext;
use crate::errors::{to_source_span, ErrorReporting, GraftError};
use crate::registry::Expansion;
use crate::syntax::{
    Accessor, AccessorBlock, AccessorKind, BindingKeyword, DeclarationContainer, Expression,
    FunctionSignature, Invocation, Member, Segment, Site, Span, StringLiteral, SyntaxNode,
    TypeAnnotation, VariableBinding,
};

fn require_container<'a>(
    site: &'a Site,
    ctx: &ExpansionContext,
) -> Result<&'a DeclarationContainer, GraftError> {
    site.as_container().ok_or_else(|| {
        ctx.invalid_site(
            ctx.request_name(),
            "a class-like declaration",
            site.describe(),
            to_source_span(site.span()),
        )
    })
}

// ---
// interface
// ---

/// Expands `@interface` on a container to a sibling `<Name>Interface`
/// declaration: variable bindings stripped to `var <name>: <type>`, then
/// function signatures with emptied bodies, each group in source order.
///
/// Bindings without a type annotation have no interface shape and are
/// skipped with a note. The decorated container itself is never touched;
/// the interface is an additional declaration.
pub fn expand_interface(
    _invocation: &Invocation,
    site: &Site,
    ctx: &mut ExpansionContext,
) -> Result<Expansion, GraftError> {
    let container = require_container(site, ctx)?;
    let mut members = Vec::new();

    for binding in container.bindings() {
        let annotation = match &binding.annotation {
            Some(annotation) => annotation,
            None => {
                ctx.note(
                    format!(
                        "binding '{}' has no type annotation and is left out of the interface",
                        binding.name
                    ),
                    to_source_span(binding.span),
                );
                continue;
            }
        };
        members.push(Member::Variable(VariableBinding {
            attributes: vec![],
            modifiers: vec![],
            keyword: BindingKeyword::Var,
            name: binding.name.clone(),
            annotation: Some(annotation.clone()),
            initializer: None,
            accessors: None,
            span: Span::default(),
        }));
    }

    for function in container.functions() {
        members.push(Member::Function(FunctionSignature {
            attributes: function.attributes.clone(),
            modifiers: function.modifiers.clone(),
            name: function.name.clone(),
            parameters: function.parameters.clone(),
            return_type: function.return_type.clone(),
            body: Some(Expression::new("{}")),
            span: Span::default(),
        }));
    }

    let interface = DeclarationContainer {
        attributes: vec![],
        modifiers: vec![],
        keyword: container.keyword,
        name: format!("{}Interface", container.name),
        members,
        span: Span::default(),
    };
    Ok(Expansion::Declarations(vec![SyntaxNode::Container(
        interface,
    )]))
}

// ---
// backed
// ---

/// Expands `@backed` on an optional binding into store-backed accessors:
/// a getter reading the store by the binding's name coerced to the inner
/// type, and a setter writing the binding's name unconditionally.
///
/// On a container site the transformation instead rewrites every qualifying
/// member (stored bindings with no accessor body) to carry the attribute and
/// the synthesized accessors, sharing the single-binding logic per member.
pub fn expand_backed(
    invocation: &Invocation,
    site: &Site,
    ctx: &mut ExpansionContext,
) -> Result<Expansion, GraftError> {
    match site {
        Site::Binding(binding) => Ok(Expansion::Accessors(synthesize_accessors(binding, ctx)?)),
        Site::Container(container) => Ok(Expansion::Members(propagate_to_members(
            invocation, container, ctx,
        )?)),
        Site::Expression(_) => Err(ctx.invalid_site(
            ctx.request_name(),
            "a variable binding or class-like declaration",
            site.describe(),
            to_source_span(site.span()),
        )),
    }
}

/// Accessor pair for one binding. The annotation must be optional: the store
/// returns nil for absent keys, and a non-optional binding cannot hold that.
fn synthesize_accessors(
    binding: &VariableBinding,
    ctx: &ExpansionContext,
) -> Result<Vec<Accessor>, GraftError> {
    let annotation = binding
        .annotation
        .as_ref()
        .ok_or_else(|| ctx.missing_type_annotation(&binding.name, to_source_span(binding.span)))?;
    if !annotation.optional {
        return Err(ctx.requires_optional_type(
            &binding.name,
            &annotation.name,
            to_source_span(annotation.span),
        ));
    }

    let getter = Accessor {
        kind: AccessorKind::Get,
        body: Expression::new(format!(
            "{{ UserDefaults.standard.value(forKey: \"{}\") as? {} }}",
            binding.name, annotation.name
        )),
    };
    let setter = Accessor {
        kind: AccessorKind::Set,
        body: Expression::new(format!(
            "{{ UserDefaults.standard.setValue(newValue, forKey: \"{}\") }}",
            binding.name
        )),
    };
    Ok(vec![getter, setter])
}

/// Container path: rewrite each stored binding with the attribute and its
/// accessors. A member that fails synthesis fails the whole request; partial
/// rewrites would leave the container half-transformed.
fn propagate_to_members(
    invocation: &Invocation,
    container: &DeclarationContainer,
    ctx: &mut ExpansionContext,
) -> Result<Vec<Member>, GraftError> {
    let mut rewritten = Vec::new();

    for member in &container.members {
        let binding = match member {
            Member::Variable(binding) if binding.accessors.is_none() => binding,
            Member::Variable(binding) => {
                ctx.note(
                    format!("binding '{}' already has a body and keeps it", binding.name),
                    to_source_span(binding.span),
                );
                continue;
            }
            Member::Function(_) => continue,
        };

        let accessors = synthesize_accessors(binding, ctx)?;
        let mut attributes = binding.attributes.clone();
        if !attributes.iter().any(|a| a.name == invocation.name) {
            attributes.push(Invocation::attribute(invocation.name.as_str()));
        }
        rewritten.push(Member::Variable(VariableBinding {
            attributes,
            modifiers: binding.modifiers.clone(),
            keyword: binding.keyword,
            name: binding.name.clone(),
            annotation: binding.annotation.clone(),
            initializer: None,
            accessors: Some(AccessorBlock::Accessors(accessors)),
            span: Span::default(),
        }));
    }

    Ok(rewritten)
}

// ---
// describe
// ---

/// Expands `@describe` on a container to one new member: a computed
/// read-only `description` property interpolating every variable member by
/// name, e.g. `"Point(x: \(x), y: \(y))"`.
///
/// Unlike `echo`, the member names enter the literal as interpolation
/// segments, so the rendered text reads their runtime values.
pub fn expand_describe(
    _invocation: &Invocation,
    site: &Site,
    ctx: &mut ExpansionContext,
) -> Result<Expansion, GraftError> {
    let container = require_container(site, ctx)?;

    let mut segments = vec![Segment::Text(format!("{}(", container.name))];
    for (index, binding) in container.bindings().enumerate() {
        let label = if index == 0 {
            format!("{}: ", binding.name)
        } else {
            format!(", {}: ", binding.name)
        };
        segments.push(Segment::Text(label));
        segments.push(Segment::Interpolation(Expression::new(
            binding.name.as_str(),
        )));
    }
    segments.push(Segment::Text(")".to_string()));

    let literal = StringLiteral {
        segments,
        span: Span::default(),
    };
    let member = Member::Variable(VariableBinding {
        attributes: vec![],
        modifiers: vec![],
        keyword: BindingKeyword::Var,
        name: "description".to_string(),
        annotation: Some(TypeAnnotation {
            name: "String".to_string(),
            optional: false,
            span: Span::default(),
        }),
        initializer: None,
        accessors: Some(AccessorBlock::Computed(Box::new(SyntaxNode::StringLiteral(
            literal,
        )))),
        span: Span::default(),
    });
    Ok(Expansion::Members(vec![member]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::syntax::parser::parse_site;
    use crate::syntax::Marker;

    fn request_at(name: &str, site_text: &str) -> (Invocation, Site, ExpansionContext) {
        let source = SourceContext::from_fragment(format!("request:{}", name), site_text);
        let site = parse_site(site_text, &source).unwrap();
        let invocation = Invocation {
            marker: Marker::At,
            name: name.to_string(),
            arguments: vec![],
            span: Span::default(),
        };
        let ctx = ExpansionContext::new(source, name);
        (invocation, site, ctx)
    }

    #[test]
    fn interface_strips_vars_and_empties_function_bodies() {
        let site_text = "class Model {\n    var x: Int\n    func f() {\n        work()\n    }\n}";
        let (invocation, site, mut ctx) = request_at("interface", site_text);
        let out = expand_interface(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec!["class ModelInterface {\n    var x: Int\n    func f() {}\n}".to_string()]
        );
        // The attached container itself is read, never rewritten.
        assert_eq!(site.as_container().unwrap().render(), site_text);
    }

    #[test]
    fn interface_orders_vars_before_funcs_and_normalizes_let() {
        let site_text = "class M {\n    func early() {}\n    let seen: Bool = true\n    private var hidden: Int\n}";
        let (invocation, site, mut ctx) = request_at("interface", site_text);
        let out = expand_interface(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec![
                "class MInterface {\n    var seen: Bool\n    var hidden: Int\n    func early() {}\n}"
                    .to_string()
            ]
        );
    }

    #[test]
    fn interface_skips_untyped_bindings_with_a_note() {
        let site_text = "class M {\n    var inferred = 3\n    var typed: Int\n}";
        let (invocation, site, mut ctx) = request_at("interface", site_text);
        let out = expand_interface(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec!["class MInterface {\n    var typed: Int\n}".to_string()]
        );
        assert_eq!(ctx.diagnostics().len(), 1);
        assert!(ctx.diagnostics()[0].message.contains("inferred"));
    }

    #[test]
    fn interface_requires_a_container_site() {
        let (invocation, site, mut ctx) = request_at("interface", "var x: Int");
        let err = expand_interface(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::invalid_site");
    }

    #[test]
    fn backed_synthesizes_getter_and_setter_for_optional_binding() {
        let (invocation, site, mut ctx) = request_at("backed", "var name: String?");
        let out = expand_backed(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec![
                "get { UserDefaults.standard.value(forKey: \"name\") as? String }".to_string(),
                "set { UserDefaults.standard.setValue(newValue, forKey: \"name\") }".to_string(),
            ]
        );
    }

    #[test]
    fn backed_requires_an_annotation() {
        let (invocation, site, mut ctx) = request_at("backed", "var name = \"unset\"");
        let err = expand_backed(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::missing_type_annotation");
    }

    #[test]
    fn backed_requires_the_annotation_to_be_optional() {
        let (invocation, site, mut ctx) = request_at("backed", "var name: String");
        let err = expand_backed(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::requires_optional_type");
        assert!(err
            .diagnostic_info
            .help
            .as_deref()
            .is_some_and(|help| help.contains("name: String?")));
    }

    #[test]
    fn backed_rejects_expression_sites() {
        let (invocation, site, mut ctx) = request_at("backed", "compute()");
        let err = expand_backed(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::invalid_site");
    }

    #[test]
    fn backed_on_container_rewrites_each_stored_binding() {
        let site_text = "class Settings {\n    var name: String?\n    var count: Int?\n}";
        let (invocation, site, mut ctx) = request_at("backed", site_text);
        let out = expand_backed(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec![
                "@backed var name: String? {\n    get { UserDefaults.standard.value(forKey: \"name\") as? String }\n    set { UserDefaults.standard.setValue(newValue, forKey: \"name\") }\n}".to_string(),
                "@backed var count: Int? {\n    get { UserDefaults.standard.value(forKey: \"count\") as? Int }\n    set { UserDefaults.standard.setValue(newValue, forKey: \"count\") }\n}".to_string(),
            ]
        );
    }

    #[test]
    fn backed_on_container_skips_members_with_bodies_and_functions() {
        let site_text = "class Settings {\n    var cached: Int? {\n        get { 1 }\n    }\n    var live: Int?\n    func reset() {}\n}";
        let (invocation, site, mut ctx) = request_at("backed", site_text);
        let out = expand_backed(&invocation, &site, &mut ctx).unwrap();
        let fragments = out.into_fragments();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("@backed var live: Int?"));
        assert_eq!(ctx.diagnostics().len(), 1);
    }

    #[test]
    fn backed_on_container_fails_whole_request_on_non_optional_member() {
        let site_text = "class Settings {\n    var name: String?\n    var count: Int\n}";
        let (invocation, site, mut ctx) = request_at("backed", site_text);
        let err = expand_backed(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::requires_optional_type");
    }

    #[test]
    fn describe_interpolates_every_binding_in_order() {
        let site_text = "class Point {\n    var x: Int\n    var y: Int\n    func norm() {}\n}";
        let (invocation, site, mut ctx) = request_at("describe", site_text);
        let out = expand_describe(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec![
                "var description: String {\n    \"Point(x: \\(x), y: \\(y))\"\n}".to_string()
            ]
        );
    }

    #[test]
    fn describe_on_empty_container_closes_the_parens() {
        let (invocation, site, mut ctx) = request_at("describe", "class Unit {}");
        let out = expand_describe(&invocation, &site, &mut ctx).unwrap();
        assert_eq!(
            out.into_fragments(),
            vec!["var description: String {\n    \"Unit()\"\n}".to_string()]
        );
    }

    #[test]
    fn describe_requires_a_container_site() {
        let (invocation, site, mut ctx) = request_at("describe", "let x: Int = 1");
        let err = expand_describe(&invocation, &site, &mut ctx).unwrap_err();
        assert_eq!(err.code(), "graft::expand::invalid_site");
    }
}
