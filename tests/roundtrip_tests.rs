// tests/roundtrip_tests.rs

use graft::syntax::parser::{
    parse_argument, parse_binding, parse_container, parse_site, parse_string_literal,
};
use graft::syntax::{Member, Segment, Site};
use graft::SourceContext;

fn source(text: &str) -> SourceContext {
    SourceContext::from_fragment("roundtrip", text)
}

// ---
// Exact round-trips: render(parse(text)) == text for canonical fragments
// ---

#[test]
fn test_container_round_trip() {
    let text = "class Settings {\n    @backed var name: String?\n    public var count: Int = 0\n    func reset() { count = 0 }\n}";
    let container = parse_container(text, &source(text)).expect("parse should succeed");
    assert_eq!(container.render(), text);
    assert_eq!(container.members.len(), 3);
}

#[test]
fn test_struct_round_trip_preserves_modifier_order() {
    let text = "public final struct Pair {\n    let first: Int\n    let second: Int\n}";
    let container = parse_container(text, &source(text)).expect("parse should succeed");
    assert_eq!(container.modifiers, vec!["public", "final"]);
    assert_eq!(container.render(), text);
}

#[test]
fn test_accessor_list_round_trip() {
    let text = "var count: Int? {\n    get { load() }\n    set { save(newValue) }\n}";
    let binding = parse_binding(text, &source(text)).expect("parse should succeed");
    assert_eq!(binding.render(), text);
}

#[test]
fn test_computed_literal_round_trip() {
    let text = "var description: String {\n    \"Point(x: \\(x))\"\n}";
    let binding = parse_binding(text, &source(text)).expect("parse should succeed");
    assert_eq!(binding.render(), text);
}

#[test]
fn test_reparse_after_render_is_stable() {
    let text = "class Point {\n    var x: Int\n    var y: Int\n    func norm() -> Int { x * x + y * y }\n}";
    let first = parse_container(text, &source(text)).expect("parse should succeed");
    let rendered = first.render();
    let second = parse_container(&rendered, &source(&rendered)).expect("re-parse should succeed");
    assert_eq!(first.members.len(), second.members.len());
    assert_eq!(second.render(), rendered);
}

// ---
// String literals and interpolation
// ---

#[test]
fn test_string_literal_segments() {
    let text = "\"Hello, \\(name)!\"";
    let literal = parse_string_literal(text, &source(text)).expect("parse should succeed");
    assert_eq!(literal.segments.len(), 3);
    assert!(matches!(&literal.segments[0], Segment::Text(t) if t == "Hello, "));
    assert!(matches!(&literal.segments[1], Segment::Interpolation(e) if e.text == "name"));
    assert!(matches!(&literal.segments[2], Segment::Text(t) if t == "!"));
    assert_eq!(literal.render(), text);
}

#[test]
fn test_escaped_interpolation_opener_stays_text() {
    let text = "\"a \\\\(b)\"";
    let literal = parse_string_literal(text, &source(text)).expect("parse should succeed");
    assert_eq!(literal.segments.len(), 1);
    assert_eq!(literal.literal_text().as_deref(), Some("a \\(b)"));
    assert_eq!(literal.render(), text);
}

#[test]
fn test_unknown_escape_survives_the_round_trip() {
    let text = "\"path\\q\"";
    let literal = parse_string_literal(text, &source(text)).expect("parse should succeed");
    assert_eq!(literal.literal_text().as_deref(), Some("path\\q"));
    assert_eq!(literal.render(), text);
}

// ---
// Argument and site classification
// ---

#[test]
fn test_argument_classifies_literal_vs_expression() {
    let literal = parse_argument("\"lit\"", &source("\"lit\"")).expect("parse should succeed");
    assert!(literal.as_string_literal().is_some());

    let expr = parse_argument("x + y", &source("x + y")).expect("parse should succeed");
    assert_eq!(expr.as_expression().expect("expression").text, "x + y");
}

#[test]
fn test_site_classification() {
    let cases: Vec<(&str, fn(&Site) -> bool)> = vec![
        ("save()", |s| matches!(s, Site::Expression(_))),
        ("x + y", |s| matches!(s, Site::Expression(_))),
        ("class C {}", |s| matches!(s, Site::Container(_))),
        ("public final class C {}", |s| matches!(s, Site::Container(_))),
        ("var x: Int? = nil", |s| matches!(s, Site::Binding(_))),
        ("@backed var x: Int?", |s| matches!(s, Site::Binding(_))),
        ("let total = 0", |s| matches!(s, Site::Binding(_))),
    ];
    for (text, check) in cases {
        let site = parse_site(text, &source(text)).expect("parse should succeed");
        assert!(check(&site), "unexpected classification for: {}", text);
    }
}

#[test]
fn test_member_order_is_preserved() {
    let text = "class M {\n    func a() {}\n    var b: Int\n    func c() {}\n}";
    let container = parse_container(text, &source(text)).expect("parse should succeed");
    let shapes: Vec<&str> = container
        .members
        .iter()
        .map(|m| match m {
            Member::Variable(_) => "var",
            Member::Function(_) => "func",
        })
        .collect();
    assert_eq!(shapes, vec!["func", "var", "func"]);
}

// ---
// Malformed fragments
// ---

#[test]
fn test_unclosed_container_fails_with_parse_error() {
    let text = "class C {\n    var x: Int\n";
    let err = parse_container(text, &source(text)).unwrap_err();
    assert_eq!(err.code(), "graft::parse::malformed_syntax");
}

#[test]
fn test_empty_site_fails() {
    let err = parse_site("   ", &source("   ")).unwrap_err();
    assert_eq!(err.code(), "graft::parse::malformed_syntax");
}

#[test]
fn test_unterminated_literal_fails() {
    let text = "\"no closing quote";
    let err = parse_string_literal(text, &source(text)).unwrap_err();
    assert_eq!(err.code(), "graft::parse::malformed_syntax");
}
