//! Syntax tree for the class-like declaration subset the engine transforms.
//!
//! Nodes keep the exact text they were parsed from, so rendering a parsed
//! node reproduces its input byte for byte. Synthesized nodes render through
//! the same code path, which is what makes the round-trip law hold for
//! everything the engine emits.

pub mod parser;

use std::fmt;

/// Represents a span in the fragment text a node was parsed from.
/// Synthesized nodes carry the default empty span.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Root abstraction: every concrete node shape is a variant.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Expression(Expression),
    StringLiteral(StringLiteral),
    Identifier(Identifier),
    TypeAnnotation(TypeAnnotation),
    Binding(VariableBinding),
    Function(FunctionSignature),
    Container(DeclarationContainer),
    Invocation(Invocation),
}

/// Arbitrary unparsed sub-syntax, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub text: String,
    pub span: Span,
}

/// A string literal as an ordered sequence of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub segments: Vec<Segment>,
    pub span: Span,
}

/// One segment of a string literal: a run of (escaped) literal text, or an
/// interpolated sub-expression rendered as `\(...)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Raw source form of the run; escapes stay exactly as written.
    Text(String),
    Interpolation(Expression),
}

/// A name token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// A type annotation: inner type name plus the is-optional wrapper flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub name: String,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKeyword {
    Var,
    Let,
}

impl BindingKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Let => "let",
        }
    }
}

/// A `var`/`let` declaration with everything the engine reads or writes:
/// attributes, modifiers, annotation, initializer, and accessor block.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub attributes: Vec<Invocation>,
    pub modifiers: Vec<String>,
    pub keyword: BindingKeyword,
    pub name: String,
    pub annotation: Option<TypeAnnotation>,
    pub initializer: Option<Expression>,
    pub accessors: Option<AccessorBlock>,
    pub span: Span,
}

/// The accessor block of a variable binding.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorBlock {
    /// Explicit accessors, one per line.
    Accessors(Vec<Accessor>),
    /// An implicit getter holding a single expression or string literal.
    Computed(Box<SyntaxNode>),
    /// A braced body kept uninterpreted, braces included.
    Verbatim(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub kind: AccessorKind,
    /// The braced accessor body, braces included.
    pub body: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Get,
    Set,
}

impl AccessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
        }
    }
}

/// A `func` declaration. `body` present/absent is meaningful: absence means
/// declaration only.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub attributes: Vec<Invocation>,
    pub modifiers: Vec<String>,
    pub name: String,
    /// Raw parameter list text between the parentheses.
    pub parameters: String,
    pub return_type: Option<TypeAnnotation>,
    /// Raw braced body, braces included.
    pub body: Option<Expression>,
    pub span: Span,
}

/// A member declaration inside a container. Insertion order is preserved and
/// semantically significant: generated output echoes source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Variable(VariableBinding),
    Function(FunctionSignature),
}

/// Ordered member declarations of a container.
pub type MemberList = Vec<Member>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKeyword {
    Class,
    Struct,
}

impl ContainerKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
        }
    }
}

/// A class-like declaration: attributes, modifiers, keyword, name, members.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationContainer {
    pub attributes: Vec<Invocation>,
    pub modifiers: Vec<String>,
    pub keyword: ContainerKeyword,
    pub name: String,
    pub members: MemberList,
    pub span: Span,
}

/// The marker character that introduced an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `@`, an attached request.
    At,
    /// `#`, a freestanding request.
    Hash,
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::At => "@",
            Self::Hash => "#",
        }
    }
}

/// A transformation request marker with its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub marker: Marker,
    pub name: String,
    pub arguments: Vec<SyntaxNode>,
    pub span: Span,
}

/// The declaration a request is attached to, as the driver hands it to a
/// handler. Handlers borrow the site; they never own or mutate it.
#[derive(Debug, Clone, PartialEq)]
pub enum Site {
    Expression(Expression),
    Container(DeclarationContainer),
    Binding(VariableBinding),
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

impl Expression {
    /// A synthesized expression; the text renders verbatim.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: Span::default(),
        }
    }
}

impl StringLiteral {
    /// A literal with no interpolation whose cooked text is `text`.
    /// The text is escaped into source form.
    pub fn plain(text: &str) -> Self {
        Self {
            segments: vec![Segment::Text(escape_text(text))],
            span: Span::default(),
        }
    }

    /// The literal's cooked text, or absent if any segment interpolates.
    pub fn literal_text(&self) -> Option<String> {
        let mut cooked = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(raw) => cooked.push_str(&unescape_text(raw)),
                Segment::Interpolation(_) => return None,
            }
        }
        Some(cooked)
    }
}

impl Invocation {
    /// A synthesized `@name` attribute with no arguments.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            marker: Marker::At,
            name: name.into(),
            arguments: Vec::new(),
            span: Span::default(),
        }
    }
}

// ============================================================================
// TYPED ACCESSORS - absence is a normal, checked condition
// ============================================================================

impl SyntaxNode {
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Self::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn as_string_literal(&self) -> Option<&StringLiteral> {
        match self {
            Self::StringLiteral(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&DeclarationContainer> {
        match self {
            Self::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&VariableBinding> {
        match self {
            Self::Binding(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Expression(expression) => expression.span,
            Self::StringLiteral(literal) => literal.span,
            Self::Identifier(identifier) => identifier.span,
            Self::TypeAnnotation(annotation) => annotation.span,
            Self::Binding(binding) => binding.span,
            Self::Function(function) => function.span,
            Self::Container(container) => container.span,
            Self::Invocation(invocation) => invocation.span,
        }
    }

    /// Returns the node shape as a string (for diagnostics and messages).
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Expression(_) => "expression",
            Self::StringLiteral(_) => "string literal",
            Self::Identifier(_) => "identifier",
            Self::TypeAnnotation(_) => "type annotation",
            Self::Binding(_) => "variable binding",
            Self::Function(_) => "function signature",
            Self::Container(_) => "declaration container",
            Self::Invocation(_) => "invocation",
        }
    }
}

impl DeclarationContainer {
    /// Variable members in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = &VariableBinding> {
        self.members.iter().filter_map(|member| match member {
            Member::Variable(binding) => Some(binding),
            Member::Function(_) => None,
        })
    }

    /// Function members in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionSignature> {
        self.members.iter().filter_map(|member| match member {
            Member::Function(function) => Some(function),
            Member::Variable(_) => None,
        })
    }
}

impl Site {
    pub fn as_container(&self) -> Option<&DeclarationContainer> {
        match self {
            Self::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn as_binding(&self) -> Option<&VariableBinding> {
        match self {
            Self::Binding(binding) => Some(binding),
            _ => None,
        }
    }

    /// Describes the site shape for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Expression(_) => "an expression",
            Self::Container(_) => "a class-like declaration",
            Self::Binding(_) => "a variable binding",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Expression(expression) => expression.span,
            Self::Container(container) => container.span,
            Self::Binding(binding) => binding.span,
        }
    }
}

// ============================================================================
// RENDERING - the unparse side of the round-trip law
// ============================================================================

const INDENT: &str = "    ";

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

impl SyntaxNode {
    /// Renders the node to source text at the top level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        match self {
            Self::Expression(expression) => out.push_str(&expression.text),
            Self::StringLiteral(literal) => literal.render_into(out),
            Self::Identifier(identifier) => out.push_str(&identifier.name),
            Self::TypeAnnotation(annotation) => annotation.render_into(out),
            Self::Binding(binding) => binding.render_into(out, indent),
            Self::Function(function) => function.render_into(out, indent),
            Self::Container(container) => container.render_into(out, indent),
            Self::Invocation(invocation) => invocation.render_into(out),
        }
    }
}

impl StringLiteral {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push('"');
        for segment in &self.segments {
            match segment {
                Segment::Text(raw) => out.push_str(raw),
                Segment::Interpolation(expression) => {
                    out.push_str("\\(");
                    out.push_str(&expression.text);
                    out.push(')');
                }
            }
        }
        out.push('"');
    }
}

impl TypeAnnotation {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.name);
        if self.optional {
            out.push('?');
        }
    }
}

impl Invocation {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(self.marker.as_str());
        out.push_str(&self.name);
        if !self.arguments.is_empty() {
            out.push('(');
            for (index, argument) in self.arguments.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                argument.render_into(out, 0);
            }
            out.push(')');
        }
    }
}

impl Accessor {
    /// Renders the accessor on one line, e.g. `get { ... }`.
    pub fn render(&self) -> String {
        format!("{} {}", self.kind.as_str(), self.body.text)
    }
}

impl AccessorBlock {
    /// Appends the block after a binding head. Continuation lines use
    /// `indent`; the closing brace sits at the binding's own level.
    fn render_into(&self, out: &mut String, indent: usize) {
        match self {
            Self::Verbatim(body) => {
                out.push(' ');
                out.push_str(&body.text);
            }
            Self::Computed(value) => {
                out.push_str(" {\n");
                push_indent(out, indent + 1);
                value.render_into(out, indent + 1);
                out.push('\n');
                push_indent(out, indent);
                out.push('}');
            }
            Self::Accessors(accessors) => {
                out.push_str(" {\n");
                for accessor in accessors {
                    push_indent(out, indent + 1);
                    out.push_str(&accessor.render());
                    out.push('\n');
                }
                push_indent(out, indent);
                out.push('}');
            }
        }
    }
}

impl VariableBinding {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        for attribute in &self.attributes {
            attribute.render_into(out);
            out.push(' ');
        }
        for modifier in &self.modifiers {
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str(self.keyword.as_str());
        out.push(' ');
        out.push_str(&self.name);
        if let Some(annotation) = &self.annotation {
            out.push_str(": ");
            annotation.render_into(out);
        }
        if let Some(initializer) = &self.initializer {
            out.push_str(" = ");
            out.push_str(&initializer.text);
        }
        if let Some(accessors) = &self.accessors {
            accessors.render_into(out, indent);
        }
    }
}

impl FunctionSignature {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, _indent: usize) {
        for attribute in &self.attributes {
            attribute.render_into(out);
            out.push(' ');
        }
        for modifier in &self.modifiers {
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str("func ");
        out.push_str(&self.name);
        out.push('(');
        out.push_str(&self.parameters);
        out.push(')');
        if let Some(return_type) = &self.return_type {
            out.push_str(" -> ");
            return_type.render_into(out);
        }
        if let Some(body) = &self.body {
            out.push(' ');
            out.push_str(&body.text);
        }
    }
}

impl Member {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        match self {
            Self::Variable(binding) => binding.render_into(out, indent),
            Self::Function(function) => function.render_into(out, indent),
        }
    }
}

impl DeclarationContainer {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        for attribute in &self.attributes {
            attribute.render_into(out);
            out.push('\n');
            push_indent(out, indent);
        }
        for modifier in &self.modifiers {
            out.push_str(modifier);
            out.push(' ');
        }
        out.push_str(self.keyword.as_str());
        out.push(' ');
        out.push_str(&self.name);
        out.push_str(" {");
        if self.members.is_empty() {
            out.push('}');
            return;
        }
        out.push('\n');
        for member in &self.members {
            push_indent(out, indent + 1);
            member.render_into(out, indent + 1);
            out.push('\n');
        }
        push_indent(out, indent);
        out.push('}');
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl fmt::Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

// ============================================================================
// ESCAPING
// ============================================================================

/// Escapes raw text into string-literal source form. An embedded `\(` comes
/// out as `\\(`, so captured interpolation syntax stays uninterpreted.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cooks the raw source form of a text run. Unknown escapes are kept as
/// written.
pub fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed_binding(name: &str, type_name: &str, optional: bool) -> VariableBinding {
        VariableBinding {
            attributes: vec![],
            modifiers: vec![],
            keyword: BindingKeyword::Var,
            name: name.to_string(),
            annotation: Some(TypeAnnotation {
                name: type_name.to_string(),
                optional,
                span: Span::default(),
            }),
            initializer: None,
            accessors: None,
            span: Span::default(),
        }
    }

    #[test]
    fn escape_round_trips_cooked_text() {
        let cooked = "say \"hi\"\\now";
        assert_eq!(unescape_text(&escape_text(cooked)), cooked);
    }

    #[test]
    fn plain_literal_escapes_interpolation_opener() {
        let literal = StringLiteral::plain("Hello, \\(name)");
        assert_eq!(literal.render(), "\"Hello, \\\\(name)\"");
        assert_eq!(literal.literal_text().as_deref(), Some("Hello, \\(name)"));
    }

    #[test]
    fn interpolated_literal_has_no_literal_text() {
        let literal = StringLiteral {
            segments: vec![
                Segment::Text("Hello, ".into()),
                Segment::Interpolation(Expression::new("name")),
            ],
            span: Span::default(),
        };
        assert_eq!(literal.render(), "\"Hello, \\(name)\"");
        assert_eq!(literal.literal_text(), None);
    }

    #[test]
    fn container_renders_members_indented() {
        let container = DeclarationContainer {
            attributes: vec![],
            modifiers: vec![],
            keyword: ContainerKeyword::Class,
            name: "Point".into(),
            members: vec![
                Member::Variable(typed_binding("x", "Int", false)),
                Member::Function(FunctionSignature {
                    attributes: vec![],
                    modifiers: vec![],
                    name: "norm".into(),
                    parameters: String::new(),
                    return_type: Some(TypeAnnotation {
                        name: "Int".into(),
                        optional: false,
                        span: Span::default(),
                    }),
                    body: Some(Expression::new("{}")),
                    span: Span::default(),
                }),
            ],
            span: Span::default(),
        };
        assert_eq!(
            container.render(),
            "class Point {\n    var x: Int\n    func norm() -> Int {}\n}"
        );
    }

    #[test]
    fn empty_container_renders_closed_braces() {
        let container = DeclarationContainer {
            attributes: vec![],
            modifiers: vec![],
            keyword: ContainerKeyword::Struct,
            name: "Unit".into(),
            members: vec![],
            span: Span::default(),
        };
        assert_eq!(container.render(), "struct Unit {}");
    }

    #[test]
    fn accessor_block_renders_one_accessor_per_line() {
        let mut binding = typed_binding("count", "Int", true);
        binding.attributes.push(Invocation::attribute("backed"));
        binding.accessors = Some(AccessorBlock::Accessors(vec![
            Accessor {
                kind: AccessorKind::Get,
                body: Expression::new("{ store(\"count\") }"),
            },
            Accessor {
                kind: AccessorKind::Set,
                body: Expression::new("{ put(newValue) }"),
            },
        ]));
        assert_eq!(
            binding.render(),
            "@backed var count: Int? {\n    get { store(\"count\") }\n    set { put(newValue) }\n}"
        );
    }
}
