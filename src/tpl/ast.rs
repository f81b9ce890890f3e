/// Byte offsets into the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// `-` markers written directly inside a construct's delimiters, e.g. `{{- name -}}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespaceControl {
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub children: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(Text),
    Expression(Expression),
    Statement(Statement),
    Comment(Comment),
    Block(Block),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Element(e) => e.span,
            Node::Text(t) => t.span,
            Node::Expression(e) => e.span,
            Node::Statement(s) => s.span,
            Node::Comment(c) => c.span,
            Node::Block(b) => b.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag_name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub expression: String,
    pub filters: Vec<String>,
    pub trim: WhitespaceControl,
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub keyword: String,
    pub argument: Option<String>,
    /// The trimmed statement body, keyword included, exactly as written.
    pub body: String,
    pub trim: WhitespaceControl,
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub content: String,
    pub trim: WhitespaceControl,
    pub raw: String,
    pub span: Span,
}

/// A block statement paired with its closer, owning everything between them.
///
/// `name` is only recorded for labeled `{% block name %}` blocks; `argument`
/// keeps the rest of the opening statement for every keyword (`if cond`,
/// `for x in xs`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub keyword: String,
    pub name: Option<String>,
    pub argument: Option<String>,
    pub children: Vec<Node>,
    pub open_trim: WhitespaceControl,
    pub close_trim: WhitespaceControl,
    /// Raw source of the opening statement.
    pub raw: String,
    pub span: Span,
}
