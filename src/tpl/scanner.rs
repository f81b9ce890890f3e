use crate::tpl::ast::{Comment, Expression, Node, Span, Statement, Text, WhitespaceControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConstructKind {
    Expression,
    Statement,
    Comment,
}

impl ConstructKind {
    fn from_open(c: u8) -> Option<Self> {
        match c {
            b'{' => Some(ConstructKind::Expression),
            b'%' => Some(ConstructKind::Statement),
            b'#' => Some(ConstructKind::Comment),
            _ => None,
        }
    }

    fn close(self) -> &'static str {
        match self {
            ConstructKind::Expression => "}}",
            ConstructKind::Statement => "%}",
            ConstructKind::Comment => "#}",
        }
    }
}

/// One `{{ }}`, `{% %}` or `{# #}` found in a text span. Offsets are relative to that span.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Construct<'a> {
    pub kind: ConstructKind,
    pub content: &'a str,
    pub raw: &'a str,
    pub trim: WhitespaceControl,
    pub start: usize,
    pub end: usize,
}

/// Finds every construct in `text` in one forward pass.
///
/// A construct runs from its opening delimiter to the first matching closer.
/// It is rejected (and left as plain text) when its trimmed content spans
/// several lines; scanning then resumes one byte after the rejected opener.
pub(crate) fn scan(text: &str) -> Vec<Construct<'_>> {
    let bytes = text.as_bytes();
    let mut constructs = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        let Some(kind) = bytes.get(start + 1).copied().and_then(ConstructKind::from_open) else {
            pos = start + 1;
            continue;
        };

        let inner_start = start + 2;
        let Some(close) = text[inner_start..].find(kind.close()) else {
            pos = start + 1;
            continue;
        };
        let inner = &text[inner_start..inner_start + close];
        if inner.trim().contains(['\n', '\r']) {
            pos = start + 1;
            continue;
        }

        let end = inner_start + close + 2;
        let (content, trim) = strip_whitespace_control(inner);
        constructs.push(Construct {
            kind,
            content,
            raw: &text[start..end],
            trim,
            start,
            end,
        });
        pos = end;
    }

    constructs
}

fn strip_whitespace_control(inner: &str) -> (&str, WhitespaceControl) {
    let mut trim = WhitespaceControl::default();
    let mut content = inner;
    if let Some(rest) = content.strip_prefix('-') {
        trim.left = true;
        content = rest;
    }
    if let Some(rest) = content.strip_suffix('-') {
        trim.right = true;
        content = rest;
    }
    (content.trim(), trim)
}

/// Turns a construct into its typed node, shifting offsets by `base`.
pub(crate) fn classify(construct: &Construct, base: usize) -> Node {
    let span = Span::new(base + construct.start, base + construct.end);
    let raw = construct.raw.to_string();
    match construct.kind {
        ConstructKind::Expression => {
            let mut parts = construct.content.split('|').map(str::trim);
            let expression = parts.next().unwrap_or_default().to_string();
            let filters = parts.map(str::to_string).collect();
            Node::Expression(Expression {
                expression,
                filters,
                trim: construct.trim,
                raw,
                span,
            })
        }
        ConstructKind::Statement => {
            let mut tokens = construct.content.split_whitespace();
            let keyword = tokens.next().unwrap_or_default().to_string();
            let rest: Vec<&str> = tokens.collect();
            let argument = if rest.is_empty() {
                None
            } else {
                Some(rest.join(" "))
            };
            Node::Statement(Statement {
                keyword,
                argument,
                body: construct.content.to_string(),
                trim: construct.trim,
                raw,
                span,
            })
        }
        ConstructKind::Comment => Node::Comment(Comment {
            content: construct.content.to_string(),
            trim: construct.trim,
            raw,
            span,
        }),
    }
}

/// Splits a text span into text and construct nodes, in source order.
///
/// Text between constructs is kept verbatim, even when blank.
pub(crate) fn parse_text(text: &str, base: usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut last_end = 0;

    for construct in scan(text) {
        if construct.start > last_end {
            nodes.push(text_node(&text[last_end..construct.start], base + last_end));
        }
        nodes.push(classify(&construct, base));
        last_end = construct.end;
    }

    if last_end < text.len() {
        nodes.push(text_node(&text[last_end..], base + last_end));
    }
    nodes
}

fn text_node(value: &str, start: usize) -> Node {
    Node::Text(Text {
        value: value.to_string(),
        span: Span::new(start, start + value.len()),
    })
}
