use crate::tpl::ast::{Attribute, Element, Node, Root, Span, Text};
use crate::tpl::parser::build_blocks;
use crate::tpl::scanner::parse_text;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use tracing::trace;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// 解析 HTML 与模板语法混合的文档
///
/// Elements are built straight from the token stream with a plain stack of
/// open elements, so markup keeps the shape it has in the source: nothing is
/// moved, synthesized, or dropped the way an HTML5 tree builder would.
pub(crate) fn assemble(source: &str) -> Root {
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from(source));

    let mut tokenizer = Tokenizer::new(TreeBuilder::new(source), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    Root {
        children: tokenizer.sink.finish(),
        span: Span::new(0, source.len()),
    }
}

/// How the tokenizer must read the content of `tag`.
fn raw_kind(tag: &str) -> Option<RawKind> {
    match tag {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Elements whose text is never decoded and must be printed as written.
pub(crate) fn is_raw_text(tag: &str) -> bool {
    matches!(
        raw_kind(&tag.to_ascii_lowercase()),
        Some(RawKind::ScriptData | RawKind::Rawtext)
    )
}

/// Open elements that `tag` closes when one of them is innermost.
fn implied_closes(tag: &str) -> &'static [&'static str] {
    match tag {
        "tr" => &["tr", "th", "td"],
        "th" | "td" => &["th", "td"],
        "li" => &["li"],
        "option" => &["option"],
        "optgroup" => &["optgroup", "option"],
        "dd" | "dt" => &["dd", "dt"],
        "rt" | "rp" => &["rt", "rp"],
        "tbody" | "tfoot" => &["thead", "tbody"],
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "address" | "article" | "aside"
        | "blockquote" | "details" | "div" | "dl" | "fieldset" | "figcaption" | "figure"
        | "footer" | "form" | "header" | "hr" | "main" | "nav" | "ol" | "pre" | "section"
        | "table" | "ul" => &["p"],
        _ => &[],
    }
}

struct OpenElement {
    // 小写标签名，用于匹配结束标签
    name: String,
    tag_name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    start: usize,
}

struct TreeBuilder<'s> {
    source: &'s str,
    // 源文本中的前向游标，用于定位节点偏移
    cursor: usize,
    open: Vec<OpenElement>,
    top: Vec<Node>,
    text: String,
}

impl TokenSink for TreeBuilder<'_> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => self.text.push_str(&text),
            Token::NullCharacterToken => self.text.push('\u{fffd}'),
            Token::TagToken(tag) => {
                self.flush_text();
                return self.tag(tag);
            }
            Token::CommentToken(contents) => {
                self.flush_text();
                let node = self.markup_text(format!("<!--{}-->", contents));
                self.push(node);
            }
            Token::DoctypeToken(doctype) => {
                self.flush_text();
                let node = self.doctype_text(doctype.name.as_deref().unwrap_or("html"));
                self.push(node);
            }
            Token::ParseError(msg) => trace!("markup parse error: {}", msg),
            Token::EOFToken => self.flush_text(),
        }
        TokenSinkResult::Continue
    }

    fn end(&mut self) {
        self.flush_text();
    }
}

impl<'s> TreeBuilder<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            cursor: 0,
            open: Vec::new(),
            top: Vec::new(),
            text: String::new(),
        }
    }

    fn tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        match tag.kind {
            TagKind::StartTag => {
                self.close_implied(&name);
                let (start, open_tag) = self.locate_open_tag(&name);
                let written = scan_attributes(open_tag);
                let attributes = tag
                    .attrs
                    .iter()
                    .map(|attr| {
                        let local: &str = &attr.name.local;
                        let found = written.iter().find(|w| w.name.eq_ignore_ascii_case(local));
                        let value = if attr.value.is_empty() && !found.is_some_and(|w| w.assigned) {
                            None
                        } else {
                            Some(attr.value.to_string())
                        };
                        Attribute {
                            name: found.map_or_else(|| local.to_string(), |w| w.name.to_string()),
                            value,
                        }
                    })
                    .collect();
                let tag_name = written_tag_name(open_tag, &name);

                // `<path/>` closes itself inside svg and math only, as in HTML
                let foreign = self.open.iter().any(|e| e.name == "svg" || e.name == "math");
                if VOID_ELEMENTS.contains(&name.as_str()) || (tag.self_closing && foreign) {
                    self.push(Node::Element(Element {
                        tag_name,
                        attributes,
                        children: Vec::new(),
                        self_closing: true,
                        span: Span::new(start, self.cursor.max(start)),
                    }));
                    return TokenSinkResult::Continue;
                }

                let kind = raw_kind(&name);
                self.open.push(OpenElement {
                    name,
                    tag_name,
                    attributes,
                    children: Vec::new(),
                    start,
                });
                if let Some(kind) = kind {
                    return TokenSinkResult::RawData(kind);
                }
            }
            TagKind::EndTag => match self.open.iter().rposition(|e| e.name == name) {
                Some(pos) => {
                    let (close_start, close_end) = self.locate_close_tag(&name);
                    while self.open.len() > pos + 1 {
                        self.close_top(close_start);
                    }
                    self.close_top(close_end);
                }
                None => {
                    trace!("discarding unmatched </{}>", name);
                    self.locate_close_tag(&name);
                }
            },
        }
        TokenSinkResult::Continue
    }

    fn close_implied(&mut self, name: &str) {
        let closes = implied_closes(name);
        while self
            .open
            .last()
            .is_some_and(|e| closes.contains(&e.name.as_str()))
        {
            self.close_top(self.cursor);
        }
    }

    fn close_top(&mut self, end: usize) {
        let Some(open) = self.open.pop() else {
            return;
        };
        let element = Node::Element(Element {
            tag_name: open.tag_name,
            attributes: open.attributes,
            children: build_blocks(open.children),
            self_closing: false,
            span: Span::new(open.start, end.max(open.start)),
        });
        self.push(element);
    }

    fn push(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.top.push(node),
        }
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let base = self.locate_text(&text);
        for node in parse_text(&text, base) {
            self.push(node);
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_text();
        let end = self.source.len();
        while !self.open.is_empty() {
            self.close_top(end);
        }
        build_blocks(std::mem::take(&mut self.top))
    }

    fn markup_text(&mut self, value: String) -> Node {
        let start = match self.source[self.cursor..].find(&value) {
            Some(pos) => {
                let start = self.cursor + pos;
                self.cursor = start + value.len();
                start
            }
            None => self.cursor,
        };
        Node::Text(Text {
            span: Span::new(start, start + value.len()),
            value,
        })
    }

    fn doctype_text(&mut self, name: &str) -> Node {
        let source = self.source;
        let located = find_ignore_case(&source[self.cursor..], "<!doctype").and_then(|pos| {
            let start = self.cursor + pos;
            source[start..].find('>').map(|end| (start, start + end + 1))
        });
        match located {
            Some((start, end)) => {
                self.cursor = end;
                Node::Text(Text {
                    value: source[start..end].to_string(),
                    span: Span::new(start, end),
                })
            }
            None => Node::Text(Text {
                value: format!("<!DOCTYPE {}>", name),
                span: Span::new(self.cursor, self.cursor),
            }),
        }
    }

    /// Finds the text run at or after the cursor. Decoded entities may make
    /// it unlocatable, in which case the cursor position is used.
    fn locate_text(&mut self, text: &str) -> usize {
        match self.source[self.cursor..].find(text) {
            Some(pos) => {
                let start = self.cursor + pos;
                self.cursor = start + text.len();
                start
            }
            None => self.cursor,
        }
    }

    fn locate_open_tag(&mut self, tag: &str) -> (usize, &'s str) {
        let source = self.source;
        let Some(pos) = find_open_tag(&source[self.cursor..], tag) else {
            return (self.cursor, "");
        };
        let start = self.cursor + pos;
        let end = match find_tag_end(&source[start..]) {
            Some(end) => start + end + 1,
            None => source.len(),
        };
        self.cursor = end;
        (start, &source[start..end])
    }

    fn locate_close_tag(&mut self, tag: &str) -> (usize, usize) {
        let source = self.source;
        let needle = format!("</{}", tag);
        let Some(pos) = find_ignore_case(&source[self.cursor..], &needle) else {
            return (self.cursor, self.cursor);
        };
        let start = self.cursor + pos;
        self.cursor = match source[start..].find('>') {
            Some(end) => start + end + 1,
            None => source.len(),
        };
        (start, self.cursor)
    }
}

/// An attribute as spelled in the source start tag.
struct WrittenAttribute<'a> {
    name: &'a str,
    assigned: bool,
}

/// Attribute names of a raw start tag with their original case, and whether
/// each one is followed by `=`.
fn scan_attributes(open_tag: &str) -> Vec<WrittenAttribute<'_>> {
    let bytes = open_tag.as_bytes();
    let is_space = |b: u8| b.is_ascii_whitespace();
    let mut attrs = Vec::new();

    let mut i = 1;
    while i < bytes.len() && !is_space(bytes[i]) && !matches!(bytes[i], b'>' | b'/') {
        i += 1;
    }
    loop {
        while i < bytes.len() && (is_space(bytes[i]) || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            break;
        }
        let start = i;
        i += 1;
        while i < bytes.len() && !is_space(bytes[i]) && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        let name = &open_tag[start..i];
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        let assigned = bytes.get(i) == Some(&b'=');
        if assigned {
            i += 1;
            while i < bytes.len() && is_space(bytes[i]) {
                i += 1;
            }
            match bytes.get(i) {
                Some(&(quote @ (b'"' | b'\''))) => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        i += 1;
                    }
                    i += 1;
                }
                _ => {
                    while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'>' {
                        i += 1;
                    }
                }
            }
        }
        attrs.push(WrittenAttribute { name, assigned });
    }
    attrs
}

/// The tag name with the case it has in the source, e.g. `linearGradient`.
fn written_tag_name(open_tag: &str, name: &str) -> String {
    match open_tag.get(1..1 + name.len()) {
        Some(written) if written.eq_ignore_ascii_case(name) => written.to_string(),
        _ => name.to_string(),
    }
}

/// Position of `<tag` followed by a tag-name boundary, ignoring ASCII case.
fn find_open_tag(haystack: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{}", tag);
    let mut from = 0;
    while let Some(pos) = find_ignore_case(&haystack[from..], &needle) {
        let at = from + pos;
        let next = haystack.as_bytes().get(at + needle.len()).copied();
        if matches!(next, None | Some(b'>' | b'/')) || next.is_some_and(|c| c.is_ascii_whitespace()) {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// End of a start tag: the first `>` outside a quoted attribute value.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(e) => e,
            other => panic!("Expected Element, got {:?}", other),
        }
    }

    fn block(node: &Node) -> &crate::tpl::ast::Block {
        match node {
            Node::Block(b) => b,
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_document() {
        let root = assemble("");
        assert!(root.children.is_empty());
        assert_eq!(root.span, Span::new(0, 0));
    }

    #[test]
    fn test_no_wrappers_are_added() {
        let root = assemble("<div>{{ user.name }}</div>");
        assert_eq!(root.children.len(), 1);
        let div = element(&root.children[0]);
        assert_eq!(div.tag_name, "div");
        assert_eq!(div.span, Span::new(0, 26));
        match &div.children[0] {
            Node::Expression(e) => {
                assert_eq!(e.expression, "user.name");
                assert_eq!(e.span, Span::new(5, 20));
            }
            other => panic!("Expected Expression, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_wrappers_are_kept() {
        let root = assemble("<html><head><title>T</title></head><body><p>x</p></body></html>");
        assert_eq!(root.children.len(), 1);
        let html = element(&root.children[0]);
        assert_eq!(html.tag_name, "html");
        let tags: Vec<&str> = html
            .children
            .iter()
            .map(|n| element(n).tag_name.as_str())
            .collect();
        assert_eq!(tags, vec!["head", "body"]);
    }

    #[test]
    fn test_header_is_not_head() {
        let root = assemble("<header><h1>x</h1></header>");
        let header = element(&root.children[0]);
        assert_eq!(header.tag_name, "header");
        assert_eq!(header.span, Span::new(0, 27));
    }

    #[test]
    fn test_table_rows_stay_inside_loop() {
        let root = assemble("<table>{% for r in rows %}<tr><td>{{ r }}</td></tr>{% endfor %}</table>");
        assert_eq!(root.children.len(), 1);
        let table = element(&root.children[0]);
        assert_eq!(table.children.len(), 1);
        let for_block = block(&table.children[0]);
        assert_eq!(for_block.keyword, "for");
        let tr = element(&for_block.children[0]);
        assert_eq!(tr.tag_name, "tr");
        assert_eq!(element(&tr.children[0]).tag_name, "td");
    }

    #[test]
    fn test_table_parts_outside_table_are_kept() {
        let root = assemble("{% macro row(x) %}<tr><td>{{ x }}</td></tr>{% endmacro %}");
        let macro_block = block(&root.children[0]);
        let tr = element(&macro_block.children[0]);
        assert_eq!(tr.tag_name, "tr");
        let td = element(&tr.children[0]);
        assert_eq!(td.tag_name, "td");
        assert!(matches!(&td.children[0], Node::Expression(e) if e.expression == "x"));
    }

    #[test]
    fn test_unmatched_end_tag_is_dropped() {
        let root = assemble("<div>a</span></div>");
        let div = element(&root.children[0]);
        assert_eq!(div.children.len(), 1);
        assert!(matches!(&div.children[0], Node::Text(t) if t.value == "a"));
    }

    #[test]
    fn test_end_tag_closes_inner_elements() {
        let root = assemble("<div><span>a</div><p>b</p>");
        assert_eq!(root.children.len(), 2);
        let div = element(&root.children[0]);
        assert_eq!(element(&div.children[0]).tag_name, "span");
        assert_eq!(element(&root.children[1]).tag_name, "p");
    }

    #[test]
    fn test_implied_close_of_siblings() {
        let root = assemble("<ul><li>a<li>b</ul>");
        let ul = element(&root.children[0]);
        let tags: Vec<&str> = ul.children.iter().map(|n| element(n).tag_name.as_str()).collect();
        assert_eq!(tags, vec!["li", "li"]);
    }

    #[test]
    fn test_unclosed_elements_end_at_input_end() {
        let root = assemble("<div><p>x");
        let div = element(&root.children[0]);
        assert_eq!(div.span, Span::new(0, 9));
        assert_eq!(element(&div.children[0]).tag_name, "p");
    }

    #[test]
    fn test_script_content_is_raw() {
        let root = assemble("<script>if (a < b) { x(); }</script>");
        let script = element(&root.children[0]);
        assert!(matches!(&script.children[0], Node::Text(t) if t.value == "if (a < b) { x(); }"));
        assert!(is_raw_text("SCRIPT"));
        assert!(!is_raw_text("title"));
    }

    #[test]
    fn test_attributes_keep_order_and_values() {
        let root = assemble(r#"<div class="{{ css_class }}" data-id="{{ item.id }}">Content</div>"#);
        let div = element(&root.children[0]);
        assert_eq!(div.attributes.len(), 2);
        assert_eq!(div.attributes[0].name, "class");
        assert_eq!(div.attributes[0].value.as_deref(), Some("{{ css_class }}"));
        assert_eq!(div.attributes[1].name, "data-id");
    }

    #[test]
    fn test_valueless_attribute() {
        let root = assemble(r#"<input disabled value="" data-disabled="x">"#);
        let input = element(&root.children[0]);
        assert!(input.self_closing);
        assert_eq!(input.attributes[0].value, None);
        assert_eq!(input.attributes[1].value.as_deref(), Some(""));
        assert_eq!(input.attributes[2].value.as_deref(), Some("x"));
    }

    #[test]
    fn test_svg_keeps_case_and_self_closing() {
        let root = assemble(r#"<svg viewBox="0 0 10 10"><linearGradient id="g"/><path d="M0"/></svg>"#);
        let svg = element(&root.children[0]);
        assert_eq!(svg.attributes[0].name, "viewBox");
        let gradient = element(&svg.children[0]);
        assert_eq!(gradient.tag_name, "linearGradient");
        assert!(gradient.self_closing);
        assert!(element(&svg.children[1]).self_closing);
    }

    #[test]
    fn test_blocks_resolved_per_element() {
        let root = assemble("<ul>{% for item in items %}<li>{{ item }}</li>{% endfor %}</ul>");
        let ul = element(&root.children[0]);
        assert_eq!(ul.children.len(), 1);
        let for_block = block(&ul.children[0]);
        assert_eq!(for_block.keyword, "for");
        assert_eq!(element(&for_block.children[0]).tag_name, "li");
    }

    #[test]
    fn test_block_does_not_cross_element_boundary() {
        let root = assemble("{% if a %}<p>{% endif %}</p>");
        // the `endif` inside <p> has nothing to close at its own level
        let if_block = block(&root.children[0]);
        let p = element(&if_block.children[0]);
        assert!(matches!(&p.children[0], Node::Statement(s) if s.keyword == "endif"));
    }

    #[test]
    fn test_html_comment_and_doctype_become_text() {
        let root = assemble("<!DOCTYPE html>\n<!-- hi --><p>x</p>");
        match &root.children[0] {
            Node::Text(t) => {
                assert_eq!(t.value, "<!DOCTYPE html>");
                assert_eq!(t.span, Span::new(0, 15));
            }
            other => panic!("Expected Text, got {:?}", other),
        }
        assert!(root
            .children
            .iter()
            .any(|n| matches!(n, Node::Text(t) if t.value == "<!-- hi -->" && t.span == Span::new(16, 27))));
    }

    #[test]
    fn test_entities_are_decoded() {
        let root = assemble(r#"<p title="a &quot;b&quot;">&lt;div&gt;</p>"#);
        let p = element(&root.children[0]);
        assert_eq!(p.attributes[0].value.as_deref(), Some(r#"a "b""#));
        assert!(matches!(&p.children[0], Node::Text(t) if t.value == "<div>"));
    }

    #[test]
    fn test_find_tag_end_skips_quotes() {
        assert_eq!(find_tag_end(r#"<a title="x > y">"#), Some(16));
        assert_eq!(find_tag_end("<a"), None);
    }
}
