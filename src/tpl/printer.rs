use crate::models::format_options::FormatOptions;
use crate::tpl::assembler::is_raw_text;
use crate::tpl::ast::{
    Attribute, Block, Comment, Element, Expression, Node, Root, Statement, Text,
    WhitespaceControl,
};
use crate::tpl::scanner::scan;

pub(crate) struct Printer<'a> {
    options: &'a FormatOptions,
    unit: String,
    sp: &'static str,
}

impl<'a> Printer<'a> {
    pub(crate) fn new(options: &'a FormatOptions) -> Self {
        Self {
            options,
            unit: options.indent_unit(),
            sp: if options.expression_spacing { " " } else { "" },
        }
    }

    pub(crate) fn print_root(&self, root: &Root) -> String {
        let outputs: Vec<String> = root
            .children
            .iter()
            .map(|child| self.print_node(child, 0, false))
            .filter_map(non_blank)
            .collect();

        let mut result = outputs.join("\n");
        if !result.is_empty() {
            result.push('\n');
        }
        result
    }

    /// `raw` is set inside script-like elements, whose text is printed as written.
    fn print_node(&self, node: &Node, level: usize, raw: bool) -> String {
        match node {
            Node::Element(e) => self.print_element(e, level),
            Node::Text(t) => self.print_text(t, raw),
            Node::Expression(e) => self.print_expression(e),
            Node::Statement(s) => self.print_statement(s),
            Node::Comment(c) => self.print_comment(c),
            Node::Block(b) => self.print_block(b, level, raw),
        }
    }

    fn indent(&self, level: usize) -> String {
        self.unit.repeat(level)
    }

    fn delimit(&self, open: &str, trim: WhitespaceControl, body: &str, close: &str) -> String {
        format!(
            "{}{}{}{}{}{}{}",
            open,
            if trim.left { "-" } else { "" },
            self.sp,
            body,
            self.sp,
            if trim.right { "-" } else { "" },
            close
        )
    }

    fn print_expression(&self, node: &Expression) -> String {
        let mut body = node.expression.clone();
        if !node.filters.is_empty() {
            body.push_str(" | ");
            body.push_str(&node.filters.join(" | "));
        }
        self.delimit("{{", node.trim, &body, "}}")
    }

    fn print_statement(&self, node: &Statement) -> String {
        self.delimit("{%", node.trim, &node.body, "%}")
    }

    fn print_comment(&self, node: &Comment) -> String {
        self.delimit("{#", node.trim, &node.content, "#}")
    }

    fn print_text(&self, node: &Text, raw: bool) -> String {
        if raw {
            node.value.clone()
        } else if self.options.preserve_whitespace {
            escape_text(&node.value)
        } else {
            escape_text(collapse_whitespace(&node.value).trim_ascii())
        }
    }

    fn print_block(&self, node: &Block, level: usize, raw: bool) -> String {
        let open = match &node.argument {
            Some(argument) => format!("{} {}", node.keyword, argument),
            None => node.keyword.clone(),
        };
        let close = match (node.keyword.as_str(), &node.name) {
            ("block", Some(name)) => format!("endblock {}", name),
            (keyword, _) => format!("end{}", keyword),
        };

        let mut result = self.delimit("{%", node.open_trim, &open, "%}");
        result.push('\n');
        result.push_str(&self.print_lines(&node.children, level + 1, raw));
        result.push_str(&self.indent(level));
        result.push_str(&self.delimit("{%", node.close_trim, &close, "%}"));
        result
    }

    /// Each non-blank child on its own line at `level`, newline-terminated.
    fn print_lines(&self, children: &[Node], level: usize, raw: bool) -> String {
        let indent = self.indent(level);
        let mut result = String::new();
        for child in children {
            if let Some(output) = non_blank(self.print_node(child, level, raw)) {
                result.push_str(&indent);
                result.push_str(&output);
                result.push('\n');
            }
        }
        result
    }

    fn print_element(&self, node: &Element, level: usize) -> String {
        let indent = self.indent(level);
        let child_indent = self.indent(level + 1);
        let raw = is_raw_text(&node.tag_name);
        let mut result = format!("<{}", node.tag_name);

        let attrs: Vec<String> = node.attributes.iter().map(print_attribute).collect();
        let wrapped = attrs.len() > 1 && {
            let attrs_width: usize = attrs.iter().map(|a| a.chars().count() + 1).sum();
            let line_width =
                self.options.indent_width(level) + result.chars().count() + attrs_width;
            line_width > self.options.print_width
        };
        if wrapped {
            for attr in &attrs {
                result.push('\n');
                result.push_str(&child_indent);
                result.push_str(attr);
            }
            result.push('\n');
            result.push_str(&indent);
        } else if !attrs.is_empty() {
            result.push(' ');
            result.push_str(&attrs.join(" "));
        }

        if node.self_closing {
            result.push_str(if wrapped { "/>" } else { " />" });
            return result;
        }
        result.push('>');

        let complex = node.children.iter().any(|child| match child {
            Node::Element(_) | Node::Block(_) => true,
            Node::Text(t) => t.value.contains('\n'),
            _ => false,
        });
        if complex {
            let lines = self.print_lines(&node.children, level + 1, raw);
            if !lines.is_empty() {
                result.push('\n');
                result.push_str(&lines);
                result.push_str(&indent);
            }
        } else {
            result.push_str(&self.print_inline(&node.children, level, raw));
        }

        result.push_str(&format!("</{}>", node.tag_name));
        result
    }

    /// Children of a simple element, joined on one line. Whitespace between
    /// inline items collapses to a single space instead of disappearing.
    fn print_inline(&self, children: &[Node], level: usize, raw: bool) -> String {
        let mut result = String::new();
        for child in children {
            match child {
                Node::Text(t) if !raw && !self.options.preserve_whitespace => {
                    result.push_str(&escape_text(&collapse_whitespace(&t.value)));
                }
                other => result.push_str(&self.print_node(other, level, raw)),
            }
        }
        if raw || self.options.preserve_whitespace {
            result
        } else {
            result.trim_ascii().to_string()
        }
    }
}

fn print_attribute(attr: &Attribute) -> String {
    let Some(value) = &attr.value else {
        return attr.name.clone();
    };
    if value.contains('"') && !value.contains('\'') {
        format!("{}='{}'", attr.name, escape_attribute(value, false))
    } else {
        format!("{}=\"{}\"", attr.name, escape_attribute(value, true))
    }
}

/// Re-escapes decoded text where the markup parser would otherwise read it
/// differently: `&` that could start a character reference, `<` that could
/// start a tag, and no-break spaces.
fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' if chars.peek().is_some_and(|&n| n.is_ascii_alphanumeric() || n == '#') => {
                result.push_str("&amp;")
            }
            '<' if chars
                .peek()
                .is_some_and(|&n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')) =>
            {
                result.push_str("&lt;")
            }
            '\u{a0}' => result.push_str("&nbsp;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escapes an attribute value outside its template constructs, which stay
/// byte-for-byte. `"` becomes `&quot;` when the value is double-quoted.
fn escape_attribute(value: &str, double_quoted: bool) -> String {
    let escape = |s: &str| {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '&' if chars.peek().is_some_and(|&n| n.is_ascii_alphanumeric() || n == '#') => {
                    out.push_str("&amp;")
                }
                '"' if double_quoted => out.push_str("&quot;"),
                '\u{a0}' => out.push_str("&nbsp;"),
                _ => out.push(c),
            }
        }
        out
    };

    let mut result = String::with_capacity(value.len());
    let mut last = 0;
    for construct in scan(value) {
        result.push_str(&escape(&value[last..construct.start]));
        result.push_str(construct.raw);
        last = construct.end;
    }
    result.push_str(&escape(&value[last..]));
    result
}

/// Collapses runs of HTML whitespace. No-break spaces are content and stay.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                result.push(' ');
            }
            in_space = true;
        } else {
            result.push(c);
            in_space = false;
        }
    }
    result
}

fn non_blank(output: String) -> Option<String> {
    let trimmed = output.trim_ascii();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
