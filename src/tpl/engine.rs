use crate::error::FormatError;
use crate::models::format_options::FormatOptions;
use crate::tpl::assembler::assemble;
use crate::tpl::ast::Root;
use crate::tpl::printer::Printer;
use std::io::Read;
use tracing::debug;

/// 解析模板，返回语法树
pub fn parse_template(source: &str) -> Root {
    let root = assemble(source);
    debug!(
        "parsed {} bytes into {} top-level nodes",
        source.len(),
        root.children.len()
    );
    root
}

/// 将语法树输出为格式化后的文本
pub fn print_template(root: &Root, options: &FormatOptions) -> String {
    Printer::new(options).print_root(root)
}

/// Parses and re-prints `source` in one go.
pub fn format_template(source: &str, options: &FormatOptions) -> String {
    print_template(&parse_template(source), options)
}

/// Reads a whole template from `reader` and formats it.
pub fn format_reader<R: Read>(mut reader: R, options: &FormatOptions) -> Result<String, FormatError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let source = String::from_utf8(bytes)?;
    Ok(format_template(&source, options))
}
