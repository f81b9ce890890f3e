use serde::{Deserialize, Serialize};

/// 格式化选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatOptions {
    pub expression_spacing: bool, // {{ var }} 还是 {{var}}
    pub block_indentation: usize, // 每级缩进的空格数
    pub preserve_whitespace: bool, // 文本节点原样输出
    pub print_width: usize,       // 属性换行的宽度阈值
    pub tab_width: usize,         // 计算宽度时一个制表符占的列数
    pub use_tabs: bool,           // 使用制表符缩进
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            expression_spacing: true,
            block_indentation: 2,
            preserve_whitespace: false,
            print_width: 80,
            tab_width: 2,
            use_tabs: false,
        }
    }
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expression_spacing(mut self, expression_spacing: bool) -> Self {
        self.expression_spacing = expression_spacing;
        self
    }

    pub fn block_indentation(mut self, block_indentation: usize) -> Self {
        self.block_indentation = block_indentation;
        self
    }

    pub fn preserve_whitespace(mut self, preserve_whitespace: bool) -> Self {
        self.preserve_whitespace = preserve_whitespace;
        self
    }

    pub fn print_width(mut self, print_width: usize) -> Self {
        self.print_width = print_width;
        self
    }

    pub fn tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    pub fn use_tabs(mut self, use_tabs: bool) -> Self {
        self.use_tabs = use_tabs;
        self
    }

    /// One level of indentation.
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.block_indentation)
        }
    }

    /// Display width of `level` indentation units, used for line-width decisions.
    pub fn indent_width(&self, level: usize) -> usize {
        let unit = if self.use_tabs {
            self.tab_width
        } else {
            self.block_indentation
        };
        unit * level
    }
}
