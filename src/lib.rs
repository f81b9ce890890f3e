pub mod error;
pub mod models;
pub mod tpl;

pub use error::FormatError;
pub use models::format_options::FormatOptions;
pub use tpl::ast::{
    Attribute, Block, Comment, Element, Expression, Node, Root, Span, Statement, Text,
    WhitespaceControl,
};
pub use tpl::engine::{format_reader, format_template, parse_template, print_template};
