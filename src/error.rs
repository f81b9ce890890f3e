use thiserror::Error;

/// Represents errors that can occur at the edges of the formatter.
///
/// Parsing and printing themselves never fail; only reading the input can.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Encoding error: input is not valid UTF-8 ({0})")]
    Encoding(#[from] std::string::FromUtf8Error),
}
