mod assembler;
pub mod ast;
pub mod engine;
mod parser;
mod printer;
mod scanner;
