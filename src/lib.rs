//! Pants - front and middle end for a small expression-oriented language
//! with first-class delimited continuations

pub mod ast;
pub mod codegen;
pub mod errors;
pub mod parser;
pub mod pipeline;

pub use ast::{Position, Program};
pub use codegen::{cleanup, convert, transform};
pub use errors::{
    format_header, format_location, format_snippet, render_error, Colors, CompileError,
    ErrorConfig,
};
pub use parser::{parse, Parser, ParserError, ParserOptions};
pub use pipeline::{compile, CompileOptions, Pipeline};
