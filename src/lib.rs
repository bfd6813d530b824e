//! Lexer and parser for a small expression language of `def`, `extern` and
//! numeric expressions. Produces an AST for a later code generator to consume.

pub mod ast;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod precedence;
