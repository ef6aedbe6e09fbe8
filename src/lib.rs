#![warn(missing_docs)]

//! Tools to run code with the F-IA language.
//!
//! F-IA is a small scripting language whose keywords are French.
//!
//! # Parsing
//!
//! Parsing of a string to an abstract syntax tree (AST) is done
//! with the [`lexer`] and [`parser`] modules.
//!
//! These modules provide:
//! - [`tokenize`][`lexer::tokenize`]: Processes strings into sequences of tokens.
//! - [`parse`][`parser::parse`]: Processes sequences of lexer tokens into an AST.
//! - [`ast`]: The components of the AST.
//!
//! # Running
//!
//! The AST is executed directly by a tree walker.
//! See the [`interpreter`] module for more info.
//!
//! This module provides:
//! - [`Interpreter`][`interpreter::Interpreter`]: A struct which reads files or strings and executes them.
//! - [`Repl`][`interpreter::Repl`]: A read-eval-print loop over the interpreter.
//! - [`runtime`][`interpreter::runtime`]: The runtime which executes the AST, including
//!   the module resolver used for `importer`/`depuis` statements.

// public API
pub mod lexer;
pub mod parser;
pub mod ast;

pub mod interpreter;
pub mod err;

pub use interpreter::{Interpreter, Repl};
