//! Runs programs.
//!
//! [`Interpreter`] drives the whole pipeline over one source: lex,
//! parse, run. [`Repl`] keeps a context alive across lines for
//! interactive use. Everything they build on is exposed through
//! [`runtime`] for embedders who need finer control (hooked IO,
//! a machine-learning backend, resolver sharing).

pub mod runtime;
pub mod repl;

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::ast;
use crate::lexer::{self, token::FullToken};
use crate::parser;

use runtime::{RtContext, Value};
pub use repl::Repl;

/// A script and the means to run it.
///
/// Errors at every stage come back rendered against the source,
/// pointers included.
pub struct Interpreter {
    source: String,
    path: Option<PathBuf>
}

impl Interpreter {
    /// Interpret source held in memory.
    pub fn from_string(source: impl Into<String>) -> Self {
        Self { source: source.into(), path: None }
    }

    /// Interpret a script file. Relative imports in the script
    /// resolve against the file's directory.
    pub fn from_file(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let source = fs::read_to_string(&path)?;
        Ok(Self { source, path: Some(path) })
    }

    /// Tokenize the source.
    pub fn lex(&self) -> Result<Vec<FullToken>, String> {
        lexer::tokenize(&self.source)
            .map_err(|e| e.full_msg(&self.source))
    }

    /// Parse the source.
    pub fn parse(&self) -> Result<ast::Program, String> {
        let tokens = self.lex()?;
        parser::parse(tokens)
            .map_err(|e| e.full_msg(&self.source))
    }

    /// Run the source to completion, producing the value of its
    /// last statement.
    pub fn run(&self) -> Result<Value, String> {
        let prog = self.parse()?;

        let mut ctx = match &self.path {
            Some(p) => RtContext::for_file(p.clone()),
            None => RtContext::new(),
        };
        ctx.run_program(&prog)
            .map_err(|e| e.full_msg(&self.source))
    }
}
