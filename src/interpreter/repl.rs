//! The interactive session.

use std::io::Write;

use crate::lexer;
use crate::parser;

use super::runtime::{rtio, RtContext, Value};

/// The state of an interactive session.
///
/// Lines run against one persistent context, so declarations carry
/// from one line to the next. Errors are reported and the session
/// goes on.
pub struct Repl<'ctx> {
    ctx: RtContext<'ctx>,
    succ_last: bool
}

impl<'ctx> Repl<'ctx> {
    /// A session over the real stdin/stdout.
    pub fn new() -> Self {
        Self::with_io(rtio::IoHook::default())
    }

    /// A session whose programs run over the given IO hook.
    pub fn with_io(io: rtio::IoHook<'ctx>) -> Self {
        Self {
            ctx: RtContext::with_io(io),
            succ_last: true
        }
    }

    /// Whether the last processed line ran without errors.
    pub fn exec_successful(&self) -> bool {
        self.succ_last
    }

    /// Run one line of input. The value of the line, when not `nul`,
    /// is echoed back on the session's output.
    pub fn process_line(&mut self, line: &str) {
        macro_rules! consume_err {
            ($e:expr) => {{
                eprintln!("{}", $e.full_msg(line));
                self.succ_last = false;
                return;
            }}
        }
        self.succ_last = true;

        let tokens = match lexer::tokenize(line) {
            Ok(t) => t,
            Err(e) => consume_err!(e),
        };
        let prog = match parser::parse(tokens) {
            Ok(p) => p,
            Err(e) => consume_err!(e),
        };
        let value = match self.ctx.run_program(&prog) {
            Ok(v) => v,
            Err(e) => consume_err!(e),
        };

        if !matches!(value, Value::Null) {
            let _ = writeln!(self.ctx.io, "{}", value.repr());
        }
    }
}

impl Default for Repl<'_> {
    fn default() -> Self {
        Self::new()
    }
}
