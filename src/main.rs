//! The `fia` command: run a script file, or start a prompt.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use fia_lang::interpreter::runtime::RtContext;
use fia_lang::{lexer, parser, Repl};

#[derive(Parser)]
#[command(version, about = "Interprète du langage F-IA")]
struct Cli {
    /// Script à exécuter. Sans script, une session interactive démarre.
    script: Option<PathBuf>,

    /// Affiche les journaux de débogage
    #[arg(short, long)]
    verbose: bool
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto
    );

    match cli.script {
        Some(path) => run_script(&path),
        None => repl()
    }
}

/// Each stage of the pipeline gets its own exit code, so scripts
/// wrapping the interpreter can tell where a run failed.
fn run_script(path: &PathBuf) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return ExitCode::from(1);
        }
    };

    let tokens = match lexer::tokenize(&source) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e.full_msg(&source));
            return ExitCode::from(2);
        }
    };
    let prog = match parser::parse(tokens) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.full_msg(&source));
            return ExitCode::from(3);
        }
    };

    let mut ctx = RtContext::for_file(path);
    match ctx.run_program(&prog) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.full_msg(&source));
            ExitCode::from(4)
        }
    }
}

fn repl() -> ExitCode {
    println!("F-IA {}", env!("CARGO_PKG_VERSION"));
    let mut repl = Repl::new();

    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => repl.process_line(line.trim_end()),
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }
}
