//! Rill CLI - run Rill scripts from the command line.
//!
//! The binary is a thin host around [`rill_engine::Engine`]: it builds an
//! engine, registers a small set of console natives (`print`,
//! `console.log`), and runs a file or an inline source string. Script
//! failures print the engine's diagnostic (cause plus scope dump) to
//! stderr.

use std::any::Any;
use std::fs;
use std::rc::Rc;

use rill_engine::{Engine, NativeError, NodeRef, ScriptError};
use tracing::debug;

/// Exit code for script failures (lex, parse, runtime).
pub const EXIT_SCRIPT_ERROR: i32 = 1;

/// Exit code for host failures (unreadable file).
pub const EXIT_HOST_ERROR: i32 = 2;

fn native_print(frame: &NodeRef, _userdata: Option<&Rc<dyn Any>>) -> Result<(), NativeError> {
    let text = frame
        .find_child("msg")
        .map(|msg| msg.as_string())
        .unwrap_or_default();
    println!("{text}");
    Ok(())
}

/// Build an engine with the CLI's console natives registered.
pub fn build_engine() -> Result<Engine, ScriptError> {
    let engine = Engine::new();
    engine.add_native("function print(msg)", native_print, None)?;
    engine.add_native("function console.log(msg)", native_print, None)?;
    debug!("console natives registered");
    Ok(engine)
}

/// Run `source` in a fresh engine, reporting failures to stderr.
/// Returns a process exit code.
pub fn run_source(source: &str) -> i32 {
    let engine = match build_engine() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {err}");
            return EXIT_HOST_ERROR;
        }
    };
    match engine.execute(source) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            EXIT_SCRIPT_ERROR
        }
    }
}

/// Run the script file at `path`. Returns a process exit code.
pub fn run_file(path: &str) -> i32 {
    match fs::read_to_string(path) {
        Ok(source) => run_source(&source),
        Err(err) => {
            eprintln!("error: cannot read `{path}`: {err}");
            EXIT_HOST_ERROR
        }
    }
}
