use std::io::{self, Write};
use crate::interpreter::InterpreterError;
use crate::preprocess::{PreprocessError, PreprocessWarning};

/// Pretty-print a runtime error with caret positioning into the program code.
/// If `program` is `Some("gamefuck")`, prefix messages with "gamefuck: ...".
pub fn print_interpreter_error(program: Option<&str>, code: &[u8], err: &InterpreterError) {
    let msg = match err {
        InterpreterError::PointerUnderflow { .. } => {
            "Runtime error: invalid cell access (< past origin)".to_string()
        }
        InterpreterError::UnmatchedBracket { kind, .. } => {
            format!("Runtime error: no matching bracket for {kind}")
        }
        InterpreterError::Io { source, .. } => format!("I/O error: {source}"),
    };
    print_error_with_context(&prefix_program(program, &msg), code, err.ip());
}

/// Print a fatal preprocessing error. Nothing has executed yet at this point.
pub fn print_preprocess_error(program: Option<&str>, err: &PreprocessError) {
    eprintln!("{}", prefix_program(program, &format!("Parse error: {err}")));
    let _ = io::stderr().flush();
}

pub fn print_warning(program: Option<&str>, warning: &PreprocessWarning) {
    eprintln!("{}", prefix_program(program, &format!("Warning: {warning}")));
    let _ = io::stderr().flush();
}

fn prefix_program(program: Option<&str>, msg: &str) -> String {
    match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg.to_string(),
    }
}

/// Print a concise error with instruction index and a caret context window.
pub fn print_error_with_context(prefix: &str, code: &[u8], pos: usize) {
    eprintln!("{prefix} at instruction {pos}");
    eprint!("{}", context_window(code, pos));
    let _ = io::stderr().flush();
}

/// Two lines: a short slice of `code` around `pos`, then a caret under `pos`.
fn context_window(code: &[u8], pos: usize) -> String {
    const WINDOW: usize = 32;

    let start = pos.saturating_sub(WINDOW);
    let end = pos.saturating_add(WINDOW + 1).min(code.len());
    let slice = String::from_utf8_lossy(&code[start.min(end)..end]);

    let underline = " ".repeat(pos.saturating_sub(start));
    format!("  {slice}\n  {underline}^\n")
}
