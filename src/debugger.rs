//! Interactive debugger entered at each break marker.
//!
//! Commands are matched by prefix, so `s`, `st` and `step` all step:
//!
//! | command            | effect                                              |
//! |--------------------|-----------------------------------------------------|
//! | `step`             | execute one core instruction                        |
//! | `quit`             | jump to the end of the program                      |
//! | `continue`         | leave the debugger and resume execution             |
//! | `memory [address]` | dump memory around the data pointer or a hex address |
//!
//! An empty line repeats the previous command.

use std::mem::size_of;

use nu_ansi_term::Style;

use crate::config::{DebuggerLayout, Palette, MAX_CONTEXT};
use crate::interpreter::{Interpreter, InterpreterError};
use crate::tape::Tape;

/// A parsed debugger command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Step,
    Quit,
    Continue,
    /// Dump memory, centered on the address if one was given.
    Memory(Option<usize>),
}

/// Problems with a single command line. These never end the session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("No command given")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Unexpected arg: {0}")]
    UnexpectedArg(String),

    #[error("Invalid address: {0} (too long)")]
    AddressTooLong(String),

    #[error("Invalid hex digit: {0}")]
    InvalidHexDigit(char),
}

impl Command {
    /// Tokenize `line` on whitespace and match the first token as a prefix
    /// of a command name.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = tokenize(line);
        let Some(name) = tokens.next() else {
            return Err(CommandError::Empty);
        };

        let command = if "step".starts_with(name) {
            Command::Step
        } else if "quit".starts_with(name) {
            Command::Quit
        } else if "continue".starts_with(name) {
            Command::Continue
        } else if "memory".starts_with(name) {
            let address = tokens.next();
            expect_no_more(&mut tokens)?;
            return Ok(Command::Memory(address.map(parse_hex_address).transpose()?));
        } else {
            return Err(CommandError::Unknown(name.to_string()));
        };

        expect_no_more(&mut tokens)?;
        Ok(command)
    }
}

fn tokenize(line: &str) -> impl Iterator<Item = &str> {
    line.split([' ', '\t', '\r', '\n']).filter(|t| !t.is_empty())
}

fn expect_no_more<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<(), CommandError> {
    match tokens.next() {
        Some(extra) => Err(CommandError::UnexpectedArg(extra.to_string())),
        None => Ok(()),
    }
}

/// Parse a case-insensitive hex address of at most pointer-width digits.
pub fn parse_hex_address(text: &str) -> Result<usize, CommandError> {
    if text.len() > 2 * size_of::<usize>() {
        return Err(CommandError::AddressTooLong(text.to_string()));
    }
    text.chars().try_fold(0usize, |acc, c| {
        let digit = c.to_digit(16).ok_or(CommandError::InvalidHexDigit(c))?;
        Ok((acc << 4) | digit as usize)
    })
}

/// Debugger state that outlives a single break: styles, geometry and the
/// last command line (repeated on empty input).
#[derive(Debug, Clone, Default)]
pub struct Debugger {
    palette: Palette,
    layout: DebuggerLayout,
    previous: String,
}

impl Debugger {
    pub fn new(palette: Palette, layout: DebuggerLayout) -> Self {
        Self { palette, layout, previous: String::new() }
    }

    /// Run the command loop until `continue`, `quit`, the end of the program
    /// or the end of the input stream.
    pub fn session(&mut self, vm: &mut Interpreter) -> Result<(), InterpreterError> {
        log::debug!("debugger entered at instruction {}", vm.ip());

        while !vm.is_finished() {
            let Some(line) = self.next_line(vm)? else {
                log::debug!("debugger input closed, resuming");
                vm.write_diagnostics("\n")?;
                return Ok(());
            };

            match Command::parse(&line) {
                Ok(Command::Step) => {
                    if !vm.step_core()? {
                        vm.skip();
                    }
                }
                Ok(Command::Quit) => vm.finish(),
                Ok(Command::Continue) => {
                    log::debug!("debugger left at instruction {}", vm.ip());
                    return Ok(());
                }
                Ok(Command::Memory(focus)) => {
                    let dump = render_memory(vm.tape(), vm.data_pointer(), focus, &self.palette, &self.layout);
                    vm.write_diagnostics(&dump)?;
                }
                Err(err) => vm.write_diagnostics(&format!("{err}\n"))?,
            }
        }

        Ok(())
    }

    /// Prompt until a non-empty line arrives, or an empty one can repeat the
    /// previous command.
    fn next_line(&mut self, vm: &mut Interpreter) -> Result<Option<String>, InterpreterError> {
        loop {
            let cell = vm.tape().get(vm.data_pointer());
            let prompt = render_prompt(vm.code(), vm.ip(), cell, &self.palette, self.layout.context);
            vm.write_diagnostics(&prompt)?;

            let Some(line) = vm.read_command_line()? else {
                return Ok(None);
            };
            if tokenize(&line).next().is_some() {
                self.previous = line.clone();
                return Ok(Some(line));
            }
            if tokenize(&self.previous).next().is_some() {
                return Ok(Some(self.previous.clone()));
            }
        }
    }
}

/// Render `(<source window>) ` with the instruction under `ip` highlighted.
///
/// Source bytes are echoed as they are, so non-ASCII text survives intact.
/// A `[` that will skip its loop (cell is 0) or a `]` that will jump back
/// (cell is nonzero) uses the `skipped_branch` style.
pub fn render_prompt(code: &[u8], ip: usize, cell: u8, palette: &Palette, context: usize) -> Vec<u8> {
    let context = context.min(MAX_CONTEXT);
    let start = ip.saturating_sub(context);
    let end = start.saturating_add(context.saturating_mul(2).saturating_add(1));

    let mut out = vec![b'('];
    for i in start..end {
        match code.get(i) {
            None => out.push(b' '),
            Some(&b) if i == ip => {
                let jumps = (b == b'[' && cell == 0) || (b == b']' && cell != 0);
                let style = if jumps { palette.skipped_branch } else { palette.instruction };
                out.extend_from_slice(style.prefix().to_string().as_bytes());
                out.push(b);
                out.extend_from_slice(style.suffix().to_string().as_bytes());
            }
            Some(&b) => out.push(b),
        }
    }
    out.extend_from_slice(b") ");
    out
}

/// Render a hex/ASCII dump around `focus` (or the data pointer when `None`).
///
/// Rows look like `08 | 00 01 … | ..`, prefixed by their base address.
pub fn render_memory(
    tape: &Tape,
    dp: usize,
    focus: Option<usize>,
    palette: &Palette,
    layout: &DebuggerLayout,
) -> String {
    let layout = layout.clamped();
    let width = layout.row_width;
    let center = focus.unwrap_or(dp);
    let focus_row = center / width * width;
    let span = layout.memory_rows.saturating_mul(width);
    let first = focus_row.saturating_sub(span);
    let last = first.saturating_add(span.saturating_mul(2));
    let digits = hex_len(last);

    let style_for = |addr: usize| {
        let mut style = Style::new();
        if addr == dp {
            style = palette.data_pointer;
        }
        if focus == Some(addr) {
            style = layer(style, palette.focus);
        }
        style
    };

    let mut out = String::new();
    let mut base = first;
    loop {
        let cells: Vec<usize> = (0..width).filter_map(|i| base.checked_add(i)).collect();

        out.push_str(&format!("{base:0digits$x} |"));
        for &addr in &cells {
            let text = format!("{:02x}", tape.get(addr));
            out.push(' ');
            out.push_str(&style_for(addr).paint(text).to_string());
        }

        out.push_str(" | ");
        for &addr in &cells {
            let byte = tape.get(addr);
            let ch = if (0x20..=0x7e).contains(&byte) { byte as char } else { '.' };
            out.push_str(&style_for(addr).paint(ch.to_string()).to_string());
        }
        out.push('\n');

        match base.checked_add(width) {
            Some(next) if next <= last => base = next,
            _ => break,
        }
    }
    out
}

/// Apply `over` on top of `base`: colors from `over` win, boldness accumulates.
fn layer(base: Style, over: Style) -> Style {
    Style {
        foreground: over.foreground.or(base.foreground),
        background: over.background.or(base.background),
        is_bold: base.is_bold || over.is_bold,
        ..over
    }
}

/// Number of hex digits needed to print `n` (at least one).
fn hex_len(mut n: usize) -> usize {
    let mut len = 1;
    while n >= 16 {
        n /= 16;
        len += 1;
    }
    len
}
