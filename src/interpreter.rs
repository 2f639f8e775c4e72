//! The execution engine.
//!
//! The interpreter maintains:
//! - the preprocessed program code and an instruction pointer into it,
//! - a growable [`Tape`] and a data pointer into it,
//! - an optional embedded-input cursor (falls back to the input stream),
//! - the screen state and the [`DisplayPort`] it is presented through,
//! - the [`Debugger`] entered at each break marker.
//!
//! Each step tries three instruction sets in order: the core Brainfuck set
//! `+-<>.,[]`, the debugger set (`p`, `#`) and the screen set
//! (`rlud'`, `:`, `;`, `P`). Anything else is skipped.

use std::io::{self, BufRead, Write};

use crate::debugger::Debugger;
use crate::display::{Cursor, DisplayPort, FrameBuffer, HeadlessDisplay, Screen};
use crate::preprocess::{BracketKind, Program};
use crate::tape::Tape;

/// The character that suspends execution and opens the debugger.
pub const BREAK_MARKER: u8 = b'#';

/// Errors that stop execution.
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    /// `<` was executed with the data pointer already at cell 0.
    #[error("invalid cell access (< past origin) at instruction {ip}")]
    PointerUnderflow { ip: usize },

    /// A bracket scan ran off either end of the code.
    #[error("no matching bracket for {kind} at instruction {ip}")]
    UnmatchedBracket { ip: usize, kind: BracketKind },

    /// Reading input, writing output or presenting a frame failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io { ip: usize, #[source] source: io::Error },
}

impl InterpreterError {
    /// Instruction index the error was raised at.
    pub fn ip(&self) -> usize {
        match self {
            InterpreterError::PointerUnderflow { ip }
            | InterpreterError::UnmatchedBracket { ip, .. }
            | InterpreterError::Io { ip, .. } => *ip,
        }
    }
}

pub struct Interpreter {
    code: Vec<u8>,
    ip: usize,
    tape: Tape,
    dp: usize,
    embedded: Option<Vec<u8>>,
    embedded_pos: usize,
    input_eof: bool,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
    diagnostics: Box<dyn Write>,
    screen: Screen,
    display: Box<dyn DisplayPort>,
    debugger: Option<Debugger>,
}

impl Interpreter {
    /// Create an interpreter over process stdio with an unpaced headless display.
    pub fn new(program: Program) -> Self {
        let (code, embedded) = program.into_parts();
        Self {
            code,
            ip: 0,
            tape: Tape::new(),
            dp: 0,
            embedded,
            embedded_pos: 0,
            input_eof: false,
            input: Box::new(io::stdin().lock()),
            output: Box::new(io::stdout()),
            diagnostics: Box::new(io::stderr()),
            screen: Screen::default(),
            display: Box::new(HeadlessDisplay::unpaced()),
            debugger: Some(Debugger::default()),
        }
    }

    /// Stream read by `,` (when there is no embedded input) and by the debugger.
    pub fn with_input<R: BufRead + 'static>(mut self, input: R) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Stream `.` writes to.
    pub fn with_output<W: Write + 'static>(mut self, output: W) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Stream for debugger prompts, dumps, `p`/`P` prints.
    pub fn with_diagnostics<W: Write + 'static>(mut self, diagnostics: W) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    pub fn with_display<D: DisplayPort + 'static>(mut self, display: D) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_debugger(mut self, debugger: Debugger) -> Self {
        self.debugger = Some(debugger);
        self
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn data_pointer(&self) -> usize {
        self.dp
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn cursor(&self) -> Cursor {
        self.screen.cursor
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.screen.frame
    }

    /// True once the instruction pointer has reached the end of the code.
    pub fn is_finished(&self) -> bool {
        self.ip >= self.code.len()
    }

    /// Execute the program until completion.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        while !self.is_finished() {
            self.step()?;
        }
        Ok(())
    }

    /// Execute one instruction with full dispatch.
    pub fn step(&mut self) -> Result<(), InterpreterError> {
        if self.is_finished() {
            return Ok(());
        }
        if self.step_core()? || self.step_debug()? || self.step_screen()? {
            return Ok(());
        }
        // Not an instruction of any set: treat as a comment.
        self.ip += 1;
        Ok(())
    }

    /// Execute one instruction of the core set.
    ///
    /// Returns `Ok(false)` without moving the instruction pointer when the
    /// current character is not a core instruction.
    pub fn step_core(&mut self) -> Result<bool, InterpreterError> {
        let ip = self.ip;
        let Some(&op) = self.code.get(ip) else {
            return Ok(false);
        };

        match op {
            b'+' => {
                let cell = self.tape.cell_mut(self.dp);
                *cell = cell.wrapping_add(1);
            }
            b'-' => {
                let cell = self.tape.cell_mut(self.dp);
                *cell = cell.wrapping_sub(1);
            }
            b'<' => {
                if self.dp == 0 {
                    return Err(InterpreterError::PointerUnderflow { ip });
                }
                self.dp -= 1;
            }
            b'>' => {
                self.dp += 1;
            }
            b'.' => {
                let byte = self.tape.get(self.dp);
                self.output
                    .write_all(&[byte])
                    .and_then(|_| self.output.flush())
                    .map_err(|source| InterpreterError::Io { ip, source })?;
            }
            b',' => {
                let byte = self.read_input_byte().map_err(|source| InterpreterError::Io { ip, source })?;
                self.tape.set(self.dp, byte);
            }
            b'[' => {
                if self.tape.get(self.dp) == 0 {
                    self.ip = matching_close(&self.code, ip)
                        .ok_or(InterpreterError::UnmatchedBracket { ip, kind: BracketKind::Open })?;
                }
            }
            b']' => {
                if self.tape.get(self.dp) != 0 {
                    self.ip = matching_open(&self.code, ip)
                        .ok_or(InterpreterError::UnmatchedBracket { ip, kind: BracketKind::Close })?;
                }
            }
            _ => return Ok(false),
        }

        self.ip += 1;
        Ok(true)
    }

    fn step_debug(&mut self) -> Result<bool, InterpreterError> {
        let op = self.code.get(self.ip).copied();
        match op {
            Some(b'p') => {
                let cell = self.tape.get(self.dp);
                self.write_diagnostics(&format!("{cell:02x}\n"))?;
            }
            Some(BREAK_MARKER) => {
                self.write_diagnostics("\n")?;
                self.ip += 1;
                self.enter_debugger()?;
                return Ok(true);
            }
            _ => return Ok(false),
        }
        self.ip += 1;
        Ok(true)
    }

    fn step_screen(&mut self) -> Result<bool, InterpreterError> {
        let ip = self.ip;
        let Some(&op) = self.code.get(ip) else {
            return Ok(false);
        };

        match op {
            b'P' => {
                let Cursor { x, y } = self.screen.cursor;
                self.write_diagnostics(&format!("{x:02x} {y:02x}\n"))?;
            }
            b':' => {
                self.display
                    .present_frame(&self.screen.frame)
                    .map_err(|source| InterpreterError::Io { ip, source })?;
            }
            b';' => {
                let key = self.display.poll_last_key();
                self.tape.set(self.dp, key);
            }
            b'r' => self.screen.cursor.right(),
            b'l' => self.screen.cursor.left(),
            b'u' => self.screen.cursor.up(),
            b'd' => self.screen.cursor.down(),
            b'\'' => {
                let value = self.tape.get(self.dp);
                self.screen.paint(value);
            }
            _ => return Ok(false),
        }

        self.ip += 1;
        Ok(true)
    }

    fn enter_debugger(&mut self) -> Result<(), InterpreterError> {
        let mut debugger = self.debugger.take().unwrap_or_default();
        let result = debugger.session(self);
        self.debugger = Some(debugger);
        result
    }

    /// Read one byte for `,`. End of input, embedded or external, reads as 0.
    fn read_input_byte(&mut self) -> io::Result<u8> {
        if let Some(embedded) = &self.embedded {
            let byte = embedded.get(self.embedded_pos).copied();
            if byte.is_some() {
                self.embedded_pos += 1;
            }
            return Ok(byte.unwrap_or(0));
        }

        if self.input_eof {
            return Ok(0);
        }

        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => {
                    self.input_eof = true;
                    return Ok(0);
                }
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read one line of debugger input. `None` at end of stream.
    pub(crate) fn read_command_line(&mut self) -> Result<Option<String>, InterpreterError> {
        let mut line = Vec::new();
        let read = self
            .input
            .read_until(b'\n', &mut line)
            .map_err(|source| InterpreterError::Io { ip: self.ip, source })?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    pub(crate) fn write_diagnostics(&mut self, text: impl AsRef<[u8]>) -> Result<(), InterpreterError> {
        self.diagnostics
            .write_all(text.as_ref())
            .and_then(|_| self.diagnostics.flush())
            .map_err(|source| InterpreterError::Io { ip: self.ip, source })
    }

    /// Advance past the current character without executing it.
    pub(crate) fn skip(&mut self) {
        if !self.is_finished() {
            self.ip += 1;
        }
    }

    /// Move the instruction pointer to the end of the code.
    pub(crate) fn finish(&mut self) {
        self.ip = self.code.len();
    }
}

/// Index of the `]` matching the `[` at `open`, scanning forward.
pub fn matching_close(code: &[u8], open: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, &b) in code.iter().enumerate().skip(open + 1) {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the `[` matching the `]` at `close`, scanning backward.
pub fn matching_open(code: &[u8], close: usize) -> Option<usize> {
    let mut depth = 1usize;
    for i in (0..close.min(code.len())).rev() {
        match code[i] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
