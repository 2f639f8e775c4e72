//! An interpreter for a Brainfuck-derived language with a debugger and a screen.
//!
//! Programs run against a growable, zero-initialized byte tape with a single
//! data pointer.
//!
//! Features and behaviors:
//! - Whitespace and nestable `{...}` comments are stripped before execution.
//! - Everything after the first `!` is embedded input, consumed by `,` before
//!   anything is read from stdin. Exhausted input of either kind reads as 0.
//! - The tape grows on demand to the right; moving left of cell 0 is an error.
//! - Unbalanced `[`/`]` is rejected before anything runs.
//! - `#` opens an interactive debugger on stderr (`step`, `quit`, `continue`,
//!   `memory [addr]`); `p` prints the current cell in hex.
//! - `r l u d` move a drawing cursor, `'` paints the pixel under it, `:`
//!   presents a frame and `;` reads the last pressed key, all through a
//!   [`DisplayPort`].
//! - Any other character is ignored.
//!
//! Quick start:
//!
//! ```no_run
//! use gamefuck::{Interpreter, Program};
//!
//! let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.";
//! let program = Program::parse(code.as_bytes()).expect("balanced brackets");
//! let mut vm = Interpreter::new(program);
//! vm.run().expect("program should run");
//! println!(); // ensure a trailing newline for readability
//! ```

pub mod cli_util;
pub mod config;
pub mod debugger;
pub mod display;
pub mod interpreter;
pub mod preprocess;
pub mod tape;

pub use debugger::{Command, CommandError, Debugger};
pub use display::{Cursor, DisplayPort, FrameBuffer, HeadlessDisplay, KeyLatch, Screen};
pub use interpreter::{Interpreter, InterpreterError, BREAK_MARKER};
pub use preprocess::{BracketKind, PreprocessError, PreprocessWarning, Program};
pub use tape::Tape;
