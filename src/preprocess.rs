//! Source preprocessing.
//!
//! Raw source goes through three passes, once, before anything executes:
//! 1. everything after the first `!` is split off as embedded input;
//! 2. whitespace and `{...}` comments (nestable) are stripped;
//! 3. `[`/`]` balance is validated.
//!
//! An unmatched `}` or any bracket imbalance is fatal. An unclosed `{` only
//! produces a [`PreprocessWarning`]; everything from the opening brace onward
//! is dropped and the program still runs.

use std::fmt;

/// Fatal preprocessing failures. Offsets are byte offsets into the text that
/// was being scanned: the raw source for comments, the stripped code for brackets.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("unmatched }} at offset {at}")]
    UnmatchedCommentClose { at: usize },

    #[error("unmatched {kind} at instruction {at}")]
    UnmatchedBracket { at: usize, kind: BracketKind },
}

/// Which side of a loop was left without a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKind::Open => write!(f, "["),
            BracketKind::Close => write!(f, "]"),
        }
    }
}

/// Non-fatal findings reported alongside a successfully preprocessed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessWarning {
    /// A `{` opened at `at` (raw source offset) was never closed.
    UnclosedComment { at: usize },
}

impl fmt::Display for PreprocessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessWarning::UnclosedComment { at } => {
                write!(f, "unmatched {{ at offset {at}")
            }
        }
    }
}

/// Executable code plus the optional embedded input, ready for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    code: Vec<u8>,
    input: Option<Vec<u8>>,
    warnings: Vec<PreprocessWarning>,
}

impl Program {
    /// Run the full preprocessing pipeline over raw source bytes.
    pub fn parse(raw: &[u8]) -> Result<Self, PreprocessError> {
        let (source, input) = split_input(raw);
        let stripped = strip_source(source)?;
        check_brackets(&stripped.code)?;

        log::debug!(
            "preprocessed {} source bytes into {} instructions (embedded input: {})",
            raw.len(),
            stripped.code.len(),
            input.map_or_else(|| "none".to_string(), |i| format!("{} bytes", i.len())),
        );

        Ok(Self {
            code: stripped.code,
            input: input.map(<[u8]>::to_vec),
            warnings: stripped.warning.into_iter().collect(),
        })
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Input carried after the `!` delimiter, if the source had one.
    pub fn embedded_input(&self) -> Option<&[u8]> {
        self.input.as_deref()
    }

    pub fn warnings(&self) -> &[PreprocessWarning] {
        &self.warnings
    }

    pub(crate) fn into_parts(self) -> (Vec<u8>, Option<Vec<u8>>) {
        (self.code, self.input)
    }
}

/// Split raw source at the first `!`. The second half (without the `!`) is
/// the embedded input; `None` means input falls back to the external stream.
pub fn split_input(raw: &[u8]) -> (&[u8], Option<&[u8]>) {
    match raw.iter().position(|&b| b == b'!') {
        Some(at) => (&raw[..at], Some(&raw[at + 1..])),
        None => (raw, None),
    }
}

/// Result of stripping whitespace and comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stripped {
    pub code: Vec<u8>,
    pub warning: Option<PreprocessWarning>,
}

/// Drop whitespace and nested `{...}` comments, keeping everything else verbatim.
pub fn strip_source(source: &[u8]) -> Result<Stripped, PreprocessError> {
    let mut code = Vec::with_capacity(source.len());
    let mut depth = 0usize;
    let mut outermost_open = 0usize;

    for (at, &b) in source.iter().enumerate() {
        match b {
            b'{' => {
                if depth == 0 {
                    outermost_open = at;
                }
                depth += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Err(PreprocessError::UnmatchedCommentClose { at });
                }
                depth -= 1;
            }
            _ if depth > 0 => {}
            _ if is_space(b) => {}
            _ => code.push(b),
        }
    }

    let warning = (depth > 0).then_some(PreprocessWarning::UnclosedComment { at: outermost_open });
    Ok(Stripped { code, warning })
}

/// Verify every `[` has a matching `]` and vice versa.
pub fn check_brackets(code: &[u8]) -> Result<(), PreprocessError> {
    let mut open: Vec<usize> = Vec::new();
    for (at, &b) in code.iter().enumerate() {
        match b {
            b'[' => open.push(at),
            b']' => {
                if open.pop().is_none() {
                    return Err(PreprocessError::UnmatchedBracket { at, kind: BracketKind::Close });
                }
            }
            _ => {}
        }
    }

    match open.last() {
        Some(&at) => Err(PreprocessError::UnmatchedBracket { at, kind: BracketKind::Open }),
        None => Ok(()),
    }
}

// C-locale isspace, which includes vertical tab unlike u8::is_ascii_whitespace.
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_without_bang_has_no_input() {
        let (src, input) = split_input(b",.");
        assert_eq!(src, b",.");
        assert!(input.is_none());
    }

    #[test]
    fn split_at_first_bang_only() {
        let (src, input) = split_input(b",.!A!B");
        assert_eq!(src, b",.");
        assert_eq!(input, Some(&b"A!B"[..]));
    }

    #[test]
    fn split_with_trailing_bang_gives_empty_input() {
        let (_, input) = split_input(b"+!");
        assert_eq!(input, Some(&b""[..]));
    }

    #[test]
    fn stripping_clean_source_is_identity() {
        let src = b"++[>+<-]>.,p#:;rlud'P";
        let stripped = strip_source(src).unwrap();
        assert_eq!(stripped.code, src.to_vec());
        assert!(stripped.warning.is_none());
    }

    #[test]
    fn whitespace_and_nested_comments_are_removed() {
        let src = b"+ +\n{ outer { inner [ } still comment ] }\t-\x0b.";
        let stripped = strip_source(src).unwrap();
        assert_eq!(stripped.code, b"++-.".to_vec());
    }

    #[test]
    fn unmatched_close_brace_is_fatal() {
        let err = strip_source(b"+{}}+").unwrap_err();
        assert_eq!(err, PreprocessError::UnmatchedCommentClose { at: 3 });
    }

    #[test]
    fn unclosed_brace_warns_and_keeps_prefix() {
        let stripped = strip_source(b"+. {never { closed }").unwrap();
        assert_eq!(stripped.code, b"+.".to_vec());
        assert_eq!(stripped.warning, Some(PreprocessWarning::UnclosedComment { at: 3 }));
    }

    #[test]
    fn extra_close_bracket_is_reported_at_its_position() {
        let err = check_brackets(b"[]]").unwrap_err();
        assert_eq!(err, PreprocessError::UnmatchedBracket { at: 2, kind: BracketKind::Close });
    }

    #[test]
    fn trailing_open_bracket_is_fatal() {
        let err = check_brackets(b"[[]").unwrap_err();
        assert_eq!(err, PreprocessError::UnmatchedBracket { at: 0, kind: BracketKind::Open });
    }

    #[test]
    fn brackets_inside_comments_are_ignored() {
        let program = Program::parse(b"{ ] [[ }+[-]").unwrap();
        assert_eq!(program.code(), b"+[-]");
    }

    #[test]
    fn bang_inside_comment_still_splits() {
        // The split happens before comments are recognized.
        let program = Program::parse(b"{ ! }").unwrap();
        assert_eq!(program.code(), b"");
        assert_eq!(program.embedded_input(), Some(&b" }"[..]));
        assert_eq!(program.warnings(), &[PreprocessWarning::UnclosedComment { at: 0 }]);
    }

    #[test]
    fn program_carries_input_and_warnings() {
        let program = Program::parse(b",. {oops!AB").unwrap();
        assert_eq!(program.code(), b",.");
        assert_eq!(program.embedded_input(), Some(&b"AB"[..]));
        assert_eq!(program.warnings().len(), 1);
    }

    #[test]
    fn messages_name_the_offending_character() {
        let err = Program::parse(b"]").unwrap_err();
        assert!(err.to_string().contains("unmatched ]"));
        let err = Program::parse(b"}").unwrap_err();
        assert!(err.to_string().contains("unmatched }"));
        let warning = PreprocessWarning::UnclosedComment { at: 0 };
        assert!(warning.to_string().contains("unmatched {"));
    }
}
