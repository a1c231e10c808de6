//! Lexical analysis (tokenization) for command lines with shell-like operators.
//!
//! Words keep their raw source text, quotes and backslashes included. The
//! execution engine turns each one into its value with [`unquote`] right
//! before the command runs.

use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word in its raw form, e.g. `"a b"` including the quotes.
    Word(String),
    /// The `&&` operator.
    AndOp,
    /// The `||` operator.
    OrOp,
    /// The pipe operator, `|`.
    PipeOp,
    /// Opening parenthesis of a sub-expression.
    OpenParen,
    /// Closing parenthesis of a sub-expression.
    CloseParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => f.write_str(w),
            Token::AndOp => f.write_str("&&"),
            Token::OrOp => f.write_str("||"),
            Token::PipeOp => f.write_str("|"),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
        }
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexingError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated {0} quote")]
    UnfinishedQuote(&'static str),

    /// The line ends with a backslash that escapes nothing.
    #[error("dangling backslash at end of line")]
    DanglingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    dangling_escape: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            dangling_escape: false,
        }
    }

    /// Runs the machine over the whole input.
    ///
    /// Fails when the input ends inside a quoted section or right after a
    /// backslash.
    fn make_tokens(&mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch, &mut out),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::ReadingSingleQuote => return Err(LexingError::UnfinishedQuote("single")),
            LexingState::ReadingDoubleQuote => return Err(LexingError::UnfinishedQuote("double")),
            _ if self.dangling_escape => return Err(LexingError::DanglingEscape),
            _ => {}
        }

        self.finish_word(&mut out);
        Ok(out)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    /// Consumes the character after an operator character when it doubles it,
    /// e.g. the second `&` of `&&`.
    fn take_double(&mut self, ch: char) -> bool {
        if self.peek_char() == Some(ch) {
            self.read_char();
            true
        } else {
            false
        }
    }

    /// Returns the operator token starting at `ch`, if any.
    fn operator(&mut self, ch: char) -> Option<Token> {
        match ch {
            '&' if self.take_double('&') => Some(Token::AndOp),
            '|' if self.take_double('|') => Some(Token::OrOp),
            '|' => Some(Token::PipeOp),
            '(' => Some(Token::OpenParen),
            ')' => Some(Token::CloseParen),
            _ => None,
        }
    }

    fn handle_start(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch.is_whitespace() {
            return;
        }
        if let Some(token) = self.operator(ch) {
            out.push(token);
            return;
        }
        self.state = LexingState::ReadingWord;
        self.handle_word(ch, out);
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch.is_whitespace() {
            self.finish_word(out);
            self.state = LexingState::Start;
            return;
        }
        if let Some(token) = self.operator(ch) {
            self.finish_word(out);
            out.push(token);
            self.state = LexingState::Start;
            return;
        }
        match ch {
            '\'' => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingSingleQuote;
            }
            '"' => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingDoubleQuote;
            }
            '\\' => self.push_escaped(ch),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        self.buffer.push(ch);
        if ch == '\'' {
            self.state = LexingState::ReadingWord;
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '\\' => self.push_escaped(ch),
            '"' => {
                self.buffer.push(ch);
                self.state = LexingState::ReadingWord;
            }
            c => self.buffer.push(c),
        }
    }

    /// Keeps a backslash together with the character it escapes.
    fn push_escaped(&mut self, backslash: char) {
        self.buffer.push(backslash);
        match self.read_char() {
            Some(next) => self.buffer.push(next),
            None => self.dangling_escape = true,
        }
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if !self.buffer.is_empty() {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
        }
    }
}

/// The main entry point function to perform lexical analysis.
///
/// Whitespace-only input produces an empty token list.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    let tokens = LexingFSM::new(line).make_tokens()?;
    trace!(?tokens, "tokenized");
    Ok(tokens)
}

/// The value of a raw [`Token::Word`] with quotes and escapes removed.
///
/// `#` is an ordinary character here, even at the start of a word.
/// Returns `None` when the word is not valid shell quoting.
pub fn unquote(raw: &str) -> Option<String> {
    let escaped;
    let raw = if raw.starts_with('#') {
        escaped = format!("\\{raw}");
        escaped.as_str()
    } else {
        raw
    };
    shlex::split(raw).map(|parts| parts.concat())
}
