use crate::error::CommandError;
use crate::session::Session;
use anyhow::Result;
use std::any::Any;
use std::collections::BTreeMap;
use std::process::ExitStatus;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

pub const SUCCESS: ExitCode = 0;
pub const FAILURE: ExitCode = 1;
/// Malformed command line.
pub const USAGE: ExitCode = 2;
/// Unknown command name, same as POSIX shells.
pub const NOT_FOUND: ExitCode = 127;

/// Raw value produced by a [`CommandHandler`].
///
/// Handlers report success or failure in whichever shape is most natural for
/// them; [`Normalizer`](crate::Normalizer) turns every variant into a
/// [`CommandResult`].
#[derive(Debug)]
pub enum Outcome {
    /// Exit code (absent means 0) and an optional error message.
    Pair(Option<i64>, Option<String>),
    /// Key/value result using the `exit_code`, `error` and `err` keys.
    Map(BTreeMap<String, String>),
    /// No value at all; counts as success.
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Textual exit code, coerced like `"2"` -> 2.
    Text(String),
    /// Anything else. Integer types and [`ExitStatus`] are understood.
    Other(Box<dyn Any>),
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Nothing
    }
}

impl From<bool> for Outcome {
    fn from(value: bool) -> Self {
        Outcome::Bool(value)
    }
}

impl From<i32> for Outcome {
    fn from(value: i32) -> Self {
        Outcome::Int(value.into())
    }
}

impl From<i64> for Outcome {
    fn from(value: i64) -> Self {
        Outcome::Int(value)
    }
}

impl From<f64> for Outcome {
    fn from(value: f64) -> Self {
        Outcome::Float(value)
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        Outcome::Text(value)
    }
}

impl From<&str> for Outcome {
    fn from(value: &str) -> Self {
        Outcome::Text(value.to_string())
    }
}

impl From<(i32, Option<String>)> for Outcome {
    fn from((code, error): (i32, Option<String>)) -> Self {
        Outcome::Pair(Some(code.into()), error)
    }
}

impl From<(i32, String)> for Outcome {
    fn from((code, error): (i32, String)) -> Self {
        Outcome::Pair(Some(code.into()), Some(error))
    }
}

impl From<(i32, &str)> for Outcome {
    fn from((code, error): (i32, &str)) -> Self {
        Outcome::Pair(Some(code.into()), Some(error.to_string()))
    }
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        Outcome::Other(Box::new(status))
    }
}

/// Canonical result of one executed step or of a whole command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub exit_code: ExitCode,
    pub error: Option<CommandError>,
}

impl CommandResult {
    pub fn new(exit_code: ExitCode, error: Option<CommandError>) -> Self {
        Self { exit_code, error }
    }

    pub fn success() -> Self {
        Self::new(SUCCESS, None)
    }

    pub fn failure(exit_code: ExitCode, error: CommandError) -> Self {
        Self::new(exit_code, Some(error))
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == SUCCESS
    }
}

/// Object-safe trait for anything the interpreter can invoke by name.
///
/// The registry keeps a factory per command and builds a fresh handler for
/// every invocation, so implementors are free to keep per-call state.
/// Returning `Err` is reserved for genuine faults: the error travels up to
/// [`Interpreter::execute`](crate::Interpreter::execute) and is reported
/// there. Expected failures should be returned as an [`Outcome`].
pub trait CommandHandler {
    /// Executes the command with the arguments following the command word.
    fn handle(&mut self, args: &[String], session: &mut Session) -> Result<Outcome>;
}

impl<F> CommandHandler for F
where
    F: FnMut(&[String], &mut Session) -> Result<Outcome>,
{
    fn handle(&mut self, args: &[String], session: &mut Session) -> Result<Outcome> {
        self(args, session)
    }
}
