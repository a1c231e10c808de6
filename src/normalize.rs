use crate::command::{CommandResult, ExitCode, FAILURE, Outcome, SUCCESS};
use crate::error::CommandError;
use std::any::Any;
use std::process::ExitStatus;
use tracing::warn;

/// Turns handler [`Outcome`]s into [`CommandResult`]s.
///
/// By default outcomes of an unknown shape count as success. In strict mode
/// they fail with [`CommandError::UnrecognizedOutput`] instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    strict: bool,
}

impl Normalizer {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn normalize(&self, outcome: Outcome) -> CommandResult {
        match outcome {
            Outcome::Pair(code, error) => {
                CommandResult::new(clamp(code.unwrap_or(0)), error.map(CommandError::Reported))
            }
            Outcome::Map(mut fields) => {
                let code = fields.remove("exit_code");
                let error = fields.remove("error").or_else(|| fields.remove("err"));
                if code.is_none() && error.is_none() {
                    return self.unrecognized("map without exit_code or error");
                }
                CommandResult::new(
                    code.map_or(SUCCESS, |c| clamp(coerce_int(&c))),
                    error.map(CommandError::Reported),
                )
            }
            Outcome::Nothing | Outcome::Bool(true) => CommandResult::success(),
            Outcome::Bool(false) => CommandResult::new(FAILURE, None),
            Outcome::Int(code) => CommandResult::new(clamp(code), None),
            // `as` truncates toward zero, saturates, and maps NaN to 0.
            Outcome::Float(code) => CommandResult::new(clamp(code as i64), None),
            Outcome::Text(text) => CommandResult::new(clamp(coerce_int(&text)), None),
            Outcome::Other(value) => match integer_of(value.as_ref()) {
                Some(code) => CommandResult::new(clamp(code), None),
                None => self.unrecognized("opaque value"),
            },
        }
    }

    fn unrecognized(&self, shape: &str) -> CommandResult {
        if self.strict {
            CommandResult::failure(FAILURE, CommandError::UnrecognizedOutput)
        } else {
            warn!(shape, "unrecognized command result treated as success");
            CommandResult::success()
        }
    }
}

/// Normalizes with the permissive default rules.
pub fn normalize(outcome: Outcome) -> CommandResult {
    Normalizer::default().normalize(outcome)
}

fn clamp(code: i64) -> ExitCode {
    ExitCode::try_from(code).unwrap_or(if code < 0 { ExitCode::MIN } else { ExitCode::MAX })
}

/// Leading-integer coercion: optional whitespace and sign, then digits.
/// `"12abc"` is 12, `"abc"` is 0.
pub fn coerce_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(d.into()));
    if negative { -value } else { value }
}

macro_rules! downcast_integer {
    ($value:expr, $($ty:ty),+) => {
        $(
            if let Some(n) = $value.downcast_ref::<$ty>() {
                return i64::try_from(*n).ok().or(Some(i64::MAX));
            }
        )+
    };
}

fn integer_of(value: &dyn Any) -> Option<i64> {
    downcast_integer!(value, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
    if let Some(status) = value.downcast_ref::<ExitStatus>() {
        return Some(status.code().map_or(i64::from(FAILURE), i64::from));
    }
    None
}
