use crate::lexer::LexingError;
use crate::parser::Operator;
use thiserror::Error;

/// Malformed command lines. Nothing of the line runs when one is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lexing(#[from] LexingError),

    #[error("invalid command format, begins with an operator `{0}`")]
    LeadingOperator(Operator),

    #[error("invalid command format, ends with an operator `{0}`")]
    TrailingOperator(Operator),

    #[error("consecutive operators `{0} {1}` are not supported")]
    ConsecutiveOperators(Operator, Operator),

    #[error("missing operator between a command and a parenthesized expression")]
    MissingOperator,

    #[error("unbalanced parentheses")]
    UnbalancedParen,

    #[error("empty parenthesized expression")]
    EmptyGroup,

    #[error("parenthesized expressions nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("the pipe operator `|` is not yet supported")]
    PipeUnsupported,
}

/// Rejected alias definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BadAlias {
    #[error("`{0}` is already a command")]
    ShadowsCommand(String),

    #[error("alias `{0}` refers to itself")]
    SelfReference(String),

    #[error("invalid alias name `{0}`")]
    InvalidName(String),

    #[error("alias `{0}` has an empty expansion")]
    EmptyExpansion(String),
}

/// The error half of a [`CommandResult`](crate::CommandResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("`{name}` is not a command{}", did_you_mean(.suggestions))]
    NotFound {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("alias `{name}` expands more than {depth} levels deep")]
    AliasLoop { name: String, depth: usize },

    /// Error text a handler returned alongside its exit code.
    #[error("{0}")]
    Reported(String),

    /// A handler returned `Err`.
    #[error("{0}")]
    Fault(String),

    #[error("command panicked: {0}")]
    Panicked(String),

    #[error("command returned an unrecognized result")]
    UnrecognizedOutput,
}

fn did_you_mean(suggestions: &[String]) -> String {
    match suggestions {
        [] => String::new(),
        [only] => format!(", did you mean `{only}`?"),
        many => format!(", did you mean one of: {}?", many.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_without_suggestions() {
        let err = CommandError::NotFound {
            name: "badcmd".to_string(),
            suggestions: vec![],
        };
        assert_eq!(err.to_string(), "`badcmd` is not a command");
    }

    #[test]
    fn test_not_found_message_with_suggestions() {
        let one = CommandError::NotFound {
            name: "instanc".to_string(),
            suggestions: vec!["instances".to_string()],
        };
        assert_eq!(
            one.to_string(),
            "`instanc` is not a command, did you mean `instances`?"
        );

        let many = CommandError::NotFound {
            name: "acc".to_string(),
            suggestions: vec!["accounts".to_string(), "account-groups".to_string()],
        };
        assert_eq!(
            many.to_string(),
            "`acc` is not a command, did you mean one of: accounts, account-groups?"
        );
    }

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(
            ParseError::LeadingOperator(Operator::And).to_string(),
            "invalid command format, begins with an operator `&&`"
        );
        assert_eq!(
            CommandError::from(ParseError::PipeUnsupported).to_string(),
            "the pipe operator `|` is not yet supported"
        );
    }
}
