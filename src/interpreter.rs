use crate::command::{CommandResult, ExitCode, FAILURE, NOT_FOUND, SUCCESS, USAGE};
use crate::config::Settings;
use crate::error::{CommandError, ParseError};
use crate::lexer;
use crate::normalize::Normalizer;
use crate::parser::{self, Flow, Node, Operator};
use crate::registry::Registry;
use crate::session::Session;
use anyhow::{Context, Result, anyhow};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, error, instrument, warn};

/// Evaluates command lines against a [`Registry`].
///
/// The interpreter owns a [`Session`] holding the registry and the output
/// stream handed to every handler. Lines are parsed into a [`Flow`] and walked
/// left to right: `&&` and `||` short-circuit, parenthesized groups run as
/// nested flows, and aliases expand into fresh lines.
///
/// Example
/// ```
/// use command_flow::Interpreter;
/// let mut sh = Interpreter::default();
/// let result = sh.execute("true && echo hello").unwrap();
/// assert_eq!(result.exit_code, 0);
/// ```
pub struct Interpreter {
    session: Session,
    normalizer: Normalizer,
    prompt: String,
    history_file: Option<PathBuf>,
    max_suggestions: usize,
    max_alias_depth: usize,
}

impl Interpreter {
    /// An interpreter over `registry` with default settings.
    pub fn new(registry: Registry) -> Self {
        Self::with_settings(registry, &Settings::default())
    }

    pub fn with_settings(registry: Registry, settings: &Settings) -> Self {
        Self {
            session: Session::new(registry),
            normalizer: Normalizer::new(settings.strict_results),
            prompt: settings.prompt.clone(),
            history_file: settings.history_file.clone(),
            max_suggestions: settings.max_suggestions,
            max_alias_depth: settings.max_alias_depth,
        }
    }

    /// Redirects handler output, e.g. into a [`MemWriter`](crate::MemWriter).
    pub fn with_output(mut self, stdout: Box<dyn Write>) -> Self {
        self.session.stdout = stdout;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.session.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.session.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Parses and runs one command line.
    ///
    /// Returns `None` for a blank line. Every failure, including handler
    /// errors and panics, is reported through the returned
    /// [`CommandResult`]; the interpreter stays usable afterwards.
    #[instrument(level = "debug", skip(self))]
    pub fn execute(&mut self, line: &str) -> Option<CommandResult> {
        self.guarded(|this| this.evaluate(line, 0))
    }

    /// Runs a single, already split invocation. No parsing takes place, so
    /// operators in `args` are passed through literally.
    #[instrument(level = "debug", skip(self))]
    pub fn run(&mut self, name: &str, args: &[&str]) -> Option<CommandResult> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        self.guarded(|this| this.dispatch(name, &args, 0).map(Some))
    }

    fn guarded<F>(&mut self, f: F) -> Option<CommandResult>
    where
        F: FnOnce(&mut Self) -> Result<Option<CommandResult>>,
    {
        let result = match panic::catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Some(failure_of(err)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "command panicked");
                Some(CommandResult::failure(FAILURE, CommandError::Panicked(message)))
            }
        };
        if let Err(err) = self.session.stdout.flush() {
            warn!(%err, "flush output");
        }
        result
    }

    fn evaluate(&mut self, line: &str, alias_depth: usize) -> Result<Option<CommandResult>> {
        let flow = parser::parse(line)?;
        flow.ensure_supported()?;
        self.run_flow(&flow, alias_depth)
    }

    fn run_flow(&mut self, flow: &Flow, alias_depth: usize) -> Result<Option<CommandResult>> {
        let mut still_executing = true;
        let mut previous: Option<CommandResult> = None;

        for node in flow.nodes() {
            let previous_code = previous.as_ref().map_or(SUCCESS, |r| r.exit_code);
            match node {
                Node::Operator(Operator::Pipe) => return Err(ParseError::PipeUnsupported.into()),
                _ if !still_executing => {}
                Node::Operator(Operator::And) => {
                    if previous_code != SUCCESS {
                        debug!(previous_code, "`&&` after failure, skipping rest");
                        still_executing = false;
                    }
                }
                Node::Operator(Operator::Or) => {
                    if previous_code == SUCCESS {
                        debug!("`||` after success, skipping rest");
                        still_executing = false;
                    }
                }
                Node::Command(words) => previous = Some(self.run_command(words, alias_depth)?),
                Node::Group(inner) => previous = self.run_flow(inner, alias_depth)?,
            }
        }

        Ok(previous)
    }

    fn run_command(&mut self, words: &[String], alias_depth: usize) -> Result<CommandResult> {
        let argv = words
            .iter()
            .map(|word| lexer::unquote(word).ok_or_else(|| anyhow!("cannot unquote `{word}`")))
            .collect::<Result<Vec<_>>>()?;
        match argv.split_first() {
            Some((name, args)) => self.dispatch(name, args, alias_depth),
            None => Ok(CommandResult::success()),
        }
    }

    /// Resolves `name` as an alias first, then as a command.
    fn dispatch(
        &mut self,
        name: &str,
        args: &[String],
        alias_depth: usize,
    ) -> Result<CommandResult> {
        if let Some(expansion) = self.session.registry.alias(name) {
            if alias_depth >= self.max_alias_depth {
                return Err(CommandError::AliasLoop {
                    name: name.to_string(),
                    depth: self.max_alias_depth,
                }
                .into());
            }
            let mut line = expansion.to_string();
            if !args.is_empty() {
                line.push(' ');
                line.push_str(&shlex::try_join(args.iter().map(String::as_str))?);
            }
            debug!(alias = name, %line, "expanding alias");
            let result = self.evaluate(&line, alias_depth + 1)?;
            return Ok(result.unwrap_or_else(CommandResult::success));
        }

        if let Some(entry) = self.session.registry.lookup(name) {
            let mut handler = entry.instantiate();
            debug!(command = name, ?args, "running command");
            let outcome = handler
                .handle(args, &mut self.session)
                .with_context(|| format!("command `{name}` failed"))?;
            return Ok(self.normalizer.normalize(outcome));
        }

        let mut suggestions = self.session.registry.suggest(name);
        suggestions.truncate(self.max_suggestions);
        debug!(command = name, ?suggestions, "command not found");
        Ok(CommandResult::failure(
            NOT_FOUND,
            CommandError::NotFound {
                name: name.to_string(),
                suggestions,
            },
        ))
    }

    /// Interactive Read-Eval-Print Loop.
    ///
    /// Runs until end of input, an interrupt, or a command asking to exit.
    /// Returns the exit code of the last command.
    pub fn repl(&mut self) -> ExitCode {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(err) => {
                eprintln!("Error: {err}");
                return FAILURE;
            }
        };
        if let Some(path) = &self.history_file {
            if let Err(err) = rl.load_history(path) {
                debug!(path = %path.display(), %err, "no history loaded");
            }
        }

        let mut last = SUCCESS;
        while !self.session.should_exit {
            match rl.readline(&self.prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(err) = rl.add_history_entry(line.as_str()) {
                        warn!(%err, "add history entry");
                    }
                    if let Some(result) = self.execute(&line) {
                        if let Some(err) = &result.error {
                            eprintln!("Error: {err}");
                        }
                        last = result.exit_code;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    last = FAILURE;
                    break;
                }
            }
        }

        if let Some(path) = &self.history_file {
            if let Err(err) = rl.save_history(path) {
                warn!(path = %path.display(), %err, "save history");
            }
        }
        last
    }
}

impl Default for Interpreter {
    /// An interpreter holding only the builtins.
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

/// Turns an error escaping the flow walk into a result.
fn failure_of(err: anyhow::Error) -> CommandResult {
    let err = match err.downcast::<CommandError>() {
        Ok(CommandError::Parse(parse)) => return CommandResult::failure(USAGE, parse.into()),
        Ok(command) => return CommandResult::failure(FAILURE, command),
        Err(err) => err,
    };
    match err.downcast::<ParseError>() {
        Ok(parse) => CommandResult::failure(USAGE, parse.into()),
        Err(err) => CommandResult::failure(FAILURE, CommandError::Fault(format!("{err:#}"))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
