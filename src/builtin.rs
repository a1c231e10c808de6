use crate::command::{CommandHandler, Outcome};
use crate::registry::{Registry, default_name};
use crate::session::Session;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::marker::PhantomData;

/// Built-in commands known to the interpreter at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// in-process. They register under the cli-ized name of their type, so
/// `EchoCommand` answers to `echo`.
pub trait BuiltinCommand: Sized + FromArgs + 'static {
    /// Hidden builtins work but stay out of `help` and suggestions.
    const HIDDEN: bool = false;

    /// Executes the command against the session.
    fn execute(self, session: &mut Session) -> Result<Outcome>;
}

/// Adapts a [`BuiltinCommand`] to the [`CommandHandler`] interface.
///
/// Arguments are parsed on every call; `--help` and usage errors print argh's
/// output and finish without running the command.
pub struct Builtin<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> CommandHandler for Builtin<T> {
    fn handle(&mut self, args: &[String], session: &mut Session) -> Result<Outcome> {
        let name = default_name::<T>();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[name.as_str()], &args) {
            Ok(cmd) => cmd.execute(session),
            Err(EarlyExit { output, status }) => {
                writeln!(session.stdout, "{}", output.trim_end())?;
                Ok(Outcome::Bool(status.is_ok()))
            }
        }
    }
}

/// Registers every builtin of this crate.
pub fn register_builtins(registry: &mut Registry) {
    registry.register_builtin::<EchoCommand>();
    registry.register_builtin::<TrueCommand>();
    registry.register_builtin::<FalseCommand>();
    registry.register_builtin::<AliasCommand>();
    registry.register_builtin::<UnaliasCommand>();
    registry.register_builtin::<HelpCommand>();
    registry.register_builtin::<ExitCommand>();
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct EchoCommand {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for EchoCommand {
    fn execute(self, session: &mut Session) -> Result<Outcome> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(session.stdout, "{}", s)?;
        } else {
            writeln!(session.stdout, "{}", s)?;
        }
        Ok(Outcome::Nothing)
    }
}

#[derive(FromArgs)]
/// do nothing, successfully.
pub struct TrueCommand {}

impl BuiltinCommand for TrueCommand {
    const HIDDEN: bool = true;

    fn execute(self, _session: &mut Session) -> Result<Outcome> {
        Ok(Outcome::Bool(true))
    }
}

#[derive(FromArgs)]
/// do nothing, unsuccessfully.
pub struct FalseCommand {}

impl BuiltinCommand for FalseCommand {
    const HIDDEN: bool = true;

    fn execute(self, _session: &mut Session) -> Result<Outcome> {
        Ok(Outcome::Bool(false))
    }
}

#[derive(FromArgs)]
/// define or display aliases.
/// without arguments, lists all aliases; with a name only, shows that alias.
pub struct AliasCommand {
    #[argh(positional, greedy)]
    /// alias name followed by the command it expands to.
    pub args: Vec<String>,
}

impl BuiltinCommand for AliasCommand {
    fn execute(self, session: &mut Session) -> Result<Outcome> {
        let Some((name, command)) = self.args.split_first() else {
            for (name, command) in session.registry.list_aliases() {
                writeln!(session.stdout, "{name} = {command}")?;
            }
            return Ok(Outcome::Nothing);
        };

        if command.is_empty() {
            return match session.registry.alias(name) {
                Some(expansion) => {
                    writeln!(session.stdout, "{name} = {expansion}")?;
                    Ok(Outcome::Nothing)
                }
                None => Ok((1, format!("alias: {name}: not found")).into()),
            };
        }

        match session.registry.register_alias(name, &command.join(" ")) {
            Ok(()) => {
                session.persist_aliases()?;
                Ok(Outcome::Nothing)
            }
            Err(e) => Ok((1, format!("alias: {e}")).into()),
        }
    }
}

#[derive(FromArgs)]
/// remove an alias.
pub struct UnaliasCommand {
    #[argh(positional)]
    /// name of the alias to remove.
    pub name: String,
}

impl BuiltinCommand for UnaliasCommand {
    fn execute(self, session: &mut Session) -> Result<Outcome> {
        if session.registry.unregister_alias(&self.name).is_none() {
            return Ok((1, format!("unalias: {}: not found", self.name)).into());
        }
        session.persist_aliases()?;
        Ok(Outcome::Nothing)
    }
}

#[derive(FromArgs)]
/// list available commands and aliases.
pub struct HelpCommand {}

impl BuiltinCommand for HelpCommand {
    fn execute(self, session: &mut Session) -> Result<Outcome> {
        let Session { registry, stdout, .. } = session;

        writeln!(stdout, "commands:")?;
        for name in registry.list_commands().keys() {
            writeln!(stdout, "  {name}")?;
        }
        if !registry.list_aliases().is_empty() {
            writeln!(stdout, "aliases:")?;
            for (name, command) in registry.list_aliases() {
                writeln!(stdout, "  {name} = {command}")?;
            }
        }
        writeln!(stdout, "chain commands with `&&` and `||`, group them with parentheses.")?;
        Ok(Outcome::Nothing)
    }
}

#[derive(FromArgs)]
/// leave the interactive prompt.
pub struct ExitCommand {
    #[argh(positional, default = "0")]
    /// exit code to finish with.
    pub code: i32,
}

impl BuiltinCommand for ExitCommand {
    fn execute(self, session: &mut Session) -> Result<Outcome> {
        session.should_exit = true;
        Ok(Outcome::Int(self.code.into()))
    }
}
