//! Command lines with `&&`, `||` and parentheses over a registry of named
//! commands.
//!
//! Commands are Rust handlers registered in a [`Registry`] under a name,
//! usually derived from their type name (`InstancesCommand` registers as
//! `instances`). The [`Interpreter`] parses a line such as
//! `instances list -g "my group" && (get 5 || echo missing)`, resolves each
//! command word as an alias or a command, runs handlers with short-circuit
//! semantics and normalizes whatever they return into a [`CommandResult`].
//! Unknown names come back with "did you mean" suggestions.
//!
//! The public modules [`command`] and [`registry`] expose the traits and types
//! for implementing and registering your own commands.

mod aliases;
mod builtin;
pub mod command;
pub mod config;
pub mod error;
mod interpreter;
mod io_adapters;
mod lexer;
mod normalize;
mod parser;
pub mod registry;
mod session;
mod suggest;

pub use aliases::AliasStore;
pub use builtin::{Builtin, BuiltinCommand};
pub use command::{CommandHandler, CommandResult, ExitCode, Outcome};
pub use config::Settings;
pub use error::{BadAlias, CommandError, ParseError};
/// The interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use io_adapters::MemWriter;
pub use lexer::LexingError;
pub use normalize::Normalizer;
pub use parser::{Flow, Node, Operator, parse};
pub use registry::Registry;
pub use session::Session;
pub use suggest::suggest;
