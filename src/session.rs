use crate::aliases::AliasStore;
use crate::registry::Registry;
use std::io::{self, Write};

/// Mutable state shared between the interpreter and the handlers it runs.
///
/// The session contains:
/// - `registry`: the command and alias table, so builtins like `alias` can mutate it.
/// - `stdout`: where handlers write their output.
/// - `should_exit`: a flag that a REPL loop checks to know when to terminate.
/// - `alias_store`: where alias changes are persisted, when attached.
pub struct Session {
    pub registry: Registry,
    pub stdout: Box<dyn Write>,
    pub should_exit: bool,
    pub alias_store: Option<AliasStore>,
}

impl Session {
    /// A session writing to the process standard output.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            stdout: Box::new(io::stdout()),
            should_exit: false,
            alias_store: None,
        }
    }

    /// Writes the current alias table to the attached store, if any.
    pub fn persist_aliases(&self) -> anyhow::Result<()> {
        match &self.alias_store {
            Some(store) => store.save(self.registry.list_aliases()),
            None => Ok(()),
        }
    }
}
