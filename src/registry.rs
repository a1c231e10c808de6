use crate::builtin::{self, Builtin, BuiltinCommand};
use crate::command::{CommandHandler, Outcome};
use crate::error::BadAlias;
use crate::session::Session;
use crate::suggest;
use regex::Regex;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Builds a fresh handler for every invocation of a command.
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn CommandHandler>>;

/// What the registry knows about one command.
pub struct CommandEntry {
    factory: HandlerFactory,
    hidden: bool,
}

impl CommandEntry {
    /// Hidden commands run normally but are left out of listings and suggestions.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn instantiate(&self) -> Box<dyn CommandHandler> {
        (self.factory)()
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

/// Table of commands and aliases, plus the name list suggestions are drawn from.
///
/// Built explicitly by the process entry point and owned by the
/// [`Session`]; there is no global instance.
#[derive(Default)]
pub struct Registry {
    commands: BTreeMap<String, CommandEntry>,
    aliases: BTreeMap<String, String>,
    names: OnceCell<Vec<String>>,
}

impl Registry {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the builtin commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Registers `name`, replacing any previous command of that name.
    ///
    /// An alias with the same name is dropped so aliases never shadow commands.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F, hidden: bool)
    where
        F: Fn() -> Box<dyn CommandHandler> + 'static,
    {
        let name = name.into();
        if self.aliases.remove(&name).is_some() {
            warn!(command = %name, "alias replaced by command of the same name");
        }
        let entry = CommandEntry {
            factory: Box::new(factory),
            hidden,
        };
        if self.commands.insert(name.clone(), entry).is_some() {
            debug!(command = %name, "command redefined");
        }
        self.clear_cache();
    }

    /// Registers a closure as the handler of `name`.
    ///
    /// Each invocation runs on a fresh clone of the closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F, hidden: bool)
    where
        F: Fn(&[String], &mut Session) -> anyhow::Result<Outcome> + Clone + 'static,
    {
        self.register(
            name,
            move || Box::new(handler.clone()) as Box<dyn CommandHandler>,
            hidden,
        );
    }

    /// Registers a builtin under the name derived from its type.
    pub fn register_builtin<T: BuiltinCommand>(&mut self) {
        self.register(
            default_name::<T>(),
            || Box::new(Builtin::<T>::default()) as Box<dyn CommandHandler>,
            T::HIDDEN,
        );
    }

    pub fn unregister(&mut self, name: &str) {
        if self.commands.remove(name).is_some() {
            self.clear_cache();
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    /// Defines `alias_name` as a shorthand for `command`.
    ///
    /// Redefining an existing alias replaces it.
    pub fn register_alias(&mut self, alias_name: &str, command: &str) -> Result<(), BadAlias> {
        if alias_name.is_empty()
            || alias_name
                .chars()
                .any(|c| c.is_whitespace() || "&|()'\"\\".contains(c))
        {
            return Err(BadAlias::InvalidName(alias_name.to_string()));
        }
        if self.commands.contains_key(alias_name) {
            return Err(BadAlias::ShadowsCommand(alias_name.to_string()));
        }
        if command.trim().is_empty() {
            return Err(BadAlias::EmptyExpansion(alias_name.to_string()));
        }
        if normalize_text(alias_name) == normalize_text(command) {
            return Err(BadAlias::SelfReference(alias_name.to_string()));
        }
        self.aliases
            .insert(alias_name.to_string(), command.trim().to_string());
        self.clear_cache();
        Ok(())
    }

    pub fn unregister_alias(&mut self, alias_name: &str) -> Option<String> {
        let removed = self.aliases.remove(alias_name);
        if removed.is_some() {
            self.clear_cache();
        }
        removed
    }

    /// The expansion of `alias_name`, if it is an alias.
    pub fn alias(&self, alias_name: &str) -> Option<&str> {
        self.aliases.get(alias_name).map(String::as_str)
    }

    /// Publicly listed commands, i.e. all but the hidden ones.
    pub fn list_commands(&self) -> BTreeMap<&str, &CommandEntry> {
        self.commands
            .iter()
            .filter(|(_, entry)| !entry.hidden)
            .map(|(name, entry)| (name.as_str(), entry))
            .collect()
    }

    pub fn list_aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Likely intended names for the unknown `name`, best first.
    pub fn suggest(&self, name: &str) -> Vec<String> {
        let names = self.names.get_or_init(|| self.collect_names());
        suggest::suggest(name, names)
    }

    /// Drops the cached name list. Every mutation calls this.
    pub fn clear_cache(&mut self) {
        self.names = OnceCell::new();
    }

    fn collect_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .list_commands()
            .into_keys()
            .map(str::to_string)
            .chain(self.aliases.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Lowercased, trimmed, with whitespace runs collapsed to a single space.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid acronym regex"));
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("valid word regex"));

/// Suffix stripped from type names, e.g. `ListCommand` -> `list`.
const GENERIC_SUFFIX: &str = "command";

/// Turns a type name into a command name.
///
/// `AccountGroupsCommand` becomes `account-groups`, `HTTPProxyCommand`
/// becomes `http-proxy` and `Instances::ListCommand` becomes `instances-list`.
pub fn cliize(type_name: &str) -> String {
    let words = type_name
        .split("::")
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let segment = ACRONYM_BOUNDARY.replace_all(segment, "${1}-${2}");
            let segment = WORD_BOUNDARY.replace_all(&segment, "${1}-${2}");
            segment.replace('_', "-").to_lowercase()
        })
        .collect::<Vec<_>>()
        .join("-");

    let mut parts: Vec<&str> = words.split('-').filter(|part| !part.is_empty()).collect();
    if parts.len() > 1 && parts.last() == Some(&GENERIC_SUFFIX) {
        parts.pop();
    }
    parts.join("-")
}

/// The command name a handler type registers under by default.
///
/// Only the last segment of the type path is used, generic arguments ignored:
/// `my_crate::commands::InstancesCommand` registers as `instances`.
pub fn default_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    let last = path.rsplit("::").next().unwrap_or(path);
    cliize(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn noop(registry: &mut Registry, name: &str, hidden: bool) {
        registry.register_fn(name, |_args, _session| Ok(Outcome::Nothing), hidden);
    }

    #[rstest]
    #[case("AccountGroupsCommand", "account-groups")]
    #[case("InstancesCommand", "instances")]
    #[case("HTTPProxyCommand", "http-proxy")]
    #[case("Instances::ListCommand", "instances-list")]
    #[case("Load_BalancersCommand", "load-balancers")]
    #[case("Ipv4AddressesCommand", "ipv4-addresses")]
    #[case("Command", "command")]
    #[case("CommandsCommand", "commands")]
    #[case("echo", "echo")]
    fn test_cliize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(cliize(input), expected);
    }

    #[test]
    fn test_cliize_is_deterministic() {
        assert_eq!(cliize("ServerTypesCommand"), cliize("ServerTypesCommand"));
        assert_eq!(cliize("ServerTypesCommand"), "server-types");
        assert_eq!(cliize("CloudIPsCommand"), "cloud-i-ps");
    }

    struct ServerGroupsCommand;

    #[test]
    fn test_default_name_strips_module_path() {
        assert_eq!(default_name::<ServerGroupsCommand>(), "server-groups");
        assert_eq!(default_name::<Vec<ServerGroupsCommand>>(), "vec");
    }

    #[test]
    fn test_last_registration_wins() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();

        let first = calls.clone();
        registry.register_fn(
            "get",
            move |_args, _session| {
                first.borrow_mut().push("first");
                Ok(Outcome::Nothing)
            },
            false,
        );
        let second = calls.clone();
        registry.register_fn(
            "get",
            move |_args, _session| {
                second.borrow_mut().push("second");
                Ok(Outcome::Nothing)
            },
            false,
        );

        assert_eq!(registry.list_commands().len(), 1);

        let mut session = Session::new(Registry::new());
        let mut handler = registry.lookup("get").unwrap().instantiate();
        handler.handle(&[], &mut session).unwrap();
        assert_eq!(*calls.borrow(), vec!["second"]);
    }

    #[test]
    fn test_unregister() {
        let mut registry = Registry::new();
        noop(&mut registry, "list", false);
        registry.unregister("list");
        registry.unregister("never-registered");
        assert!(registry.lookup("list").is_none());
    }

    #[test]
    fn test_hidden_commands_are_not_listed_but_resolve() {
        let mut registry = Registry::new();
        noop(&mut registry, "list", false);
        noop(&mut registry, "debug-dump", true);

        let listed: Vec<&str> = registry.list_commands().into_keys().collect();
        assert_eq!(listed, vec!["list"]);
        assert!(registry.lookup("debug-dump").unwrap().is_hidden());
    }

    #[rstest]
    #[case("foo", "foo", BadAlias::SelfReference("foo".to_string()))]
    #[case("foo", " FOO ", BadAlias::SelfReference("foo".to_string()))]
    #[case("list", "anything", BadAlias::ShadowsCommand("list".to_string()))]
    #[case("", "list", BadAlias::InvalidName(String::new()))]
    #[case("my alias", "list", BadAlias::InvalidName("my alias".to_string()))]
    #[case("a&&b", "list", BadAlias::InvalidName("a&&b".to_string()))]
    #[case("empty", "   ", BadAlias::EmptyExpansion("empty".to_string()))]
    fn test_bad_aliases(#[case] name: &str, #[case] command: &str, #[case] expected: BadAlias) {
        let mut registry = Registry::new();
        noop(&mut registry, "list", false);
        assert_eq!(registry.register_alias(name, command), Err(expected));
        assert!(registry.list_aliases().is_empty());
    }

    #[test]
    fn test_alias_cannot_shadow_hidden_command() {
        let mut registry = Registry::new();
        noop(&mut registry, "secret", true);
        assert_eq!(
            registry.register_alias("secret", "list"),
            Err(BadAlias::ShadowsCommand("secret".to_string()))
        );
    }

    #[test]
    fn test_alias_lifecycle() {
        let mut registry = Registry::new();
        registry
            .register_alias("mine", "  instances list -g mygroup ")
            .unwrap();
        assert_eq!(registry.alias("mine"), Some("instances list -g mygroup"));

        registry.register_alias("mine", "instances list").unwrap();
        assert_eq!(registry.list_aliases().len(), 1);
        assert_eq!(registry.alias("mine"), Some("instances list"));

        assert_eq!(
            registry.unregister_alias("mine"),
            Some("instances list".to_string())
        );
        assert_eq!(registry.unregister_alias("mine"), None);
    }

    #[test]
    fn test_command_registration_drops_same_named_alias() {
        let mut registry = Registry::new();
        registry.register_alias("ls", "instances list").unwrap();
        noop(&mut registry, "ls", false);
        assert_eq!(registry.alias("ls"), None);
        assert!(registry.lookup("ls").is_some());
    }

    #[test]
    fn test_suggestion_cache_follows_mutations() {
        let mut registry = Registry::new();
        noop(&mut registry, "instances", false);
        assert_eq!(registry.suggest("instanc"), vec!["instances"]);

        registry.unregister("instances");
        assert!(registry.suggest("instanc").is_empty());

        registry.register_alias("instance-types", "types list").unwrap();
        assert_eq!(registry.suggest("instanc"), vec!["instance-types"]);
    }

    #[test]
    fn test_suggestions_skip_hidden_commands() {
        let mut registry = Registry::new();
        noop(&mut registry, "images", false);
        noop(&mut registry, "image-debug", true);
        assert_eq!(registry.suggest("imag"), vec!["images"]);
    }

    #[test]
    fn test_builtins_are_registered_by_type_name() {
        let registry = Registry::with_builtins();
        for name in ["alias", "unalias", "echo", "help", "exit", "true", "false"] {
            assert!(registry.lookup(name).is_some(), "missing builtin {name}");
        }
        assert!(registry.lookup("true").unwrap().is_hidden());
    }
}
