use argh::FromArgs;
use command_flow::command::{FAILURE, NOT_FOUND, SUCCESS, USAGE};
use command_flow::{
    AliasStore, BuiltinCommand, CommandError, CommandResult, Interpreter, MemWriter, Outcome,
    ParseError, Registry, Session, Settings,
};
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::TempDir;

#[derive(FromArgs)]
/// list or show instances.
struct InstancesCommand {
    #[argh(option, short = 'g')]
    /// only instances of this group.
    group: Option<String>,

    #[argh(positional)]
    /// instance id to show.
    id: Option<u32>,
}

impl BuiltinCommand for InstancesCommand {
    fn execute(self, session: &mut Session) -> anyhow::Result<Outcome> {
        match self.id {
            Some(0) => Ok((1, "no instance with id 0").into()),
            Some(id) => {
                writeln!(session.stdout, "instance {id}")?;
                Ok(Outcome::Nothing)
            }
            None => {
                let group = self.group.unwrap_or_else(|| "all".to_string());
                writeln!(session.stdout, "instances in {group}")?;
                Ok(Outcome::Nothing)
            }
        }
    }
}

#[derive(FromArgs)]
/// print the server count.
struct ServerGroupsCommand {}

impl BuiltinCommand for ServerGroupsCommand {
    fn execute(self, _session: &mut Session) -> anyhow::Result<Outcome> {
        let mut fields = BTreeMap::new();
        fields.insert("exit_code".to_string(), "3".to_string());
        fields.insert("err".to_string(), "no server groups".to_string());
        Ok(Outcome::Map(fields))
    }
}

fn interpreter(settings: &Settings) -> (Interpreter, MemWriter) {
    let mut registry = Registry::with_builtins();
    registry.register_builtin::<InstancesCommand>();
    registry.register_builtin::<ServerGroupsCommand>();
    let out = MemWriter::new();
    let sh = Interpreter::with_settings(registry, settings).with_output(Box::new(out.clone()));
    (sh, out)
}

#[test]
fn commands_register_under_cliized_type_names() {
    let (sh, _) = interpreter(&Settings::default());
    let names: Vec<&str> = sh.registry().list_commands().into_keys().collect();
    assert!(names.contains(&"instances"));
    assert!(names.contains(&"server-groups"));
    assert!(!names.contains(&"true"));
}

#[test]
fn chained_commands_share_one_output() {
    let (mut sh, out) = interpreter(&Settings::default());
    let res = sh
        .execute(r#"instances -g "web tier" && instances 7 || echo unreachable"#)
        .unwrap();
    assert_eq!(res, CommandResult::success());
    assert_eq!(out.contents(), "instances in web tier\ninstance 7\n");
}

#[test]
fn reported_failure_triggers_fallback() {
    let (mut sh, out) = interpreter(&Settings::default());
    let res = sh.execute("instances 0 || echo fallback").unwrap();
    assert_eq!(res, CommandResult::success());
    assert_eq!(out.contents(), "fallback\n");

    let res = sh.execute("instances 0 && echo never").unwrap();
    assert_eq!(
        res,
        CommandResult::failure(
            FAILURE,
            CommandError::Reported("no instance with id 0".to_string())
        )
    );
}

#[test]
fn map_results_are_normalized() {
    let (mut sh, _) = interpreter(&Settings::default());
    let res = sh.execute("server-groups").unwrap();
    assert_eq!(
        res,
        CommandResult::failure(3, CommandError::Reported("no server groups".to_string()))
    );
}

#[test]
fn unknown_singular_suggests_the_plural() {
    let (mut sh, _) = interpreter(&Settings::default());
    let res = sh.execute("instance 5").unwrap();
    assert_eq!(res.exit_code, NOT_FOUND);
    let err = res.error.unwrap();
    assert_eq!(
        err.to_string(),
        "`instance` is not a command, did you mean `instances`?"
    );
}

#[test]
fn pipes_are_rejected_before_anything_runs() {
    let (mut sh, out) = interpreter(&Settings::default());
    let res = sh.execute("echo first && (instances | echo x)").unwrap();
    assert_eq!(
        res,
        CommandResult::failure(USAGE, ParseError::PipeUnsupported.into())
    );
    assert_eq!(out.contents(), "");
}

#[test]
fn usage_errors_print_help_and_fail() {
    let (mut sh, out) = interpreter(&Settings::default());
    let res = sh.execute("instances --bogus").unwrap();
    assert_eq!(res.exit_code, FAILURE);
    assert!(!out.contents().is_empty());

    out.clear();
    let res = sh.execute("instances --help").unwrap();
    assert_eq!(res.exit_code, SUCCESS);
    assert!(out.contents().contains("Usage: instances"));
}

#[test]
fn aliases_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let store = AliasStore::new(dir.path().join("aliases.toml"));

    {
        let (mut sh, _) = interpreter(&Settings::default());
        sh.session_mut().alias_store = Some(store.clone());
        let res = sh.execute("alias web instances -g web").unwrap();
        assert!(res.is_success());
    }

    let (mut sh, out) = interpreter(&Settings::default());
    assert_eq!(store.apply(sh.registry_mut()).unwrap(), 1);
    sh.session_mut().alias_store = Some(store.clone());

    assert!(sh.execute("web && web 4").unwrap().is_success());
    assert_eq!(out.contents(), "instances in web\ninstance 4\n");

    assert!(sh.execute("unalias web").unwrap().is_success());
    assert!(store.load().unwrap().is_empty());
    assert_eq!(sh.execute("web").unwrap().exit_code, NOT_FOUND);
}

#[test]
fn alias_file_entries_that_shadow_commands_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aliases.toml");
    std::fs::write(
        &path,
        "[aliases]\necho = \"instances\"\nall = \"instances\"\nloop = \"loop\"\n",
    )
    .unwrap();

    let mut registry = Registry::with_builtins();
    let applied = AliasStore::new(&path).apply(&mut registry).unwrap();
    assert_eq!(applied, 1);
    assert_eq!(registry.alias("all"), Some("instances"));
    assert_eq!(registry.alias("echo"), None);
}

#[test]
fn strict_settings_reject_opaque_results() {
    let settings = Settings {
        strict_results: true,
        ..Settings::default()
    };
    let (mut sh, _) = interpreter(&settings);
    sh.registry_mut()
        .register_fn("odd", |_args, _session| Ok(Outcome::Other(Box::new('x'))), false);

    let res = sh.execute("odd || echo recovered").unwrap();
    assert!(res.is_success());

    let res = sh.execute("odd").unwrap();
    assert_eq!(
        res,
        CommandResult::failure(FAILURE, CommandError::UnrecognizedOutput)
    );
}

#[test]
fn interpreter_survives_faults() {
    let (mut sh, out) = interpreter(&Settings::default());
    sh.registry_mut().register_fn(
        "explode",
        |_args, _session| -> anyhow::Result<Outcome> { panic!("handler bug") },
        true,
    );

    let res = sh.execute("echo before && explode && echo after").unwrap();
    assert_eq!(
        res,
        CommandResult::failure(FAILURE, CommandError::Panicked("handler bug".to_string()))
    );
    assert_eq!(out.contents(), "before\n");

    assert!(sh.execute("echo again").unwrap().is_success());
}
