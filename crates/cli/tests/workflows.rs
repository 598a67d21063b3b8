//! Workflow tests with in-memory fakes for the backend, the command
//! runner and the prompter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use aphrc_cli::app;
use aphrc_cli::backend::container::{ContainerBackend, EXPORT_SCRIPT, EXTRACT_SCRIPT};
use aphrc_cli::backend::{ExportSummary, ExtractSummary, WorksBackend};
use aphrc_cli::bootstrap::Environment;
use aphrc_cli::cli::Command;
use aphrc_cli::error::{WorkflowError, WorkflowResult};
use aphrc_cli::export;
use aphrc_cli::import::{self, ImportOptions};
use aphrc_cli::prompt::Prompter;
use aphrc_core::config::{EnvironmentConfig, PartialRemoteDbConfig, RemoteDbConfig};
use aphrc_core::docker::Docker;
use aphrc_core::process::{CommandOutput, CommandRunner, ProcessError};
use aphrc_core::readiness::ReadinessConfig;
use assert_matches::assert_matches;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Records every step it is asked to perform.
#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<&'static str>>,
    rows: i64,
    fail_on: Option<&'static str>,
    exported_to: Mutex<Option<RemoteDbConfig>>,
}

impl FakeBackend {
    fn with_rows(rows: i64) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    fn failing_on(step: &'static str) -> Self {
        Self {
            fail_on: Some(step),
            ..Default::default()
        }
    }

    fn step(&self, name: &'static str) -> WorkflowResult<()> {
        self.calls.lock().unwrap().push(name);
        if self.fail_on == Some(name) {
            return Err(WorkflowError::InvalidInput(format!("{name} failed")));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl WorksBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn prepare(&self) -> WorkflowResult<()> {
        self.step("prepare")
    }

    async fn install_extraction_dependencies(&self) {
        self.calls.lock().unwrap().push("install_extraction");
    }

    async fn stage_extraction(&self) -> WorkflowResult<()> {
        self.step("stage_extraction")
    }

    async fn truncate(&self) -> WorkflowResult<()> {
        self.step("truncate")
    }

    async fn extract(&self) -> WorkflowResult<ExtractSummary> {
        self.step("extract")?;
        Ok(ExtractSummary {
            source: "sample".into(),
            works: Some(10),
            inserted: Some(10),
        })
    }

    async fn install_report_dependencies(&self) {
        self.calls.lock().unwrap().push("install_report");
    }

    async fn verify(&self) -> WorkflowResult<()> {
        self.step("verify")
    }

    async fn count(&self) -> WorkflowResult<i64> {
        self.step("count")?;
        Ok(self.rows)
    }

    async fn stage_export(&self) -> WorkflowResult<()> {
        self.step("stage_export")
    }

    async fn export(&self, remote: &RemoteDbConfig) -> WorkflowResult<ExportSummary> {
        self.step("export")?;
        *self.exported_to.lock().unwrap() = Some(remote.clone());
        Ok(ExportSummary::default())
    }
}

/// Answers every prompt with the same text, except the port prompt when
/// `port_answer` is set, and counts the calls.
struct CountingPrompter {
    answer: String,
    port_answer: Option<String>,
    calls: AtomicUsize,
}

impl CountingPrompter {
    fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            port_answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_port(mut self, port: &str) -> Self {
        self.port_answer = Some(port.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Prompter for CountingPrompter {
    fn input(&self, prompt: &str) -> WorkflowResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.port_answer {
            Some(port) if prompt.starts_with("Port") => Ok(port.clone()),
            _ => Ok(self.answer.clone()),
        }
    }

    fn password(&self, prompt: &str) -> WorkflowResult<String> {
        self.input(prompt)
    }
}

type Reply = Box<dyn Fn(&[String]) -> CommandOutput + Send + Sync>;

/// Command runner that records `docker` invocations and answers them
/// with a closure.
struct FakeDocker {
    calls: Mutex<Vec<Vec<String>>>,
    reply: Reply,
}

impl FakeDocker {
    fn new(reply: impl Fn(&[String]) -> CommandOutput + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::default(),
            reply: Box::new(reply),
        }
    }
}

impl CommandRunner for FakeDocker {
    async fn run(&self, _program: &str, args: &[String]) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(args.to_vec());
        Ok((self.reply)(args))
    }
}

fn out(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        ..Default::default()
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        stderr: stderr.to_string(),
        exit_code: 1,
        ..Default::default()
    }
}

/// Fake runner where both containers run and the database answers.
fn healthy(args: &[String]) -> CommandOutput {
    match args.first().map(String::as_str) {
        Some("ps") => out("openalex_db\nopenalex_runner\n"),
        _ => out(""),
    }
}

fn environment(runner: FakeDocker, config: EnvironmentConfig) -> Environment<FakeDocker> {
    let mut env = Environment::new(Docker::new(runner), config);
    env.readiness = ReadinessConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        multiplier: 2.0,
        timeout: Duration::from_millis(30),
    };
    env
}

fn calls(env: &Environment<FakeDocker>) -> Vec<Vec<String>> {
    env.docker.runner().calls.lock().unwrap().clone()
}

fn is_sql(call: &[String], fragment: &str) -> bool {
    call.first().map(String::as_str) == Some("exec")
        && call.iter().any(|a| a == "psql")
        && call.last().is_some_and(|sql| sql.contains(fragment))
}

fn scripts_dir(scripts: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for script in scripts {
        std::fs::write(dir.path().join(script), "print('ok')\n").unwrap();
    }
    dir
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_runs_steps_in_order() {
    let backend = FakeBackend::default();
    let summary = import::run(&backend, ImportOptions::default()).await.unwrap();

    assert_eq!(summary.source, "sample");
    assert_eq!(
        backend.calls(),
        [
            "install_extraction",
            "stage_extraction",
            "prepare",
            "truncate",
            "extract",
            "install_report",
            "verify",
        ]
    );
}

#[tokio::test]
async fn skip_verify_stops_after_extraction() {
    let backend = FakeBackend::default();
    import::run(&backend, ImportOptions { skip_verify: true })
        .await
        .unwrap();
    assert_eq!(backend.calls().last(), Some(&"extract"));
}

#[tokio::test]
async fn failed_copy_aborts_before_truncate() {
    let backend = FakeBackend::failing_on("stage_extraction");
    let err = import::run(&backend, ImportOptions::default()).await.unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(!backend.calls().contains(&"truncate"));
}

#[tokio::test]
async fn failed_extraction_skips_verification() {
    let backend = FakeBackend::failing_on("extract");
    let err = import::run(&backend, ImportOptions::default()).await.unwrap_err();

    assert_matches!(err, WorkflowError::InvalidInput(ref m) if m == "extract failed");
    assert!(!backend.calls().contains(&"verify"));
}

#[tokio::test]
async fn unready_database_never_truncates() {
    let env = environment(
        FakeDocker::new(|args| match args.first().map(String::as_str) {
            Some("ps") => out("openalex_db\nopenalex_runner\n"),
            _ => failed("could not connect to server"),
        }),
        EnvironmentConfig::default(),
    );
    let backend = ContainerBackend::new(&env);

    let result: WorkflowResult<()> = async {
        env.ensure_running().await?;
        import::run(&backend, ImportOptions::default()).await?;
        Ok(())
    }
    .await;

    let err = result.unwrap_err();
    assert_matches!(err, WorkflowError::NotReady(ref e) if e.target == "openalex_db");
    assert!(!calls(&env).iter().any(|c| is_sql(c, "TRUNCATE")));
}

#[tokio::test]
async fn container_import_copies_and_runs_extraction() {
    let dir = scripts_dir(&[EXTRACT_SCRIPT]);
    let env = environment(
        FakeDocker::new(|args| {
            if args.iter().any(|a| a == "pip") {
                failed("no network")
            } else {
                healthy(args)
            }
        }),
        EnvironmentConfig {
            scripts_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let backend = ContainerBackend::new(&env);

    import::run(&backend, ImportOptions { skip_verify: true })
        .await
        .unwrap();

    let calls = calls(&env);
    let copy = calls.iter().position(|c| c[0] == "cp").unwrap();
    let truncate = calls
        .iter()
        .position(|c| is_sql(c, "TRUNCATE TABLE aphrc_works"))
        .unwrap();
    let run = calls
        .iter()
        .position(|c| c[0] == "exec" && c.iter().any(|a| a == "/app/extract_aphrc_from_snapshot.py"))
        .unwrap();

    assert!(copy < truncate && truncate < run);
    assert_eq!(calls[copy][2], "openalex_runner:/app/extract_aphrc_from_snapshot.py");
}

#[tokio::test]
async fn missing_extraction_script_is_reported() {
    let dir = scripts_dir(&[]);
    let env = environment(
        FakeDocker::new(healthy),
        EnvironmentConfig {
            scripts_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let backend = ContainerBackend::new(&env);

    let err = import::run(&backend, ImportOptions::default()).await.unwrap_err();
    assert_matches!(err, WorkflowError::ScriptNotFound(ref p) if p.ends_with(EXTRACT_SCRIPT));
    assert!(!calls(&env).iter().any(|c| is_sql(c, "TRUNCATE")));
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_table_exits_one_without_prompting() {
    let backend = FakeBackend::with_rows(0);
    let prompter = CountingPrompter::answering("x");

    let err = export::run(&backend, PartialRemoteDbConfig::default(), &prompter)
        .await
        .unwrap_err();

    assert_matches!(err, WorkflowError::NoRecords);
    assert_eq!(err.exit_code(), 1);
    assert_eq!(prompter.calls(), 0);
    assert!(!backend.calls().contains(&"stage_export"));
    assert!(!backend.calls().contains(&"export"));
}

#[tokio::test]
async fn prompts_for_every_missing_field() {
    let backend = FakeBackend::with_rows(3);
    let prompter = CountingPrompter::answering("");
    let partial = PartialRemoteDbConfig {
        dbname: Some("works".into()),
        ..Default::default()
    };

    // Blank answers for user and host are rejected after prompting.
    let err = export::run(&backend, partial, &prompter).await.unwrap_err();
    assert_matches!(err, WorkflowError::InvalidInput(_));
    assert_eq!(prompter.calls(), 4);
    assert!(!backend.calls().contains(&"export"));
}

#[tokio::test]
async fn exports_with_resolved_config() {
    let backend = FakeBackend::with_rows(5);
    let prompter = CountingPrompter::answering("unused");
    let partial = PartialRemoteDbConfig {
        dbname: Some("works".into()),
        user: Some("alice".into()),
        password: Some("pw".into()),
        host: Some("db.example".into()),
        port: Some("6543".into()),
    };

    export::run(&backend, partial, &prompter).await.unwrap();

    assert_eq!(prompter.calls(), 0);
    assert_eq!(
        backend.calls(),
        ["prepare", "count", "stage_export", "export"]
    );
    let remote = backend.exported_to.lock().unwrap().clone().unwrap();
    assert_eq!(remote.port, 6543);
}

#[tokio::test]
async fn container_export_passes_default_port() {
    let dir = scripts_dir(&[EXPORT_SCRIPT]);
    let env = environment(
        FakeDocker::new(|args| {
            if is_sql(args, "COUNT(*)") {
                out("   120\n\n")
            } else {
                healthy(args)
            }
        }),
        EnvironmentConfig {
            scripts_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let backend = ContainerBackend::new(&env);
    let prompter = CountingPrompter::answering("unused");
    let partial = PartialRemoteDbConfig {
        dbname: Some("works".into()),
        user: Some("alice".into()),
        password: Some("pw".into()),
        host: Some("db.example".into()),
        port: Some("".into()),
    };

    export::run(&backend, partial, &prompter).await.unwrap();

    let calls = calls(&env);
    let run = calls
        .iter()
        .find(|c| c[0] == "exec" && c.iter().any(|a| a == "/app/export_to_remote.py"))
        .unwrap();
    assert_eq!(
        run[run.len() - 5..],
        ["works", "alice", "pw", "db.example", "5432"]
    );
}

#[tokio::test]
async fn nothing_supplied_prompts_five_times_and_defaults_port() {
    let backend = FakeBackend::with_rows(120);
    let prompter = CountingPrompter::answering("x").with_port("");

    export::run(&backend, PartialRemoteDbConfig::default(), &prompter)
        .await
        .unwrap();

    assert_eq!(prompter.calls(), 5);
    let remote = backend.exported_to.lock().unwrap().clone().unwrap();
    assert_eq!(remote.to_args(), ["x", "x", "x", "x", "5432"].map(String::from));
}

#[tokio::test]
async fn container_export_with_prompted_blank_port() {
    let dir = scripts_dir(&[EXPORT_SCRIPT]);
    let env = environment(
        FakeDocker::new(|args| {
            if is_sql(args, "COUNT(*)") {
                out(" 120\n")
            } else {
                healthy(args)
            }
        }),
        EnvironmentConfig {
            scripts_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
    );
    let backend = ContainerBackend::new(&env);
    let prompter = CountingPrompter::answering("x").with_port("");

    export::run(&backend, PartialRemoteDbConfig::default(), &prompter)
        .await
        .unwrap();

    assert_eq!(prompter.calls(), 5);
    let calls = calls(&env);
    let run = calls
        .iter()
        .find(|c| c[0] == "exec" && c.iter().any(|a| a == "/app/export_to_remote.py"))
        .unwrap();
    assert_eq!(run.last().map(String::as_str), Some("5432"));
}

#[tokio::test]
async fn blank_env_values_are_prompted_for() {
    let backend = FakeBackend::with_rows(1);
    let prompter = CountingPrompter::answering("db.example").with_port("");
    let partial = PartialRemoteDbConfig::from_lookup(|key| {
        match key {
            "REMOTE_DB_NAME" => Some("works"),
            "REMOTE_DB_USER" => Some("alice"),
            "REMOTE_DB_PASSWORD" => Some("pw"),
            "REMOTE_DB_HOST" => Some(""),
            _ => None,
        }
        .map(String::from)
    });

    export::run(&backend, partial, &prompter).await.unwrap();

    // Host and port.
    assert_eq!(prompter.calls(), 2);
    let remote = backend.exported_to.lock().unwrap().clone().unwrap();
    assert_eq!(remote.host, "db.example");
    assert_eq!(remote.port, 5432);
}

// ---------------------------------------------------------------------------
// Bootstrap and dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn running_containers_are_not_restarted() {
    let env = environment(FakeDocker::new(healthy), EnvironmentConfig::default());
    let outcome = env.ensure_running().await.unwrap();

    assert!(!outcome.started);
    assert_eq!(outcome.probe_attempts, 1);
    assert!(!calls(&env).iter().any(|c| c[0] == "compose"));
}

#[tokio::test]
async fn missing_runner_starts_compose_then_probes() {
    let env = environment(
        FakeDocker::new(|args| match args.first().map(String::as_str) {
            Some("ps") => out("openalex_db\n"),
            _ => out(""),
        }),
        EnvironmentConfig::default(),
    );
    let outcome = env.ensure_running().await.unwrap();
    assert!(outcome.started);

    let calls = calls(&env);
    let compose = calls.iter().position(|c| c[0] == "compose").unwrap();
    let probe = calls.iter().position(|c| is_sql(c, "SELECT 1")).unwrap();
    assert!(compose < probe);
    assert_eq!(calls[compose], ["compose", "-f", "docker-compose.yml", "up", "-d"]);
}

#[tokio::test]
async fn readiness_check_connects_over_tcp() {
    let env = environment(FakeDocker::new(healthy), EnvironmentConfig::default());
    env.wait_for_database().await.unwrap();

    let calls = calls(&env);
    let probe = calls.iter().find(|c| is_sql(c, "SELECT 1")).unwrap();
    let host = probe.iter().position(|a| a == "-h").unwrap();
    assert_eq!(probe[host + 1], "127.0.0.1");
}

#[tokio::test]
async fn count_command_prepares_then_counts() {
    let backend = FakeBackend::with_rows(42);
    let prompter = CountingPrompter::answering("");
    app::dispatch(&backend, Command::Count, &prompter).await.unwrap();
    assert_eq!(backend.calls(), ["prepare", "count"]);
}
