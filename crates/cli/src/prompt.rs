//! Interactive collection of export parameters.

use aphrc_core::config::{normalize_port, PartialRemoteDbConfig, RemoteDbConfig};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};

use crate::error::{WorkflowError, WorkflowResult};

/// Source of answers for missing export parameters.
pub trait Prompter: Send + Sync {
    /// Ask for a visible line of text. Empty answers are allowed.
    fn input(&self, prompt: &str) -> WorkflowResult<String>;

    /// Ask for a secret without echoing it.
    fn password(&self, prompt: &str) -> WorkflowResult<String>;
}

/// Terminal prompts through `dialoguer`.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Prompter for DialoguerPrompter {
    fn input(&self, prompt: &str) -> WorkflowResult<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| WorkflowError::Prompt(e.to_string()))
    }

    fn password(&self, prompt: &str) -> WorkflowResult<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| WorkflowError::Prompt(e.to_string()))
    }
}

/// Turn `partial` into a full export target.
///
/// When every text field is already known nothing is asked. Otherwise
/// each missing field is prompted for, port included; a blank port
/// answer means 5432.
pub fn resolve_remote_config<P: Prompter + ?Sized>(
    partial: PartialRemoteDbConfig,
    prompter: &P,
) -> WorkflowResult<RemoteDbConfig> {
    if let Some(config) = partial.complete()? {
        validate(&config)?;
        return Ok(config);
    }

    let dbname = ask(partial.dbname, || prompter.input("Database name"))?;
    let user = ask(partial.user, || prompter.input("Username"))?;
    let password = ask(partial.password, || prompter.password("Password"))?;
    let host = ask(partial.host, || prompter.input("Host"))?;
    let port = ask(partial.port, || prompter.input("Port (default 5432)"))?;

    let config = RemoteDbConfig {
        dbname: dbname.trim().to_string(),
        user: user.trim().to_string(),
        password,
        host: host.trim().to_string(),
        port: normalize_port(&port)?,
    };
    validate(&config)?;
    Ok(config)
}

fn ask<F>(known: Option<String>, prompt: F) -> WorkflowResult<String>
where
    F: FnOnce() -> WorkflowResult<String>,
{
    match known {
        Some(value) => Ok(value),
        None => prompt(),
    }
}

fn validate(config: &RemoteDbConfig) -> WorkflowResult<()> {
    for (field, value) in [
        ("database name", &config.dbname),
        ("username", &config.user),
        ("host", &config.host),
    ] {
        if value.trim().is_empty() {
            return Err(WorkflowError::InvalidInput(format!("{field} must not be empty")));
        }
    }
    Ok(())
}
