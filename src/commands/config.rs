use clap::{Subcommand, ValueEnum};
use serde_json::{Value, json};

use crate::app::Runtime;
use crate::config::{ProfileConfig, validate_url};
use crate::errors::{CliError, redact_secret};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file and store the browser session for the active profile
    Init {
        #[arg(long = "api-url")]
        api_url: Option<String>,
        /// Value of the `sessionid` cookie from a logged-in browser
        #[arg(long)]
        session: Option<String>,
    },
    /// Read a config key from the active profile
    Get {
        key: ConfigKey,
        /// Print secrets unredacted
        #[arg(long)]
        show_secret: bool,
    },
    /// Set a config key on the active profile
    Set { key: ConfigKey, value: String },
    /// List all profiles
    Profiles,
    /// Switch active profile
    Use { profile: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    #[value(name = "apiUrl")]
    ApiUrl,
    #[value(name = "session")]
    Session,
    #[value(name = "csrfToken")]
    CsrfToken,
    #[value(name = "persistSession")]
    PersistSession,
}

impl ConfigKey {
    fn name(self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "apiUrl",
            ConfigKey::Session => "session",
            ConfigKey::CsrfToken => "csrfToken",
            ConfigKey::PersistSession => "persistSession",
        }
    }

    fn is_secret(self) -> bool {
        matches!(self, ConfigKey::Session | ConfigKey::CsrfToken)
    }
}

pub async fn handle(runtime: &mut Runtime, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Init { api_url, session } => init(runtime, api_url, session),
        ConfigCommand::Get { key, show_secret } => get(runtime, key, show_secret),
        ConfigCommand::Set { key, value } => set(runtime, key, value),
        ConfigCommand::Profiles => profiles(runtime),
        ConfigCommand::Use { profile } => use_profile(runtime, profile),
    }
}

fn init(
    runtime: &mut Runtime,
    api_url: Option<String>,
    session: Option<String>,
) -> Result<(), CliError> {
    let name = runtime.active_profile();
    let session = match session {
        Some(value) => Some(value),
        None if can_prompt(runtime) => prompt_session()?,
        None => None,
    };

    let profile = runtime.config.profile_entry(&name);
    if let Some(url) = api_url {
        apply_key(profile, ConfigKey::ApiUrl, &url)?;
    }
    if let Some(value) = session {
        apply_key(profile, ConfigKey::Session, &value)?;
    }
    runtime.config.profile = name;
    runtime.save_config()?;

    let path = runtime.config_path.display().to_string();
    acknowledge(
        runtime,
        json!({ "ok": true, "path": path }),
        &format!("Config initialized: {path}"),
    )
}

fn get(runtime: &mut Runtime, key: ConfigKey, show_secret: bool) -> Result<(), CliError> {
    let name = runtime.active_profile();
    let profile = runtime.config.profile(&name).ok_or_else(|| {
        CliError::Usage(format!(
            "Profile '{name}' not found. Run `resumax config init` first."
        ))
    })?;

    let value = match key {
        ConfigKey::ApiUrl => Some(profile.api_url.clone()),
        ConfigKey::PersistSession => Some(profile.persist_session.to_string()),
        // Secrets honour the environment overrides.
        ConfigKey::Session => runtime.resolved_session_id(),
        ConfigKey::CsrfToken => runtime.resolved_csrf_token(),
    };
    let value = value.map(|v| {
        if key.is_secret() && !show_secret {
            redact_secret(&v)
        } else {
            v
        }
    });

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "key": key.name(), "value": value }))?;
    } else {
        runtime
            .output
            .print_human(value.as_deref().unwrap_or("(not set)"));
    }
    Ok(())
}

fn set(runtime: &mut Runtime, key: ConfigKey, value: String) -> Result<(), CliError> {
    let name = runtime.active_profile();
    apply_key(runtime.config.profile_entry(&name), key, &value)?;
    runtime.save_config()?;
    tracing::info!(profile = %name, key = key.name(), "config updated");
    acknowledge(runtime, json!({ "ok": true }), "Config updated.")
}

fn profiles(runtime: &mut Runtime) -> Result<(), CliError> {
    let active = runtime.active_profile();

    if runtime.output.json {
        let payload: Vec<Value> = runtime
            .config
            .profiles
            .iter()
            .map(|(name, profile)| {
                json!({
                    "name": name,
                    "active": *name == active,
                    "apiUrl": profile.api_url,
                    "hasSession": profile.has_session(),
                    "persistSession": profile.persist_session,
                })
            })
            .collect();
        return runtime.output.print_json(&json!({ "profiles": payload }));
    }

    for (name, profile) in &runtime.config.profiles {
        let marker = if *name == active { "*" } else { " " };
        runtime
            .output
            .print_human(&format!("{marker} {name}  {}", profile.api_url));
    }
    Ok(())
}

fn use_profile(runtime: &mut Runtime, name: String) -> Result<(), CliError> {
    runtime.config.profile_entry(&name);
    runtime.config.profile = name.clone();
    runtime.save_config()?;
    acknowledge(
        runtime,
        json!({ "ok": true, "profile": name }),
        &format!("Active profile: {name}"),
    )
}

/// Writes one key onto a profile. Blank secrets clear the stored value.
fn apply_key(profile: &mut ProfileConfig, key: ConfigKey, value: &str) -> Result<(), CliError> {
    let value = value.trim();
    match key {
        ConfigKey::ApiUrl => {
            validate_url(value)?;
            profile.api_url = value.to_string();
        }
        ConfigKey::Session => profile.session_id = non_blank(value),
        ConfigKey::CsrfToken => profile.csrf_token = non_blank(value),
        ConfigKey::PersistSession => profile.persist_session = parse_bool(value)?,
    }
    Ok(())
}

fn non_blank(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn acknowledge(runtime: &Runtime, payload: Value, message: &str) -> Result<(), CliError> {
    if runtime.output.json {
        runtime.output.print_json(&payload)
    } else {
        runtime.output.print_human(message);
        Ok(())
    }
}

fn can_prompt(runtime: &Runtime) -> bool {
    let ci = std::env::var("CI").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    !ci && !runtime.output.json && !runtime.output.quiet
}

fn prompt_session() -> Result<Option<String>, CliError> {
    let entered = rpassword::prompt_password("Session cookie (optional, Enter to skip): ")
        .map_err(|e| CliError::Generic(format!("Failed reading session: {e}")))?;
    Ok(non_blank(entered.trim()))
}

fn parse_bool(value: &str) -> Result<bool, CliError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CliError::Usage(format!(
            "Expected true or false, got '{other}'."
        ))),
    }
}
