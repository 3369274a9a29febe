use std::path::PathBuf;

use crate::api::ApiClient;
use crate::client::session::{FileStore, MemoryStore, Session, SessionStore};
use crate::config::{CliConfig, cookie_header};
use crate::errors::CliError;
use crate::output::OutputMode;

#[derive(Debug, Clone)]
pub struct Runtime {
    pub output: OutputMode,
    pub config: CliConfig,
    pub config_path: PathBuf,
    pub profile_override: Option<String>,
    pub api_url_override: Option<String>,
    pub timeout_ms: u64,
}

impl Runtime {
    pub fn active_profile(&self) -> String {
        self.config.active_name(self.profile_override.as_deref())
    }

    pub fn resolved_api_url(&self) -> Result<String, CliError> {
        self.config
            .api_url(&self.active_profile(), self.api_url_override.as_deref())
    }

    pub fn resolved_session_id(&self) -> Option<String> {
        self.config.session_id(&self.active_profile())
    }

    pub fn resolved_csrf_token(&self) -> Option<String> {
        self.config.csrf_token(&self.active_profile())
    }

    pub fn cookie(&self) -> Option<String> {
        cookie_header(
            self.resolved_session_id().as_deref(),
            self.resolved_csrf_token().as_deref(),
        )
    }

    pub fn api_client(&self) -> Result<ApiClient, CliError> {
        let session = self.resolved_session_id();
        if session.is_none() {
            tracing::warn!("no session configured; the backend will likely ask for a login");
        }
        ApiClient::new(
            self.resolved_api_url()?,
            self.cookie(),
            self.timeout_ms,
            self.output.debug,
        )
    }

    /// Whether the TUI's thread pointer should outlive this process.
    pub fn persists_session(&self, flag: bool) -> bool {
        flag || self
            .config
            .profile(&self.active_profile())
            .is_some_and(|p| p.persist_session)
    }

    pub fn save_config(&self) -> Result<(), CliError> {
        self.config.save_to(&self.config_path)
    }

    /// Session for the interactive client: durable when the flag or profile asks for it.
    pub fn tui_session(&self, persist: bool) -> Result<Session, CliError> {
        let store: Box<dyn SessionStore> = if self.persists_session(persist) {
            Box::new(FileStore::for_profile(&self.active_profile())?)
        } else {
            Box::new(MemoryStore::new())
        };
        Ok(Session::restore(store))
    }

    /// Session for one-shot commands. Never reads or writes the TUI's saved focus,
    /// so `chat` without `--thread` always starts a new thread.
    pub fn ephemeral_session(&self) -> Session {
        Session::in_memory()
    }
}
