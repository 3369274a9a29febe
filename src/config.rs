use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::CliError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PROFILE: &str = "default";
pub const SESSION_ENV: &str = "RESUMAX_SESSION";
pub const CSRF_TOKEN_ENV: &str = "RESUMAX_CSRF_TOKEN";

/// Connection settings for one backend account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub api_url: String,
    /// Value of the backend's `sessionid` cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Value of the backend's `csrftoken` cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    /// Keep the focused thread across TUI launches instead of per run.
    #[serde(default)]
    pub persist_session: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_id: None,
            csrf_token: None,
            persist_session: false,
        }
    }
}

impl ProfileConfig {
    pub fn has_session(&self) -> bool {
        self.session_id.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub profile: String,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            profiles: BTreeMap::from([(DEFAULT_PROFILE.to_string(), ProfileConfig::default())]),
        }
    }
}

impl CliConfig {
    /// `<config_dir>/resumax/config.json`.
    pub fn default_path() -> Result<PathBuf, CliError> {
        let base = dirs::config_dir().ok_or_else(|| {
            CliError::Generic("Could not resolve config directory for this OS.".to_string())
        })?;
        Ok(base.join("resumax").join("config.json"))
    }

    /// A missing file yields the default config; the active profile always exists afterwards.
    pub fn load_from(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let mut config: CliConfig = serde_json::from_str(&text)?;
        let active = config.profile.clone();
        config.profile_entry(&active);
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn active_name(&self, profile_override: Option<&str>) -> String {
        profile_override.unwrap_or(self.profile.as_str()).to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.get(name)
    }

    /// The named profile, created with defaults when absent.
    pub fn profile_entry(&mut self, name: &str) -> &mut ProfileConfig {
        self.profiles.entry(name.to_string()).or_default()
    }

    pub fn api_url(&self, name: &str, api_override: Option<&str>) -> Result<String, CliError> {
        if let Some(url) = api_override {
            validate_url(url)?;
            return Ok(url.to_string());
        }
        let profile = self
            .profile(name)
            .ok_or_else(|| CliError::Usage(format!("Profile '{name}' does not exist.")))?;
        validate_url(&profile.api_url)?;
        Ok(profile.api_url.clone())
    }

    /// `RESUMAX_SESSION` wins over the stored cookie value.
    pub fn session_id(&self, name: &str) -> Option<String> {
        env_non_empty(SESSION_ENV).or_else(|| {
            self.profile(name)
                .and_then(|p| p.session_id.clone())
                .filter(|s| !s.trim().is_empty())
        })
    }

    pub fn csrf_token(&self, name: &str) -> Option<String> {
        env_non_empty(CSRF_TOKEN_ENV).or_else(|| {
            self.profile(name)
                .and_then(|p| p.csrf_token.clone())
                .filter(|s| !s.trim().is_empty())
        })
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds the `Cookie` header the backend expects from a browser session.
pub fn cookie_header(session_id: Option<&str>, csrf_token: Option<&str>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(session) = session_id.filter(|s| !s.is_empty()) {
        parts.push(format!("sessionid={session}"));
    }
    if let Some(token) = csrf_token.filter(|s| !s.is_empty()) {
        parts.push(format!("csrftoken={}", urlencoding::encode(token)));
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}

pub fn validate_url(value: &str) -> Result<(), CliError> {
    let parsed = Url::parse(value)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(CliError::Usage(
            "API URL must use http:// or https://.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate_url("http://localhost:8000").is_ok());
        assert!(validate_url("https://resumax.example").is_ok());
        assert!(matches!(
            validate_url("ftp://resumax.example"),
            Err(CliError::Usage(_))
        ));
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn cookie_header_joins_present_parts() {
        assert_eq!(cookie_header(None, None), None);
        assert_eq!(
            cookie_header(Some("s1"), None).as_deref(),
            Some("sessionid=s1")
        );
        assert_eq!(
            cookie_header(Some("s1"), Some("tok")).as_deref(),
            Some("sessionid=s1; csrftoken=tok")
        );
    }

    #[test]
    fn override_wins_over_profile_url() {
        let config = CliConfig::default();
        let url = config.api_url("default", Some("https://other.example")).unwrap();
        assert_eq!(url, "https://other.example");
        assert_eq!(config.api_url("default", None).unwrap(), DEFAULT_API_URL);
        assert!(config.api_url("missing", None).is_err());
    }

    #[test]
    fn round_trips_through_disk_and_fills_active_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        assert_eq!(CliConfig::load_from(&path).unwrap().profile, DEFAULT_PROFILE);

        let mut config = CliConfig::default();
        config.profile = "work".to_string();
        config.profile_entry("work").persist_session = true;
        config.save_to(&path).unwrap();

        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded.profile, "work");
        assert!(loaded.profile("work").is_some_and(|p| p.persist_session));

        fs::write(&path, r#"{ "profile": "fresh" }"#).unwrap();
        let loaded = CliConfig::load_from(&path).unwrap();
        assert_eq!(loaded.profile("fresh"), Some(&ProfileConfig::default()));
    }

    #[test]
    fn blank_stored_session_counts_as_missing() {
        let mut config = CliConfig::default();
        config.profile_entry("default").session_id = Some("  ".to_string());
        assert!(!config.profile("default").is_some_and(ProfileConfig::has_session));
        if std::env::var(SESSION_ENV).is_err() {
            assert_eq!(config.session_id("default"), None);
        }
    }
}
