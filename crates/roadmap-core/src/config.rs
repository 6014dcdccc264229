use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project state directory, created by `rmap init`.
pub const ROADMAP_DIR: &str = ".roadmap";
/// Config file name inside [`ROADMAP_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub votes: VotesConfig,
    #[serde(default)]
    pub subscribe: SubscribeConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where the per-client vote record lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteStoreKind {
    /// `kv_store` table in `.roadmap/roadmap.db`.
    #[default]
    Sqlite,
    /// One file per key under `.roadmap/kv/`.
    File,
    /// Nothing persists past the process.
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesConfig {
    #[serde(default)]
    pub store: VoteStoreKind,
    /// Drop votes for ids missing from the catalog when a session starts.
    #[serde(default)]
    pub prune_stale: bool,
}

/// Which subscriber list the gateway talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Http,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Base URL for the `http` backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_source")]
    pub source: String,
    /// Offered to users when the subscriber list is unavailable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            endpoint: None,
            timeout_ms: default_timeout_ms(),
            source: default_source(),
            fallback_url: None,
        }
    }
}

impl SubscribeConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint for the `http` backend.
    ///
    /// # Errors
    ///
    /// Fails when no non-empty endpoint is configured.
    pub fn require_endpoint(&self) -> Result<&str> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => bail!("subscribe.backend = \"http\" requires subscribe.endpoint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_future_page_size")]
    pub future_page_size: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            future_page_size: default_future_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Path of the project config under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(ROADMAP_DIR).join(CONFIG_FILE)
}

impl ProjectConfig {
    /// Reject values that parse but cannot drive the controller.
    ///
    /// # Errors
    ///
    /// Fails on a zero subscribe timeout or a zero future page size.
    pub fn validate(&self) -> Result<()> {
        if self.subscribe.timeout_ms == 0 {
            bail!("subscribe.timeout_ms must be greater than zero");
        }
        if self.display.future_page_size == 0 {
            bail!("display.future_page_size must be greater than zero");
        }
        Ok(())
    }
}

/// # Errors
///
/// Fails if the file exists but cannot be read, parsed or validated.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(config)
}

/// # Errors
///
/// Fails if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&path)
}

/// `<config dir>/roadmap/config.toml`, when the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("roadmap").join(CONFIG_FILE))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load project and user config and settle the output mode.
///
/// # Errors
///
/// Fails if either config file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output mode: `--json`, then `FORMAT`, then user config, then TTY.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_timeout_ms() -> u64 {
    10_000
}

fn default_source() -> String {
    crate::model::subscriber::DEFAULT_SOURCE.to_string()
}

const fn default_future_page_size() -> usize {
    crate::sorter::DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_project_config(dir: &Path, body: &str) {
        let roadmap_dir = dir.join(ROADMAP_DIR);
        std::fs::create_dir_all(&roadmap_dir).expect("create .roadmap");
        std::fs::write(roadmap_dir.join(CONFIG_FILE), body).expect("write config");
    }

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.votes.store, VoteStoreKind::Sqlite);
        assert!(!cfg.votes.prune_stale);
        assert_eq!(cfg.subscribe.backend, BackendKind::Sqlite);
        assert_eq!(cfg.subscribe.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.subscribe.source, "roadmap");
        assert_eq!(cfg.display.future_page_size, 5);
    }

    #[test]
    fn partial_project_config_fills_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(
            root.path(),
            r#"
[votes]
store = "file"

[subscribe]
backend = "http"
endpoint = "https://lists.example.com/api"
fallback_url = "mailto:roadmap@example.com"
"#,
        );

        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.votes.store, VoteStoreKind::File);
        assert_eq!(cfg.subscribe.backend, BackendKind::Http);
        assert_eq!(
            cfg.subscribe.require_endpoint().expect("endpoint"),
            "https://lists.example.com/api"
        );
        assert_eq!(cfg.subscribe.timeout_ms, 10_000);
        assert_eq!(cfg.display, DisplayConfig::default());
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(root.path(), "[subscribe]\nbackend = \"carrier-pigeon\"\n");
        let err = load_project_config(root.path()).expect_err("unknown backend");
        assert!(format!("{err:#}").contains("Failed to parse"));
    }

    #[test]
    fn zero_timeout_or_page_size_is_rejected() {
        let root = tempfile::tempdir().expect("temp dir");
        write_project_config(root.path(), "[subscribe]\ntimeout_ms = 0\n");
        let err = load_project_config(root.path()).expect_err("zero timeout");
        assert!(format!("{err:#}").contains("subscribe.timeout_ms must be greater than zero"));

        write_project_config(root.path(), "[display]\nfuture_page_size = 0\n");
        let err = load_project_config(root.path()).expect_err("zero page size");
        assert!(format!("{err:#}").contains("display.future_page_size must be greater than zero"));

        write_project_config(root.path(), "[subscribe]\ntimeout_ms = 1\n");
        let cfg = load_project_config(root.path()).expect("one millisecond is allowed");
        assert_eq!(cfg.subscribe.timeout(), Duration::from_millis(1));
    }

    #[test]
    fn http_backend_without_endpoint_is_rejected() {
        let cfg = SubscribeConfig {
            backend: BackendKind::Http,
            endpoint: Some("   ".to_string()),
            ..SubscribeConfig::default()
        };
        assert!(cfg.require_endpoint().is_err());
    }

    #[test]
    fn user_config_reads_output() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output = \"json\"\n").expect("write config");
        let cfg = load_user_config_from(&path).expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));

        let missing = load_user_config_from(&dir.path().join("nope.toml")).expect("default");
        assert_eq!(missing, UserConfig::default());
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_config() {
        assert_eq!(resolve_output(false, Some("json"), Some("text")), "text");
        assert_eq!(resolve_output(false, Some("json"), Some("bogus")), "json");
    }

    #[test]
    fn aliases_are_normalized() {
        assert_eq!(resolve_output(false, Some("table"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("human"), Some("table")), "text");
    }
}
