use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand, ValueEnum};
use roadmap_core::config::{
    EffectiveConfig, project_config_path, resolve_config, user_config_path,
};
use std::path::{Path, PathBuf};
use toml::Value;

use crate::output::OutputMode;
use crate::project::find_roadmap_dir;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show resolved or raw configuration
    Show(ShowArgs),
    /// Set a configuration key in project or user scope
    Set(SetArgs),
    /// Unset a configuration key in project or user scope
    Unset(UnsetArgs),
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Show raw project config only
    #[arg(long, conflicts_with = "user")]
    project: bool,

    /// Show raw user config only
    #[arg(long)]
    user: bool,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. subscribe.backend, user.output)
    key: String,

    /// New value
    value: String,
}

#[derive(Args, Debug)]
struct UnsetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. subscribe.endpoint, user.output)
    key: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigScope {
    Project,
    User,
}

/// Execute `rmap config`.
///
/// # Errors
///
/// Returns an error if a config file cannot be read, parsed or written, or
/// the key is not a known setting.
pub fn run_config(args: &ConfigArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let root = find_roadmap_dir(project_root)
        .and_then(|dir| dir.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| project_root.to_path_buf());

    match &args.command {
        ConfigCommand::Show(show) => run_show(show, &root, output),
        ConfigCommand::Set(set) => run_set(set, &root, output),
        ConfigCommand::Unset(unset) => run_unset(unset, &root, output),
    }
}

fn run_show(args: &ShowArgs, root: &Path, output: OutputMode) -> Result<()> {
    if args.project {
        let value = load_toml_table(&project_config_path(root))?;
        print_toml_or_json(&value, output)?;
        return Ok(());
    }

    if args.user {
        let value = load_toml_table(&require_user_config_path()?)?;
        print_toml_or_json(&value, output)?;
        return Ok(());
    }

    let effective = resolve_config(root, output.is_json())?;
    print_effective(&effective, output)
}

fn run_set(args: &SetArgs, root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, root)?;
    let mut value = load_toml_table(&path)?;
    apply_set(&mut value, args.scope, &args.key, &args.value)?;
    write_toml_table(&path, &value)?;
    render_mutation(output, "set", scope_label(args.scope), &args.key)
}

fn run_unset(args: &UnsetArgs, root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, root)?;
    let mut value = load_toml_table(&path)?;
    apply_unset(&mut value, args.scope, &args.key)?;
    write_toml_table(&path, &value)?;
    render_mutation(output, "unset", scope_label(args.scope), &args.key)
}

fn scope_path(scope: ConfigScope, root: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Project => {
            if find_roadmap_dir(root).is_none() {
                bail!("not a roadmap project (run `rmap init`)");
            }
            Ok(project_config_path(root))
        }
        ConfigScope::User => require_user_config_path(),
    }
}

fn require_user_config_path() -> Result<PathBuf> {
    user_config_path().ok_or_else(|| anyhow!("Unable to resolve user config directory"))
}

fn apply_set(root: &mut Value, scope: ConfigScope, key: &str, raw: &str) -> Result<()> {
    let parsed = parse_value(scope, key, raw)?;
    let (section, leaf) = split_known_key(scope, key)?;
    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    let section_entry = table
        .entry(section.to_string())
        .or_insert_with(|| Value::Table(toml::map::Map::new()));

    let section_table = section_entry
        .as_table_mut()
        .ok_or_else(|| anyhow!("Section {section} must be a TOML table"))?;

    section_table.insert(leaf.to_string(), parsed);
    Ok(())
}

fn apply_unset(root: &mut Value, scope: ConfigScope, key: &str) -> Result<()> {
    let (section, leaf) = split_known_key(scope, key)?;
    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    let now_empty = match table.get_mut(section).and_then(Value::as_table_mut) {
        Some(section_table) => {
            section_table.remove(leaf);
            section_table.is_empty()
        }
        None => false,
    };
    if now_empty {
        table.remove(section);
    }
    Ok(())
}

fn split_known_key(scope: ConfigScope, key: &str) -> Result<(&str, &str)> {
    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| anyhow!("Key must use section.key format"))?;

    let valid = match scope {
        ConfigScope::Project => matches!(
            (section, leaf),
            ("votes", "store" | "prune_stale")
                | (
                    "subscribe",
                    "backend" | "endpoint" | "timeout_ms" | "source" | "fallback_url"
                )
                | ("display", "future_page_size")
        ),
        ConfigScope::User => matches!((section, leaf), ("user", "output")),
    };

    if valid {
        Ok((section, leaf))
    } else {
        bail!("Unsupported key `{key}` for {} scope", scope_label(scope));
    }
}

fn parse_value(scope: ConfigScope, key: &str, raw: &str) -> Result<Value> {
    let (section, leaf) = split_known_key(scope, key)?;

    match (section, leaf) {
        ("votes", "store") => one_of(key, raw, &["sqlite", "file", "memory"]),
        ("subscribe", "backend") => one_of(key, raw, &["sqlite", "http", "disabled"]),
        ("user", "output") => one_of(key, raw, &["pretty", "text", "json"]),
        ("votes", "prune_stale") => {
            let value: bool = raw
                .parse()
                .with_context(|| format!("{key} expects true or false"))?;
            Ok(Value::Boolean(value))
        }
        ("subscribe", "timeout_ms") | ("display", "future_page_size") => {
            let number: i64 = raw
                .parse()
                .with_context(|| format!("{key} expects a whole number"))?;
            if number <= 0 {
                bail!("{key} must be greater than zero");
            }
            Ok(Value::Integer(number))
        }
        _ => Ok(Value::String(raw.to_string())),
    }
}

fn one_of(key: &str, raw: &str, allowed: &[&str]) -> Result<Value> {
    let normalized = raw.trim().to_ascii_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(Value::String(normalized))
    } else {
        bail!("{key} expects one of: {}", allowed.join(", "));
    }
}

fn load_toml_table(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if !value.is_table() {
        bail!("{} must contain a top-level TOML table", path.display());
    }

    Ok(value)
}

fn write_toml_table(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let serialized = toml::to_string_pretty(value)?;
    std::fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_toml_or_json(value: &Value, output: OutputMode) -> Result<()> {
    match output {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputMode::Text | OutputMode::Pretty => print!("{}", toml::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_effective(value: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let project = &value.project;
    match output {
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputMode::Text => {
            println!("resolved_output={}", value.resolved_output);
            println!("votes.store={}", toml_str(&project.votes.store)?);
            println!("votes.prune_stale={}", project.votes.prune_stale);
            println!("subscribe.backend={}", toml_str(&project.subscribe.backend)?);
            if let Some(endpoint) = &project.subscribe.endpoint {
                println!("subscribe.endpoint={endpoint}");
            }
            println!("subscribe.timeout_ms={}", project.subscribe.timeout_ms);
            println!("subscribe.source={}", project.subscribe.source);
            if let Some(url) = &project.subscribe.fallback_url {
                println!("subscribe.fallback_url={url}");
            }
            println!(
                "display.future_page_size={}",
                project.display.future_page_size
            );
            if let Some(out) = &value.user.output {
                println!("user.output={out}");
            }
        }
        OutputMode::Pretty => {
            println!("resolved_output = \"{}\"", value.resolved_output);
            println!();
            print!("{}", toml::to_string_pretty(project)?);
            if let Some(out) = &value.user.output {
                println!();
                println!("[user]");
                println!("output = \"{out}\"");
            }
        }
    }

    Ok(())
}

/// Bare string form of a lowercase config enum.
fn toml_str<T: serde::Serialize>(value: &T) -> Result<String> {
    match Value::try_from(value)? {
        Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn render_mutation(output: OutputMode, action: &str, scope: &str, key: &str) -> Result<()> {
    match output {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ok": true,
                    "action": action,
                    "scope": scope,
                    "key": key,
                }))?
            );
        }
        OutputMode::Text => {
            println!("ok=true action={action} scope={scope} key={key}");
        }
        OutputMode::Pretty => {
            let title = if action == "set" { "Set" } else { "Unset" };
            println!("{title} {key} in {scope} config");
        }
    }
    Ok(())
}

const fn scope_label(scope: ConfigScope) -> &'static str {
    match scope {
        ConfigScope::Project => "project",
        ConfigScope::User => "user",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap_core::config::{BackendKind, ProjectConfig, VoteStoreKind};

    fn empty() -> Value {
        Value::Table(toml::map::Map::new())
    }

    #[test]
    fn set_then_parse_as_project_config() {
        let mut value = empty();
        apply_set(&mut value, ConfigScope::Project, "subscribe.backend", "HTTP").expect("set");
        apply_set(
            &mut value,
            ConfigScope::Project,
            "subscribe.endpoint",
            "https://lists.example.com/api",
        )
        .expect("set");
        apply_set(&mut value, ConfigScope::Project, "votes.store", "file").expect("set");
        apply_set(&mut value, ConfigScope::Project, "display.future_page_size", "3")
            .expect("set");

        let config: ProjectConfig =
            toml::from_str(&toml::to_string(&value).expect("encode")).expect("decode");
        assert_eq!(config.subscribe.backend, BackendKind::Http);
        assert_eq!(
            config.subscribe.endpoint.as_deref(),
            Some("https://lists.example.com/api")
        );
        assert_eq!(config.votes.store, VoteStoreKind::File);
        assert_eq!(config.display.future_page_size, 3);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let mut value = empty();
        assert!(apply_set(&mut value, ConfigScope::Project, "votes.color", "red").is_err());
        assert!(apply_set(&mut value, ConfigScope::Project, "votes.store", "redis").is_err());
        assert!(apply_set(&mut value, ConfigScope::Project, "subscribe.timeout_ms", "0").is_err());
        assert!(apply_set(&mut value, ConfigScope::User, "votes.store", "file").is_err());
        assert!(apply_set(&mut value, ConfigScope::Project, "nodot", "x").is_err());
    }

    #[test]
    fn unset_drops_empty_sections() {
        let mut value = empty();
        apply_set(&mut value, ConfigScope::User, "user.output", "json").expect("set");
        apply_unset(&mut value, ConfigScope::User, "user.output").expect("unset");
        assert!(value.as_table().expect("table").is_empty());
    }

    #[test]
    fn enum_values_render_bare() {
        assert_eq!(toml_str(&VoteStoreKind::Sqlite).expect("str"), "sqlite");
        assert_eq!(toml_str(&BackendKind::Disabled).expect("str"), "disabled");
    }
}
