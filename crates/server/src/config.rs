use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub allow_origin: Option<String>,
    pub allow_credentials: bool,
    pub command_interval: Duration,
    pub seed_todos: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:4000".into(),
            allow_origin: None,
            allow_credentials: true,
            command_interval: Duration::from_secs(1),
            seed_todos: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    allow_origin: Option<String>,
    allow_credentials: Option<bool>,
    command_interval_ms: Option<u64>,
    seed_todos: Option<bool>,
}

/// Defaults, then the optional TOML file at `path`, then `APP__*` variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.allow_origin {
        settings.allow_origin = Some(v);
    }
    if let Some(v) = file_cfg.allow_credentials {
        settings.allow_credentials = v;
    }
    if let Some(v) = file_cfg.command_interval_ms {
        settings.command_interval = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.seed_todos {
        settings.seed_todos = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__ALLOW_ORIGIN") {
        settings.allow_origin = Some(v);
    }
    if let Some(v) = lookup("APP__ALLOW_CREDENTIALS") {
        settings.allow_credentials = v
            .parse()
            .with_context(|| format!("APP__ALLOW_CREDENTIALS must be true or false, got '{v}'"))?;
    }
    if let Some(v) = lookup("APP__COMMAND_INTERVAL_MS") {
        let millis: u64 = v
            .parse()
            .with_context(|| format!("APP__COMMAND_INTERVAL_MS must be an integer, got '{v}'"))?;
        settings.command_interval = Duration::from_millis(millis);
    }
    if let Some(v) = lookup("APP__SEED_TODOS") {
        settings.seed_todos = v
            .parse()
            .with_context(|| format!("APP__SEED_TODOS must be true or false, got '{v}'"))?;
    }
    Ok(())
}

/// Replaces the port of a `host:port` bind address.
pub fn with_port(bind: &str, port: u16) -> String {
    match bind.rsplit_once(':') {
        Some((host, _)) => format!("{host}:{port}"),
        None => format!("{bind}:{port}"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
