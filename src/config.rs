//! Loading `roundsman.toml` / `roundsman.json` into a settings registry.

use anyhow::{Context, Result, bail};
use chefkit::{Settings, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Base name of the config file.
pub const CONFIG_NAME: &str = "roundsman";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Find `<name>.toml` or `<name>.json` in `dir`. TOML wins when both exist.
pub fn find_config_file(dir: &Path, name: &str) -> Option<(PathBuf, ConfigFormat)> {
    [ConfigFormat::Toml, ConfigFormat::Json]
        .into_iter()
        .map(|format| (dir.join(format!("{name}.{}", format.extension())), format))
        .find(|(path, _)| path.is_file())
}

/// How to reach the host.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    pub address: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    /// Privilege escalation prefix (default `sudo`)
    pub sudo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoundsmanConfig {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl RoundsmanConfig {
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).context("Invalid TOML config"),
            ConfigFormat::Json => serde_json::from_str(content).context("Invalid JSON config"),
        }
    }

    /// Load `explicit`, or the config in the current directory if there is one.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let found = match explicit {
            Some(path) => Some((path.to_path_buf(), ConfigFormat::from_path(path))),
            None => find_config_file(&std::env::current_dir()?, CONFIG_NAME),
        };
        let Some((path, format)) = found else {
            log::debug!("No {CONFIG_NAME}.toml found, using defaults");
            return Ok((Self::default(), None));
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content, format)
            .with_context(|| format!("Could not load {}", path.display()))?;
        Ok((config, Some(path)))
    }

    /// Built-in defaults overlaid with this file's settings.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::with_defaults();
        for (name, value) in &self.settings {
            settings.set(name, setting_value(name, value)?);
        }
        Ok(settings)
    }
}

/// Apply `name=value` overrides. Values are read as TOML literals, falling
/// back to a plain string. Overrides of a string setting are always strings.
pub fn apply_overrides(settings: &mut Settings, overrides: &[String]) -> Result<()> {
    for item in overrides {
        let Some((name, raw)) = item.split_once('=') else {
            bail!("Invalid override '{item}', expected NAME=VALUE");
        };
        let name = name.trim().trim_start_matches(':');
        if name.is_empty() {
            bail!("Invalid override '{item}', missing setting name");
        }
        let value = match toml::from_str::<BTreeMap<String, serde_json::Value>>(&format!(
            "value = {raw}"
        )) {
            Ok(mut table) => table.remove("value").unwrap_or(serde_json::Value::Null),
            Err(_) => serde_json::Value::String(raw.to_string()),
        };
        // String settings stay strings, so `ruby_version=2.1` is not a float
        let value = match (settings.get(name), value) {
            (Some(Value::Str(_)), v) if !v.is_string() && !v.is_object() => {
                serde_json::Value::String(raw.trim().to_string())
            }
            (_, v) => v,
        };
        settings.set(name, setting_value(name, &value)?);
    }
    Ok(())
}

/// Convert a config value. `{ prompt = ".." }` and `{ env = ".." }` tables
/// become deferred values.
fn setting_value(name: &str, value: &serde_json::Value) -> Result<Value> {
    if let Some(deferred) = deferred_value(name, value)? {
        return Ok(deferred);
    }
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(
            items
                .iter()
                .map(|v| setting_value(name, v))
                .collect::<Result<_>>()?,
        ),
        serde_json::Value::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), setting_value(name, v)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn deferred_value(name: &str, value: &serde_json::Value) -> Result<Option<Value>> {
    let serde_json::Value::Object(map) = value else {
        return Ok(None);
    };
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();

    match keys.as_slice() {
        ["env"] => {
            let var = text(name, map.get("env"))?;
            Ok(Some(Value::deferred(move || {
                std::env::var(&var).map(Value::Str).map_err(|_| chefkit::Error::Deferred {
                    name: var.clone(),
                    message: "environment variable is not set".to_string(),
                })
            })))
        }
        ["prompt"] | ["prompt", "secret"] | ["secret", "prompt"] => {
            let prompt = text(name, map.get("prompt"))?;
            let secret = map
                .get("secret")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            Ok(Some(Value::deferred(move || {
                crate::prompt::ask(&prompt, secret).map(Value::Str)
            })))
        }
        _ => Ok(None),
    }
}

fn text(name: &str, value: Option<&serde_json::Value>) -> Result<String> {
    value
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("Setting :{name} must use a string for prompt/env"))
}
