//! Settings registry with default/override bookkeeping.
//!
//! Every setting is a [`Value`]. A value is either concrete data, a
//! [`Deferred`] computation that is only evaluated when the attributes
//! document is assembled, or a [`Handle`] to an object owned by the host
//! framework (a task or namespace) which must never be serialized.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Longest inspected value shown by [`Settings::configuration`] before truncation.
pub const DISPLAY_LIMIT: usize = 40;

/// A lazily computed setting value.
///
/// Cloning a `Deferred` shares the underlying computation, so clones have
/// the same [`Deferred::id`].
#[derive(Clone)]
pub struct Deferred(Arc<dyn Fn() -> Result<Value> + Send + Sync>);

impl Deferred {
    /// Wrap a computation.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the computation.
    pub fn call(&self) -> Result<Value> {
        (self.0)()
    }

    /// Identity of the shared computation.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<deferred>")
    }
}

/// An object belonging to the host framework rather than to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handle {
    /// An invocable task, e.g. `roundsman:chef`.
    Task(String),
    /// A task namespace, e.g. `roundsman`.
    Namespace(String),
}

/// A setting value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Deferred(Deferred),
    Handle(Handle),
}

impl Value {
    /// Build a deferred value from a closure.
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Self::Deferred(Deferred::new(f))
    }

    /// Build a list of strings.
    pub fn str_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::Str(s.into())).collect())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interpret as a list of strings. A single string counts as a one-item list.
    pub fn as_str_list(&self) -> Option<Vec<String>> {
        match self {
            Self::Str(s) => Some(vec![s.clone()]),
            Self::List(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    /// Render the value for display, Ruby-inspect style.
    pub fn inspect(&self) -> String {
        match self {
            Self::Null => "nil".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => format!("{s:?}"),
            Self::List(items) => {
                let inner: Vec<String> = items.iter().map(Self::inspect).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Map(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k:?}=>{}", v.inspect()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
            Self::Deferred(_) => "<deferred>".to_string(),
            Self::Handle(Handle::Task(name)) => format!("#<task {name}>"),
            Self::Handle(Handle::Namespace(name)) => format!("#<namespace {name}>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Names of the built-in settings.
pub mod keys {
    pub const RUBY_VERSION: &str = "ruby_version";
    pub const COOKBOOKS_DIRECTORY: &str = "cookbooks_directory";
    pub const STREAM_CHEF_OUTPUT: &str = "stream_chef_output";
    pub const CARE_ABOUT_RUBY_VERSION: &str = "care_about_ruby_version";
    pub const CHEF_DIRECTORY: &str = "chef_directory";
    pub const CHEF_VERSION: &str = "chef_version";
    pub const COPYFILE_DISABLE: &str = "copyfile_disable";
    pub const RUBY_DEPENDENCIES: &str = "ruby_dependencies";
    pub const RUBY_INSTALL_DIR: &str = "ruby_install_dir";
    pub const RUBY_INSTALL_SCRIPT: &str = "ruby_install_script";
}

/// Packages installed before building Ruby.
pub const DEFAULT_RUBY_DEPENDENCIES: &[&str] = &[
    "git-core",
    "curl",
    "build-essential",
    "bison",
    "openssl",
    "libreadline6",
    "libreadline6-dev",
    "zlib1g",
    "zlib1g-dev",
    "libssl-dev",
    "libyaml-dev",
    "libxml2-dev",
    "libxslt-dev",
    "autoconf",
    "libc6-dev",
    "ncurses-dev",
    "vim",
    "wget",
    "tree",
];

/// Default Ruby install script. Placeholders are rendered at install time.
pub const DEFAULT_RUBY_INSTALL_SCRIPT: &str = "set -e
cd {chef_directory}
rm -rf ruby-build
git clone -q git://github.com/sstephenson/ruby-build.git
cd ruby-build
./install.sh
ruby-build {ruby_version} {ruby_install_dir}
";

/// One line of the configuration listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationEntry {
    pub name: String,
    /// Inspected value, `<deferred>` for deferred values, possibly truncated.
    pub value: String,
    pub overridden: bool,
}

impl fmt::Display for ConfigurationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display_name = format!(":{},", self.name);
        write!(f, "set {display_name:<30} {}", self.value)?;
        if self.overridden {
            write!(f, " (overridden)")?;
        }
        Ok(())
    }
}

/// The settings registry.
///
/// Holds every setting by name, the set of names registered as defaults, and
/// the subset of those the caller explicitly overrode.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: BTreeMap<String, Value>,
    defaults: BTreeSet<String>,
    overridden: BTreeSet<String>,
}

impl Settings {
    /// An empty registry with no defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in default.
    pub fn with_defaults() -> Self {
        let mut settings = Self::new();
        settings.set_default(keys::RUBY_VERSION, "1.9.3-p125");
        settings.set_default(
            keys::COOKBOOKS_DIRECTORY,
            Value::str_list(["config/cookbooks"]),
        );
        settings.set_default(keys::STREAM_CHEF_OUTPUT, true);
        settings.set_default(keys::CARE_ABOUT_RUBY_VERSION, true);
        settings.set_default(keys::CHEF_DIRECTORY, "/tmp/chef");
        settings.set_default(keys::CHEF_VERSION, "~> 0.10.8");
        settings.set_default(keys::COPYFILE_DISABLE, false);
        settings.set_default(
            keys::RUBY_DEPENDENCIES,
            Value::str_list(DEFAULT_RUBY_DEPENDENCIES.iter().copied()),
        );
        settings.set_default(keys::RUBY_INSTALL_DIR, "/usr/local");
        settings.set_default(keys::RUBY_INSTALL_SCRIPT, DEFAULT_RUBY_INSTALL_SCRIPT);
        settings
    }

    /// Register a default. If the caller already set `name`, their value is
    /// kept and the setting is marked overridden.
    pub fn set_default(&mut self, name: &str, value: impl Into<Value>) {
        self.defaults.insert(name.to_string());
        if self.values.contains_key(name) {
            self.overridden.insert(name.to_string());
        } else {
            self.values.insert(name.to_string(), value.into());
        }
    }

    /// Set a value. Setting a registered default marks it overridden.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        if self.defaults.contains(name) {
            self.overridden.insert(name.to_string());
        }
        self.values.insert(name.to_string(), value.into());
    }

    /// Register a framework task under its name.
    pub fn register_task(&mut self, name: &str) {
        self.values
            .insert(name.to_string(), Value::Handle(Handle::Task(name.to_string())));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_overridden(&self, name: &str) -> bool {
        self.overridden.contains(name)
    }

    /// Iterate over every setting in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A concrete string setting.
    pub fn string(&self, name: &str) -> Result<String> {
        self.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| invalid(name, "a string"))
    }

    /// A concrete boolean setting.
    pub fn flag(&self, name: &str) -> Result<bool> {
        self.get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid(name, "true or false"))
    }

    /// A concrete string or list-of-strings setting.
    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        self.get(name)
            .and_then(Value::as_str_list)
            .ok_or_else(|| invalid(name, "a string or a list of strings"))
    }

    /// List every registered default, sorted by name.
    ///
    /// Deferred values are shown as `<deferred>` and are not evaluated.
    pub fn configuration(&self) -> Vec<ConfigurationEntry> {
        self.defaults
            .iter()
            .map(|name| {
                let value = match self.values.get(name) {
                    Some(v) if v.is_deferred() => "<deferred>".to_string(),
                    Some(v) => truncate_inspected(v.inspect()),
                    None => "nil".to_string(),
                };
                ConfigurationEntry {
                    name: name.clone(),
                    value,
                    overridden: self.overridden.contains(name),
                }
            })
            .collect()
    }
}

fn invalid(name: &str, expected: &'static str) -> Error {
    Error::InvalidSetting {
        name: name.to_string(),
        expected,
    }
}

fn truncate_inspected(value: String) -> String {
    if value.chars().count() > DISPLAY_LIMIT {
        let head: String = value.chars().take(DISPLAY_LIMIT + 1).collect();
        format!("{head}... (truncated)")
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.string(keys::RUBY_VERSION).unwrap(), "1.9.3-p125");
        assert_eq!(settings.string(keys::CHEF_DIRECTORY).unwrap(), "/tmp/chef");
        assert!(settings.flag(keys::STREAM_CHEF_OUTPUT).unwrap());
        assert!(!settings.flag(keys::COPYFILE_DISABLE).unwrap());
        assert_eq!(
            settings.string_list(keys::COOKBOOKS_DIRECTORY).unwrap(),
            vec!["config/cookbooks"]
        );
        assert_eq!(
            settings.string_list(keys::RUBY_DEPENDENCIES).unwrap().len(),
            DEFAULT_RUBY_DEPENDENCIES.len()
        );
        assert!(!settings.is_overridden(keys::RUBY_VERSION));
    }

    #[test]
    fn test_set_marks_default_overridden() {
        let mut settings = Settings::with_defaults();
        settings.set(keys::RUBY_VERSION, "2.0.0-p0");
        settings.set("application", "shop");

        assert!(settings.is_overridden(keys::RUBY_VERSION));
        assert!(!settings.is_overridden("application"));
        assert_eq!(settings.string(keys::RUBY_VERSION).unwrap(), "2.0.0-p0");
    }

    #[test]
    fn test_set_before_default_keeps_caller_value() {
        let mut settings = Settings::new();
        settings.set("chef_directory", "/opt/chef");
        settings.set_default("chef_directory", "/tmp/chef");

        assert_eq!(settings.string("chef_directory").unwrap(), "/opt/chef");
        assert!(settings.is_overridden("chef_directory"));
    }

    #[test]
    fn test_single_string_is_a_list() {
        let mut settings = Settings::with_defaults();
        settings.set(keys::COOKBOOKS_DIRECTORY, "cookbooks");
        assert_eq!(
            settings.string_list(keys::COOKBOOKS_DIRECTORY).unwrap(),
            vec!["cookbooks"]
        );
    }

    #[test]
    fn test_typed_getters_reject_deferred() {
        let mut settings = Settings::with_defaults();
        settings.set(keys::RUBY_VERSION, Value::deferred(|| Ok("2.0.0".into())));
        let err = settings.string(keys::RUBY_VERSION).unwrap_err();
        assert!(matches!(err, Error::InvalidSetting { .. }));
    }

    #[test]
    fn test_configuration_listing() {
        let mut settings = Settings::with_defaults();
        settings.set(keys::CHEF_VERSION, Value::deferred(|| panic!("evaluated")));
        settings.set("application", "shop");

        let entries = settings.configuration();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(!names.contains(&"application"));

        let chef = entries.iter().find(|e| e.name == "chef_version").unwrap();
        assert_eq!(chef.value, "<deferred>");
        assert!(chef.overridden);
        assert!(chef.to_string().ends_with("(overridden)"));

        let deps = entries.iter().find(|e| e.name == "ruby_dependencies").unwrap();
        assert!(deps.value.ends_with("... (truncated)"));
        assert_eq!(deps.value.len(), DISPLAY_LIMIT + 1 + "... (truncated)".len());
    }

    #[test]
    fn test_configuration_line_format() {
        let entry = ConfigurationEntry {
            name: "ruby_version".to_string(),
            value: "\"1.9.3-p125\"".to_string(),
            overridden: false,
        };
        assert_eq!(
            entry.to_string(),
            format!("set {:<30} \"1.9.3-p125\"", ":ruby_version,")
        );
    }

    #[test]
    fn test_inspect() {
        assert_eq!(Value::from("a").inspect(), "\"a\"");
        assert_eq!(Value::str_list(["a", "b"]).inspect(), "[\"a\", \"b\"]");
        assert_eq!(Value::Bool(true).inspect(), "true");
        assert_eq!(Value::Null.inspect(), "nil");
        let mut map = BTreeMap::new();
        map.insert("port".to_string(), Value::Int(80));
        assert_eq!(Value::Map(map).inspect(), "{\"port\"=>80}");
    }

    #[test]
    fn test_deferred_clones_share_identity() {
        let d = Deferred::new(|| Ok(Value::Null));
        let other = Deferred::new(|| Ok(Value::Null));
        assert_eq!(d.id(), d.clone().id());
        assert_ne!(d.id(), other.id());
    }

    #[test]
    fn test_register_task() {
        let mut settings = Settings::new();
        settings.register_task("roundsman:chef");
        assert!(matches!(
            settings.get("roundsman:chef"),
            Some(Value::Handle(Handle::Task(_)))
        ));
    }
}
