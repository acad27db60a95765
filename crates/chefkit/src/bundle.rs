//! Generated chef-solo documents: `solo.rb` and `solo.json`.

use crate::error::{Error, Result};
use crate::settings::{Settings, Value};
use serde_json::{Map, Number, Value as Json};
use std::collections::HashMap;
use std::path::{Component, Path};

/// Key the run list is stored under in the attributes document.
pub const RUN_LIST_KEY: &str = "run_list";

/// Name of a cookbook directory inside the archive and relative to the
/// remote working directory: the local path with any root, prefix or `..`
/// removed, so it always stays inside the working directory.
pub fn archive_name(path: &str) -> String {
    Path::new(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir
            | Component::CurDir
            | Component::RootDir
            | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build `solo.rb`.
///
/// The document resolves its own directory when chef-solo loads it, so the
/// cookbook paths are emitted as joins against that root rather than as
/// absolute paths.
pub fn build_config_document(cookbook_paths: &[String]) -> String {
    let cookbooks = cookbook_paths
        .iter()
        .map(|path| format!("File.join(root, {:?})", archive_name(path)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "root = File.expand_path(File.dirname(__FILE__))\n\
         file_cache_path File.join(root, \"cache\")\n\
         cookbook_path [ {cookbooks} ]\n"
    )
}

/// Build the `solo.json` attributes document from every setting plus the run list.
///
/// Works on a copy of the registry. Deferred values are evaluated here and
/// nowhere else, each shared computation exactly once per call. Task and
/// namespace handles are dropped wherever they appear.
pub fn build_attributes_document(settings: &Settings, run_list: &[String]) -> Result<Json> {
    let mut resolver = Resolver::default();
    let mut attributes = Map::new();
    for (name, value) in settings.iter() {
        if let Some(json) = resolver.resolve(name, value)? {
            attributes.insert(name.to_string(), json);
        }
    }
    attributes.insert(
        RUN_LIST_KEY.to_string(),
        Json::Array(run_list.iter().cloned().map(Json::String).collect()),
    );
    Ok(Json::Object(attributes))
}

/// Serialize the attributes document compactly.
pub fn render_attributes(document: &Json) -> Result<String> {
    Ok(serde_json::to_string(document)?)
}

#[derive(Default)]
struct Resolver {
    evaluated: HashMap<usize, Value>,
}

impl Resolver {
    /// Convert one value; `None` means it is excluded from the document.
    fn resolve(&mut self, name: &str, value: &Value) -> Result<Option<Json>> {
        let json = match value {
            Value::Handle(_) => return Ok(None),
            Value::Deferred(deferred) => {
                let resolved = match self.evaluated.get(&deferred.id()) {
                    Some(v) => v.clone(),
                    None => {
                        let v = deferred.call().map_err(|e| Error::Deferred {
                            name: name.to_string(),
                            message: e.to_string(),
                        })?;
                        self.evaluated.insert(deferred.id(), v.clone());
                        v
                    }
                };
                return self.resolve(name, &resolved);
            }
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(json) = self.resolve(name, item)? {
                        out.push(json);
                    }
                }
                Json::Array(out)
            }
            Value::Map(map) => {
                let mut out = Map::new();
                for (key, item) in map {
                    if let Some(json) = self.resolve(name, item)? {
                        out.insert(key.clone(), json);
                    }
                }
                Json::Object(out)
            }
        };
        Ok(Some(json))
    }
}
