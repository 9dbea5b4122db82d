//! Package manifest (`composer.json`) model
//!
//! `require` and `extra` are typed; every other key is carried through
//! untouched. Writing puts each key back in its original position, so a
//! rewrite only changes what was patched.

use crate::error::{InstallerError, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::path::Path;

/// File name of the package manifest inside an application
pub const MANIFEST_FILE: &str = "composer.json";

const REQUIRE_KEY: &str = "require";
const EXTRA_KEY: &str = "extra";

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Requirements,
    Extras,
    Other(String, Value),
}

/// Typed view of a package manifest
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageManifest {
    /// `require`: package name -> version constraint
    pub requirements: IndexMap<String, String>,
    /// `extra`, when present
    pub extras: Option<Map<String, Value>>,
    fields: Vec<Field>,
}

impl PackageManifest {
    /// Parse a manifest document
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| InstallerError::InvalidManifest {
            path: path.to_path_buf(),
            reason,
        };

        let document: Map<String, Value> =
            serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;

        let mut manifest = Self::default();
        for (key, value) in document {
            if key == REQUIRE_KEY {
                manifest.requirements = requirements_from(value)
                    .map_err(|e| invalid(format!("'require' must map names to strings: {}", e)))?;
                manifest.fields.push(Field::Requirements);
            } else if key == EXTRA_KEY {
                match value {
                    Value::Object(map) => {
                        manifest.extras = Some(map);
                        manifest.fields.push(Field::Extras);
                    }
                    // PHP encodes an empty object as []
                    Value::Array(items) if items.is_empty() => {
                        manifest.extras = Some(Map::new());
                        manifest.fields.push(Field::Extras);
                    }
                    other => manifest.fields.push(Field::Other(key, other)),
                }
            } else {
                manifest.fields.push(Field::Other(key, value));
            }
        }

        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InstallerError::InvalidManifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, path)
    }

    /// Add or replace a requirement, keeping its position when it already exists
    pub fn require(&mut self, package: impl Into<String>, constraint: impl Into<String>) {
        self.requirements.insert(package.into(), constraint.into());
    }

    /// Pin a front-end asset under `extra.bower.require`
    pub fn pin_asset(&mut self, package: &str, constraint: &str) {
        let extras = self.extras.get_or_insert_with(Map::new);
        let bower = object_entry(extras, "bower");
        let require = object_entry(bower, REQUIRE_KEY);
        require.insert(package.to_string(), Value::String(constraint.to_string()));
    }

    /// Asset constraint pinned under `extra.bower.require`, if any
    pub fn asset_pin(&self, package: &str) -> Option<&str> {
        self.extras
            .as_ref()?
            .get("bower")?
            .get(REQUIRE_KEY)?
            .get(package)?
            .as_str()
    }

    /// Rebuild the full document with keys in their original order
    pub fn to_document(&self) -> Map<String, Value> {
        let mut document = Map::new();
        let mut wrote_requirements = false;
        let mut wrote_extras = false;

        for field in &self.fields {
            match field {
                Field::Requirements => {
                    document.insert(REQUIRE_KEY.to_string(), self.requirements_value());
                    wrote_requirements = true;
                }
                Field::Extras => {
                    if let Some(extras) = &self.extras {
                        document.insert(EXTRA_KEY.to_string(), Value::Object(extras.clone()));
                    }
                    wrote_extras = true;
                }
                Field::Other(key, value) => {
                    document.insert(key.clone(), value.clone());
                }
            }
        }

        if !wrote_requirements && !self.requirements.is_empty() {
            document.insert(REQUIRE_KEY.to_string(), self.requirements_value());
        }
        if !wrote_extras {
            if let Some(extras) = &self.extras {
                document.insert(EXTRA_KEY.to_string(), Value::Object(extras.clone()));
            }
        }

        document
    }

    /// Pretty-printed JSON with four-space indentation and a trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.to_document()
            .serialize(&mut serializer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut json = String::from_utf8(buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        json.push('\n');
        Ok(json)
    }

    /// Overwrite the manifest file
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    fn requirements_value(&self) -> Value {
        Value::Object(
            self.requirements
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

fn requirements_from(value: Value) -> std::result::Result<IndexMap<String, String>, serde_json::Error> {
    match value {
        Value::Array(items) if items.is_empty() => Ok(IndexMap::new()),
        other => serde_json::from_value(other),
    }
}

/// Get `map[key]` as an object, replacing any non-object value
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    match entry {
        Value::Object(map) => map,
        _ => unreachable!("entry was just made an object"),
    }
}

/// Caret constraint for a resolved version, dropping its last numeric component.
///
/// `2.1.7` -> `^2.1`, `3` -> `^3`.
pub fn caret_constraint(version: &str) -> String {
    let base = match version.rsplit_once('.') {
        Some((head, tail)) if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) => head,
        _ => version,
    };
    format!("^{}", base)
}
