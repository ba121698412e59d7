//! Configuration discovery and loading.
//!
//! Two kinds of configuration are read:
//!
//! - [`ProjectConfig`]: module resolution settings (`baseUrl`, `paths`) from the project's
//!   `tsconfig.json` or `jsconfig.json`, found by walking upward from the entry file.
//! - [`GeneratorConfig`]: document metadata supplied by the user (info, servers, security
//!   schemes, extra schemas, root security requirements and directive markers), from a JSON or
//!   YAML file.

use crate::error::{Error, Result};
use crate::literal::parse_literal;
use crate::openapi_builder::{Info, SecurityRequirement, Server};
use crate::schema_generator::Schema;
use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// File names probed, in order, in every directory on the way up
pub const PROJECT_CONFIG_NAMES: [&str; 2] = ["tsconfig.json", "jsconfig.json"];

const MAX_EXTENDS_DEPTH: usize = 8;

/// Walks up from `start` looking for a project configuration file.
///
/// # Arguments
///
/// * `start` - Directory where the search begins (usually the entry file's directory)
///
/// # Returns
///
/// The path of the first `tsconfig.json` or `jsconfig.json` found, or `None` when the
/// filesystem root is reached.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in PROJECT_CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                debug!("Found project config: {}", candidate.display());
                return Some(candidate);
            }
        }
        dir = current.parent();
    }
    None
}

/// Module resolution settings of a TypeScript/JavaScript project
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    /// The configuration file this was loaded from
    pub config_path: PathBuf,
    /// Absolute `compilerOptions.baseUrl`
    pub base_url: Option<PathBuf>,
    /// `compilerOptions.paths`, pattern -> substitutions
    pub paths: IndexMap<String, Vec<String>>,
    /// Directory the `paths` substitutions are relative to
    pub paths_base: PathBuf,
}

impl ProjectConfig {
    /// Loads a configuration file, following relative `extends` chains.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the file (or a file it extends) cannot be read or is not
    /// a valid JSON-with-comments document.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = ProjectConfig {
            config_path: path.to_path_buf(),
            paths_base: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ..Default::default()
        };
        config.apply_file(path, 0)?;
        info!(
            "Loaded project config {} ({} path aliases)",
            path.display(),
            config.paths.len()
        );
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path, depth: usize) -> Result<()> {
        let config_error = |message: String| Error::ConfigError {
            file: path.to_path_buf(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let value = parse_literal(&content).map_err(|e| config_error(e.to_string()))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        if let Some(parent) = value.get("extends").and_then(Value::as_str) {
            if parent.starts_with('.') && depth < MAX_EXTENDS_DEPTH {
                let mut parent_path = dir.join(parent);
                if parent_path.extension().is_none() {
                    parent_path.set_extension("json");
                }
                self.apply_file(&parent_path, depth + 1)?;
            } else {
                debug!("Ignoring non-relative extends `{}` in {}", parent, path.display());
            }
        }

        let Some(options) = value.get("compilerOptions") else {
            return Ok(());
        };

        if let Some(base_url) = options.get("baseUrl").and_then(Value::as_str) {
            let base = dir.join(base_url);
            self.paths_base = base.clone();
            self.base_url = Some(base);
        }

        if let Some(paths) = options.get("paths").and_then(Value::as_object) {
            if self.base_url.is_none() {
                self.paths_base = dir.clone();
            }
            self.paths = paths
                .iter()
                .map(|(pattern, targets)| {
                    let targets = targets
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    (pattern.clone(), targets)
                })
                .collect();
        }

        Ok(())
    }

    /// Candidate paths (without extension probing) for a bare module specifier.
    ///
    /// `paths` patterns are tried longest-prefix first, then `baseUrl`.
    pub fn alias_candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let mut matches: Vec<(usize, String, &Vec<String>)> = Vec::new();
        for (pattern, targets) in &self.paths {
            match pattern.split_once('*') {
                None if pattern == specifier => matches.push((pattern.len(), String::new(), targets)),
                None => {}
                Some((prefix, suffix)) => {
                    if specifier.len() >= prefix.len() + suffix.len()
                        && specifier.starts_with(prefix)
                        && specifier.ends_with(suffix)
                    {
                        let captured = &specifier[prefix.len()..specifier.len() - suffix.len()];
                        matches.push((prefix.len(), captured.to_string(), targets));
                    }
                }
            }
        }
        matches.sort_by(|a, b| b.0.cmp(&a.0));

        let mut candidates: Vec<PathBuf> = matches
            .into_iter()
            .flat_map(|(_, captured, targets)| {
                targets
                    .iter()
                    .map(move |t| self.paths_base.join(t.replace('*', &captured)))
                    .collect::<Vec<_>>()
            })
            .collect();

        if let Some(base) = &self.base_url {
            candidates.push(base.join(specifier));
        }
        candidates
    }
}

/// User-supplied document metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub info: Option<Info>,
    pub servers: Vec<Server>,
    pub components: ComponentsConfig,
    /// Root-level security requirements
    pub security: Vec<SecurityRequirement>,
    /// Directive comment markers; `#<marker>.<key> = <value>`
    pub directive_markers: Vec<String>,
}

/// The `components` part of [`GeneratorConfig`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentsConfig {
    pub security_schemes: IndexMap<String, Value>,
    pub schemas: IndexMap<String, Schema>,
}

impl GeneratorConfig {
    /// Loads a generator configuration; `.yaml`/`.yml` files are read as YAML, anything else
    /// as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |message: String| Error::ConfigError {
            file: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: GeneratorConfig = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| config_error(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| config_error(e.to_string()))?
        };
        debug!("Loaded generator config: {:?}", config);
        Ok(config)
    }
}
