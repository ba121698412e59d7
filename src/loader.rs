//! Program loading: parses the entry file and every module reachable from it.
//!
//! Imports are followed breadth-first. Relative specifiers are resolved against the importing
//! file, bare specifiers through the project's `paths`/`baseUrl` settings. Bare specifiers that
//! match neither (e.g. `express`) are left unresolved; their names are treated as opaque
//! external types by the type resolver.

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::parser::{AstParser, SourceLanguage};
use crate::syntax::{NodeId, Program, UnitId, UnitOrigin};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};

/// Extensions probed when an import omits one, in priority order
const PROBE_EXTENSIONS: [&str; 8] = ["ts", "tsx", "d.ts", "js", "jsx", "mjs", "cjs", "mts"];

/// Loads a [`Program`] starting from an entry file
pub struct ProgramLoader {
    parser: AstParser,
    project: Option<ProjectConfig>,
}

/// Result of loading a program
#[derive(Debug)]
pub struct LoadedProgram {
    pub program: Program,
    pub entry: UnitId,
}

impl ProgramLoader {
    pub fn new(project: Option<ProjectConfig>) -> Result<Self> {
        Ok(Self {
            parser: AstParser::new()?,
            project,
        })
    }

    /// Loads the entry file and everything it imports, transitively.
    ///
    /// # Errors
    ///
    /// Returns `Error::EntryNotFound` if the entry file does not exist or cannot be parsed.
    /// Other files that fail to load are skipped with a warning.
    pub fn load(&mut self, entry: &Path) -> Result<LoadedProgram> {
        if !entry.is_file() {
            return Err(Error::EntryNotFound(entry.to_path_buf()));
        }
        let entry_path = normalize(&absolute(entry));

        let mut program = Program::new();
        let mut loaded: IndexMap<PathBuf, UnitId> = IndexMap::new();
        let mut pending_imports: Vec<(UnitId, String, PathBuf)> = Vec::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::from([entry_path.clone()]);
        let mut seen: Vec<PathBuf> = vec![entry_path.clone()];

        while let Some(path) = queue.pop_front() {
            let origin = origin_of(&path);
            let unit = match self.parser.parse_file(&path, origin) {
                Ok(unit) => unit,
                Err(e) if path == entry_path => {
                    warn!("{:#}", e);
                    return Err(Error::EntryNotFound(entry.to_path_buf()));
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    continue;
                }
            };

            let id = program.add_unit(unit);
            let specifiers = import_specifiers(&program, id);
            loaded.insert(path.clone(), id);

            for specifier in specifiers {
                let Some(target) = self.resolve_specifier(&path, &specifier) else {
                    debug!("Unresolved import `{}` in {}", specifier, path.display());
                    continue;
                };
                if !seen.contains(&target) {
                    seen.push(target.clone());
                    queue.push_back(target.clone());
                }
                pending_imports.push((id, specifier, target));
            }
        }

        for (unit, specifier, target) in pending_imports {
            if let Some(&target_id) = loaded.get(&target) {
                program.unit_mut(unit).imports.insert(specifier, target_id);
            }
        }

        let entry_id = loaded
            .get(&entry_path)
            .copied()
            .ok_or_else(|| Error::EntryNotFound(entry.to_path_buf()))?;

        info!("Loaded {} source units", program.unit_count());
        Ok(LoadedProgram {
            program,
            entry: entry_id,
        })
    }

    /// Resolves a module specifier written in `from` to a file on disk
    pub fn resolve_specifier(&self, from: &Path, specifier: &str) -> Option<PathBuf> {
        let dir = from.parent()?;
        if specifier.starts_with('.') || specifier.starts_with('/') {
            return probe(&dir.join(specifier));
        }
        let project = self.project.as_ref()?;
        project
            .alias_candidates(specifier)
            .iter()
            .find_map(|candidate| probe(candidate))
    }
}

/// Finds the file an extension-less (or `.js`-suffixed) import refers to
fn probe(base: &Path) -> Option<PathBuf> {
    let base = normalize(base);
    if base.is_file() && SourceLanguage::from_path(&base).is_some() {
        return Some(base);
    }

    let text = base.to_string_lossy().into_owned();
    // `import "./a.js"` from TypeScript refers to `a.ts`
    let stem = [".js", ".jsx", ".mjs", ".cjs"]
        .iter()
        .find_map(|ext| text.strip_suffix(ext))
        .unwrap_or(&text);

    for ext in PROBE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", stem, ext));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if base.is_dir() {
        for ext in PROBE_EXTENSIONS {
            let candidate = base.join(format!("index.{}", ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn origin_of(path: &Path) -> UnitOrigin {
    if path
        .components()
        .any(|c| c.as_os_str() == "node_modules")
    {
        return UnitOrigin::External;
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
        UnitOrigin::Ambient
    } else {
        UnitOrigin::Project
    }
}

/// Module specifiers of `import ... from`, `export ... from` and `import("...")` forms
fn import_specifiers(program: &Program, id: UnitId) -> Vec<String> {
    let mut specifiers = Vec::new();
    for index in 0..program.unit(id).nodes.len() {
        let node = NodeId {
            unit: id,
            index: index as u32,
        };
        let source = match program.kind(node) {
            "import_statement" | "export_statement" => program.field(node, "source"),
            "call_expression" => {
                let is_dynamic_import = program
                    .field(node, "function")
                    .is_some_and(|f| program.kind(f) == "import");
                if is_dynamic_import {
                    program
                        .field(node, "arguments")
                        .and_then(|args| program.named_children(args).next())
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(value) = source.and_then(|s| program.string_value(s)) {
            if !specifiers.contains(&value) {
                specifiers.push(value);
            }
        }
    }
    specifiers
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Lexically resolves `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_follows_relative_imports() {
        let temp_dir = TempDir::new().unwrap();
        let entry = write(
            temp_dir.path(),
            "index.ts",
            "import users from './routes/users';\nimport { x } from 'express';",
        );
        write(temp_dir.path(), "routes/users.ts", "export * from '../types';\nexport default 1;");
        write(temp_dir.path(), "types/index.ts", "export interface User { id: string }");

        let mut loader = ProgramLoader::new(None).unwrap();
        let loaded = loader.load(&entry).unwrap();

        assert_eq!(loaded.program.unit_count(), 3);
        let users = loaded.program.resolve_import(loaded.entry, "./routes/users").unwrap();
        assert!(loaded.program.unit(users).path.ends_with("routes/users.ts"));
        assert!(loaded.program.resolve_import(loaded.entry, "express").is_none());
        assert!(loaded.program.resolve_import(users, "../types").is_some());
    }

    #[test]
    fn test_js_suffix_maps_to_typescript_source() {
        let temp_dir = TempDir::new().unwrap();
        let entry = write(temp_dir.path(), "index.ts", "import { a } from './a.js';");
        write(temp_dir.path(), "a.ts", "export const a = 1;");

        let mut loader = ProgramLoader::new(None).unwrap();
        let loaded = loader.load(&entry).unwrap();
        assert!(loaded.program.resolve_import(loaded.entry, "./a.js").is_some());
    }

    #[test]
    fn test_declaration_files_are_ambient() {
        let temp_dir = TempDir::new().unwrap();
        let entry = write(temp_dir.path(), "index.ts", "import { T } from './types';");
        write(temp_dir.path(), "types.d.ts", "export interface T { a: string }");

        let mut loader = ProgramLoader::new(None).unwrap();
        let loaded = loader.load(&entry).unwrap();
        let types = loaded.program.resolve_import(loaded.entry, "./types").unwrap();
        assert_eq!(loaded.program.unit(types).origin, UnitOrigin::Ambient);
        assert_eq!(loaded.program.unit(loaded.entry).origin, UnitOrigin::Project);
    }

    #[test]
    fn test_path_alias_resolution() {
        let temp_dir = TempDir::new().unwrap();
        write(
            temp_dir.path(),
            "backend/tsconfig.json",
            r#"{ "compilerOptions": { "paths": { "common": ["../common/src/index.ts"] } } }"#,
        );
        let entry = write(temp_dir.path(), "backend/index.ts", "import { Dto } from 'common';");
        write(temp_dir.path(), "common/src/index.ts", "export interface Dto { id: number }");

        let config = ProjectConfig::load(&temp_dir.path().join("backend/tsconfig.json")).unwrap();
        let mut loader = ProgramLoader::new(Some(config)).unwrap();
        let loaded = loader.load(&entry).unwrap();
        assert!(loaded.program.resolve_import(loaded.entry, "common").is_some());
    }

    #[test]
    fn test_missing_entry_is_fatal() {
        let mut loader = ProgramLoader::new(None).unwrap();
        let err = loader.load(Path::new("/definitely/not/here.ts")).unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }

    #[test]
    fn test_missing_import_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let entry = write(temp_dir.path(), "index.ts", "import a from './missing';");

        let mut loader = ProgramLoader::new(None).unwrap();
        let loaded = loader.load(&entry).unwrap();
        assert_eq!(loaded.program.unit_count(), 1);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }
}
