use crate::syntax::{Node, SourceUnit, UnitOrigin};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Parser, Tree};

/// Grammar used for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    TypeScript,
    Tsx,
    JavaScript,
}

impl SourceLanguage {
    /// Picks the grammar from the file extension. Returns `None` for files that are not
    /// TypeScript or JavaScript sources.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
            return Some(SourceLanguage::TypeScript);
        }
        match path.extension()?.to_str()? {
            "ts" | "mts" | "cts" => Some(SourceLanguage::TypeScript),
            "tsx" => Some(SourceLanguage::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(SourceLanguage::JavaScript),
            _ => None,
        }
    }
}

/// Parser for TypeScript and JavaScript source files.
///
/// The `AstParser` uses tree-sitter grammars to parse source code and copies the resulting
/// concrete syntax tree into an owned [`SourceUnit`], so that many files can stay alive while the
/// crawler moves between them.
///
/// # Example
///
/// ```no_run
/// use openapi_route_crawler::parser::AstParser;
/// use openapi_route_crawler::syntax::UnitOrigin;
/// use std::path::Path;
///
/// let mut parser = AstParser::new().unwrap();
/// let unit = parser.parse_file(Path::new("src/index.ts"), UnitOrigin::Project).unwrap();
/// println!("Parsed {} nodes", unit.nodes.len());
/// ```
pub struct AstParser {
    typescript: Parser,
    tsx: Parser,
    javascript: Parser,
}

impl AstParser {
    /// Creates a parser with the TypeScript, TSX and JavaScript grammars loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if a grammar is incompatible with the linked tree-sitter runtime.
    pub fn new() -> crate::error::Result<Self> {
        let mut typescript = Parser::new();
        typescript.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())?;
        let mut tsx = Parser::new();
        tsx.set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())?;
        let mut javascript = Parser::new();
        javascript.set_language(&tree_sitter_javascript::LANGUAGE.into())?;
        Ok(Self {
            typescript,
            tsx,
            javascript,
        })
    }

    /// Parses a single source file into a [`SourceUnit`].
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the source file to parse
    /// * `origin` - Whether the file belongs to the project, is a declaration file or a dependency
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The extension does not belong to a supported language
    /// - The parser gives up on the file
    pub fn parse_file(&mut self, path: &Path, origin: UnitOrigin) -> Result<SourceUnit> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        self.parse_source(path.to_path_buf(), content, origin)
    }

    /// Parses in-memory source text. The language is still picked from `path`.
    pub fn parse_source(
        &mut self,
        path: PathBuf,
        source: String,
        origin: UnitOrigin,
    ) -> Result<SourceUnit> {
        let language = SourceLanguage::from_path(&path)
            .with_context(|| format!("Unsupported source file: {}", path.display()))?;

        let parser = match language {
            SourceLanguage::TypeScript => &mut self.typescript,
            SourceLanguage::Tsx => &mut self.tsx,
            SourceLanguage::JavaScript => &mut self.javascript,
        };

        let tree = parser
            .parse(&source, None)
            .with_context(|| format!("Failed to parse source in file: {}", path.display()))?;

        if tree.root_node().has_error() {
            // tree-sitter recovers from syntax errors, keep whatever it produced
            warn!("Syntax errors in {}, analysis may be incomplete", path.display());
        }

        let nodes = copy_tree(&tree);
        debug!("Successfully parsed file: {} ({} nodes)", path.display(), nodes.len());

        Ok(SourceUnit::new(path, origin, source, nodes))
    }
}

/// Copies the tree into a flat arena in pre-order; the root lands at index 0.
fn copy_tree(tree: &Tree) -> Vec<Node> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut parents: Vec<u32> = Vec::new();
    let mut cursor = tree.walk();

    loop {
        let node = cursor.node();
        let index = nodes.len() as u32;
        let parent = parents.last().copied();
        nodes.push(Node {
            kind: node.kind(),
            field: cursor.field_name(),
            named: node.is_named(),
            parent,
            children: Vec::new(),
            start: node.start_byte(),
            end: node.end_byte(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
        });
        if let Some(p) = parent {
            nodes[p as usize].children.push(index);
        }

        if cursor.goto_first_child() {
            parents.push(index);
            continue;
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return nodes;
            }
            parents.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Program, UnitOrigin};
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(SourceLanguage::from_path(Path::new("a.ts")), Some(SourceLanguage::TypeScript));
        assert_eq!(SourceLanguage::from_path(Path::new("a.d.ts")), Some(SourceLanguage::TypeScript));
        assert_eq!(SourceLanguage::from_path(Path::new("a.tsx")), Some(SourceLanguage::Tsx));
        assert_eq!(SourceLanguage::from_path(Path::new("a.mjs")), Some(SourceLanguage::JavaScript));
        assert_eq!(SourceLanguage::from_path(Path::new("a.rs")), None);
    }

    #[test]
    fn test_parse_typescript_file() {
        let temp_dir = TempDir::new().unwrap();
        let code = r#"
            import { Router } from "express";
            const router = Router();
            router.get("/users", (req, res) => res.json([]));
            export default router;
        "#;
        let path = create_temp_file(&temp_dir, "index.ts", code);

        let mut parser = AstParser::new().unwrap();
        let unit = parser.parse_file(&path, UnitOrigin::Project).unwrap();

        assert_eq!(unit.path, path);
        assert_eq!(unit.nodes[0].kind, "program");
        assert!(unit.nodes.iter().any(|n| n.kind == "call_expression"));
        assert!(unit.nodes.iter().any(|n| n.kind == "import_statement"));
    }

    #[test]
    fn test_fields_and_tokens_are_preserved() {
        let mut parser = AstParser::new().unwrap();
        let unit = parser
            .parse_source(
                PathBuf::from("types.ts"),
                "interface User { name?: string }".to_string(),
                UnitOrigin::Project,
            )
            .unwrap();

        let mut program = Program::new();
        let id = program.add_unit(unit);
        let root = program.root(id);
        let interface = program.named_children(root).next().unwrap();
        assert_eq!(program.kind(interface), "interface_declaration");

        let name = program.field(interface, "name").unwrap();
        assert_eq!(program.text(name), "User");

        let body = program.field(interface, "body").unwrap();
        let property = program.named_children(body).next().unwrap();
        assert_eq!(program.kind(property), "property_signature");
        assert!(program.has_token(property, "?"));
    }

    #[test]
    fn test_leading_comments_attach_to_next_statement() {
        let mut parser = AstParser::new().unwrap();
        let unit = parser
            .parse_source(
                PathBuf::from("a.ts"),
                "foo(); // trailing\n// first\n/** second */\nbar();".to_string(),
                UnitOrigin::Project,
            )
            .unwrap();
        let mut program = Program::new();
        let id = program.add_unit(unit);
        let statements: Vec<_> = program.named_children(program.root(id)).collect();

        assert_eq!(statements.len(), 2);
        assert_eq!(program.leading_comments(statements[1]), vec!["// first", "/** second */"]);
        assert_eq!(program.doc_comment(statements[1]).unwrap().text.as_deref(), Some("second"));
    }

    #[test]
    fn test_parse_javascript_file() {
        let mut parser = AstParser::new().unwrap();
        let unit = parser
            .parse_source(
                PathBuf::from("app.js"),
                "const express = require('express');\nmodule.exports = express();".to_string(),
                UnitOrigin::Project,
            )
            .unwrap();
        assert_eq!(unit.nodes[0].kind, "program");
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let mut parser = AstParser::new().unwrap();
        let result = parser.parse_file(Path::new("/nonexistent/file.ts"), UnitOrigin::Project);

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to read file"));
    }
}
