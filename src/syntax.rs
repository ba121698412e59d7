//! Owned syntax trees for every source unit of an analysed program.
//!
//! tree-sitter trees borrow their parser and source, which makes it awkward to keep many files
//! alive while crawling across module boundaries. The parser therefore copies each concrete
//! syntax tree into an arena of [`Node`]s owned by a [`SourceUnit`], and the whole set of units
//! lives in a [`Program`]. Nodes are addressed by [`NodeId`] (unit + arena index), which is
//! `Copy`, hashable and stable for the lifetime of the program.

use crate::literal;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Identifier of a source unit inside a [`Program`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// Identifier of a syntax node inside a [`Program`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub unit: UnitId,
    pub index: u32,
}

/// Where a source unit comes from.
///
/// Only `Project` units are crawled for routes and followed when resolving handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOrigin {
    /// Regular project source
    Project,
    /// Declaration-only file (`.d.ts`)
    Ambient,
    /// Third-party dependency (anything under `node_modules`)
    External,
}

/// One node of the copied syntax tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Grammar kind, e.g. `call_expression` or `"("` for anonymous tokens
    pub kind: &'static str,
    /// Field name under which the parent holds this node
    pub field: Option<&'static str>,
    /// Whether the node is a named grammar node (as opposed to punctuation or keywords)
    pub named: bool,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    pub start: usize,
    pub end: usize,
    /// 1-based line of the first byte
    pub start_line: usize,
    /// 1-based line of the last byte
    pub end_line: usize,
}

/// A parsed source file
#[derive(Debug)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub origin: UnitOrigin,
    pub source: String,
    /// Arena of nodes; index 0 is the root
    pub nodes: Vec<Node>,
    /// Module specifier -> loaded unit, filled in by the program loader
    pub imports: IndexMap<String, UnitId>,
}

impl SourceUnit {
    pub fn new(path: PathBuf, origin: UnitOrigin, source: String, nodes: Vec<Node>) -> Self {
        Self {
            path,
            origin,
            source,
            nodes,
            imports: IndexMap::new(),
        }
    }
}

/// The set of loaded source units
#[derive(Debug, Default)]
pub struct Program {
    units: Vec<SourceUnit>,
}

impl Program {
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Adds a unit and returns its identifier
    pub fn add_unit(&mut self, unit: SourceUnit) -> UnitId {
        self.units.push(unit);
        UnitId(self.units.len() - 1)
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &SourceUnit)> {
        self.units.iter().enumerate().map(|(i, u)| (UnitId(i), u))
    }

    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.0]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut SourceUnit {
        &mut self.units[id.0]
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Resolves an import specifier as written in `unit`
    pub fn resolve_import(&self, unit: UnitId, specifier: &str) -> Option<UnitId> {
        self.unit(unit).imports.get(specifier).copied()
    }

    pub fn root(&self, unit: UnitId) -> NodeId {
        NodeId { unit, index: 0 }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.unit(id.unit).nodes[id.index as usize]
    }

    pub fn kind(&self, id: NodeId) -> &'static str {
        self.node(id).kind
    }

    pub fn origin(&self, id: NodeId) -> UnitOrigin {
        self.unit(id.unit).origin
    }

    /// Source text covered by the node
    pub fn text(&self, id: NodeId) -> &str {
        let unit = self.unit(id.unit);
        let node = &unit.nodes[id.index as usize];
        unit.source.get(node.start..node.end).unwrap_or("")
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.node(id).start_line
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent.map(|index| NodeId {
            unit: id.unit,
            index,
        })
    }

    /// All children, including anonymous tokens and comments
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let unit = id.unit;
        self.node(id)
            .children
            .iter()
            .map(move |&index| NodeId { unit, index })
    }

    /// Named children without comments
    pub fn named_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).filter(move |&c| {
            let node = self.node(c);
            node.named && node.kind != "comment"
        })
    }

    /// First child held under `field`
    pub fn field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children(id)
            .find(|&c| self.node(c).field == Some(field))
    }

    /// Every child held under `field`
    pub fn fields(&self, id: NodeId, field: &str) -> Vec<NodeId> {
        self.children(id)
            .filter(|&c| self.node(c).field == Some(field))
            .collect()
    }

    /// First named child of the given kind
    pub fn child_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.named_children(id).find(|&c| self.kind(c) == kind)
    }

    /// Whether the node has an anonymous token child such as `?`, `default` or `async`
    pub fn has_token(&self, id: NodeId, token: &str) -> bool {
        self.children(id).any(|c| {
            let node = self.node(c);
            !node.named && node.kind == token
        })
    }

    /// Walks up the parents until one of the given kinds is found
    pub fn ancestor_of_kind(&self, id: NodeId, kinds: &[&str]) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if kinds.contains(&self.kind(node)) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Comments directly preceding the node among its siblings, in source order.
    ///
    /// A comment that trails the previous sibling on the same line belongs to that sibling.
    pub fn leading_comments(&self, id: NodeId) -> Vec<&str> {
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let siblings: Vec<NodeId> = self.children(parent).collect();
        let Some(position) = siblings.iter().position(|&s| s == id) else {
            return Vec::new();
        };

        let mut comments = Vec::new();
        let mut i = position;
        while i > 0 {
            i -= 1;
            let sibling = siblings[i];
            if self.kind(sibling) != "comment" {
                break;
            }
            let trailing = i > 0
                && self.node(siblings[i - 1]).end_line == self.node(sibling).start_line
                && self.kind(siblings[i - 1]) != "comment"
                && self.node(siblings[i - 1]).named;
            if trailing {
                break;
            }
            comments.push(self.text(sibling));
        }
        comments.reverse();
        comments
    }

    /// The closest JSDoc block (`/** ... */`) preceding the node
    pub fn doc_comment(&self, id: NodeId) -> Option<DocComment> {
        self.leading_comments(id)
            .into_iter()
            .rev()
            .find_map(DocComment::parse)
    }

    /// Value of a string literal, or of a template literal without substitutions
    pub fn string_value(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            "string" => {
                let text = self.text(id);
                if text.len() < 2 {
                    return None;
                }
                Some(literal::unescape(&text[1..text.len() - 1]))
            }
            "template_string" => {
                if self
                    .children(id)
                    .any(|c| self.kind(c) == "template_substitution")
                {
                    return None;
                }
                let text = self.text(id);
                if text.len() < 2 {
                    return None;
                }
                Some(literal::unescape(&text[1..text.len() - 1]))
            }
            _ => None,
        }
    }

    /// Strips parentheses, non-null assertions and `satisfies` wrappers
    pub fn skip_parens(&self, mut id: NodeId) -> NodeId {
        loop {
            match self.kind(id) {
                "parenthesized_expression" | "non_null_expression" | "satisfies_expression" => {
                    match self.named_children(id).next() {
                        Some(inner) => id = inner,
                        None => return id,
                    }
                }
                _ => return id,
            }
        }
    }
}

/// A single `@tag value` entry of a JSDoc block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub name: String,
    pub value: Option<String>,
}

/// Parsed JSDoc block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Free text before the first tag
    pub text: Option<String>,
    pub tags: Vec<DocTag>,
}

impl DocComment {
    /// Parses a raw `/** ... */` comment. Returns `None` for any other comment form.
    pub fn parse(raw: &str) -> Option<DocComment> {
        let raw = raw.trim();
        if !raw.starts_with("/**") || !raw.ends_with("*/") || raw.len() < 5 {
            return None;
        }
        let inner = &raw[3..raw.len() - 2];

        let mut text_lines: Vec<String> = Vec::new();
        let mut tags: Vec<DocTag> = Vec::new();

        for line in inner.lines() {
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line).trim();

            if let Some(rest) = line.strip_prefix('@') {
                let (name, value) = match rest.find(char::is_whitespace) {
                    Some(split) => (&rest[..split], rest[split..].trim()),
                    None => (rest, ""),
                };
                tags.push(DocTag {
                    name: name.to_string(),
                    value: (!value.is_empty()).then(|| value.to_string()),
                });
            } else if let Some(last) = tags.last_mut() {
                // continuation of the previous tag
                if !line.is_empty() {
                    let value = match last.value.take() {
                        Some(v) => format!("{} {}", v, line),
                        None => line.to_string(),
                    };
                    last.value = Some(value);
                }
            } else {
                text_lines.push(line.to_string());
            }
        }

        let text = text_lines.join("\n").trim().to_string();
        Some(DocComment {
            text: (!text.is_empty()).then_some(text),
            tags,
        })
    }

    pub fn tag(&self, name: &str) -> Option<&DocTag> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tag(name).and_then(|t| t.value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_doc_comment_text_and_tags() {
        let doc = DocComment::parse(
            "/**\n * Lists users.\n * @summary List users\n * @tags Users, Admin\n * @deprecated\n */",
        )
        .unwrap();

        assert_eq!(doc.text.as_deref(), Some("Lists users."));
        assert_eq!(doc.tag_value("summary"), Some("List users"));
        assert_eq!(doc.tag_value("tags"), Some("Users, Admin"));
        assert!(doc.has_tag("deprecated"));
        assert_eq!(doc.tag_value("deprecated"), None);
    }

    #[test]
    fn test_parse_single_line_doc_comment() {
        let doc = DocComment::parse("/** The user's name */").unwrap();
        assert_eq!(doc.text.as_deref(), Some("The user's name"));
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn test_plain_comments_are_not_doc_comments() {
        assert!(DocComment::parse("// @summary nope").is_none());
        assert!(DocComment::parse("/* @summary nope */").is_none());
    }

    #[test]
    fn test_multiline_tag_value_is_joined() {
        let doc = DocComment::parse("/**\n * @description first line\n *   second line\n */").unwrap();
        assert_eq!(doc.tag_value("description"), Some("first line second line"));
    }
}
