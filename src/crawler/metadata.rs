//! Operation metadata from JSDoc blocks and inline directive comments.
//!
//! JSDoc blocks on the route registration and on the handler definition supply `@summary`,
//! `@description`, `@operationId`, `@deprecated` and `@tags`. Directive comments inside the
//! handler body (`// #swagger.responses.201.description = "Created"`) assign arbitrary fields
//! of the operation. Directive values are parsed as data literals, never evaluated.

use crate::literal::parse_literal;
use crate::openapi_builder::Operation;
use crate::syntax::{DocComment, NodeId, Program};
use log::{debug, warn};
use serde_json::{Map, Value};

/// Directive markers recognized when none are configured
pub const DEFAULT_DIRECTIVE_MARKERS: [&str; 2] = ["swagger", "directive"];

/// Documentation gathered from one JSDoc block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocMetadata {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,
}

impl DocMetadata {
    pub fn from_doc(doc: &DocComment) -> Self {
        let tags = doc
            .tag_value("tags")
            .map(|value| {
                value
                    .split(',')
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            summary: doc.tag_value("summary").map(str::to_string),
            description: doc.tag_value("description").map(str::to_string),
            operation_id: doc.tag_value("operationId").map(str::to_string),
            deprecated: doc.has_tag("deprecated"),
            tags,
        }
    }

    /// Merges into an operation: present scalars override, tags are unioned
    pub fn merge_into(&self, operation: &mut Operation) {
        if let Some(summary) = &self.summary {
            operation.summary = Some(summary.clone());
        }
        if let Some(description) = &self.description {
            operation.description = Some(description.clone());
        }
        if let Some(operation_id) = &self.operation_id {
            operation.operation_id = Some(operation_id.clone());
        }
        if self.deprecated {
            operation.deprecated = true;
        }
        operation.add_tags(self.tags.iter().cloned());
    }
}

/// JSDoc on a route registration call, e.g. above `router.get(...)`
pub fn call_site_docs(program: &Program, call: NodeId) -> DocMetadata {
    let mut current = Some(call);
    while let Some(node) = current {
        if let Some(doc) = program.doc_comment(node) {
            return DocMetadata::from_doc(&doc);
        }
        current = program
            .parent(node)
            .filter(|p| matches!(program.kind(*p), "expression_statement" | "await_expression"));
    }
    DocMetadata::default()
}

/// JSDoc on a handler definition, climbing through the declaration that holds it
pub fn handler_docs(program: &Program, handler: NodeId) -> DocMetadata {
    let mut current = Some(handler);
    while let Some(node) = current {
        if let Some(doc) = program.doc_comment(node) {
            return DocMetadata::from_doc(&doc);
        }
        current = program.parent(node).filter(|p| {
            matches!(
                program.kind(*p),
                "variable_declarator"
                    | "lexical_declaration"
                    | "variable_declaration"
                    | "export_statement"
                    | "pair"
                    | "public_field_definition"
            )
        });
    }
    DocMetadata::default()
}

/// A parsed `#<marker>.<key> = <value>` directive
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub key: String,
    pub value: Value,
}

/// Applies the directive comments preceding the top-level statements of a handler body.
///
/// Comments nested deeper in the body, or in other functions, are not considered.
pub fn apply_directives(program: &Program, body: NodeId, operation: &mut Operation, markers: &[String]) {
    if program.kind(body) != "statement_block" {
        return;
    }
    for statement in program.named_children(body) {
        for comment in program.leading_comments(statement) {
            for directive in parse_directives(comment, markers) {
                apply_directive(operation, directive);
            }
        }
    }
}

/// Extracts the directives of one comment. Unparseable values are reported and skipped.
pub fn parse_directives(comment: &str, markers: &[String]) -> Vec<Directive> {
    let content = strip_comment_delimiters(comment);
    let mut directives = Vec::new();

    let mut offset = 0;
    while offset < content.len() {
        let Some((start, key, value_start)) = find_directive(&content[offset..], markers) else {
            break;
        };
        let value_start = offset + value_start;
        let line_end = content[value_start..]
            .find('\n')
            .map(|i| value_start + i)
            .unwrap_or(content.len());

        // single-line value first, then values spanning the following lines
        let mut ends = vec![line_end];
        ends.extend(
            content[line_end..]
                .match_indices('\n')
                .map(|(i, _)| line_end + i)
                .skip(1),
        );
        ends.push(content.len());
        ends.dedup();

        let mut parsed = Err(None);
        for end in ends {
            match parse_literal(&content[value_start..end]) {
                Ok(value) => {
                    parsed = Ok((value, end));
                    break;
                }
                Err(e) => {
                    if parsed.is_err() && end == line_end {
                        parsed = Err(Some(e));
                    }
                }
            }
        }
        let parsed = parsed.map_err(|e| e.map(|e| e.to_string()).unwrap_or_default());

        match parsed {
            Ok((value, end)) => {
                debug!("Directive {} = {}", key, value);
                directives.push(Directive { key, value });
                offset = end;
            }
            Err(e) => {
                warn!(
                    "Failed to parse directive `{}`: {}",
                    content[offset + start..line_end].trim(),
                    e
                );
                offset = line_end;
            }
        }
    }
    directives
}

/// Finds the next `#<marker>.<key> =` in `text`.
///
/// # Returns
///
/// Start of the directive, the dotted key and the position right after `=`
fn find_directive(text: &str, markers: &[String]) -> Option<(usize, String, usize)> {
    let mut search = 0;
    while let Some(hash) = text[search..].find('#').map(|i| search + i) {
        search = hash + 1;
        for marker in markers {
            let prefix = format!("#{}.", marker);
            if !text[hash..].starts_with(&prefix) {
                continue;
            }
            let key_start = hash + prefix.len();
            let key_len = text[key_start..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.' || c == '$' || c == '-'))
                .unwrap_or(text.len() - key_start);
            let key = text[key_start..key_start + key_len].trim_end_matches('.');
            let rest = &text[key_start + key_len..];
            let trimmed = rest.trim_start_matches([' ', '\t']);
            if key.is_empty() || !trimmed.starts_with('=') {
                continue;
            }
            let value_start = key_start + key_len + (rest.len() - trimmed.len()) + 1;
            return Some((hash, key.to_string(), value_start));
        }
    }
    None
}

fn strip_comment_delimiters(comment: &str) -> String {
    let comment = comment.trim();
    if let Some(line) = comment.strip_prefix("//") {
        return line.trim().to_string();
    }
    let inner = comment
        .strip_prefix("/*")
        .and_then(|c| c.strip_suffix("*/"))
        .unwrap_or(comment);
    inner
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Sets the field named by a directive key on the operation
pub fn apply_directive(operation: &mut Operation, directive: Directive) {
    let Directive { key, value } = directive;
    match key.as_str() {
        "tags" => match value {
            Value::String(tag) => operation.add_tags([tag]),
            Value::Array(items) => {
                let tags: Vec<String> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(tag) => Some(tag),
                        other => {
                            warn!("Ignoring non-string tag {}", other);
                            None
                        }
                    })
                    .collect();
                operation.add_tags(tags);
            }
            other => warn!("Ignoring tags directive with value {}", other),
        },
        "summary" => operation.summary = scalar_text(&key, value),
        "description" => operation.description = scalar_text(&key, value),
        "operationId" => operation.operation_id = scalar_text(&key, value),
        "deprecated" => operation.deprecated = is_truthy(&value),
        _ => set_operation_field(operation, &key, value),
    }
}

fn scalar_text(key: &str, value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => {
            warn!("Directive `{}` expects text, got {}", key, other);
            None
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Assigns a (possibly nested) field through the operation's JSON form.
///
/// The operation is left untouched if the result no longer describes a valid operation.
fn set_operation_field(operation: &mut Operation, key: &str, value: Value) {
    let mut document = match serde_json::to_value(&*operation) {
        Ok(document) => document,
        Err(e) => {
            warn!("Cannot apply directive `{}`: {}", key, e);
            return;
        }
    };
    set_deep_value(&mut document, key, value);

    match serde_json::from_value::<Operation>(document) {
        Ok(updated) => *operation = updated,
        Err(e) => warn!("Directive `{}` does not fit the operation: {}", key, e),
    }
}

/// Sets `value` at a dotted path, creating intermediate objects as needed.
///
/// Numeric segments index into existing arrays; any other non-object on the way is replaced.
pub fn set_deep_value(target: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').filter(|p| !p.is_empty()).collect();
    if !parts.is_empty() {
        set_path(target, &parts, value);
    }
}

fn set_path(target: &mut Value, parts: &[&str], value: Value) {
    let Some((first, rest)) = parts.split_first() else {
        *target = value;
        return;
    };

    if let Value::Array(items) = target {
        if let Some(item) = first.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            set_path(item, rest, value);
            return;
        }
    }

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let child = map.entry(first.to_string()).or_insert(Value::Null);
        set_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::syntax::{UnitId, UnitOrigin};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    fn markers() -> Vec<String> {
        DEFAULT_DIRECTIVE_MARKERS.iter().map(|m| m.to_string()).collect()
    }

    fn create_program(source: &str) -> Program {
        let mut parser = AstParser::new().unwrap();
        let mut program = Program::new();
        let unit = parser
            .parse_source(PathBuf::from("routes.ts"), source.to_string(), UnitOrigin::Project)
            .unwrap();
        program.add_unit(unit);
        program
    }

    fn first_of_kind(program: &Program, kind: &str) -> NodeId {
        let count = program.unit(UnitId(0)).nodes.len();
        (0..count)
            .map(|index| NodeId {
                unit: UnitId(0),
                index: index as u32,
            })
            .find(|&id| program.kind(id) == kind)
            .unwrap()
    }

    #[test]
    fn test_parse_single_line_directives() {
        let directives = parse_directives("// #swagger.tags = ['Users']", &markers());
        assert_eq!(
            directives,
            vec![Directive {
                key: "tags".to_string(),
                value: json!(["Users"])
            }]
        );

        let directives = parse_directives("// #directive.responses.201.description = \"Made\"", &markers());
        assert_eq!(directives[0].key, "responses.201.description");
        assert_eq!(directives[0].value, json!("Made"));
    }

    #[test]
    fn test_parse_block_comment_with_several_directives() {
        let comment = "/*\n * #swagger.summary = 'List'\n * #swagger.security = [{\n *   bearerAuth: []\n * }]\n */";
        let directives = parse_directives(comment, &markers());
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].value, json!("List"));
        assert_eq!(directives[1].key, "security");
        assert_eq!(directives[1].value, json!([{"bearerAuth": []}]));
    }

    #[test]
    fn test_unparseable_directive_is_skipped() {
        let directives = parse_directives("// #swagger.summary = computeSummary()", &markers());
        assert!(directives.is_empty());
        assert!(parse_directives("// plain comment", &markers()).is_empty());
        assert!(parse_directives("// #other.summary = 'x'", &markers()).is_empty());
    }

    #[test]
    fn test_apply_scalar_and_tag_directives() {
        let mut operation = Operation::new();
        operation.add_tags(["Public"]);
        apply_directive(&mut operation, Directive { key: "tags".into(), value: json!(["Public", "Users"]) });
        apply_directive(&mut operation, Directive { key: "summary".into(), value: json!("Get users") });
        apply_directive(&mut operation, Directive { key: "deprecated".into(), value: json!(1) });

        assert_eq!(operation.tags, vec!["Public", "Users"]);
        assert_eq!(operation.summary.as_deref(), Some("Get users"));
        assert!(operation.deprecated);
    }

    #[test]
    fn test_apply_nested_directive() {
        let mut operation = Operation::new();
        apply_directive(
            &mut operation,
            Directive { key: "responses.201.description".into(), value: json!("User created") },
        );
        apply_directive(
            &mut operation,
            Directive { key: "security".into(), value: json!([{"bearerAuth": []}]) },
        );
        apply_directive(&mut operation, Directive { key: "x-internal".into(), value: json!(true) });

        assert_eq!(operation.responses["201"].description, "User created");
        assert_eq!(operation.responses["200"].description, "OK");
        assert_eq!(operation.security.as_ref().unwrap()[0]["bearerAuth"], Vec::<String>::new());
        assert_eq!(operation.extensions["x-internal"], json!(true));
    }

    #[test]
    fn test_directive_that_does_not_fit_is_ignored() {
        let mut operation = Operation::new();
        apply_directive(&mut operation, Directive { key: "responses".into(), value: json!(5) });
        assert!(operation.responses.contains_key("200"));
    }

    #[test]
    fn test_set_deep_value() {
        let mut value = json!({"a": {"b": 1}, "list": [{"x": 1}]});
        set_deep_value(&mut value, "a.c.d", json!(2));
        set_deep_value(&mut value, "list.0.x", json!(3));
        set_deep_value(&mut value, "a.b.e", json!(4));
        assert_eq!(value, json!({"a": {"b": {"e": 4}, "c": {"d": 2}}, "list": [{"x": 3}]}));
    }

    #[test]
    fn test_apply_directives_only_from_top_level_statements() {
        let program = create_program(
            "function handler(req, res) {\n  // #swagger.summary = 'Top'\n  const x = 1;\n  if (x) {\n    // #swagger.description = 'Nested'\n    res.send();\n  }\n}",
        );
        let function = first_of_kind(&program, "function_declaration");
        let body = program.field(function, "body").unwrap();
        let mut operation = Operation::new();
        apply_directives(&program, body, &mut operation, &markers());

        assert_eq!(operation.summary.as_deref(), Some("Top"));
        assert_eq!(operation.description, None);
    }

    #[test]
    fn test_call_site_and_handler_docs() {
        let program = create_program(
            "/**\n * @summary Get users\n * @tags Public\n */\nrouter.get('/users', getUsers);\n\n/**\n * @description Lists users\n * @tags Users\n * @deprecated\n */\nexport const getUsers = (req, res) => {};",
        );
        let call = first_of_kind(&program, "call_expression");
        let handler = first_of_kind(&program, "arrow_function");

        let call_docs = call_site_docs(&program, call);
        assert_eq!(call_docs.summary.as_deref(), Some("Get users"));
        assert_eq!(call_docs.tags, vec!["Public"]);

        let docs = handler_docs(&program, handler);
        assert_eq!(docs.description.as_deref(), Some("Lists users"));
        assert!(docs.deprecated);

        let mut operation = Operation::new();
        call_docs.merge_into(&mut operation);
        docs.merge_into(&mut operation);
        assert_eq!(operation.tags, vec!["Public", "Users"]);
        assert_eq!(operation.summary.as_deref(), Some("Get users"));
    }
}
