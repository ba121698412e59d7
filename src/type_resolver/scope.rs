//! Name lookup, import/export tables and symbol creation.

use super::types::{SymbolData, SymbolKey, SymbolKind};
use super::TypeResolver;
use crate::oracle::SymbolId;
use crate::syntax::{NodeId, UnitId};
use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

const MAX_ALIAS_HOPS: usize = 32;
const MAX_EXPORT_DEPTH: usize = 16;

/// Which declaration space a name is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Namespace {
    Value,
    Type,
}

/// Names declared directly in one scope, mapped to their binding node
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    values: HashMap<String, NodeId>,
    types: HashMap<String, NodeId>,
}

impl Bindings {
    fn value(&mut self, name: &str, node: NodeId) {
        self.values.entry(name.to_string()).or_insert(node);
    }

    fn ty(&mut self, name: &str, node: NodeId) {
        self.types.entry(name.to_string()).or_insert(node);
    }

    fn both(&mut self, name: &str, node: NodeId) {
        self.value(name, node);
        self.ty(name, node);
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ExportTarget {
    /// A name declared in the module's top-level scope
    Local(String),
    /// A declaration or default-exported expression
    Node(NodeId),
    Reexport { unit: UnitId, name: String },
    Namespace(UnitId),
    /// Re-export from a module that was not loaded
    Unresolved,
}

#[derive(Debug, Default)]
pub(crate) struct Exports {
    named: HashMap<String, ExportTarget>,
    stars: Vec<UnitId>,
}

fn is_scope(kind: &str) -> bool {
    matches!(
        kind,
        "program"
            | "statement_block"
            | "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
            | "method_signature"
            | "function_signature"
            | "interface_declaration"
            | "type_alias_declaration"
            | "class_declaration"
            | "abstract_class_declaration"
            | "class"
    )
}

impl<'p> TypeResolver<'p> {
    pub(crate) fn symbol(&self, id: SymbolId) -> SymbolData {
        self.symbols.borrow()[id.0 as usize].clone()
    }

    pub(crate) fn intern_symbol(&self, key: SymbolKey, make: impl FnOnce() -> SymbolData) -> SymbolId {
        if let Some(&id) = self.symbol_index.borrow().get(&key) {
            return id;
        }
        let data = make();
        let mut symbols = self.symbols.borrow_mut();
        let id = SymbolId(symbols.len() as u32);
        symbols.push(data);
        self.symbol_index.borrow_mut().insert(key, id);
        id
    }

    /// Finds the binding node for `name` visible from `at`
    pub(crate) fn lookup(&self, name: &str, at: NodeId, namespace: Namespace) -> Option<NodeId> {
        let mut current = Some(at);
        while let Some(node) = current {
            if is_scope(self.program.kind(node)) {
                let bindings = self.bindings(node);
                let table = match namespace {
                    Namespace::Value => &bindings.values,
                    Namespace::Type => &bindings.types,
                };
                if let Some(&binding) = table.get(name) {
                    return Some(binding);
                }
            }
            current = self.program.parent(node);
        }
        None
    }

    fn bindings(&self, scope: NodeId) -> Rc<Bindings> {
        if let Some(bindings) = self.scopes.borrow().get(&scope) {
            return Rc::clone(bindings);
        }
        let bindings = Rc::new(self.collect_bindings(scope));
        self.scopes.borrow_mut().insert(scope, Rc::clone(&bindings));
        bindings
    }

    fn collect_bindings(&self, scope: NodeId) -> Bindings {
        let program = self.program;
        let mut bindings = Bindings::default();
        match program.kind(scope) {
            "program" | "statement_block" => {
                for statement in program.named_children(scope) {
                    self.declare_statement(statement, &mut bindings);
                }
            }
            _ => {
                for param in self.type_parameters(scope) {
                    if let Some(name) = program.field(param, "name") {
                        bindings.ty(program.text(name), param);
                    }
                }
                if let Some(params) = program.field(scope, "parameters") {
                    for param in program.named_children(params) {
                        self.declare_parameter(param, &mut bindings);
                    }
                }
                if let Some(param) = program.field(scope, "parameter") {
                    self.declare_parameter(param, &mut bindings);
                }
            }
        }
        bindings
    }

    fn declare_statement(&self, statement: NodeId, bindings: &mut Bindings) {
        let program = self.program;
        let name_of = |node: NodeId| program.field(node, "name").map(|n| program.text(n));
        match program.kind(statement) {
            "export_statement" => {
                if let Some(declaration) = program.field(statement, "declaration") {
                    self.declare_statement(declaration, bindings);
                }
            }
            "ambient_declaration" => {
                for inner in program.named_children(statement) {
                    self.declare_statement(inner, bindings);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                for declarator in program.named_children(statement) {
                    if program.kind(declarator) != "variable_declarator" {
                        continue;
                    }
                    if let Some(pattern) = program.field(declarator, "name") {
                        self.declare_pattern(pattern, declarator, bindings);
                    }
                }
            }
            "function_declaration" | "generator_function_declaration" | "function_signature"
            | "internal_module" | "module" => {
                if let Some(name) = name_of(statement) {
                    bindings.value(name, statement);
                }
            }
            "class_declaration" | "abstract_class_declaration" | "enum_declaration" => {
                if let Some(name) = name_of(statement) {
                    bindings.both(name, statement);
                }
            }
            "interface_declaration" | "type_alias_declaration" => {
                if let Some(name) = name_of(statement) {
                    bindings.ty(name, statement);
                }
            }
            "import_statement" => {
                let Some(clause) = program.child_of_kind(statement, "import_clause") else {
                    return;
                };
                for part in program.named_children(clause) {
                    match program.kind(part) {
                        "identifier" => bindings.both(program.text(part), part),
                        "named_imports" => {
                            for specifier in program.named_children(part) {
                                if program.kind(specifier) != "import_specifier" {
                                    continue;
                                }
                                let local = program
                                    .field(specifier, "alias")
                                    .or_else(|| program.field(specifier, "name"));
                                if let Some(local) = local {
                                    bindings.both(program.text(local), specifier);
                                }
                            }
                        }
                        "namespace_import" => {
                            if let Some(name) = program.child_of_kind(part, "identifier") {
                                bindings.both(program.text(name), part);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Binds the names introduced by a declarator's name pattern
    fn declare_pattern(&self, pattern: NodeId, declarator: NodeId, bindings: &mut Bindings) {
        let program = self.program;
        match program.kind(pattern) {
            "identifier" => bindings.value(program.text(pattern), declarator),
            "object_pattern" | "array_pattern" => {
                for element in program.named_children(pattern) {
                    self.declare_element(element, bindings);
                }
            }
            _ => {}
        }
    }

    fn declare_element(&self, element: NodeId, bindings: &mut Bindings) {
        let program = self.program;
        match program.kind(element) {
            "identifier" | "shorthand_property_identifier_pattern" => {
                bindings.value(program.text(element), element)
            }
            "pair_pattern" => {
                if let Some(value) = program.field(element, "value") {
                    self.declare_element(value, bindings);
                }
            }
            "object_assignment_pattern" | "assignment_pattern" => {
                if let Some(left) = program.field(element, "left") {
                    self.declare_element(left, bindings);
                }
            }
            "rest_pattern" => {
                if let Some(name) = program.child_of_kind(element, "identifier") {
                    bindings.value(program.text(name), name);
                }
            }
            "object_pattern" | "array_pattern" => {
                for inner in program.named_children(element) {
                    self.declare_element(inner, bindings);
                }
            }
            _ => {}
        }
    }

    fn declare_parameter(&self, param: NodeId, bindings: &mut Bindings) {
        let program = self.program;
        match program.kind(param) {
            "required_parameter" | "optional_parameter" => match program.field(param, "pattern") {
                Some(pattern) if program.kind(pattern) == "identifier" => {
                    bindings.value(program.text(pattern), param)
                }
                Some(pattern) => self.declare_element(pattern, bindings),
                None => {}
            },
            "assignment_pattern" => match program.field(param, "left") {
                Some(left) if program.kind(left) == "identifier" => {
                    bindings.value(program.text(left), param)
                }
                Some(left) => self.declare_element(left, bindings),
                None => {}
            },
            _ => self.declare_element(param, bindings),
        }
    }

    /// Symbol for a binding node found by [`Self::lookup`] or an export table
    pub(crate) fn symbol_for_binding(&self, binding: NodeId) -> SymbolId {
        let program = self.program;
        self.intern_symbol(SymbolKey::Decl(binding), || {
            let text_of = |n: Option<NodeId>| n.map(|n| program.text(n).to_string());
            let module = || {
                program
                    .ancestor_of_kind(binding, &["import_statement"])
                    .and_then(|statement| program.field(statement, "source"))
                    .and_then(|source| program.string_value(source))
                    .and_then(|specifier| program.resolve_import(binding.unit, &specifier))
            };

            match program.kind(binding) {
                "import_specifier" => {
                    let imported_node = program.field(binding, "name");
                    let imported = imported_node
                        .and_then(|n| program.string_value(n))
                        .or_else(|| text_of(imported_node))
                        .unwrap_or_default();
                    let local = text_of(program.field(binding, "alias")).unwrap_or_else(|| imported.clone());
                    SymbolData {
                        name: local,
                        kind: SymbolKind::Import {
                            decl: binding,
                            module: module(),
                            imported,
                        },
                    }
                }
                "namespace_import" => {
                    let name = text_of(program.child_of_kind(binding, "identifier")).unwrap_or_default();
                    let kind = match module() {
                        Some(unit) => SymbolKind::Namespace { unit },
                        None => SymbolKind::Import {
                            decl: binding,
                            module: None,
                            imported: "*".to_string(),
                        },
                    };
                    SymbolData { name, kind }
                }
                "identifier"
                    if program
                        .parent(binding)
                        .is_some_and(|p| program.kind(p) == "import_clause") =>
                {
                    SymbolData {
                        name: program.text(binding).to_string(),
                        kind: SymbolKind::Import {
                            decl: binding,
                            module: module(),
                            imported: "default".to_string(),
                        },
                    }
                }
                _ => {
                    let name = program
                        .field(binding, "name")
                        .or_else(|| program.field(binding, "pattern"))
                        .or_else(|| program.field(binding, "left"))
                        .map(|n| program.text(n).to_string())
                        .unwrap_or_else(|| match program.kind(binding) {
                            "identifier" | "shorthand_property_identifier_pattern" => {
                                program.text(binding).to_string()
                            }
                            _ => "default".to_string(),
                        });
                    SymbolData {
                        name,
                        kind: SymbolKind::Declared { decl: binding },
                    }
                }
            }
        })
    }

    pub(crate) fn namespace_symbol(&self, unit: UnitId) -> SymbolId {
        let program = self.program;
        self.intern_symbol(SymbolKey::Namespace(unit), || SymbolData {
            name: program
                .unit(unit)
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            kind: SymbolKind::Namespace { unit },
        })
    }

    /// Follows import bindings until a non-import symbol is reached.
    ///
    /// Returns `None` when the chain leaves the loaded program (e.g. a package import).
    pub(crate) fn follow_alias(&self, symbol: SymbolId) -> Option<SymbolId> {
        let mut current = symbol;
        for _ in 0..MAX_ALIAS_HOPS {
            match self.symbol(current).kind {
                SymbolKind::Import {
                    module: Some(unit),
                    imported,
                    ..
                } => {
                    if imported == "*" {
                        return Some(self.namespace_symbol(unit));
                    }
                    current = self.resolve_export(unit, &imported, 0)?;
                }
                SymbolKind::Import { module: None, .. } => return None,
                _ => return Some(current),
            }
        }
        debug!("Alias chain too long starting at symbol {:?}", symbol);
        None
    }

    /// Name imported by an import binding, when it is a plain named import
    pub(crate) fn imported_name(&self, symbol: SymbolId) -> Option<String> {
        match self.symbol(symbol).kind {
            SymbolKind::Import { imported, .. } if imported != "default" && imported != "*" => {
                Some(imported)
            }
            _ => None,
        }
    }

    /// Module a namespace identifier (`import * as ns`) refers to
    pub(crate) fn namespace_unit(&self, identifier: NodeId) -> Option<UnitId> {
        let binding = self.lookup(self.program.text(identifier), identifier, Namespace::Value)?;
        let symbol = self.follow_alias(self.symbol_for_binding(binding))?;
        match self.symbol(symbol).kind {
            SymbolKind::Namespace { unit } => Some(unit),
            _ => None,
        }
    }

    fn exports(&self, unit: UnitId) -> Rc<Exports> {
        if let Some(exports) = self.exports.borrow().get(&unit) {
            return Rc::clone(exports);
        }
        let exports = Rc::new(self.collect_exports(unit));
        self.exports.borrow_mut().insert(unit, Rc::clone(&exports));
        exports
    }

    fn collect_exports(&self, unit: UnitId) -> Exports {
        let program = self.program;
        let mut exports = Exports::default();
        let root = program.root(unit);

        for statement in program.named_children(root) {
            if program.kind(statement) != "export_statement" {
                continue;
            }
            let module = program
                .field(statement, "source")
                .and_then(|s| program.string_value(s))
                .map(|specifier| program.resolve_import(unit, &specifier));
            let is_default = program.has_token(statement, "default");

            if let Some(declaration) = program.field(statement, "declaration") {
                if is_default {
                    exports
                        .named
                        .insert("default".to_string(), ExportTarget::Node(declaration));
                    continue;
                }
                let mut declared = Bindings::default();
                self.declare_statement(declaration, &mut declared);
                for (name, node) in declared.values.into_iter().chain(declared.types) {
                    exports
                        .named
                        .entry(name)
                        .or_insert(ExportTarget::Node(node));
                }
            } else if let Some(value) = program.field(statement, "value") {
                let target = if program.kind(value) == "identifier" {
                    ExportTarget::Local(program.text(value).to_string())
                } else {
                    ExportTarget::Node(value)
                };
                exports.named.insert("default".to_string(), target);
            } else if let Some(clause) = program.child_of_kind(statement, "export_clause") {
                for specifier in program.named_children(clause) {
                    let Some(name_node) = program.field(specifier, "name") else {
                        continue;
                    };
                    let name = program
                        .string_value(name_node)
                        .unwrap_or_else(|| program.text(name_node).to_string());
                    let exported = program
                        .field(specifier, "alias")
                        .map(|a| program.string_value(a).unwrap_or_else(|| program.text(a).to_string()))
                        .unwrap_or_else(|| name.clone());
                    let target = match module {
                        Some(Some(unit)) => ExportTarget::Reexport { unit, name },
                        Some(None) => ExportTarget::Unresolved,
                        None => ExportTarget::Local(name),
                    };
                    exports.named.insert(exported, target);
                }
            } else if let Some(namespace) = program.child_of_kind(statement, "namespace_export") {
                let name = program
                    .named_children(namespace)
                    .next()
                    .map(|n| program.text(n).to_string())
                    .unwrap_or_default();
                let target = match module {
                    Some(Some(unit)) => ExportTarget::Namespace(unit),
                    _ => ExportTarget::Unresolved,
                };
                exports.named.insert(name, target);
            } else if program.has_token(statement, "*") {
                if let Some(Some(unit)) = module {
                    exports.stars.push(unit);
                }
            }
        }
        exports
    }

    /// Symbol exported from `unit` under `name`, following re-exports
    pub(crate) fn resolve_export(&self, unit: UnitId, name: &str, depth: usize) -> Option<SymbolId> {
        if depth > MAX_EXPORT_DEPTH {
            return None;
        }
        let exports = self.exports(unit);
        match exports.named.get(name) {
            Some(ExportTarget::Local(local)) => {
                let root = self.program.root(unit);
                let binding = self
                    .lookup(local, root, Namespace::Value)
                    .or_else(|| self.lookup(local, root, Namespace::Type))?;
                Some(self.symbol_for_binding(binding))
            }
            Some(ExportTarget::Node(node)) => Some(self.symbol_for_binding(*node)),
            Some(ExportTarget::Reexport { unit, name }) => self.resolve_export(*unit, name, depth + 1),
            Some(ExportTarget::Namespace(unit)) => Some(self.namespace_symbol(*unit)),
            Some(ExportTarget::Unresolved) => None,
            None if name == "default" => None,
            None => exports
                .stars
                .iter()
                .find_map(|&star| self.resolve_export(star, name, depth + 1)),
        }
    }
}
