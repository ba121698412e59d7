//! Declaration-level type resolver for TypeScript and JavaScript programs.
//!
//! [`TypeResolver`] implements [`TypeOracle`] directly on top of the syntax trees of a loaded
//! [`Program`]. It understands what a route crawler needs: scopes and imports (including
//! re-exports and namespace imports), interfaces, classes, type aliases, enums, generics with
//! explicit type arguments, unions, intersections, tuples, and a light inference for expressions
//! (literals, object/array literals, casts, `await`, calls with declared return types, member
//! access). It is not a full checker: overloads, conditional and mapped types, and control-flow
//! narrowing are not modelled, and unknown library types are represented by name only.
//!
//! All caches use interior mutability, so a resolver is used through `&self` but is not `Sync`.

mod scope;
mod types;

use crate::oracle::{number_to_json, LiteralValue, SymbolId, TypeId, TypeOracle, TypeShape};
use crate::syntax::{NodeId, Program, UnitId};
use log::debug;
use scope::Namespace;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use types::{canonical_number, ObjectKey, PropSource, SymbolData, SymbolKey, SymbolKind, TypeData};

/// Type resolver over a loaded program
pub struct TypeResolver<'p> {
    program: &'p Program,
    /// Interned types, indexed by `TypeId`
    types: RefCell<Vec<TypeData>>,
    interned: RefCell<HashMap<TypeData, TypeId>>,
    symbols: RefCell<Vec<SymbolData>>,
    symbol_index: RefCell<HashMap<SymbolKey, SymbolId>>,
    scopes: RefCell<HashMap<NodeId, Rc<scope::Bindings>>>,
    exports: RefCell<HashMap<UnitId, Rc<scope::Exports>>>,
    /// Property symbols of object-like types
    members: RefCell<HashMap<TypeId, Rc<Vec<SymbolId>>>>,
    alias_cache: RefCell<HashMap<(NodeId, Vec<TypeId>), TypeId>>,
    /// Track type aliases currently being resolved to detect circular references
    resolving_stack: RefCell<HashSet<(NodeId, Vec<TypeId>)>>,
    /// Object types whose members are currently being collected
    member_stack: RefCell<HashSet<TypeId>>,
    /// Inferred types of expressions
    node_types: RefCell<HashMap<NodeId, TypeId>>,
    inferring: RefCell<HashSet<NodeId>>,
}

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_annotation"
            | "predefined_type"
            | "type_identifier"
            | "generic_type"
            | "nested_type_identifier"
            | "object_type"
            | "union_type"
            | "intersection_type"
            | "array_type"
            | "tuple_type"
            | "literal_type"
            | "function_type"
            | "parenthesized_type"
            | "readonly_type"
            | "type_query"
            | "lookup_type"
            | "template_literal_type"
            | "index_type_query"
    )
}

fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
            | "method_signature"
            | "function_signature"
    )
}

impl<'p> TypeResolver<'p> {
    /// Create a new TypeResolver over a loaded program
    pub fn new(program: &'p Program) -> Self {
        debug!("Initializing TypeResolver with {} units", program.unit_count());
        Self {
            program,
            types: RefCell::new(Vec::new()),
            interned: RefCell::new(HashMap::new()),
            symbols: RefCell::new(Vec::new()),
            symbol_index: RefCell::new(HashMap::new()),
            scopes: RefCell::new(HashMap::new()),
            exports: RefCell::new(HashMap::new()),
            members: RefCell::new(HashMap::new()),
            alias_cache: RefCell::new(HashMap::new()),
            resolving_stack: RefCell::new(HashSet::new()),
            member_stack: RefCell::new(HashSet::new()),
            node_types: RefCell::new(HashMap::new()),
            inferring: RefCell::new(HashSet::new()),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Type of a value expression
    pub(crate) fn type_at_value(&self, node: NodeId) -> TypeId {
        if let Some(&cached) = self.node_types.borrow().get(&node) {
            return cached;
        }
        if !self.inferring.borrow_mut().insert(node) {
            // recursive initializer, e.g. `const a = a.b`
            return self.any();
        }
        let ty = self.infer(node);
        self.inferring.borrow_mut().remove(&node);
        self.node_types.borrow_mut().insert(node, ty);
        ty
    }

    fn infer(&self, node: NodeId) -> TypeId {
        let program = self.program;
        match program.kind(node) {
            "identifier" | "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                match self.lookup(program.text(node), node, Namespace::Value) {
                    Some(binding) => {
                        let symbol = self.symbol_for_binding(binding);
                        self.symbol_type(symbol)
                    }
                    None if program.text(node) == "undefined" => self.intern(TypeData::Undefined),
                    None => self.any(),
                }
            }
            "string" | "template_string" => match program.string_value(node) {
                Some(value) => self.intern(TypeData::StringLit(value)),
                None => self.intern(TypeData::String),
            },
            "number" => self.intern(TypeData::NumberLit(canonical_number(program.text(node)))),
            "true" => self.intern(TypeData::BooleanLit(true)),
            "false" => self.intern(TypeData::BooleanLit(false)),
            "null" => self.intern(TypeData::Null),
            "undefined" => self.intern(TypeData::Undefined),
            "regex" => self.builtin_type("RegExp", Vec::new()),
            "object" => {
                let symbol = self.builtin_symbol("__object");
                self.intern(TypeData::Object {
                    key: ObjectKey::Value { node },
                    symbol,
                    alias: None,
                })
            }
            "array" => {
                let elements: Vec<TypeId> = program
                    .named_children(node)
                    .filter(|&e| program.kind(e) != "spread_element")
                    .map(|e| self.widen(self.type_at_value(e)))
                    .collect();
                let element = if elements.is_empty() {
                    self.any()
                } else {
                    self.make_union(elements)
                };
                self.intern(TypeData::Array(element))
            }
            "parenthesized_expression" | "satisfies_expression" => {
                match program.named_children(node).next() {
                    Some(inner) => self.type_at_value(inner),
                    None => self.any(),
                }
            }
            "non_null_expression" => match program.named_children(node).next() {
                Some(inner) => self.non_nullable(self.type_at_value(inner)),
                None => self.any(),
            },
            "as_expression" => {
                let mut parts = program.named_children(node);
                let expression = parts.next();
                match (expression, parts.next()) {
                    (_, Some(ty)) => self.eval_type(ty, &Vec::new()),
                    // `as const`
                    (Some(expression), None) => self.type_at_value(expression),
                    (None, None) => self.any(),
                }
            }
            "type_assertion" => match program.child_of_kind(node, "type_arguments") {
                Some(args) => self.eval_type(args, &Vec::new()),
                None => self.any(),
            },
            "await_expression" => match program.named_children(node).next() {
                Some(inner) => self.awaited(self.type_at_value(inner)),
                None => self.any(),
            },
            "call_expression" => self.infer_call(node),
            "new_expression" => self.infer_new(node),
            "member_expression" => {
                if let Some(symbol) = self.member_symbol(node) {
                    return self.symbol_type(symbol);
                }
                let object = program.field(node, "object");
                let property = program.field(node, "property");
                match (object, property) {
                    (Some(object), Some(property)) => {
                        let object = self.type_at_value(object);
                        self.property_type(object, program.text(property))
                    }
                    _ => self.any(),
                }
            }
            "subscript_expression" => {
                let (Some(object), Some(index)) =
                    (program.field(node, "object"), program.field(node, "index"))
                else {
                    return self.any();
                };
                let object = self.type_at_value(object);
                match (self.data(object), program.kind(index)) {
                    (TypeData::Array(element), _) => element,
                    (TypeData::Tuple(elements), "number") => program
                        .text(index)
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| elements.get(i).copied())
                        .unwrap_or_else(|| self.any()),
                    (_, "string") => match program.string_value(index) {
                        Some(key) => self.property_type(object, &key),
                        None => self.any(),
                    },
                    _ => self.any(),
                }
            }
            "binary_expression" => self.infer_binary(node),
            "unary_expression" => {
                let operator = program.field(node, "operator").map(|o| program.text(o));
                match operator {
                    Some("!") | Some("delete") => self.intern(TypeData::Boolean),
                    Some("typeof") => self.intern(TypeData::String),
                    Some("void") => self.intern(TypeData::Undefined),
                    Some("-") => match program.field(node, "argument") {
                        Some(arg) if program.kind(arg) == "number" => self.intern(TypeData::NumberLit(
                            format!("-{}", canonical_number(program.text(arg))),
                        )),
                        _ => self.intern(TypeData::Number),
                    },
                    _ => self.intern(TypeData::Number),
                }
            }
            "update_expression" => self.intern(TypeData::Number),
            "ternary_expression" => {
                let branches = ["consequence", "alternative"]
                    .iter()
                    .filter_map(|f| program.field(node, f))
                    .map(|b| self.type_at_value(b))
                    .collect();
                self.make_union(branches)
            }
            "assignment_expression" => match program.field(node, "right") {
                Some(right) => self.type_at_value(right),
                None => self.any(),
            },
            "sequence_expression" => match program.named_children(node).last() {
                Some(last) => self.type_at_value(last),
                None => self.any(),
            },
            kind if is_function_like(kind) => self.intern(TypeData::Function { decl: Some(node) }),
            _ => self.any(),
        }
    }

    fn infer_binary(&self, node: NodeId) -> TypeId {
        let program = self.program;
        let operator = program
            .field(node, "operator")
            .map(|o| program.text(o))
            .unwrap_or_default();
        let side = |field: &str| {
            program
                .field(node, field)
                .map(|n| self.type_at_value(n))
                .unwrap_or_else(|| self.any())
        };
        match operator {
            "+" => {
                let is_string = |t: TypeId| matches!(self.data(t), TypeData::String | TypeData::StringLit(_));
                if is_string(side("left")) || is_string(side("right")) {
                    self.intern(TypeData::String)
                } else {
                    self.intern(TypeData::Number)
                }
            }
            "==" | "===" | "!=" | "!==" | "<" | ">" | "<=" | ">=" | "instanceof" | "in" => {
                self.intern(TypeData::Boolean)
            }
            "&&" | "||" | "??" => {
                let left = side("left");
                let right = side("right");
                let left = if operator == "??" { self.non_nullable(left) } else { left };
                self.make_union(vec![left, right])
            }
            _ => self.intern(TypeData::Number),
        }
    }

    fn infer_call(&self, node: NodeId) -> TypeId {
        let program = self.program;
        let Some(callee) = program.field(node, "function") else {
            return self.any();
        };
        let callee_type = self.type_at_value(callee);
        let TypeData::Function { decl: Some(decl) } = self.data(callee_type) else {
            return self.any();
        };
        self.return_type(decl)
    }

    /// Declared (or, for expression-bodied arrows, inferred) return type of a function
    fn return_type(&self, decl: NodeId) -> TypeId {
        let program = self.program;
        if let Some(annotation) = program.field(decl, "return_type") {
            return self.eval_type(annotation, &Vec::new());
        }
        let is_async = program.has_token(decl, "async");
        let body = program.field(decl, "body");
        let inner = match body {
            Some(body) if program.kind(body) != "statement_block" => self.type_at_value(body),
            _ => self.any(),
        };
        if is_async {
            self.builtin_type("Promise", vec![inner])
        } else {
            inner
        }
    }

    fn infer_new(&self, node: NodeId) -> TypeId {
        let program = self.program;
        let Some(constructor) = program.field(node, "constructor") else {
            return self.any();
        };
        let args: Vec<TypeId> = program
            .field(node, "type_arguments")
            .map(|list| {
                program
                    .named_children(list)
                    .map(|a| self.eval_type(a, &Vec::new()))
                    .collect()
            })
            .unwrap_or_default();

        if program.kind(constructor) == "identifier" {
            let name = program.text(constructor);
            if let Some(binding) = self.lookup(name, constructor, Namespace::Value) {
                let symbol = self.symbol_for_binding(binding);
                return self.type_of_type_symbol(symbol, name, args);
            }
            return self.builtin_type(name, args);
        }
        self.any()
    }

    /// Symbol named by `a.b`, via namespace exports or the properties of `a`'s type
    fn member_symbol(&self, member: NodeId) -> Option<SymbolId> {
        let program = self.program;
        let object = program.field(member, "object")?;
        let property = program.field(member, "property")?;
        let name = program.text(property);

        if program.kind(object) == "identifier" {
            if let Some(unit) = self.namespace_unit(object) {
                return self.resolve_export(unit, name, 0);
            }
        }
        let object_type = self.type_at_value(object);
        self.find_property(object_type, name)
    }

    fn find_property(&self, ty: TypeId, name: &str) -> Option<SymbolId> {
        self.members_of(ty)
            .iter()
            .copied()
            .find(|&p| self.symbol(p).name == name)
    }

    pub(crate) fn property_type(&self, ty: TypeId, name: &str) -> TypeId {
        match self.data(ty) {
            TypeData::Array(_) | TypeData::Tuple(_) | TypeData::String | TypeData::StringLit(_)
                if name == "length" =>
            {
                self.intern(TypeData::Number)
            }
            TypeData::Union(members) => {
                let found = members
                    .into_iter()
                    .filter(|&m| !matches!(self.data(m), TypeData::Null | TypeData::Undefined))
                    .map(|m| self.property_type(m, name))
                    .collect();
                self.make_union(found)
            }
            _ => match self.find_property(ty, name) {
                Some(symbol) => self.symbol_type(symbol),
                None => self.any(),
            },
        }
    }

    /// Value type of a symbol
    fn symbol_type(&self, symbol: SymbolId) -> TypeId {
        match self.symbol(symbol).kind {
            SymbolKind::Declared { decl } => self.declaration_type(decl, symbol),
            SymbolKind::Import { .. } => match self.follow_alias(symbol) {
                Some(target) if target != symbol => self.symbol_type(target),
                _ => self.any(),
            },
            SymbolKind::Namespace { .. } | SymbolKind::Builtin => self.any(),
            SymbolKind::Property { source, .. } => match source {
                PropSource::TypeNode { node, env } => self.eval_type(node, &env),
                PropSource::Value(node) => self.widen(self.type_at_value(node)),
                PropSource::Method(node) => self.intern(TypeData::Function { decl: Some(node) }),
                PropSource::Fixed(ty) => ty,
            },
            SymbolKind::EnumMember { value, .. } => value,
        }
    }

    fn declaration_type(&self, decl: NodeId, symbol: SymbolId) -> TypeId {
        let program = self.program;
        match program.kind(decl) {
            "variable_declarator" => {
                if let Some(annotation) = program.field(decl, "type") {
                    return self.eval_type(annotation, &Vec::new());
                }
                let Some(value) = program.field(decl, "value") else {
                    return self.any();
                };
                let ty = self.type_at_value(value);
                let is_const = program
                    .parent(decl)
                    .is_some_and(|d| program.has_token(d, "const"));
                if is_const {
                    ty
                } else {
                    self.widen(ty)
                }
            }
            "required_parameter" | "optional_parameter" => {
                if let Some(annotation) = program.field(decl, "type") {
                    self.eval_type(annotation, &Vec::new())
                } else if let Some(value) = program.field(decl, "value") {
                    self.widen(self.type_at_value(value))
                } else {
                    self.any()
                }
            }
            "assignment_pattern" => match program.field(decl, "right") {
                Some(right) => self.widen(self.type_at_value(right)),
                None => self.any(),
            },
            "shorthand_property_identifier_pattern" | "identifier" => {
                self.destructured_type(decl).unwrap_or_else(|| self.any())
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.intern(TypeData::Function { decl: Some(decl) })
            }
            "enum_declaration" => self.intern(TypeData::Enum { symbol }),
            "interface_declaration" | "type_alias_declaration" => self.declared_type(decl, symbol, Vec::new()),
            "internal_module" | "module" => self.any(),
            kind if is_function_like(kind) => self.intern(TypeData::Function { decl: Some(decl) }),
            // default-exported expression
            _ => self.type_at_value(decl),
        }
    }

    /// Type of a name bound by object destructuring, e.g. `id` in `const { id } = req.params`
    fn destructured_type(&self, element: NodeId) -> Option<TypeId> {
        let program = self.program;
        let (key, mut pattern_child) = match program.kind(element) {
            "shorthand_property_identifier_pattern" => (program.text(element).to_string(), element),
            _ => {
                let pair = program.parent(element)?;
                if program.kind(pair) != "pair_pattern" {
                    return None;
                }
                let key = program.field(pair, "key")?;
                let key = program
                    .string_value(key)
                    .unwrap_or_else(|| program.text(key).to_string());
                (key, pair)
            }
        };
        let mut pattern = program.parent(pattern_child)?;
        if program.kind(pattern) == "object_assignment_pattern" {
            pattern_child = pattern;
            pattern = program.parent(pattern_child)?;
        }
        if program.kind(pattern) != "object_pattern" {
            return None;
        }
        let holder = program.parent(pattern)?;
        let source = match program.kind(holder) {
            "variable_declarator" => match program.field(holder, "type") {
                Some(annotation) => self.eval_type(annotation, &Vec::new()),
                None => self.type_at_value(program.field(holder, "value")?),
            },
            "required_parameter" | "optional_parameter" => {
                self.eval_type(program.field(holder, "type")?, &Vec::new())
            }
            _ => return None,
        };
        Some(self.property_type(source, &key))
    }

    fn property_name(&self, node: NodeId) -> Option<String> {
        let program = self.program;
        match program.kind(node) {
            "property_identifier" | "private_property_identifier" | "identifier" => {
                Some(program.text(node).to_string())
            }
            "string" => program.string_value(node),
            "number" => Some(canonical_number(program.text(node))),
            _ => None,
        }
    }

    fn property_symbol(
        &self,
        owner: TypeId,
        name: String,
        decl: Option<NodeId>,
        source: PropSource,
        optional: bool,
    ) -> SymbolId {
        self.intern_symbol(SymbolKey::Property(owner, name.clone()), || SymbolData {
            name,
            kind: SymbolKind::Property {
                owner,
                decl,
                source,
                optional,
            },
        })
    }

    fn members_of(&self, ty: TypeId) -> Rc<Vec<SymbolId>> {
        if let Some(members) = self.members.borrow().get(&ty) {
            return Rc::clone(members);
        }
        if !self.member_stack.borrow_mut().insert(ty) {
            debug!("Circular inheritance while collecting members of {:?}", ty);
            return Rc::new(Vec::new());
        }

        let mut members: Vec<SymbolId> = Vec::new();
        match self.data(ty) {
            TypeData::Object { key, .. } => match key {
                ObjectKey::Declared { decl, args } => {
                    let env = self.bind_env(decl, &args);
                    match self.program.kind(decl) {
                        "interface_declaration" => self.interface_members(decl, &env, ty, &mut members),
                        _ => self.class_members(decl, &env, ty, &mut members),
                    }
                }
                ObjectKey::Literal { node, env } => self.type_literal_members(node, &env, ty, &mut members),
                ObjectKey::Value { node } => self.object_literal_members(node, ty, &mut members),
                ObjectKey::Partial(inner) => {
                    for base in self.members_of(inner).iter() {
                        let data = self.symbol(*base);
                        let decl = match data.kind {
                            SymbolKind::Property { decl, .. } => decl,
                            _ => None,
                        };
                        let fixed = self.symbol_type(*base);
                        members.push(self.property_symbol(ty, data.name, decl, PropSource::Fixed(fixed), true));
                    }
                }
            },
            TypeData::Enum { symbol } => {
                for (_, member, _) in self.enum_members(symbol) {
                    members.push(self.symbol_for_enum_member(member, symbol));
                }
            }
            _ => {}
        }

        self.member_stack.borrow_mut().remove(&ty);
        let members = Rc::new(members);
        self.members.borrow_mut().insert(ty, Rc::clone(&members));
        members
    }

    fn push_member(&self, members: &mut Vec<SymbolId>, symbol: SymbolId) {
        let name = self.symbol(symbol).name;
        match members.iter().position(|&m| self.symbol(m).name == name) {
            Some(existing) => members[existing] = symbol,
            None => members.push(symbol),
        }
    }

    fn interface_members(&self, decl: NodeId, env: &types::Env, owner: TypeId, members: &mut Vec<SymbolId>) {
        let program = self.program;
        for clause in program.named_children(decl) {
            if program.kind(clause) != "extends_type_clause" {
                continue;
            }
            for base in program.fields(clause, "type") {
                let base = self.eval_type(base, env);
                for symbol in self.members_of(base).iter() {
                    self.push_member(members, *symbol);
                }
            }
        }
        if let Some(body) = program.field(decl, "body") {
            self.type_literal_members(body, env, owner, members);
        }
    }

    fn type_literal_members(&self, body: NodeId, env: &types::Env, owner: TypeId, members: &mut Vec<SymbolId>) {
        let program = self.program;
        for member in program.named_children(body) {
            let kind = program.kind(member);
            if kind != "property_signature" && kind != "method_signature" {
                continue;
            }
            let Some(name) = program.field(member, "name").and_then(|n| self.property_name(n)) else {
                continue;
            };
            let optional = program.has_token(member, "?");
            let source = if kind == "method_signature" {
                PropSource::Method(member)
            } else {
                match program.field(member, "type") {
                    Some(annotation) => PropSource::TypeNode {
                        node: annotation,
                        env: env.clone(),
                    },
                    None => PropSource::Fixed(self.any()),
                }
            };
            let symbol = self.property_symbol(owner, name, Some(member), source, optional);
            self.push_member(members, symbol);
        }
    }

    fn class_members(&self, decl: NodeId, env: &types::Env, owner: TypeId, members: &mut Vec<SymbolId>) {
        let program = self.program;
        if let Some(heritage) = program.child_of_kind(decl, "class_heritage") {
            let extends = program.child_of_kind(heritage, "extends_clause");
            if let Some(base) = extends.and_then(|e| program.field(e, "value")) {
                if program.kind(base) == "identifier" {
                    let args = extends
                        .and_then(|e| program.field(e, "type_arguments"))
                        .map(|list| {
                            program
                                .named_children(list)
                                .map(|a| self.eval_type(a, env))
                                .collect()
                        })
                        .unwrap_or_default();
                    let base_type = self.resolve_type_name(program.text(base), base, env, args);
                    for symbol in self.members_of(base_type).iter() {
                        self.push_member(members, *symbol);
                    }
                }
            }
        }

        let Some(body) = program.field(decl, "body") else {
            return;
        };
        for member in program.named_children(body) {
            if program.has_token(member, "static") {
                continue;
            }
            match program.kind(member) {
                "public_field_definition" => {
                    let Some(name) = program.field(member, "name").and_then(|n| self.property_name(n)) else {
                        continue;
                    };
                    let source = if let Some(annotation) = program.field(member, "type") {
                        PropSource::TypeNode {
                            node: annotation,
                            env: env.clone(),
                        }
                    } else if let Some(value) = program.field(member, "value") {
                        PropSource::Value(value)
                    } else {
                        PropSource::Fixed(self.any())
                    };
                    let optional = program.has_token(member, "?");
                    let symbol = self.property_symbol(owner, name, Some(member), source, optional);
                    self.push_member(members, symbol);
                }
                "method_definition" => {
                    let Some(name) = program.field(member, "name").and_then(|n| self.property_name(n)) else {
                        continue;
                    };
                    if name == "constructor" {
                        self.constructor_properties(member, env, owner, members);
                        continue;
                    }
                    let symbol = self.property_symbol(owner, name, Some(member), PropSource::Method(member), false);
                    self.push_member(members, symbol);
                }
                _ => {}
            }
        }
    }

    /// `constructor(public name: string)` declares a property
    fn constructor_properties(&self, constructor: NodeId, env: &types::Env, owner: TypeId, members: &mut Vec<SymbolId>) {
        let program = self.program;
        let Some(params) = program.field(constructor, "parameters") else {
            return;
        };
        for param in program.named_children(params) {
            let is_property = program.child_of_kind(param, "accessibility_modifier").is_some()
                || program.has_token(param, "readonly");
            if !is_property {
                continue;
            }
            let Some(pattern) = program.field(param, "pattern") else {
                continue;
            };
            let source = match program.field(param, "type") {
                Some(annotation) => PropSource::TypeNode {
                    node: annotation,
                    env: env.clone(),
                },
                None => PropSource::Fixed(self.any()),
            };
            let optional = program.kind(param) == "optional_parameter";
            let symbol = self.property_symbol(owner, program.text(pattern).to_string(), Some(param), source, optional);
            self.push_member(members, symbol);
        }
    }

    fn object_literal_members(&self, node: NodeId, owner: TypeId, members: &mut Vec<SymbolId>) {
        let program = self.program;
        for member in program.named_children(node) {
            match program.kind(member) {
                "pair" => {
                    let Some(name) = program.field(member, "key").and_then(|k| self.property_name(k)) else {
                        continue;
                    };
                    let Some(value) = program.field(member, "value") else {
                        continue;
                    };
                    let symbol = self.property_symbol(owner, name, Some(member), PropSource::Value(value), false);
                    self.push_member(members, symbol);
                }
                "shorthand_property_identifier" => {
                    let name = program.text(member).to_string();
                    let symbol = self.property_symbol(owner, name, Some(member), PropSource::Value(member), false);
                    self.push_member(members, symbol);
                }
                "method_definition" => {
                    let Some(name) = program.field(member, "name").and_then(|n| self.property_name(n)) else {
                        continue;
                    };
                    let symbol = self.property_symbol(owner, name, Some(member), PropSource::Method(member), false);
                    self.push_member(members, symbol);
                }
                "spread_element" => {
                    if let Some(inner) = program.named_children(member).next() {
                        let spread = self.type_at_value(inner);
                        for symbol in self.members_of(spread).iter() {
                            self.push_member(members, *symbol);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Members of an enum with their values; uninitialized members count up from the
    /// previous numeric value
    fn enum_members(&self, symbol: SymbolId) -> Vec<(String, NodeId, LiteralValue)> {
        let program = self.program;
        let SymbolKind::Declared { decl } = self.symbol(symbol).kind else {
            return Vec::new();
        };
        let Some(body) = program.field(decl, "body") else {
            return Vec::new();
        };

        let mut next = 0.0_f64;
        let mut out = Vec::new();
        for member in program.named_children(body) {
            let (name_node, value_node) = match program.kind(member) {
                "enum_assignment" => (program.field(member, "name"), program.field(member, "value")),
                _ => (Some(member), None),
            };
            let Some(name) = name_node.and_then(|n| self.property_name(n)) else {
                continue;
            };
            let value = match value_node {
                Some(value) => match self.data(self.type_at_value(value)) {
                    TypeData::StringLit(s) => LiteralValue::String(s),
                    TypeData::NumberLit(n) => {
                        let n = n.parse::<f64>().unwrap_or(next);
                        next = n + 1.0;
                        LiteralValue::Number(n)
                    }
                    _ => {
                        let n = next;
                        next += 1.0;
                        LiteralValue::Number(n)
                    }
                },
                None => {
                    let n = next;
                    next += 1.0;
                    LiteralValue::Number(n)
                }
            };
            out.push((name, member, value));
        }
        out
    }

    fn symbol_for_enum_member(&self, member: NodeId, enum_symbol: SymbolId) -> SymbolId {
        let (name, value) = self
            .enum_members(enum_symbol)
            .into_iter()
            .find(|(_, node, _)| *node == member)
            .map(|(name, _, value)| (name, value))
            .unwrap_or_else(|| (String::new(), LiteralValue::Number(0.0)));
        let value = match value {
            LiteralValue::String(s) => self.intern(TypeData::StringLit(s)),
            LiteralValue::Number(n) => self.intern(TypeData::NumberLit(number_to_json(n).to_string())),
        };
        self.intern_symbol(SymbolKey::Decl(member), || SymbolData {
            name,
            kind: SymbolKind::EnumMember { decl: member, value },
        })
    }

    fn render(&self, ty: TypeId, depth: usize) -> String {
        if depth > 4 {
            return "...".to_string();
        }
        let join = |items: &[TypeId], sep: &str| {
            items
                .iter()
                .map(|&t| self.render(t, depth + 1))
                .collect::<Vec<_>>()
                .join(sep)
        };
        match self.data(ty) {
            TypeData::Any => "any".to_string(),
            TypeData::Unknown => "unknown".to_string(),
            TypeData::Never => "never".to_string(),
            TypeData::Void => "void".to_string(),
            TypeData::Undefined => "undefined".to_string(),
            TypeData::Null => "null".to_string(),
            TypeData::String => "string".to_string(),
            TypeData::Number => "number".to_string(),
            TypeData::Boolean => "boolean".to_string(),
            TypeData::StringLit(s) => format!("\"{}\"", s),
            TypeData::NumberLit(n) => n,
            TypeData::BooleanLit(b) => b.to_string(),
            TypeData::Array(element) => format!("{}[]", self.render(element, depth + 1)),
            TypeData::Tuple(elements) => format!("[{}]", join(&elements, ", ")),
            TypeData::Union(members) => join(&members, " | "),
            TypeData::Intersection(members) => join(&members, " & "),
            TypeData::Object { symbol, alias, key } => {
                let name = self.symbol(alias.unwrap_or(symbol)).name;
                match key {
                    ObjectKey::Declared { args, .. } if !args.is_empty() => {
                        format!("{}<{}>", name, join(&args, ", "))
                    }
                    _ => name,
                }
            }
            TypeData::Enum { symbol } => self.symbol(symbol).name,
            TypeData::Function { .. } => "function".to_string(),
            TypeData::Named { symbol, args } if args.is_empty() => self.symbol(symbol).name,
            TypeData::Named { symbol, args } => format!("{}<{}>", self.symbol(symbol).name, join(&args, ", ")),
        }
    }
}

impl<'p> TypeOracle for TypeResolver<'p> {
    fn type_at(&self, node: NodeId) -> TypeId {
        let program = self.program;
        if is_type_node(program.kind(node)) {
            return self.eval_type(node, &Vec::new());
        }
        // the name of a declaration stands for the declared entity
        if program.node(node).field == Some("name") {
            if let Some(parent) = program.parent(node) {
                match program.kind(parent) {
                    "variable_declarator" | "function_declaration" | "class_declaration"
                    | "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
                        let symbol = self.symbol_for_binding(parent);
                        return self.declaration_type(parent, symbol);
                    }
                    _ => {}
                }
            }
        }
        self.type_at_value(node)
    }

    fn type_from_type_node(&self, node: NodeId) -> TypeId {
        self.eval_type(node, &Vec::new())
    }

    fn symbol_at(&self, node: NodeId) -> Option<SymbolId> {
        let program = self.program;
        match program.kind(node) {
            "identifier" | "shorthand_property_identifier" => self
                .lookup(program.text(node), node, Namespace::Value)
                .map(|binding| self.symbol_for_binding(binding)),
            "type_identifier" => self
                .lookup(program.text(node), node, Namespace::Type)
                .map(|binding| self.symbol_for_binding(binding)),
            "property_identifier" => {
                let parent = program.parent(node)?;
                if program.kind(parent) == "member_expression" {
                    self.member_symbol(parent)
                } else {
                    None
                }
            }
            "member_expression" => self.member_symbol(node),
            "parenthesized_expression" | "non_null_expression" => {
                self.symbol_at(program.named_children(node).next()?)
            }
            _ => None,
        }
    }

    fn symbol_name(&self, symbol: SymbolId) -> String {
        self.symbol(symbol).name
    }

    fn is_alias(&self, symbol: SymbolId) -> bool {
        matches!(self.symbol(symbol).kind, SymbolKind::Import { .. })
    }

    fn aliased_symbol(&self, symbol: SymbolId) -> Option<SymbolId> {
        self.follow_alias(symbol)
    }

    fn declarations(&self, symbol: SymbolId) -> Vec<NodeId> {
        match self.symbol(symbol).kind {
            SymbolKind::Declared { decl } | SymbolKind::Import { decl, .. } => vec![decl],
            SymbolKind::EnumMember { decl, .. } => vec![decl],
            SymbolKind::Property { decl, .. } => decl.into_iter().collect(),
            SymbolKind::Namespace { unit } => vec![self.program.root(unit)],
            SymbolKind::Builtin => Vec::new(),
        }
    }

    fn type_of_symbol(&self, symbol: SymbolId, _at: Option<NodeId>) -> TypeId {
        self.symbol_type(symbol)
    }

    fn is_optional(&self, symbol: SymbolId) -> bool {
        match self.symbol(symbol).kind {
            SymbolKind::Property { optional, .. } => optional,
            SymbolKind::Declared { decl } => self.program.kind(decl) == "optional_parameter",
            _ => false,
        }
    }

    fn container_name(&self, symbol: SymbolId) -> Option<String> {
        match self.symbol(symbol).kind {
            SymbolKind::Property { owner, .. } => match self.data(owner) {
                TypeData::Object { symbol, alias, .. } => Some(self.symbol(alias.unwrap_or(symbol)).name),
                TypeData::Named { symbol, .. } | TypeData::Enum { symbol } => Some(self.symbol(symbol).name),
                _ => None,
            },
            _ => None,
        }
    }

    fn doc_comment(&self, symbol: SymbolId) -> Option<String> {
        let program = self.program;
        let decl = *self.declarations(symbol).first()?;
        let mut current = Some(decl);
        for _ in 0..3 {
            let node = current?;
            if let Some(doc) = program.doc_comment(node) {
                return doc.text;
            }
            current = program.parent(node).filter(|p| {
                matches!(
                    program.kind(*p),
                    "variable_declarator" | "lexical_declaration" | "variable_declaration" | "export_statement"
                )
            });
        }
        None
    }

    fn shape(&self, ty: TypeId) -> TypeShape {
        match self.data(ty) {
            TypeData::Any => TypeShape::Any,
            TypeData::Unknown => TypeShape::Unknown,
            TypeData::Never => TypeShape::Never,
            TypeData::Void => TypeShape::Void,
            TypeData::Undefined => TypeShape::Undefined,
            TypeData::Null => TypeShape::Null,
            TypeData::String => TypeShape::String,
            TypeData::Number => TypeShape::Number,
            TypeData::Boolean => TypeShape::Boolean,
            TypeData::StringLit(s) => TypeShape::StringLiteral(s),
            TypeData::NumberLit(n) => TypeShape::NumberLiteral(n.parse().unwrap_or(0.0)),
            TypeData::BooleanLit(b) => TypeShape::BooleanLiteral(b),
            TypeData::Enum { .. } => TypeShape::Enum,
            TypeData::Union(_) => TypeShape::Union,
            TypeData::Intersection(_) => TypeShape::Intersection,
            TypeData::Array(_) | TypeData::Tuple(_) | TypeData::Object { .. } | TypeData::Named { .. } => {
                TypeShape::Object
            }
            TypeData::Function { .. } => TypeShape::Function,
        }
    }

    fn type_symbol(&self, ty: TypeId) -> Option<SymbolId> {
        match self.data(ty) {
            TypeData::Object { symbol, .. } | TypeData::Named { symbol, .. } | TypeData::Enum { symbol } => {
                Some(symbol)
            }
            TypeData::Array(_) => Some(self.builtin_symbol("Array")),
            TypeData::Function { .. } => Some(self.builtin_symbol("__function")),
            _ => None,
        }
    }

    fn alias_symbol(&self, ty: TypeId) -> Option<SymbolId> {
        match self.data(ty) {
            TypeData::Object { alias, .. } => alias,
            _ => None,
        }
    }

    fn type_arguments(&self, ty: TypeId) -> Vec<TypeId> {
        match self.data(ty) {
            TypeData::Array(element) => vec![element],
            TypeData::Tuple(elements) => elements,
            TypeData::Named { args, .. } => args,
            TypeData::Object {
                key: ObjectKey::Declared { args, .. },
                ..
            } => args,
            _ => Vec::new(),
        }
    }

    fn is_tuple(&self, ty: TypeId) -> bool {
        matches!(self.data(ty), TypeData::Tuple(_))
    }

    fn constituents(&self, ty: TypeId) -> Vec<TypeId> {
        match self.data(ty) {
            TypeData::Union(members) | TypeData::Intersection(members) => members,
            _ => Vec::new(),
        }
    }

    fn properties(&self, ty: TypeId) -> Vec<SymbolId> {
        self.members_of(ty).as_ref().clone()
    }

    fn call_signature_count(&self, ty: TypeId) -> usize {
        match self.data(ty) {
            TypeData::Function { .. } => 1,
            TypeData::Object {
                key: ObjectKey::Literal { node, .. },
                ..
            } => self
                .program
                .named_children(node)
                .filter(|&m| self.program.kind(m) == "call_signature")
                .count(),
            TypeData::Object {
                key: ObjectKey::Declared { decl, .. },
                ..
            } => self
                .program
                .field(decl, "body")
                .map(|body| {
                    self.program
                        .named_children(body)
                        .filter(|&m| self.program.kind(m) == "call_signature")
                        .count()
                })
                .unwrap_or(0),
            _ => 0,
        }
    }

    fn enum_literals(&self, ty: TypeId) -> Vec<LiteralValue> {
        match self.data(ty) {
            TypeData::Enum { symbol } => self
                .enum_members(symbol)
                .into_iter()
                .map(|(_, _, value)| value)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn describe(&self, ty: TypeId) -> String {
        self.render(ty, 0)
    }
}
