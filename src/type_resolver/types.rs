//! Type representation and evaluation of type annotations.

use super::TypeResolver;
use crate::oracle::{SymbolId, TypeId};
use crate::syntax::NodeId;
use log::debug;

/// Type parameters bound to concrete types while evaluating a generic declaration
pub(crate) type Env = Vec<(String, TypeId)>;

/// Internal type representation. Values are interned, so equal data means equal [`TypeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeData {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    String,
    Number,
    Boolean,
    StringLit(String),
    /// Canonical decimal text of the number
    NumberLit(String),
    BooleanLit(bool),
    Array(TypeId),
    Tuple(Vec<TypeId>),
    Union(Vec<TypeId>),
    Intersection(Vec<TypeId>),
    Object {
        key: ObjectKey,
        symbol: SymbolId,
        alias: Option<SymbolId>,
    },
    Enum {
        symbol: SymbolId,
    },
    Function {
        decl: Option<NodeId>,
    },
    /// Library or unresolved external type, e.g. `Promise<T>`, `Date`, `Request`
    Named {
        symbol: SymbolId,
        args: Vec<TypeId>,
    },
}

/// Identity of an object type; members are derived from it lazily
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ObjectKey {
    /// Interface or class instantiated with type arguments
    Declared { decl: NodeId, args: Vec<TypeId> },
    /// Object type literal in a type position
    Literal { node: NodeId, env: Env },
    /// Object literal expression
    Value { node: NodeId },
    /// `Partial<T>`
    Partial(TypeId),
}

/// Where the type of a property comes from
#[derive(Debug, Clone)]
pub(crate) enum PropSource {
    TypeNode { node: NodeId, env: Env },
    /// Object literal value; literal types are widened
    Value(NodeId),
    Method(NodeId),
    Fixed(TypeId),
}

#[derive(Debug, Clone)]
pub(crate) enum SymbolKind {
    /// Local declaration (variable, function, class, interface, alias, enum, parameter)
    Declared { decl: NodeId },
    /// Import binding; `imported` is `default`, a name, or `*`
    Import {
        decl: NodeId,
        module: Option<crate::syntax::UnitId>,
        imported: String,
    },
    Namespace { unit: crate::syntax::UnitId },
    Property {
        owner: TypeId,
        decl: Option<NodeId>,
        source: PropSource,
        optional: bool,
    },
    EnumMember { decl: NodeId, value: TypeId },
    /// Library and synthetic names (`Promise`, `Date`, `__type`, ...)
    Builtin,
}

#[derive(Debug, Clone)]
pub(crate) struct SymbolData {
    pub name: String,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SymbolKey {
    Decl(NodeId),
    Builtin(String),
    Property(TypeId, String),
    Namespace(crate::syntax::UnitId),
}

/// Canonical text for a numeric literal
pub(crate) fn canonical_number(text: &str) -> String {
    let cleaned = text.replace('_', "");
    let value = if let Some(hex) = cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok().map(|v| v as f64)
    } else if let Some(bin) = cleaned.strip_prefix("0b").or_else(|| cleaned.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok().map(|v| v as f64)
    } else if let Some(oct) = cleaned.strip_prefix("0o").or_else(|| cleaned.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok().map(|v| v as f64)
    } else {
        cleaned.trim_end_matches('n').parse::<f64>().ok()
    };
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
        None => cleaned,
    }
}

impl<'p> TypeResolver<'p> {
    pub(crate) fn intern(&self, data: TypeData) -> TypeId {
        if let Some(&id) = self.interned.borrow().get(&data) {
            return id;
        }
        let mut types = self.types.borrow_mut();
        let id = TypeId(types.len() as u32);
        types.push(data.clone());
        self.interned.borrow_mut().insert(data, id);
        id
    }

    pub(crate) fn data(&self, ty: TypeId) -> TypeData {
        self.types.borrow()[ty.0 as usize].clone()
    }

    pub(crate) fn any(&self) -> TypeId {
        self.intern(TypeData::Any)
    }

    pub(crate) fn builtin_symbol(&self, name: &str) -> SymbolId {
        self.intern_symbol(SymbolKey::Builtin(name.to_string()), || SymbolData {
            name: name.to_string(),
            kind: SymbolKind::Builtin,
        })
    }

    /// Flattens, dedups and simplifies a union
    pub(crate) fn make_union(&self, members: Vec<TypeId>) -> TypeId {
        let mut flat: Vec<TypeId> = Vec::new();
        for member in members {
            match self.data(member) {
                TypeData::Union(inner) => {
                    for t in inner {
                        if !flat.contains(&t) {
                            flat.push(t);
                        }
                    }
                }
                TypeData::Never => {}
                _ => {
                    if !flat.contains(&member) {
                        flat.push(member);
                    }
                }
            }
        }

        if flat.iter().any(|&t| matches!(self.data(t), TypeData::Any)) {
            return self.any();
        }

        let true_lit = self.intern(TypeData::BooleanLit(true));
        let false_lit = self.intern(TypeData::BooleanLit(false));
        if let (Some(t), Some(_)) = (
            flat.iter().position(|&x| x == true_lit),
            flat.iter().position(|&x| x == false_lit),
        ) {
            flat[t] = self.intern(TypeData::Boolean);
            flat.retain(|&x| x != false_lit);
        }

        match flat.len() {
            0 => self.intern(TypeData::Never),
            1 => flat[0],
            _ => self.intern(TypeData::Union(flat)),
        }
    }

    pub(crate) fn make_intersection(&self, members: Vec<TypeId>) -> TypeId {
        let mut flat: Vec<TypeId> = Vec::new();
        for member in members {
            match self.data(member) {
                TypeData::Intersection(inner) => flat.extend(inner),
                _ => flat.push(member),
            }
        }
        flat.dedup();
        match flat.len() {
            0 => self.intern(TypeData::Unknown),
            1 => flat[0],
            _ => self.intern(TypeData::Intersection(flat)),
        }
    }

    /// Literal types widen to their primitive in mutable positions
    pub(crate) fn widen(&self, ty: TypeId) -> TypeId {
        match self.data(ty) {
            TypeData::StringLit(_) => self.intern(TypeData::String),
            TypeData::NumberLit(_) => self.intern(TypeData::Number),
            TypeData::BooleanLit(_) => self.intern(TypeData::Boolean),
            TypeData::Union(members) => {
                let widened = members.into_iter().map(|m| self.widen(m)).collect();
                self.make_union(widened)
            }
            _ => ty,
        }
    }

    /// Drops `null` and `undefined` from a type
    pub(crate) fn non_nullable(&self, ty: TypeId) -> TypeId {
        match self.data(ty) {
            TypeData::Union(members) => {
                let kept = members
                    .into_iter()
                    .filter(|&m| !matches!(self.data(m), TypeData::Null | TypeData::Undefined))
                    .collect();
                self.make_union(kept)
            }
            _ => ty,
        }
    }

    /// Unwraps `Promise<T>` to `T`
    pub(crate) fn awaited(&self, ty: TypeId) -> TypeId {
        match self.data(ty) {
            TypeData::Named { symbol, args } if self.is_promise_symbol(symbol) => {
                args.first().copied().unwrap_or_else(|| self.any())
            }
            _ => ty,
        }
    }

    fn is_promise_symbol(&self, symbol: SymbolId) -> bool {
        let name = self.symbol(symbol).name;
        name == "Promise" || name == "PromiseLike"
    }

    /// Evaluates a type annotation node under the given type parameter bindings
    pub(crate) fn eval_type(&self, node: NodeId, env: &Env) -> TypeId {
        let program = self.program;
        match program.kind(node) {
            "type_annotation" | "opting_type_annotation" | "omitting_type_annotation"
            | "parenthesized_type" | "readonly_type" | "type_arguments" => {
                match program.named_children(node).next() {
                    Some(inner) => self.eval_type(inner, env),
                    None => self.any(),
                }
            }
            "predefined_type" => match program.text(node) {
                "string" => self.intern(TypeData::String),
                "number" | "bigint" => self.intern(TypeData::Number),
                "boolean" => self.intern(TypeData::Boolean),
                "unknown" => self.intern(TypeData::Unknown),
                "never" => self.intern(TypeData::Never),
                "void" => self.intern(TypeData::Void),
                "undefined" => self.intern(TypeData::Undefined),
                "null" => self.intern(TypeData::Null),
                "object" => self.builtin_type("Object", Vec::new()),
                "symbol" => self.builtin_type("Symbol", Vec::new()),
                _ => self.any(),
            },
            "literal_type" => match program.named_children(node).next() {
                Some(inner) => self.literal_type(inner),
                None => self.any(),
            },
            "string" | "number" | "true" | "false" | "null" | "undefined" => {
                self.literal_type(node)
            }
            "template_literal_type" | "index_type_query" => self.intern(TypeData::String),
            "type_identifier" | "identifier" => {
                self.resolve_type_name(program.text(node), node, env, Vec::new())
            }
            "nested_type_identifier" => self.nested_type(node, Vec::new()),
            "generic_type" => {
                let args: Vec<TypeId> = program
                    .field(node, "type_arguments")
                    .map(|list| {
                        program
                            .named_children(list)
                            .map(|arg| self.eval_type(arg, env))
                            .collect()
                    })
                    .unwrap_or_default();
                match program.field(node, "name") {
                    Some(name) if program.kind(name) == "nested_type_identifier" => {
                        self.nested_type(name, args)
                    }
                    Some(name) => self.resolve_type_name(program.text(name), node, env, args),
                    None => self.any(),
                }
            }
            "array_type" => {
                let element = program
                    .named_children(node)
                    .next()
                    .map(|inner| self.eval_type(inner, env))
                    .unwrap_or_else(|| self.any());
                self.intern(TypeData::Array(element))
            }
            "tuple_type" => {
                let elements = program
                    .named_children(node)
                    .map(|element| {
                        let inner = match program.kind(element) {
                            "optional_type" | "rest_type" => program.named_children(element).next(),
                            _ => program.field(element, "type").or(Some(element)),
                        };
                        inner
                            .map(|n| self.eval_type(n, env))
                            .unwrap_or_else(|| self.any())
                    })
                    .collect();
                self.intern(TypeData::Tuple(elements))
            }
            "union_type" => {
                let members = program
                    .named_children(node)
                    .map(|m| self.eval_type(m, env))
                    .collect();
                self.make_union(members)
            }
            "intersection_type" => {
                let members = program
                    .named_children(node)
                    .map(|m| self.eval_type(m, env))
                    .collect();
                self.make_intersection(members)
            }
            "object_type" | "interface_body" => {
                let symbol = self.builtin_symbol("__type");
                self.intern(TypeData::Object {
                    key: ObjectKey::Literal {
                        node,
                        env: env.clone(),
                    },
                    symbol,
                    alias: None,
                })
            }
            "function_type" | "constructor_type" => self.intern(TypeData::Function { decl: Some(node) }),
            "type_query" => match program.named_children(node).next() {
                Some(target) => self.type_at_value(target),
                None => self.any(),
            },
            "lookup_type" => {
                let mut parts = program.named_children(node);
                let (Some(object), Some(index)) = (parts.next(), parts.next()) else {
                    return self.any();
                };
                let object = self.eval_type(object, env);
                let key = match program.kind(index) {
                    "literal_type" => program
                        .named_children(index)
                        .next()
                        .and_then(|s| program.string_value(s)),
                    _ => None,
                };
                match key {
                    Some(key) => self.property_type(object, &key),
                    None => self.any(),
                }
            }
            "type_predicate" | "type_predicate_annotation" => self.intern(TypeData::Boolean),
            "asserts" | "asserts_annotation" => self.intern(TypeData::Void),
            other => {
                debug!("Unsupported type node `{}`, using any", other);
                self.any()
            }
        }
    }

    fn literal_type(&self, node: NodeId) -> TypeId {
        let program = self.program;
        match program.kind(node) {
            "string" => match program.string_value(node) {
                Some(value) => self.intern(TypeData::StringLit(value)),
                None => self.intern(TypeData::String),
            },
            "number" => self.intern(TypeData::NumberLit(canonical_number(program.text(node)))),
            "true" => self.intern(TypeData::BooleanLit(true)),
            "false" => self.intern(TypeData::BooleanLit(false)),
            "null" => self.intern(TypeData::Null),
            "undefined" => self.intern(TypeData::Undefined),
            "unary_expression" => {
                let negative = program
                    .field(node, "operator")
                    .is_some_and(|op| program.text(op) == "-");
                match program.field(node, "argument") {
                    Some(arg) if program.kind(arg) == "number" => {
                        let text = canonical_number(program.text(arg));
                        let text = if negative { format!("-{}", text) } else { text };
                        self.intern(TypeData::NumberLit(text))
                    }
                    _ => self.intern(TypeData::Number),
                }
            }
            _ => self.any(),
        }
    }

    /// `ns.Name` in a type position
    fn nested_type(&self, node: NodeId, args: Vec<TypeId>) -> TypeId {
        let program = self.program;
        let name = program
            .field(node, "name")
            .map(|n| program.text(n).to_string())
            .unwrap_or_default();
        let module = program.field(node, "module");

        if let Some(module) = module {
            if program.kind(module) == "identifier" {
                if let Some(unit) = self.namespace_unit(module) {
                    if let Some(symbol) = self.resolve_export(unit, &name, 0) {
                        return self.type_of_type_symbol(symbol, &name, args);
                    }
                }
            }
        }
        self.builtin_type(&name, args)
    }

    /// Resolves a type name visible at `at`
    pub(crate) fn resolve_type_name(
        &self,
        name: &str,
        at: NodeId,
        env: &Env,
        args: Vec<TypeId>,
    ) -> TypeId {
        if let Some((_, bound)) = env.iter().rev().find(|(n, _)| n == name) {
            return *bound;
        }

        let Some(binding) = self.lookup(name, at, super::scope::Namespace::Type) else {
            return self.builtin_type(name, args);
        };

        if self.program.kind(binding) == "type_parameter" {
            // unbound type parameter: fall back to its default or constraint
            let fallback = self
                .program
                .field(binding, "value")
                .or_else(|| self.program.field(binding, "constraint"))
                .and_then(|n| self.program.named_children(n).next().or(Some(n)));
            return match fallback {
                Some(node) => self.eval_type(node, &Vec::new()),
                None => self.intern(TypeData::Unknown),
            };
        }

        let symbol = self.symbol_for_binding(binding);
        self.type_of_type_symbol(symbol, name, args)
    }

    /// Type denoted by a symbol used in a type position
    pub(crate) fn type_of_type_symbol(&self, symbol: SymbolId, name: &str, args: Vec<TypeId>) -> TypeId {
        let target = match self.symbol(symbol).kind {
            SymbolKind::Import { .. } => match self.follow_alias(symbol) {
                Some(target) => target,
                None => {
                    let imported = self.imported_name(symbol).unwrap_or_else(|| name.to_string());
                    return self.builtin_type(&imported, args);
                }
            },
            _ => symbol,
        };

        match self.symbol(target).kind {
            SymbolKind::Declared { decl } => self.declared_type(decl, target, args),
            _ => self.builtin_type(name, args),
        }
    }

    /// Instance type of an interface, class, alias or enum declaration
    pub(crate) fn declared_type(&self, decl: NodeId, symbol: SymbolId, args: Vec<TypeId>) -> TypeId {
        let program = self.program;
        match program.kind(decl) {
            "interface_declaration" | "class_declaration" | "abstract_class_declaration" | "class" => {
                let args = self.complete_args(decl, args);
                self.intern(TypeData::Object {
                    key: ObjectKey::Declared { decl, args },
                    symbol,
                    alias: None,
                })
            }
            "type_alias_declaration" => self.alias_type(decl, symbol, args),
            "enum_declaration" => self.intern(TypeData::Enum { symbol }),
            _ => self.any(),
        }
    }

    /// Pads missing type arguments with defaults so equal instantiations intern identically
    fn complete_args(&self, decl: NodeId, mut args: Vec<TypeId>) -> Vec<TypeId> {
        let params = self.type_parameters(decl);
        while args.len() < params.len() {
            let default = self
                .program
                .field(params[args.len()], "value")
                .and_then(|v| self.program.named_children(v).next())
                .map(|v| self.eval_type(v, &Vec::new()))
                .unwrap_or_else(|| self.intern(TypeData::Unknown));
            args.push(default);
        }
        args.truncate(params.len());
        args
    }

    pub(crate) fn type_parameters(&self, decl: NodeId) -> Vec<NodeId> {
        self.program
            .field(decl, "type_parameters")
            .map(|list| {
                self.program
                    .named_children(list)
                    .filter(|&p| self.program.kind(p) == "type_parameter")
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Binds a declaration's type parameters to `args`
    pub(crate) fn bind_env(&self, decl: NodeId, args: &[TypeId]) -> Env {
        let unknown = self.intern(TypeData::Unknown);
        self.type_parameters(decl)
            .into_iter()
            .enumerate()
            .filter_map(|(i, param)| {
                let name = self.program.field(param, "name")?;
                let bound = args.get(i).copied().unwrap_or(unknown);
                Some((self.program.text(name).to_string(), bound))
            })
            .collect()
    }

    fn alias_type(&self, decl: NodeId, symbol: SymbolId, args: Vec<TypeId>) -> TypeId {
        let args = self.complete_args(decl, args);
        let key = (decl, args.clone());
        if let Some(&cached) = self.alias_cache.borrow().get(&key) {
            return cached;
        }
        if !self.resolving_stack.borrow_mut().insert(key.clone()) {
            debug!("Circular type alias at {:?}", decl);
            return self.any();
        }

        let env = self.bind_env(decl, &args);
        let result = match self.program.field(decl, "value") {
            Some(value) if self.program.kind(value) == "object_type" => {
                let literal_symbol = self.builtin_symbol("__type");
                self.intern(TypeData::Object {
                    key: ObjectKey::Literal { node: value, env },
                    symbol: literal_symbol,
                    alias: Some(symbol),
                })
            }
            Some(value) => self.eval_type(value, &env),
            None => self.any(),
        };

        self.resolving_stack.borrow_mut().remove(&key);
        self.alias_cache.borrow_mut().insert(key, result);
        result
    }

    /// Library types that are known by name only
    pub(crate) fn builtin_type(&self, name: &str, args: Vec<TypeId>) -> TypeId {
        match name {
            "Array" | "ReadonlyArray" => {
                let element = args.first().copied().unwrap_or_else(|| self.any());
                self.intern(TypeData::Array(element))
            }
            "Readonly" | "Required" => args.first().copied().unwrap_or_else(|| self.any()),
            "NonNullable" => match args.first() {
                Some(&inner) => self.non_nullable(inner),
                None => self.any(),
            },
            "Awaited" => match args.first() {
                Some(&inner) => self.awaited(inner),
                None => self.any(),
            },
            "Partial" => match args.first() {
                Some(&inner) => {
                    let symbol = self.builtin_symbol("Partial");
                    self.intern(TypeData::Object {
                        key: ObjectKey::Partial(inner),
                        symbol,
                        alias: None,
                    })
                }
                None => self.any(),
            },
            "String" => self.intern(TypeData::String),
            "Number" => self.intern(TypeData::Number),
            "Boolean" => self.intern(TypeData::Boolean),
            "Function" => self.intern(TypeData::Function { decl: None }),
            _ => {
                let symbol = self.builtin_symbol(name);
                self.intern(TypeData::Named { symbol, args })
            }
        }
    }
}
