//! The query interface between the route crawler and whatever answers type questions.
//!
//! The crawler, the usage analyzer and the schema generator never look at type annotations
//! themselves. They ask a [`TypeOracle`] for the resolved type of a node, the symbol behind an
//! identifier, the members of an object type and so on. [`crate::type_resolver::TypeResolver`]
//! is the bundled implementation; tests use small fakes.

use crate::syntax::NodeId;

/// Opaque handle of a resolved type. Equal handles denote the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Opaque handle of a symbol (a named declaration, property or import binding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Coarse classification of a type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Any,
    Unknown,
    Never,
    Void,
    Undefined,
    Null,
    String,
    Number,
    Boolean,
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    /// A declared enumeration; members come from [`TypeOracle::enum_literals`]
    Enum,
    /// Constituents come from [`TypeOracle::constituents`]
    Union,
    Intersection,
    /// Any object-like type: interfaces, classes, object literals, arrays, tuples and
    /// library types such as `Promise` or `Date`
    Object,
    Function,
    Other,
}

/// Value of an enum member
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
}

impl LiteralValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LiteralValue::String(s) => serde_json::Value::String(s.clone()),
            LiteralValue::Number(n) => number_to_json(*n),
        }
    }
}

/// Integral values serialize as integers, everything else as floats
pub fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Type and symbol queries over a loaded program.
///
/// Every method is total: when nothing sensible can be said the answer is `None`, an empty
/// list, or a type whose shape is [`TypeShape::Any`].
pub trait TypeOracle {
    /// Resolved type of an expression, declaration name or type annotation node
    fn type_at(&self, node: NodeId) -> TypeId;

    /// Type denoted by a type annotation node, e.g. the `T` in `x as T`
    fn type_from_type_node(&self, node: NodeId) -> TypeId;

    /// Symbol an identifier or member name refers to
    fn symbol_at(&self, node: NodeId) -> Option<SymbolId>;

    fn symbol_name(&self, symbol: SymbolId) -> String;

    /// Whether the symbol is an import binding or re-export
    fn is_alias(&self, symbol: SymbolId) -> bool;

    /// Follows an alias chain to the original symbol
    fn aliased_symbol(&self, symbol: SymbolId) -> Option<SymbolId>;

    /// Declaration nodes of a symbol, in source order
    fn declarations(&self, symbol: SymbolId) -> Vec<NodeId>;

    /// Type of a symbol as seen from `at`
    fn type_of_symbol(&self, symbol: SymbolId, at: Option<NodeId>) -> TypeId;

    /// Whether a property or parameter symbol is optional
    fn is_optional(&self, symbol: SymbolId) -> bool;

    /// Name of the declaration that owns a member symbol (interface, class, ...)
    fn container_name(&self, symbol: SymbolId) -> Option<String>;

    /// Documentation text attached to a symbol's declaration
    fn doc_comment(&self, symbol: SymbolId) -> Option<String>;

    fn shape(&self, ty: TypeId) -> TypeShape;

    /// Symbol naming the type itself (`User`, `Promise`, `__type` for anonymous literals)
    fn type_symbol(&self, ty: TypeId) -> Option<SymbolId>;

    /// Symbol of the type alias the type was reached through, if any
    fn alias_symbol(&self, ty: TypeId) -> Option<SymbolId>;

    /// Type arguments (`T` in `Promise<T>`, element types of a tuple)
    fn type_arguments(&self, ty: TypeId) -> Vec<TypeId>;

    fn is_tuple(&self, ty: TypeId) -> bool;

    /// Members of a union or intersection
    fn constituents(&self, ty: TypeId) -> Vec<TypeId>;

    /// Properties of an object-like type
    fn properties(&self, ty: TypeId) -> Vec<SymbolId>;

    fn call_signature_count(&self, ty: TypeId) -> usize;

    /// Member values of an enum type
    fn enum_literals(&self, ty: TypeId) -> Vec<LiteralValue>;

    /// Human-readable rendering for log output
    fn describe(&self, ty: TypeId) -> String;
}
