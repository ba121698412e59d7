use crate::oracle::{TypeId, TypeOracle, TypeShape};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recursion guard for pathological type graphs
const MAX_DEPTH: usize = 10;

/// Object type names that are never registered as named schemas
const DENYLIST: [&str; 13] = [
    "Object",
    "Promise",
    "Array",
    "Function",
    "Request",
    "Response",
    "Record",
    "Partial",
    "Map",
    "Set",
    "__type",
    "__object",
    "__function",
];

/// Library types too large to expand, documented by name only
const OPAQUE: [&str; 7] = [
    "ReactElement",
    "ReactPortal",
    "CSSProperties",
    "Element",
    "HTMLElement",
    "Buffer",
    "Readable",
];

/// Schema generator - converts resolved types to OpenAPI schemas
pub struct SchemaGenerator<'a> {
    /// Type oracle answering type and symbol queries
    oracle: &'a dyn TypeOracle,
    /// Named schema definitions generated so far
    schemas: IndexMap<String, Schema>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// The type of the schema (string, number, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "anyOf", skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(rename = "allOf", skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
    #[serde(rename = "oneOf", skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    /// Any other schema keyword, kept as-is
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl Schema {
    /// Schema with only a `type`
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    /// Reference to an entry under `#/components/schemas`
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("#/components/schemas/{}", name)),
            ..Default::default()
        }
    }

    /// Placeholder for a value whose shape is only known from usage
    pub fn inferred_object() -> Self {
        Self {
            schema_type: Some("object".to_string()),
            description: Some("Inferred from usage".to_string()),
            ..Default::default()
        }
    }

    /// Whether the schema carries no structural information: an untyped or plain object
    /// schema without properties, reference, combinators, items or enum values
    pub fn is_empty(&self) -> bool {
        matches!(self.schema_type.as_deref(), None | Some("object"))
            && self.properties.is_empty()
            && self.reference.is_none()
            && self.any_of.is_empty()
            && self.all_of.is_empty()
            && self.one_of.is_empty()
            && self.items.is_none()
            && self.enum_values.is_empty()
    }
}

impl<'a> SchemaGenerator<'a> {
    /// Create a new SchemaGenerator backed by a type oracle
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            oracle,
            schemas: IndexMap::new(),
        }
    }

    /// Generate a schema for a resolved type.
    ///
    /// Named object types are registered in the schema table and returned as `$ref`s.
    pub fn generate_schema(&mut self, ty: TypeId) -> Schema {
        debug!("Generating schema for type: {}", self.oracle.describe(ty));
        self.type_to_schema(ty, 0)
    }

    /// Get all named schemas generated so far
    pub fn get_schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }

    fn type_to_schema(&mut self, ty: TypeId, depth: usize) -> Schema {
        if depth > MAX_DEPTH {
            debug!("Schema depth limit reached at {}", self.oracle.describe(ty));
            return Schema::default();
        }

        let oracle = self.oracle;
        let symbol_name = oracle.type_symbol(ty).map(|s| oracle.symbol_name(s));

        // Promise<T> is documented as T
        if matches!(symbol_name.as_deref(), Some("Promise") | Some("PromiseLike")) {
            return match oracle.type_arguments(ty).first() {
                Some(&inner) => self.type_to_schema(inner, depth),
                None => Schema::default(),
            };
        }

        let shape = oracle.shape(ty);
        match shape {
            TypeShape::String => return Schema::typed("string"),
            TypeShape::Number => return Schema::typed("number"),
            TypeShape::Boolean => return Schema::typed("boolean"),
            TypeShape::Any | TypeShape::Unknown | TypeShape::Never | TypeShape::Void => {
                return Schema::default()
            }
            TypeShape::Undefined | TypeShape::Null => {
                return Schema {
                    format: Some("nullable".to_string()),
                    ..Schema::typed("string")
                }
            }
            _ => {}
        }

        if symbol_name.as_deref() == Some("Date") {
            return Schema {
                format: Some("date-time".to_string()),
                ..Schema::typed("string")
            };
        }

        // Tuples keep only their first element type
        let is_array = matches!(symbol_name.as_deref(), Some("Array") | Some("ReadonlyArray"));
        if oracle.is_tuple(ty) || is_array {
            let items = match oracle.type_arguments(ty).first() {
                Some(&element) => self.type_to_schema(element, depth + 1),
                None => Schema::default(),
            };
            return Schema {
                items: Some(Box::new(items)),
                ..Schema::typed("array")
            };
        }

        match shape.clone() {
            TypeShape::Enum => {
                let values: Vec<Value> = oracle
                    .enum_literals(ty)
                    .iter()
                    .map(|literal| literal.to_json())
                    .collect();
                let Some(first) = values.first() else {
                    return Schema::default();
                };
                let schema_type = if first.is_string() { "string" } else { "number" };
                return Schema {
                    enum_values: values,
                    ..Schema::typed(schema_type)
                };
            }
            TypeShape::Union => return self.union_schema(ty, depth),
            TypeShape::Intersection => {
                let all_of = oracle
                    .constituents(ty)
                    .into_iter()
                    .map(|member| self.type_to_schema(member, depth + 1))
                    .collect();
                return Schema {
                    all_of,
                    ..Default::default()
                };
            }
            TypeShape::StringLiteral(value) => {
                return Schema {
                    enum_values: vec![Value::String(value)],
                    ..Schema::typed("string")
                }
            }
            TypeShape::NumberLiteral(value) => {
                return Schema {
                    enum_values: vec![crate::oracle::number_to_json(value)],
                    ..Schema::typed("number")
                }
            }
            TypeShape::BooleanLiteral(value) => {
                return Schema {
                    enum_values: vec![Value::Bool(value)],
                    ..Schema::typed("boolean")
                }
            }
            _ => {}
        }

        if matches!(shape, TypeShape::Object | TypeShape::Function) {
            let name = oracle
                .alias_symbol(ty)
                .or_else(|| oracle.type_symbol(ty))
                .map(|s| oracle.symbol_name(s));

            if let Some(name) = name {
                if OPAQUE.contains(&name.as_str()) {
                    return Schema {
                        description: Some(name),
                        ..Schema::typed("object")
                    };
                }
                if !DENYLIST.contains(&name.as_str()) {
                    return self.named_schema(&name, ty, depth);
                }
            }
            return self.object_schema(ty, depth);
        }

        Schema::typed("object")
    }

    fn union_schema(&mut self, ty: TypeId, depth: usize) -> Schema {
        let members = self.oracle.constituents(ty);
        let literals: Option<Vec<Value>> = members
            .iter()
            .map(|&member| match self.oracle.shape(member) {
                TypeShape::StringLiteral(value) => Some(Value::String(value)),
                _ => None,
            })
            .collect();

        match literals {
            Some(values) if !values.is_empty() => Schema {
                enum_values: values,
                ..Schema::typed("string")
            },
            _ => Schema {
                any_of: members
                    .into_iter()
                    .map(|member| self.type_to_schema(member, depth + 1))
                    .collect(),
                ..Default::default()
            },
        }
    }

    /// Registers a named object type and returns a reference to it.
    ///
    /// An empty placeholder is written before the members are extracted, so a
    /// self-referential member resolves to a `$ref` instead of recursing.
    fn named_schema(&mut self, name: &str, ty: TypeId, depth: usize) -> Schema {
        if self.schemas.contains_key(name) {
            return Schema::reference(name);
        }

        debug!("Registering schema: {}", name);
        self.schemas.insert(name.to_string(), Schema::default());
        let definition = self.object_schema(ty, depth);
        self.schemas.insert(name.to_string(), definition);
        Schema::reference(name)
    }

    /// Expands the data members of an object type
    fn object_schema(&mut self, ty: TypeId, depth: usize) -> Schema {
        let oracle = self.oracle;
        let mut schema = Schema::typed("object");

        for property in oracle.properties(ty) {
            let name = oracle.symbol_name(property);
            if name.starts_with("__") {
                continue;
            }
            if matches!(
                oracle.container_name(property).as_deref(),
                Some("Object") | Some("Function")
            ) {
                continue;
            }

            let property_type = oracle.type_of_symbol(property, None);
            // Methods are not part of the data contract
            if oracle.call_signature_count(property_type) > 0 || oracle.shape(property_type) == TypeShape::Function {
                continue;
            }

            if !oracle.is_optional(property) {
                schema.required.push(name.clone());
            }

            let mut property_schema = self.type_to_schema(property_type, depth + 1);
            if let Some(doc) = oracle.doc_comment(property).filter(|d| !d.is_empty()) {
                property_schema.description = Some(doc);
            }
            schema.properties.insert(name, property_schema);
        }

        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{LiteralValue, SymbolId};
    use crate::syntax::NodeId;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    /// Type description used by the fake oracle
    #[derive(Clone, Default)]
    struct FakeType {
        shape: Option<TypeShape>,
        symbol: Option<u32>,
        alias: Option<u32>,
        args: Vec<TypeId>,
        tuple: bool,
        constituents: Vec<TypeId>,
        properties: Vec<SymbolId>,
        calls: usize,
        literals: Vec<LiteralValue>,
    }

    #[derive(Clone, Default)]
    struct FakeSymbol {
        name: String,
        ty: Option<TypeId>,
        optional: bool,
        container: Option<String>,
        doc: Option<String>,
    }

    /// A hand-built type universe
    #[derive(Default)]
    struct FakeOracle {
        types: Vec<FakeType>,
        symbols: Vec<FakeSymbol>,
        names: HashMap<String, u32>,
    }

    impl FakeOracle {
        fn add_type(&mut self, ty: FakeType) -> TypeId {
            self.types.push(ty);
            TypeId(self.types.len() as u32 - 1)
        }

        fn primitive(&mut self, shape: TypeShape) -> TypeId {
            self.add_type(FakeType {
                shape: Some(shape),
                ..Default::default()
            })
        }

        fn name(&mut self, name: &str) -> u32 {
            if let Some(&id) = self.names.get(name) {
                return id;
            }
            self.symbols.push(FakeSymbol {
                name: name.to_string(),
                ..Default::default()
            });
            let id = self.symbols.len() as u32 - 1;
            self.names.insert(name.to_string(), id);
            id
        }

        fn named(&mut self, name: &str, args: Vec<TypeId>) -> TypeId {
            let symbol = self.name(name);
            self.add_type(FakeType {
                shape: Some(TypeShape::Object),
                symbol: Some(symbol),
                args,
                ..Default::default()
            })
        }

        fn property(&mut self, name: &str, ty: TypeId, optional: bool) -> SymbolId {
            self.symbols.push(FakeSymbol {
                name: name.to_string(),
                ty: Some(ty),
                optional,
                ..Default::default()
            });
            SymbolId(self.symbols.len() as u32 - 1)
        }

        fn set_properties(&mut self, ty: TypeId, properties: Vec<SymbolId>) {
            self.types[ty.0 as usize].properties = properties;
        }

        fn ty(&self, ty: TypeId) -> &FakeType {
            &self.types[ty.0 as usize]
        }
    }

    impl TypeOracle for FakeOracle {
        fn type_at(&self, _node: NodeId) -> TypeId {
            TypeId(0)
        }
        fn type_from_type_node(&self, _node: NodeId) -> TypeId {
            TypeId(0)
        }
        fn symbol_at(&self, _node: NodeId) -> Option<SymbolId> {
            None
        }
        fn symbol_name(&self, symbol: SymbolId) -> String {
            self.symbols[symbol.0 as usize].name.clone()
        }
        fn is_alias(&self, _symbol: SymbolId) -> bool {
            false
        }
        fn aliased_symbol(&self, symbol: SymbolId) -> Option<SymbolId> {
            Some(symbol)
        }
        fn declarations(&self, _symbol: SymbolId) -> Vec<NodeId> {
            Vec::new()
        }
        fn type_of_symbol(&self, symbol: SymbolId, _at: Option<NodeId>) -> TypeId {
            self.symbols[symbol.0 as usize].ty.unwrap_or(TypeId(0))
        }
        fn is_optional(&self, symbol: SymbolId) -> bool {
            self.symbols[symbol.0 as usize].optional
        }
        fn container_name(&self, symbol: SymbolId) -> Option<String> {
            self.symbols[symbol.0 as usize].container.clone()
        }
        fn doc_comment(&self, symbol: SymbolId) -> Option<String> {
            self.symbols[symbol.0 as usize].doc.clone()
        }
        fn shape(&self, ty: TypeId) -> TypeShape {
            self.ty(ty).shape.clone().unwrap_or(TypeShape::Any)
        }
        fn type_symbol(&self, ty: TypeId) -> Option<SymbolId> {
            self.ty(ty).symbol.map(SymbolId)
        }
        fn alias_symbol(&self, ty: TypeId) -> Option<SymbolId> {
            self.ty(ty).alias.map(SymbolId)
        }
        fn type_arguments(&self, ty: TypeId) -> Vec<TypeId> {
            self.ty(ty).args.clone()
        }
        fn is_tuple(&self, ty: TypeId) -> bool {
            self.ty(ty).tuple
        }
        fn constituents(&self, ty: TypeId) -> Vec<TypeId> {
            self.ty(ty).constituents.clone()
        }
        fn properties(&self, ty: TypeId) -> Vec<SymbolId> {
            self.ty(ty).properties.clone()
        }
        fn call_signature_count(&self, ty: TypeId) -> usize {
            self.ty(ty).calls
        }
        fn enum_literals(&self, ty: TypeId) -> Vec<LiteralValue> {
            self.ty(ty).literals.clone()
        }
        fn describe(&self, ty: TypeId) -> String {
            format!("type#{}", ty.0)
        }
    }

    fn to_json(schema: &Schema) -> serde_json::Value {
        serde_json::to_value(schema).unwrap()
    }

    #[test]
    fn test_primitive_types() {
        let mut oracle = FakeOracle::default();
        let any = oracle.primitive(TypeShape::Any);
        let string = oracle.primitive(TypeShape::String);
        let number = oracle.primitive(TypeShape::Number);
        let null = oracle.primitive(TypeShape::Null);
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(to_json(&generator.generate_schema(any)), json!({}));
        assert_eq!(to_json(&generator.generate_schema(string)), json!({"type": "string"}));
        assert_eq!(to_json(&generator.generate_schema(number)), json!({"type": "number"}));
        assert_eq!(
            to_json(&generator.generate_schema(null)),
            json!({"type": "string", "format": "nullable"})
        );
        assert!(generator.get_schemas().is_empty());
    }

    #[test]
    fn test_promise_and_date() {
        let mut oracle = FakeOracle::default();
        let date = oracle.named("Date", Vec::new());
        let promise = oracle.named("Promise", vec![date]);
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(promise)),
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn test_array_and_tuple() {
        let mut oracle = FakeOracle::default();
        let string = oracle.primitive(TypeShape::String);
        let number = oracle.primitive(TypeShape::Number);
        let array = oracle.named("Array", vec![number]);
        let tuple = oracle.add_type(FakeType {
            shape: Some(TypeShape::Object),
            tuple: true,
            args: vec![string, number],
            ..Default::default()
        });
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(array)),
            json!({"type": "array", "items": {"type": "number"}})
        );
        assert_eq!(
            to_json(&generator.generate_schema(tuple)),
            json!({"type": "array", "items": {"type": "string"}})
        );
    }

    #[test]
    fn test_enum_schema() {
        let mut oracle = FakeOracle::default();
        let role = oracle.add_type(FakeType {
            shape: Some(TypeShape::Enum),
            literals: vec![LiteralValue::String("admin".into()), LiteralValue::String("user".into())],
            ..Default::default()
        });
        let level = oracle.add_type(FakeType {
            shape: Some(TypeShape::Enum),
            literals: vec![LiteralValue::Number(0.0), LiteralValue::Number(1.0)],
            ..Default::default()
        });
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(role)),
            json!({"type": "string", "enum": ["admin", "user"]})
        );
        assert_eq!(
            to_json(&generator.generate_schema(level)),
            json!({"type": "number", "enum": [0, 1]})
        );
    }

    #[test]
    fn test_string_literal_union_becomes_enum() {
        let mut oracle = FakeOracle::default();
        let a = oracle.primitive(TypeShape::StringLiteral("a".into()));
        let b = oracle.primitive(TypeShape::StringLiteral("b".into()));
        let union = oracle.add_type(FakeType {
            shape: Some(TypeShape::Union),
            constituents: vec![a, b],
            ..Default::default()
        });
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(union)),
            json!({"type": "string", "enum": ["a", "b"]})
        );
    }

    #[test]
    fn test_mixed_union_and_intersection() {
        let mut oracle = FakeOracle::default();
        let string = oracle.primitive(TypeShape::String);
        let number = oracle.primitive(TypeShape::Number);
        let union = oracle.add_type(FakeType {
            shape: Some(TypeShape::Union),
            constituents: vec![string, number],
            ..Default::default()
        });
        let intersection = oracle.add_type(FakeType {
            shape: Some(TypeShape::Intersection),
            constituents: vec![string, number],
            ..Default::default()
        });
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(union)),
            json!({"anyOf": [{"type": "string"}, {"type": "number"}]})
        );
        assert_eq!(
            to_json(&generator.generate_schema(intersection)),
            json!({"allOf": [{"type": "string"}, {"type": "number"}]})
        );
    }

    #[test]
    fn test_lone_literal() {
        let mut oracle = FakeOracle::default();
        let literal = oracle.primitive(TypeShape::NumberLiteral(42.0));
        let mut generator = SchemaGenerator::new(&oracle);
        assert_eq!(
            to_json(&generator.generate_schema(literal)),
            json!({"type": "number", "enum": [42]})
        );
    }

    #[test]
    fn test_named_object_registration() {
        let mut oracle = FakeOracle::default();
        let string = oracle.primitive(TypeShape::String);
        let number = oracle.primitive(TypeShape::Number);
        let method = oracle.add_type(FakeType {
            shape: Some(TypeShape::Function),
            calls: 1,
            ..Default::default()
        });
        let user = oracle.named("User", Vec::new());
        let id = oracle.property("id", number, false);
        let name = oracle.property("name", string, true);
        let greet = oracle.property("greet", method, false);
        let internal = oracle.property("__brand", string, false);
        oracle.symbols[id.0 as usize].doc = Some("Identifier".to_string());
        oracle.set_properties(user, vec![id, name, greet, internal]);
        let mut generator = SchemaGenerator::new(&oracle);

        let schema = generator.generate_schema(user);
        assert_eq!(to_json(&schema), json!({"$ref": "#/components/schemas/User"}));
        assert_eq!(
            to_json(&generator.get_schemas()["User"]),
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "number", "description": "Identifier"},
                    "name": {"type": "string"}
                },
                "required": ["id"]
            })
        );
    }

    #[test]
    fn test_recursive_schema_uses_reference() {
        let mut oracle = FakeOracle::default();
        let comment = oracle.named("Comment", Vec::new());
        let replies_type = oracle.named("Array", vec![comment]);
        let replies = oracle.property("replies", replies_type, false);
        oracle.set_properties(comment, vec![replies]);
        let mut generator = SchemaGenerator::new(&oracle);

        generator.generate_schema(comment);
        let schemas = generator.into_schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(
            to_json(&schemas["Comment"]),
            json!({
                "type": "object",
                "properties": {
                    "replies": {"type": "array", "items": {"$ref": "#/components/schemas/Comment"}}
                },
                "required": ["replies"]
            })
        );
    }

    #[test]
    fn test_alias_name_preferred_over_literal() {
        let mut oracle = FakeOracle::default();
        let string = oracle.primitive(TypeShape::String);
        let literal_symbol = oracle.name("__type");
        let alias_symbol = oracle.name("Point");
        let point = oracle.add_type(FakeType {
            shape: Some(TypeShape::Object),
            symbol: Some(literal_symbol),
            alias: Some(alias_symbol),
            ..Default::default()
        });
        let x = oracle.property("x", string, false);
        oracle.set_properties(point, vec![x]);
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(point)),
            json!({"$ref": "#/components/schemas/Point"})
        );
    }

    #[test]
    fn test_denylisted_and_opaque_types() {
        let mut oracle = FakeOracle::default();
        let string = oracle.primitive(TypeShape::String);
        let literal = oracle.named("__type", Vec::new());
        let a = oracle.property("a", string, false);
        oracle.set_properties(literal, vec![a]);
        let buffer = oracle.named("Buffer", Vec::new());
        let mut generator = SchemaGenerator::new(&oracle);

        assert_eq!(
            to_json(&generator.generate_schema(literal)),
            json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]})
        );
        assert_eq!(
            to_json(&generator.generate_schema(buffer)),
            json!({"type": "object", "description": "Buffer"})
        );
        assert!(generator.get_schemas().is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let mut oracle = FakeOracle::default();
        // Array<Array<...<string>>> nested deeper than the limit
        let mut ty = oracle.primitive(TypeShape::String);
        for _ in 0..15 {
            ty = oracle.named("Array", vec![ty]);
        }
        let mut generator = SchemaGenerator::new(&oracle);
        let mut schema = generator.generate_schema(ty);
        let mut levels = 0;
        while let Some(items) = schema.items.take() {
            schema = *items;
            levels += 1;
        }
        assert_eq!(levels, MAX_DEPTH + 1);
        assert_eq!(schema, Schema::default());
    }

    #[test]
    fn test_empty_schema_detection() {
        assert!(Schema::default().is_empty());
        assert!(Schema::typed("object").is_empty());
        assert!(!Schema::typed("string").is_empty());
        assert!(!Schema::reference("User").is_empty());
    }

    #[test]
    fn test_schema_deserializes_extensions() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "string",
            "minLength": 3
        }))
        .unwrap();
        assert_eq!(schema.schema_type.as_deref(), Some("string"));
        assert_eq!(schema.extensions["minLength"], json!(3));
    }
}
