//! Inference of parameters, request bodies and responses from how a handler uses its
//! request and response values.

use crate::crawler::resolver::{is_function_literal, HandlerResolver};
use crate::openapi_builder::{
    MediaType, Operation, Parameter, ParameterLocation, RequestBody, JSON_MEDIA_TYPE,
};
use crate::oracle::{SymbolId, TypeId, TypeOracle};
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::syntax::{NodeId, Program};
use log::debug;
use std::collections::HashSet;

/// How deep request/response values are followed into helper functions
const MAX_FORWARD_DEPTH: usize = 8;

/// Header that is described by the request body's media type instead
const CONTENT_TYPE: &str = "content-type";

/// Node kinds that wrap an expression without changing its value
const TRANSPARENT: [&str; 3] = ["parenthesized_expression", "non_null_expression", "satisfies_expression"];

/// Names the request and response values are bound to in the function being analyzed
#[derive(Debug, Clone, Default, PartialEq)]
struct Bindings {
    request: Option<String>,
    response: Option<String>,
}

impl Bindings {
    fn is_empty(&self) -> bool {
        self.request.is_none() && self.response.is_none()
    }
}

/// Usage analyzer - walks handler bodies and records what they read and send
pub struct UsageAnalyzer<'a, 'g> {
    program: &'a Program,
    oracle: &'a dyn TypeOracle,
    resolver: &'g HandlerResolver<'a>,
    schemas: &'g mut SchemaGenerator<'a>,
    /// Helper functions already analyzed for the current handler
    visited: HashSet<NodeId>,
}

impl<'a, 'g> UsageAnalyzer<'a, 'g> {
    pub fn new(
        program: &'a Program,
        oracle: &'a dyn TypeOracle,
        resolver: &'g HandlerResolver<'a>,
        schemas: &'g mut SchemaGenerator<'a>,
    ) -> Self {
        Self {
            program,
            oracle,
            resolver,
            schemas,
            visited: HashSet::new(),
        }
    }

    /// Analyzes one handler of a route's chain.
    ///
    /// The first parameter is taken as the request and the second as the response. Typed
    /// request generics are applied before the body is walked.
    pub fn analyze_handler(&mut self, handler: NodeId, operation: &mut Operation) {
        let parameters = parameter_nodes(self.program, handler);
        if parameters.len() >= 2 {
            self.apply_request_generics(parameters[0], operation);
        }

        let names: Vec<Option<String>> = parameters
            .iter()
            .map(|&p| binding_name(self.program, p))
            .collect();
        let bindings = Bindings {
            request: names.first().cloned().flatten(),
            response: names.get(1).cloned().flatten(),
        };

        if let Some(body) = self.program.field(handler, "body") {
            self.visited.insert(handler);
            self.analyze(body, operation, &bindings, 0);
        }
    }

    /// Applies `Request<Params, ResBody, ReqBody, Query>` type arguments of the request parameter
    fn apply_request_generics(&mut self, request: NodeId, operation: &mut Operation) {
        let Some(name) = binding_node(self.program, request) else {
            return;
        };
        let arguments = self.oracle.type_arguments(self.oracle.type_at(name));
        if arguments.is_empty() {
            return;
        }
        debug!(
            "Request parameter typed as {}",
            self.oracle.describe(self.oracle.type_at(name))
        );

        if let Some(&body) = arguments.get(2) {
            let schema = self.schemas.generate_schema(body);
            if !schema.is_empty() {
                operation.request_body = Some(RequestBody::json(schema));
            }
        }
        if let Some(&query) = arguments.get(3) {
            self.add_query_parameters(query, operation);
        }
    }

    fn analyze(&mut self, body: NodeId, operation: &mut Operation, bindings: &Bindings, depth: usize) {
        if bindings.is_empty() {
            return;
        }

        let mut pending = vec![body];
        while let Some(node) = pending.pop() {
            match self.program.kind(node) {
                "call_expression" => self.visit_call(node, operation, bindings, depth),
                "member_expression" => self.visit_member(node, operation, bindings),
                "subscript_expression" => self.visit_subscript(node, operation, bindings),
                "as_expression" | "type_assertion" => self.visit_cast(node, operation, bindings),
                "variable_declarator" => self.visit_declarator(node, operation, bindings),
                _ => {}
            }
            let children: Vec<NodeId> = self.program.named_children(node).collect();
            pending.extend(children.into_iter().rev());
        }
    }

    fn visit_call(&mut self, call: NodeId, operation: &mut Operation, bindings: &Bindings, depth: usize) {
        let program = self.program;
        let Some(function) = program.field(call, "function").map(|f| program.skip_parens(f)) else {
            return;
        };
        let arguments = call_arguments(program, call);

        if program.kind(function) == "member_expression" {
            let method = program.field(function, "property").map(|p| program.text(p));
            let object = program.field(function, "object").map(|o| program.skip_parens(o));

            if let (Some(response), Some(method), Some(object)) = (&bindings.response, method, object) {
                let on_response =
                    program.kind(object) == "identifier" && program.text(object) == response.as_str();

                if on_response && matches!(method, "status" | "sendStatus") {
                    if let Some(code) = arguments.first().and_then(|&a| status_code(program, a)) {
                        debug!("Response status {} at line {}", code, program.line(call));
                        operation.ensure_response(&code);
                    }
                }

                if matches!(method, "json" | "send")
                    && !arguments.is_empty()
                    && chain_root(program, function).is_some_and(|root| root == response.as_str())
                {
                    let payload = self.oracle.type_at(arguments[0]);
                    let ok = operation.ensure_response("200");
                    if ok.content.is_empty() {
                        let schema = self.schemas.generate_schema(payload);
                        ok.content
                            .insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
                    }
                }
            }

            if let (Some(request), Some(method), Some(object)) = (&bindings.request, method, object) {
                let on_request =
                    program.kind(object) == "identifier" && program.text(object) == request.as_str();
                if on_request && matches!(method, "header" | "get") {
                    if let Some(name) = arguments.first().and_then(|&a| program.string_value(a)) {
                        add_header(operation, name, false);
                    }
                }
            }
        }

        self.follow_forwarded(function, &arguments, operation, bindings, depth);
    }

    /// Analyzes a same-unit helper that receives the request or response value
    fn follow_forwarded(
        &mut self,
        callee: NodeId,
        arguments: &[NodeId],
        operation: &mut Operation,
        bindings: &Bindings,
        depth: usize,
    ) {
        if depth >= MAX_FORWARD_DEPTH {
            return;
        }
        let program = self.program;
        let position_of = |name: &Option<String>| {
            name.as_ref().and_then(|name| {
                arguments.iter().position(|&a| {
                    let a = program.skip_parens(a);
                    program.kind(a) == "identifier" && program.text(a) == name.as_str()
                })
            })
        };
        let request_position = position_of(&bindings.request);
        let response_position = position_of(&bindings.response);
        if request_position.is_none() && response_position.is_none() {
            return;
        }
        if is_function_literal(program.kind(callee)) {
            return;
        }

        let Some(helper) = self.resolver.resolve_handler(callee) else {
            return;
        };
        if helper.unit != callee.unit || !self.visited.insert(helper) {
            return;
        }

        let parameters = parameter_nodes(program, helper);
        let rename = |position: Option<usize>| {
            position
                .and_then(|i| parameters.get(i))
                .and_then(|&p| binding_name(program, p))
        };
        let forwarded = Bindings {
            request: rename(request_position),
            response: rename(response_position),
        };
        debug!(
            "Following `{}` into helper at line {} with {:?}",
            program.text(callee),
            program.line(helper),
            forwarded
        );

        if let Some(body) = program.field(helper, "body") {
            self.analyze(body, operation, &forwarded, depth + 1);
        }
    }

    fn visit_member(&mut self, member: NodeId, operation: &mut Operation, bindings: &Bindings) {
        let program = self.program;
        match request_property(program, member, bindings) {
            Some("body") => {
                if cast_around(program, member).is_none() && operation.request_body.is_none() {
                    debug!("Untyped request body access at line {}", program.line(member));
                    operation.request_body = Some(RequestBody::json(Schema::inferred_object()));
                }
            }
            _ => {
                // req.headers.x
                let Some(object) = program.field(member, "object").map(|o| program.skip_parens(o)) else {
                    return;
                };
                if request_property(program, object, bindings) == Some("headers") {
                    if let Some(property) = program.field(member, "property") {
                        add_header(operation, program.text(property).to_string(), false);
                    }
                }
            }
        }
    }

    fn visit_subscript(&mut self, subscript: NodeId, operation: &mut Operation, bindings: &Bindings) {
        let program = self.program;
        let Some(object) = program.field(subscript, "object").map(|o| program.skip_parens(o)) else {
            return;
        };
        if request_property(program, object, bindings) != Some("headers") {
            return;
        }
        if let Some(name) = program
            .field(subscript, "index")
            .and_then(|index| program.string_value(program.skip_parens(index)))
        {
            add_header(operation, name, false);
        }
    }

    fn visit_cast(&mut self, cast: NodeId, operation: &mut Operation, bindings: &Bindings) {
        let program = self.program;
        // only the outermost cast of a chain counts
        if is_cast(program, unwrap_parent(program, cast)) {
            return;
        }
        let target = strip_casts(program, cast);
        let Some(property) = request_property(program, target, bindings) else {
            return;
        };
        let ty = self.cast_type(cast);

        match property {
            "body" => {
                let schema = self.schemas.generate_schema(ty);
                if schema.is_empty() {
                    debug!("Ignoring untyped body cast at line {}", program.line(cast));
                } else {
                    operation.request_body = Some(RequestBody::json(schema));
                }
            }
            "query" => self.add_query_parameters(ty, operation),
            "headers" => {
                for symbol in self.oracle.properties(ty) {
                    add_header(operation, self.oracle.symbol_name(symbol), !self.oracle.is_optional(symbol));
                }
            }
            _ => {}
        }
    }

    /// Asserted type of a cast: the written type, or the cast expression's own type for
    /// `as const`
    fn cast_type(&self, cast: NodeId) -> TypeId {
        let program = self.program;
        let type_node = match program.kind(cast) {
            "type_assertion" => program
                .child_of_kind(cast, "type_arguments")
                .and_then(|args| program.named_children(args).next()),
            _ => {
                let children: Vec<NodeId> = program.named_children(cast).collect();
                if children.len() >= 2 {
                    children.last().copied()
                } else {
                    None
                }
            }
        };
        match type_node {
            Some(node) => self.oracle.type_from_type_node(node),
            None => self.oracle.type_at(cast),
        }
    }

    /// `const { page, sort: order } = req.query`
    fn visit_declarator(&mut self, declarator: NodeId, operation: &mut Operation, bindings: &Bindings) {
        let program = self.program;
        let (Some(pattern), Some(value)) = (program.field(declarator, "name"), program.field(declarator, "value")) else {
            return;
        };
        if program.kind(pattern) != "object_pattern" {
            return;
        }
        if request_property(program, strip_casts(program, value), bindings) != Some("query") {
            return;
        }

        let ty = self.oracle.type_at(value);
        let properties = self.oracle.properties(ty);
        for key in destructured_keys(program, pattern) {
            let property = properties
                .iter()
                .copied()
                .find(|&p| self.oracle.symbol_name(p) == key);
            let parameter = match property {
                Some(symbol) => self.query_parameter(symbol),
                None => Parameter::new(key, ParameterLocation::Query, false, Schema::typed("string")),
            };
            operation.add_parameter(parameter);
        }
    }

    fn add_query_parameters(&mut self, ty: TypeId, operation: &mut Operation) {
        for symbol in self.oracle.properties(ty) {
            let parameter = self.query_parameter(symbol);
            operation.add_parameter(parameter);
        }
    }

    fn query_parameter(&mut self, symbol: SymbolId) -> Parameter {
        let name = self.oracle.symbol_name(symbol);
        let mut schema = self
            .schemas
            .generate_schema(self.oracle.type_of_symbol(symbol, None));
        if schema == Schema::default() {
            schema = Schema::typed("string");
        }
        let mut parameter = Parameter::new(
            name,
            ParameterLocation::Query,
            !self.oracle.is_optional(symbol),
            schema,
        );
        parameter.description = self.oracle.doc_comment(symbol);
        parameter
    }
}

fn add_header(operation: &mut Operation, name: String, required: bool) {
    if name.eq_ignore_ascii_case(CONTENT_TYPE) {
        return;
    }
    operation.add_parameter(Parameter::new(
        name,
        ParameterLocation::Header,
        required,
        Schema::typed("string"),
    ));
}

/// Declared parameters of a function-like node
pub fn parameter_nodes(program: &Program, function: NodeId) -> Vec<NodeId> {
    if let Some(parameters) = program.field(function, "parameters") {
        return program.named_children(parameters).collect();
    }
    // `req => ...`
    program.field(function, "parameter").into_iter().collect()
}

/// Identifier a parameter binds, if it is a plain name
fn binding_node(program: &Program, parameter: NodeId) -> Option<NodeId> {
    let node = match program.kind(parameter) {
        "required_parameter" | "optional_parameter" => program.field(parameter, "pattern")?,
        "assignment_pattern" => program.field(parameter, "left")?,
        _ => parameter,
    };
    (program.kind(node) == "identifier").then_some(node)
}

fn binding_name(program: &Program, parameter: NodeId) -> Option<String> {
    binding_node(program, parameter).map(|node| program.text(node).to_string())
}

fn call_arguments(program: &Program, call: NodeId) -> Vec<NodeId> {
    program
        .field(call, "arguments")
        .map(|args| program.named_children(args).collect())
        .unwrap_or_default()
}

/// Numeric status code literal, e.g. `404`
fn status_code(program: &Program, node: NodeId) -> Option<String> {
    let node = program.skip_parens(node);
    if program.kind(node) != "number" {
        return None;
    }
    let text = program.text(node);
    text.parse::<u16>().ok().map(|code| code.to_string())
}

/// Identifier at the root of a member/call chain such as `res.status(200).json`
fn chain_root<'p>(program: &'p Program, node: NodeId) -> Option<&'p str> {
    let mut current = node;
    loop {
        current = match program.kind(current) {
            "member_expression" | "subscript_expression" => program.field(current, "object")?,
            "call_expression" => program.field(current, "function")?,
            kind if TRANSPARENT.contains(&kind) => program.named_children(current).next()?,
            "identifier" => return Some(program.text(current)),
            _ => return None,
        };
    }
}

/// Property name of `<request>.<name>`
fn request_property<'p>(program: &'p Program, node: NodeId, bindings: &Bindings) -> Option<&'p str> {
    let request = bindings.request.as_deref()?;
    if program.kind(node) != "member_expression" {
        return None;
    }
    let object = program.skip_parens(program.field(node, "object")?);
    if program.kind(object) != "identifier" || program.text(object) != request {
        return None;
    }
    program.field(node, "property").map(|p| program.text(p))
}

fn is_cast(program: &Program, node: Option<NodeId>) -> bool {
    node.is_some_and(|n| matches!(program.kind(n), "as_expression" | "type_assertion"))
}

/// Parent of a node, looking through transparent wrappers
fn unwrap_parent(program: &Program, node: NodeId) -> Option<NodeId> {
    let mut parent = program.parent(node);
    while let Some(p) = parent {
        if !TRANSPARENT.contains(&program.kind(p)) {
            break;
        }
        parent = program.parent(p);
    }
    parent
}

/// The cast directly wrapping an expression, if any
fn cast_around(program: &Program, node: NodeId) -> Option<NodeId> {
    unwrap_parent(program, node).filter(|&p| is_cast(program, Some(p)))
}

/// Expression under a chain of casts and wrappers
fn strip_casts(program: &Program, node: NodeId) -> NodeId {
    let mut current = program.skip_parens(node);
    loop {
        let inner = match program.kind(current) {
            "as_expression" => program.named_children(current).next(),
            "type_assertion" => program
                .named_children(current)
                .find(|&c| program.kind(c) != "type_arguments"),
            _ => None,
        };
        match inner {
            Some(inner) => current = program.skip_parens(inner),
            None => return current,
        }
    }
}

/// Property keys of an object destructuring pattern; renamed bindings use the key
fn destructured_keys(program: &Program, pattern: NodeId) -> Vec<String> {
    program
        .named_children(pattern)
        .filter_map(|element| match program.kind(element) {
            "shorthand_property_identifier_pattern" => Some(program.text(element).to_string()),
            "pair_pattern" => program.field(element, "key").map(|key| {
                program
                    .string_value(key)
                    .unwrap_or_else(|| program.text(key).to_string())
            }),
            "object_assignment_pattern" => program
                .field(element, "left")
                .map(|left| program.text(left).to_string()),
            _ => None,
        })
        .collect()
}
