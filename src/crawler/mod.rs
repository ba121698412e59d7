//! Route-graph crawler.
//!
//! Starting from the entry unit, every call shaped `<receiver>.<verb>(...)` is inspected.
//! `use` calls mount another unit's routes under a base path and are followed recursively;
//! HTTP verb calls register an operation whose parameters, body and responses are inferred
//! from the handler chain.

pub mod metadata;
pub mod resolver;
pub mod usage;

use crate::openapi_builder::{
    convert_path_format, path_parameters, HttpMethod, Operation, Parameter, ParameterLocation,
    RouteGraph,
};
use crate::oracle::TypeOracle;
use crate::schema_generator::{Schema, SchemaGenerator};
use crate::syntax::{NodeId, Program, UnitId};
use indexmap::IndexMap;
use log::{debug, info};

pub use metadata::DEFAULT_DIRECTIVE_MARKERS;
pub use resolver::HandlerResolver;
pub use usage::UsageAnalyzer;

/// Result of one crawl: the route graph and the named schemas its operations reference
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlOutput {
    pub routes: RouteGraph,
    pub schemas: IndexMap<String, Schema>,
}

/// Route crawler - owns the route graph and schema table of one crawl
pub struct RouteCrawler<'a> {
    program: &'a Program,
    oracle: &'a dyn TypeOracle,
    resolver: HandlerResolver<'a>,
    schemas: SchemaGenerator<'a>,
    routes: RouteGraph,
    /// Directive comment markers, e.g. `swagger` for `#swagger.summary = ...`
    markers: Vec<String>,
}

impl<'a> RouteCrawler<'a> {
    pub fn new(program: &'a Program, oracle: &'a dyn TypeOracle) -> Self {
        Self {
            program,
            oracle,
            resolver: HandlerResolver::new(program, oracle),
            schemas: SchemaGenerator::new(oracle),
            routes: RouteGraph::new(),
            markers: DEFAULT_DIRECTIVE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn with_directive_markers(mut self, markers: Vec<String>) -> Self {
        if !markers.is_empty() {
            self.markers = markers;
        }
        self
    }

    /// Crawls every route reachable from the entry unit
    pub fn crawl(mut self, entry: UnitId) -> CrawlOutput {
        info!(
            "Crawling routes from {}",
            self.program.unit(entry).path.display()
        );
        self.crawl_unit(entry, "/", &[entry]);

        let operations: usize = self.routes.values().map(|item| item.len()).sum();
        info!(
            "Found {} operations on {} paths",
            operations,
            self.routes.len()
        );
        CrawlOutput {
            routes: self.routes,
            schemas: self.schemas.into_schemas(),
        }
    }

    /// Pre-order walk of one unit. `stack` holds the units mounted on the current branch.
    fn crawl_unit(&mut self, unit: UnitId, base: &str, stack: &[UnitId]) {
        debug!(
            "Visiting {} with base path {}",
            self.program.unit(unit).path.display(),
            base
        );
        let mut pending = vec![self.program.root(unit)];
        while let Some(node) = pending.pop() {
            if self.program.kind(node) == "call_expression" {
                self.handle_call(node, base, stack);
            }
            let children: Vec<NodeId> = self.program.named_children(node).collect();
            pending.extend(children.into_iter().rev());
        }
    }

    fn handle_call(&mut self, call: NodeId, base: &str, stack: &[UnitId]) {
        let program = self.program;
        let Some(function) = program.field(call, "function") else {
            return;
        };
        if program.kind(function) != "member_expression" {
            return;
        }
        let Some(verb) = program.field(function, "property").map(|p| program.text(p)) else {
            return;
        };
        let arguments: Vec<NodeId> = program
            .field(call, "arguments")
            .map(|args| program.named_children(args).collect())
            .unwrap_or_default();
        if arguments.len() < 2 {
            return;
        }

        if verb.eq_ignore_ascii_case("use") {
            self.handle_mount(call, &arguments, base, stack);
        } else if let Some(method) = HttpMethod::from_verb(verb) {
            self.handle_route(call, method, &arguments, base);
        }
    }

    fn handle_mount(&mut self, call: NodeId, arguments: &[NodeId], base: &str, stack: &[UnitId]) {
        let mount_path = self
            .resolver
            .resolve_path(arguments[0])
            .unwrap_or_else(|| "/".to_string());
        let Some(target) = self.resolver.resolve_mount_target(arguments[1]) else {
            debug!(
                "Mount target `{}` at line {} does not resolve",
                self.program.text(arguments[1]),
                self.program.line(call)
            );
            return;
        };
        if stack.contains(&target) {
            debug!(
                "Skipping mount of {}: already on the crawl stack",
                self.program.unit(target).path.display()
            );
            return;
        }

        let mounted_base = join_paths(base, &mount_path);
        let mut branch = stack.to_vec();
        branch.push(target);
        self.crawl_unit(target, &mounted_base, &branch);
    }

    fn handle_route(&mut self, call: NodeId, method: HttpMethod, arguments: &[NodeId], base: &str) {
        let program = self.program;
        let Some(route_path) = self.resolver.resolve_path(arguments[0]) else {
            debug!(
                "Skipping {} route with dynamic path at line {}",
                method,
                program.line(call)
            );
            return;
        };

        let handlers: Vec<NodeId> = arguments[1..]
            .iter()
            .filter(|&&arg| program.kind(program.skip_parens(arg)) != "call_expression")
            .filter_map(|&arg| self.resolver.resolve_handler(arg))
            .collect();
        if handlers.is_empty() {
            debug!(
                "No handler resolved for {} {} at line {}",
                method,
                route_path,
                program.line(call)
            );
            return;
        }

        let path = convert_path_format(&join_paths(base, &route_path));
        debug!("Found route: {} {}", method, path);

        let mut operation = Operation::new();
        metadata::call_site_docs(program, call).merge_into(&mut operation);
        for name in path_parameters(&path) {
            operation.add_parameter(Parameter::new(
                name,
                ParameterLocation::Path,
                true,
                Schema::typed("string"),
            ));
        }

        // docs of the whole chain first, directives after them, usage last
        for &handler in &handlers {
            metadata::handler_docs(program, handler).merge_into(&mut operation);
        }
        for &handler in &handlers {
            if let Some(body) = program.field(handler, "body") {
                metadata::apply_directives(program, body, &mut operation, &self.markers);
            }
        }
        for &handler in &handlers {
            UsageAnalyzer::new(program, self.oracle, &self.resolver, &mut self.schemas)
                .analyze_handler(handler, &mut operation);
        }

        // a repeated path and method replaces the earlier registration
        self.routes.entry(path).or_default().insert(method, operation);
    }
}

/// Joins a base path and a route path into a normalized absolute path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, `..` removes the previous
/// segment. The result always starts with `/` and never ends with one, except for the root.
pub fn join_paths(base: &str, path: &str) -> String {
    let joined = format!("{}/{}", base, path).replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}
