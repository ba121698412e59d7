//! Resolution of route paths, handlers and mount targets.

use crate::oracle::{TypeOracle, TypeShape};
use crate::syntax::{NodeId, Program, UnitId, UnitOrigin};
use log::debug;

/// Node kinds that are function literals
const FUNCTION_LITERALS: [&str; 4] = [
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Resolves path arguments, handler references and mount targets through the type oracle
pub struct HandlerResolver<'a> {
    program: &'a Program,
    oracle: &'a dyn TypeOracle,
}

pub fn is_function_literal(kind: &str) -> bool {
    FUNCTION_LITERALS.contains(&kind)
}

impl<'a> HandlerResolver<'a> {
    pub fn new(program: &'a Program, oracle: &'a dyn TypeOracle) -> Self {
        Self { program, oracle }
    }

    /// Resolves a path argument to its string value.
    ///
    /// String literals and substitution-free template literals are read directly. A reference
    /// resolves when the oracle types it as a single string literal, as for
    /// `const USERS = "/users"`.
    ///
    /// # Returns
    ///
    /// `None` for dynamic paths
    pub fn resolve_path(&self, node: NodeId) -> Option<String> {
        let node = self.program.skip_parens(node);
        match self.program.kind(node) {
            "string" | "template_string" => self.program.string_value(node),
            "identifier" | "member_expression" => match self.oracle.shape(self.oracle.type_at(node)) {
                TypeShape::StringLiteral(value) => Some(value),
                _ => {
                    debug!("Path `{}` is not statically known", self.program.text(node));
                    None
                }
            },
            _ => None,
        }
    }

    /// Resolves a handler argument to the function that implements it.
    ///
    /// Function literals are returned as-is. References are followed through imports and
    /// re-exports to a function or method declaration, a variable initialized with a function
    /// literal, or an object/class member holding one. Declarations in ambient or external
    /// units are never followed.
    pub fn resolve_handler(&self, node: NodeId) -> Option<NodeId> {
        let program = self.program;
        let node = program.skip_parens(node);
        let kind = program.kind(node);
        if is_function_literal(kind) {
            return Some(node);
        }
        if kind != "identifier" && kind != "member_expression" {
            return None;
        }

        let declaration = self.declaration_of(node)?;
        let handler = match program.kind(declaration) {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                Some(declaration)
            }
            kind if is_function_literal(kind) => Some(declaration),
            "variable_declarator" | "public_field_definition" | "pair" => program
                .field(declaration, "value")
                .map(|value| program.skip_parens(value))
                .filter(|&value| is_function_literal(program.kind(value))),
            _ => None,
        };
        if handler.is_none() {
            debug!(
                "`{}` does not resolve to a function ({})",
                program.text(node),
                program.kind(declaration)
            );
        }
        handler
    }

    /// Resolves a mount target (a router reference) to the unit that defines it
    pub fn resolve_mount_target(&self, node: NodeId) -> Option<UnitId> {
        let node = self.program.skip_parens(node);
        self.declaration_of(node).map(|declaration| declaration.unit)
    }

    /// First declaration of the symbol a reference resolves to, following aliases.
    ///
    /// Declarations outside the project's own sources are rejected.
    fn declaration_of(&self, node: NodeId) -> Option<NodeId> {
        let oracle = self.oracle;
        let mut symbol = oracle.symbol_at(node)?;
        if oracle.is_alias(symbol) {
            symbol = oracle.aliased_symbol(symbol)?;
        }
        let declaration = oracle.declarations(symbol).into_iter().next()?;
        match self.program.origin(declaration) {
            UnitOrigin::Project => Some(declaration),
            origin => {
                debug!(
                    "Not following `{}` into {:?} unit {}",
                    self.program.text(node),
                    origin,
                    self.program.unit(declaration.unit).path.display()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::type_resolver::TypeResolver;
    use std::path::PathBuf;

    fn create_program(files: &[(&str, &str, UnitOrigin)]) -> Program {
        let mut parser = AstParser::new().unwrap();
        let mut program = Program::new();
        for (name, source, origin) in files {
            let unit = parser
                .parse_source(PathBuf::from(name), source.to_string(), *origin)
                .unwrap();
            program.add_unit(unit);
        }
        for i in 1..files.len() {
            let specifier = format!("./{}", files[i].0.trim_end_matches(".ts").trim_end_matches(".d"));
            program.unit_mut(UnitId(0)).imports.insert(specifier, UnitId(i));
        }
        program
    }

    /// Arguments of the first call to `<receiver>.<verb>(...)`
    fn call_args(program: &Program, verb: &str) -> Vec<NodeId> {
        let nodes = &program.unit(UnitId(0)).nodes;
        for index in 0..nodes.len() {
            let id = NodeId {
                unit: UnitId(0),
                index: index as u32,
            };
            if program.kind(id) != "call_expression" {
                continue;
            }
            let matches = program
                .field(id, "function")
                .and_then(|f| program.field(f, "property"))
                .is_some_and(|p| program.text(p) == verb);
            if matches {
                let args = program.field(id, "arguments").unwrap();
                return program.named_children(args).collect();
            }
        }
        panic!("no call to {}", verb);
    }

    #[test]
    fn test_resolve_literal_and_const_paths() {
        let program = create_program(&[(
            "index.ts",
            "const USERS = '/users';\nlet dynamic = '/x';\nrouter.get('/a', h);\nrouter.post(`/b`, h);\nrouter.put(USERS, h);\nrouter.patch(dynamic, h);\nrouter.delete(`/c/${x}`, h);",
            UnitOrigin::Project,
        )]);
        let resolver_oracle = TypeResolver::new(&program);
        let resolver = HandlerResolver::new(&program, &resolver_oracle);

        assert_eq!(resolver.resolve_path(call_args(&program, "get")[0]).as_deref(), Some("/a"));
        assert_eq!(resolver.resolve_path(call_args(&program, "post")[0]).as_deref(), Some("/b"));
        assert_eq!(resolver.resolve_path(call_args(&program, "put")[0]).as_deref(), Some("/users"));
        assert_eq!(resolver.resolve_path(call_args(&program, "patch")[0]), None);
        assert_eq!(resolver.resolve_path(call_args(&program, "delete")[0]), None);
    }

    #[test]
    fn test_resolve_handler_forms() {
        let program = create_program(&[
            (
                "index.ts",
                "import { list } from './controller';\nfunction show(req, res) {}\nconst create = (req, res) => {};\nconst notAHandler = 42;\nrouter.get('/a', list);\nrouter.post('/b', show);\nrouter.put('/c', create);\nrouter.patch('/d', (req, res) => {});\nrouter.delete('/e', notAHandler);",
                UnitOrigin::Project,
            ),
            ("controller.ts", "export const list = function (req, res) {};", UnitOrigin::Project),
        ]);
        let oracle = TypeResolver::new(&program);
        let resolver = HandlerResolver::new(&program, &oracle);

        let list = resolver.resolve_handler(call_args(&program, "get")[1]).unwrap();
        assert_eq!(list.unit, UnitId(1));
        assert_eq!(program.kind(list), "function_expression");

        let show = resolver.resolve_handler(call_args(&program, "post")[1]).unwrap();
        assert_eq!(program.kind(show), "function_declaration");

        let create = resolver.resolve_handler(call_args(&program, "put")[1]).unwrap();
        assert_eq!(program.kind(create), "arrow_function");

        assert!(resolver.resolve_handler(call_args(&program, "patch")[1]).is_some());
        assert!(resolver.resolve_handler(call_args(&program, "delete")[1]).is_none());
    }

    #[test]
    fn test_ambient_declarations_are_not_followed() {
        let program = create_program(&[
            (
                "index.ts",
                "import { handler } from './types';\nimport router from './types';\nrouter.get('/a', handler);\napp.use('/x', router);",
                UnitOrigin::Project,
            ),
            (
                "types.d.ts",
                "export declare function handler(req: any, res: any): void;\ndeclare const router: any;\nexport default router;",
                UnitOrigin::Ambient,
            ),
        ]);
        let oracle = TypeResolver::new(&program);
        let resolver = HandlerResolver::new(&program, &oracle);

        assert!(resolver.resolve_handler(call_args(&program, "get")[1]).is_none());
        assert!(resolver.resolve_mount_target(call_args(&program, "use")[1]).is_none());
    }

    #[test]
    fn test_resolve_mount_target() {
        let program = create_program(&[
            ("index.ts", "import users from './users';\napp.use('/users', users);", UnitOrigin::Project),
            ("users.ts", "const router = Router();\nexport default router;", UnitOrigin::Project),
        ]);
        let oracle = TypeResolver::new(&program);
        let resolver = HandlerResolver::new(&program, &oracle);

        assert_eq!(
            resolver.resolve_mount_target(call_args(&program, "use")[1]),
            Some(UnitId(1))
        );
    }
}
