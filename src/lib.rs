//! OpenAPI Route Crawler - OpenAPI documents from Express-style TypeScript/JavaScript sources.
//!
//! The library starts at an application's entry file, follows router mounts (`app.use`) across
//! modules and records every route registration (`router.get`, `router.post`, ...). Request and
//! response contracts are inferred from the handlers: typed request generics, casts of
//! `req.body`/`req.query`, header reads, `res.status(...)` and `res.json(...)` calls, JSDoc
//! tags and `#swagger.*` directive comments. Types are answered by a [`oracle::TypeOracle`].
//!
//! # Architecture
//!
//! 1. [`config`] - Finds and reads `tsconfig.json`/`jsconfig.json` and the generator config
//! 2. [`loader`] - Parses the entry file and every module reachable through imports
//! 3. [`parser`] / [`syntax`] - tree-sitter parsing into owned syntax trees
//! 4. [`type_resolver`] - Resolves declarations, imports and types behind the oracle interface
//! 5. [`crawler`] - Walks the route graph and analyzes handler chains
//! 6. [`schema_generator`] - Converts resolved types to OpenAPI schemas
//! 7. [`openapi_builder`] - Constructs the complete OpenAPI document
//! 8. [`serializer`] - Serializes the document to JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_route_crawler::{
//!     crawler::RouteCrawler,
//!     loader::ProgramLoader,
//!     openapi_builder::OpenApiBuilder,
//!     serializer::serialize_json,
//!     type_resolver::TypeResolver,
//! };
//! use std::path::Path;
//!
//! let mut loader = ProgramLoader::new(None).unwrap();
//! let loaded = loader.load(Path::new("src/app.ts")).unwrap();
//!
//! let resolver = TypeResolver::new(&loaded.program);
//! let output = RouteCrawler::new(&loaded.program, &resolver).crawl(loaded.entry);
//!
//! let document = OpenApiBuilder::new().build(output);
//! println!("{}", serialize_json(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod literal;
pub mod loader;
pub mod openapi_builder;
pub mod oracle;
pub mod parser;
pub mod schema_generator;
pub mod serializer;
pub mod syntax;
pub mod type_resolver;
