//! OpenAPI Route Crawler - command-line tool for generating OpenAPI documents.
//!
//! Crawls the route graph of an Express-style TypeScript or JavaScript application, starting
//! from its entry file, and writes an OpenAPI 3.0 document describing every route it finds.
//!
//! # Usage
//!
//! ```bash
//! openapi-route-crawler [OPTIONS] <ENTRY> <OUTPUT>
//! ```
//!
//! # Examples
//!
//! Generate JSON documentation:
//! ```bash
//! openapi-route-crawler src/app.ts openapi.json
//! ```
//!
//! Generate YAML documentation with a custom title and server:
//! ```bash
//! openapi-route-crawler src/app.ts openapi.yaml --title "Shop API" --server https://api.example.com
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-route-crawler src/app.ts openapi.json -v
//! ```

use clap::Parser;
use log::{error, info};
use openapi_route_crawler::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse once up front so the verbose flag can configure the logger
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("OpenAPI Route Crawler starting...");

    let result = cli::parse_args_from_parsed(args).and_then(cli::run);
    match result {
        Ok(()) => {
            info!("OpenAPI document generation completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
