use crate::config::{find_project_config, GeneratorConfig, ProjectConfig};
use crate::crawler::RouteCrawler;
use crate::error::Error;
use crate::loader::ProgramLoader;
use crate::openapi_builder::{OpenApiBuilder, OpenApiDocument, Server};
use crate::parser::SourceLanguage;
use crate::serializer::{serialize, write_to_file, OutputFormat};
use crate::type_resolver::TypeResolver;
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// OpenAPI Route Crawler - generate OpenAPI documents from Express-style TypeScript/JavaScript
/// applications
#[derive(Parser, Debug)]
#[command(name = "openapi-route-crawler")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Entry file of the application, e.g. src/app.ts
    #[arg(value_name = "ENTRY")]
    pub entry: PathBuf,

    /// Output file path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Project configuration (tsconfig.json / jsconfig.json); discovered from the entry
    /// directory upward when omitted
    #[arg(short = 'p', long = "project", value_name = "TSCONFIG")]
    pub project: Option<PathBuf>,

    /// Generator configuration (JSON or YAML) with info, servers, security schemes and schemas
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format; defaults to the output file's extension, then JSON
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// API title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// API version
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Server URL; may be repeated
    #[arg(long = "server", value_name = "URL")]
    pub servers: Vec<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Format requested with `--format`, or implied by the output file name
    pub fn output_format(&self) -> OutputFormat {
        self.format
            .unwrap_or_else(|| OutputFormat::from_path(&self.output))
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.entry.is_file() {
        return Err(Error::EntryNotFound(args.entry.clone()).into());
    }
    if SourceLanguage::from_path(&args.entry).is_none() {
        return Err(Error::InvalidArgument(format!(
            "unsupported entry file type: {}",
            args.entry.display()
        ))
        .into());
    }

    info!("Entry file: {}", args.entry.display());
    info!("Output file: {}", args.output.display());
    info!("Output format: {:?}", args.output_format());

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");

    let document = generate(&args)?;

    let format = args.output_format();
    info!("Serializing to {:?} format...", format);
    let content = serialize(&document, format)?;

    write_to_file(&content, &args.output)?;
    info!("Successfully wrote OpenAPI document to {}", args.output.display());

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Schemas: {}", document.components.schemas.len());

    Ok(())
}

/// Loads the program reachable from the entry file, crawls its routes and assembles the
/// document, applying the generator configuration and command line overrides.
///
/// # Errors
///
/// Fails if the entry cannot be loaded or a configuration file is malformed.
pub fn generate(args: &CliArgs) -> Result<OpenApiDocument> {
    let entry = args
        .entry
        .canonicalize()
        .map_err(|_| Error::EntryNotFound(args.entry.clone()))?;

    // Step 1: Configuration
    let project = load_project_config(&entry, args.project.as_deref())?;
    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load generator config {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    // Step 2: Load the program
    info!("Loading program from {}...", entry.display());
    let mut loader = ProgramLoader::new(project)?;
    let loaded = loader
        .load(&entry)
        .with_context(|| format!("Failed to load entry file {}", entry.display()))?;

    // Step 3: Crawl routes
    let resolver = TypeResolver::new(&loaded.program);
    let output = RouteCrawler::new(&loaded.program, &resolver)
        .with_directive_markers(config.directive_markers.clone())
        .crawl(loaded.entry);

    // Step 4: Build OpenAPI document
    info!("Building OpenAPI document...");
    let mut info = config.info.clone().unwrap_or_default();
    if let Some(title) = &args.title {
        info.title = title.clone();
    }
    if let Some(version) = &args.api_version {
        info.version = version.clone();
    }
    let servers = if args.servers.is_empty() {
        config.servers.clone()
    } else {
        args.servers
            .iter()
            .map(|url| Server {
                url: url.clone(),
                description: None,
            })
            .collect()
    };

    let document = OpenApiBuilder::new()
        .with_info(info)
        .with_servers(servers)
        .with_security_schemes(config.components.security_schemes)
        .with_security(config.security)
        .with_schemas(config.components.schemas)
        .build(output);
    info!("OpenAPI document built successfully");

    Ok(document)
}

/// Explicit project configuration, or the first one found above the entry file
fn load_project_config(entry: &Path, explicit: Option<&Path>) -> Result<Option<ProjectConfig>> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => entry.parent().and_then(find_project_config),
    };
    match path {
        Some(path) => {
            let config = ProjectConfig::load(&path)
                .with_context(|| format!("Failed to load project config {}", path.display()))?;
            Ok(Some(config))
        }
        None => {
            debug!("No project config found for {}", entry.display());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(entry: PathBuf, output: PathBuf) -> CliArgs {
        CliArgs {
            entry,
            output,
            project: None,
            config: None,
            format: None,
            title: None,
            api_version: None,
            servers: Vec::new(),
            verbose: false,
        }
    }

    #[test]
    fn test_parse_positionals_and_flags() {
        let parsed = CliArgs::try_parse_from([
            "openapi-route-crawler",
            "src/app.ts",
            "openapi.yaml",
            "--title",
            "Shop",
            "--server",
            "http://a",
            "--server",
            "http://b",
            "-v",
        ])
        .unwrap();
        assert_eq!(parsed.entry, PathBuf::from("src/app.ts"));
        assert_eq!(parsed.title.as_deref(), Some("Shop"));
        assert_eq!(parsed.servers, vec!["http://a", "http://b"]);
        assert!(parsed.verbose);
        assert_eq!(parsed.output_format(), OutputFormat::Yaml);

        let parsed =
            CliArgs::try_parse_from(["openapi-route-crawler", "app.ts", "out.yaml", "-f", "json"]).unwrap();
        assert_eq!(parsed.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_missing_entry_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = parse_args_from_parsed(args(
            temp_dir.path().join("missing.ts"),
            temp_dir.path().join("out.json"),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_unsupported_entry_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let entry = temp_dir.path().join("app.py");
        fs::write(&entry, "").unwrap();
        assert!(parse_args_from_parsed(args(entry, temp_dir.path().join("out.json"))).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let temp_dir = TempDir::new().unwrap();
        let entry = temp_dir.path().join("app.ts");
        fs::write(&entry, "app.get('/ping', (req, res) => { res.send('pong'); });").unwrap();
        let config = temp_dir.path().join("openapi.config.yaml");
        fs::write(
            &config,
            "info:\n  title: From Config\n  version: 0.1.0\nservers:\n  - url: http://config\n",
        )
        .unwrap();

        let mut cli = args(entry, temp_dir.path().join("out.json"));
        cli.config = Some(config);
        cli.api_version = Some("2.0.0".to_string());

        let document = generate(&cli).unwrap();
        assert_eq!(document.info.title, "From Config");
        assert_eq!(document.info.version, "2.0.0");
        assert_eq!(document.servers[0].url, "http://config");
        assert!(document.paths.contains_key("/ping"));
    }
}
