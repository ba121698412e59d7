use crate::crawler::CrawlOutput;
use crate::schema_generator::Schema;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Security requirement: scheme name -> required scopes
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// All operations for a single path, keyed by method in registration order
pub type PathItem = IndexMap<HttpMethod, Operation>;

/// Route graph produced by one crawl: normalized path -> method -> operation
pub type RouteGraph = IndexMap<String, PathItem>;

/// HTTP methods a route can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parses a router method name, case-insensitively
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    servers: Vec<Server>,
    /// User-supplied security schemes
    security_schemes: IndexMap<String, Value>,
    /// Root security requirements
    security: Vec<SecurityRequirement>,
    /// User-supplied schemas; these win over crawler-derived ones
    schemas: IndexMap<String, Schema>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "Auto Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Operation object - the accumulated contract of one path and method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Tags, without duplicates, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Parameters (path, query, header, cookie)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    /// Any other field set by a directive comment
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header, cookie)
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter is required
    #[serde(default)]
    pub required: bool,
    /// Parameter schema
    #[serde(default)]
    pub schema: Schema,
    /// Parameter description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Content types and their schemas
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    #[serde(default)]
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    #[serde(default)]
    pub description: String,
    /// Response content
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
    #[serde(rename = "securitySchemes", default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, Value>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    /// API paths
    pub paths: RouteGraph,
    /// Components (schemas, security schemes)
    #[serde(default)]
    pub components: Components,
    /// Root security requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

/// JSON media type used for every inferred body
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Default description for a status code
pub fn status_description(code: &str) -> String {
    match code {
        "200" => "OK".to_string(),
        "201" => "Created".to_string(),
        "204" => "No Content".to_string(),
        "400" => "Bad Request".to_string(),
        "401" => "Unauthorized".to_string(),
        "403" => "Forbidden".to_string(),
        "404" => "Not Found".to_string(),
        "500" => "Internal Server Error".to_string(),
        other => format!("Status {}", other),
    }
}

impl Response {
    pub fn new(description: String) -> Self {
        Self {
            description,
            content: IndexMap::new(),
            extensions: IndexMap::new(),
        }
    }
}

impl RequestBody {
    /// JSON request body
    pub fn json(schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert(JSON_MEDIA_TYPE.to_string(), MediaType { schema });
        Self {
            description: None,
            required: false,
            content,
        }
    }
}

impl Parameter {
    pub fn new(name: String, location: ParameterLocation, required: bool, schema: Schema) -> Self {
        Self {
            name,
            location,
            required,
            schema,
            description: None,
        }
    }

    fn same_as(&self, name: &str, location: ParameterLocation) -> bool {
        if self.location != location {
            return false;
        }
        // HTTP header names are case-insensitive
        if location == ParameterLocation::Header {
            self.name.eq_ignore_ascii_case(name)
        } else {
            self.name == name
        }
    }
}

impl Operation {
    /// A fresh operation with the default `200: OK` response
    pub fn new() -> Self {
        let mut responses = IndexMap::new();
        responses.insert("200".to_string(), Response::new(status_description("200")));
        Self {
            summary: None,
            description: None,
            operation_id: None,
            tags: Vec::new(),
            deprecated: false,
            parameters: Vec::new(),
            request_body: None,
            responses,
            security: None,
            extensions: IndexMap::new(),
        }
    }

    pub fn has_parameter(&self, name: &str, location: ParameterLocation) -> bool {
        self.parameters.iter().any(|p| p.same_as(name, location))
    }

    /// Adds a parameter unless one with the same name and location exists
    ///
    /// # Returns
    ///
    /// `true` if the parameter was added
    pub fn add_parameter(&mut self, parameter: Parameter) -> bool {
        if self.has_parameter(&parameter.name, parameter.location) {
            return false;
        }
        self.parameters.push(parameter);
        true
    }

    /// Ensures a response entry exists for `code`, with the default description
    pub fn ensure_response(&mut self, code: &str) -> &mut Response {
        self.responses
            .entry(code.to_string())
            .or_insert_with(|| Response::new(status_description(code)))
    }

    /// Adds tags that are not present yet, keeping insertion order
    pub fn add_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert path format from `:param` to OpenAPI `{param}` format
pub fn convert_path_format(path: &str) -> String {
    let mut converted = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ':' {
            converted.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            converted.push(':');
        } else {
            converted.push('{');
            converted.push_str(&name);
            converted.push('}');
            // optional segment marker, `:id?`
            if chars.peek() == Some(&'?') {
                chars.next();
            }
        }
    }
    converted
}

/// Names of the `{param}` placeholders in an OpenAPI path, in order
pub fn path_parameters(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start + 1..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + 1 + len];
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &rest[start + 1 + len + 1..];
    }
    names
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info::default(),
            servers: Vec::new(),
            security_schemes: IndexMap::new(),
            security: Vec::new(),
            schemas: IndexMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    pub fn with_servers(mut self, servers: Vec<Server>) -> Self {
        self.servers = servers;
        self
    }

    pub fn with_security_schemes(mut self, schemes: IndexMap<String, Value>) -> Self {
        self.security_schemes = schemes;
        self
    }

    pub fn with_security(mut self, security: Vec<SecurityRequirement>) -> Self {
        self.security = security;
        self
    }

    /// User-defined schemas, merged over the crawler-derived ones
    pub fn with_schemas(mut self, schemas: IndexMap<String, Schema>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Build the final OpenAPI document
    pub fn build(self, output: CrawlOutput) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let mut schemas = output.schemas;
        for (name, schema) in self.schemas {
            if schemas.contains_key(&name) {
                debug!("User schema `{}` overrides the inferred one", name);
            }
            schemas.insert(name, schema);
        }

        info!("Found {} paths", output.routes.len());
        info!("Generated {} schemas", schemas.len());

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            servers: self.servers,
            paths: output.routes,
            components: Components {
                schemas,
                security_schemes: self.security_schemes,
            },
            security: self.security,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
