use openapi_route_crawler::{
    cli::{generate, CliArgs},
    crawler::RouteCrawler,
    loader::ProgramLoader,
    openapi_builder::OpenApiBuilder,
    serializer::serialize_json,
    type_resolver::TypeResolver,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// Helper function to create a temporary test project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn generate_from(entry: &Path) -> Value {
    let mut loader = ProgramLoader::new(None).expect("Failed to create loader");
    let loaded = loader.load(entry).expect("Failed to load program");
    let resolver = TypeResolver::new(&loaded.program);
    let output = RouteCrawler::new(&loaded.program, &resolver).crawl(loaded.entry);
    let document = OpenApiBuilder::new().build(output);
    serde_json::from_str(&serialize_json(&document).unwrap()).unwrap()
}

fn path_keys(doc: &Value) -> Vec<String> {
    doc["paths"].as_object().unwrap().keys().cloned().collect()
}

#[test]
fn test_circular_mounts_stop_per_branch() {
    let temp_dir = create_test_project(vec![
        (
            "src/index.ts",
            r#"
import express from 'express';
import a from './a';

const app = express();
app.use('/a', a);
app.listen(3000);
"#,
        ),
        (
            "src/a.ts",
            r#"
import { Router } from 'express';
import b from './b';

const router = Router();
router.get('/hello', (req, res) => {
  res.send('hello from a');
});
router.use('/b', b);

export default router;
"#,
        ),
        (
            "src/b.ts",
            r#"
import { Router } from 'express';
import a from './a';

const router = Router();
router.get('/hello', (req, res) => {
  res.send('hello from b');
});
router.use('/a-again', a);

export default router;
"#,
        ),
    ]);

    let doc = generate_from(&temp_dir.path().join("src/index.ts"));
    assert_eq!(path_keys(&doc), vec!["/a/hello", "/a/b/hello"]);
}

#[test]
fn test_cycle_through_three_units() {
    let temp_dir = create_test_project(vec![
        (
            "index.ts",
            "import a from './a';\napp.use('/a', a);\n",
        ),
        (
            "a.ts",
            "import b from './b';\nconst r = Router();\nr.use('/b', b);\nr.get('/x', (req, res) => res.send());\nexport default r;\n",
        ),
        (
            "b.ts",
            "import a from './a';\nconst r = Router();\nr.use('/a', a);\nr.get('/y', (req, res) => res.send());\nexport default r;\n",
        ),
    ]);

    let doc = generate_from(&temp_dir.path().join("index.ts"));
    assert_eq!(path_keys(&doc), vec!["/a/b/y", "/a/x"]);
}

#[test]
fn test_unit_is_crawled_again_on_independent_branch() {
    let temp_dir = create_test_project(vec![
        (
            "index.ts",
            "import a from './a';\nimport b from './b';\nconst app = express();\napp.use('/a', a);\napp.use('/b', b);\n",
        ),
        (
            "a.ts",
            "import b from './b';\nconst r = Router();\nr.get('/ha', (req, res) => res.send());\nr.use('/b', b);\nexport default r;\n",
        ),
        (
            "b.ts",
            "import a from './a';\nconst r = Router();\nr.get('/hb', (req, res) => res.send());\nr.use('/a', a);\nexport default r;\n",
        ),
    ]);

    let doc = generate_from(&temp_dir.path().join("index.ts"));
    assert_eq!(path_keys(&doc), vec!["/a/ha", "/a/b/hb", "/b/hb", "/b/a/ha"]);
}

#[test]
fn test_nested_mounts_build_path_parameters() {
    let temp_dir = create_test_project(vec![
        (
            "app.ts",
            "import api from './routes/api';\nconst app = express();\napp.use('/api', api);\n",
        ),
        (
            "routes/api.ts",
            "import v1 from './v1';\nconst router = Router();\nrouter.use('/v1/', v1);\nexport default router;\n",
        ),
        (
            "routes/v1.ts",
            r#"
const router = Router();

function getItem(req, res) {
  res.json({ id: req.params.id });
}

router.get('/:id', getItem);
export default router;
"#,
        ),
    ]);

    let doc = generate_from(&temp_dir.path().join("app.ts"));
    assert_eq!(path_keys(&doc), vec!["/api/v1/{id}"]);
    assert_eq!(
        doc["paths"]["/api/v1/{id}"]["get"]["parameters"],
        json!([{"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}])
    );
}

#[test]
fn test_handler_imported_from_controller() {
    let temp_dir = create_test_project(vec![
        (
            "app.ts",
            r#"
import { getUser, controller } from './controllers/users';

app.get('/users/:id', getUser);
app.put('/users/:id', controller.update);
"#,
        ),
        (
            "controllers/users.ts",
            r#"
import { User } from '../models';

/**
 * @summary Fetch one user
 * @operationId getUser
 */
export async function getUser(req, res) {
  const user: User = await findUser(req.params.id);
  if (!user) {
    return res.sendStatus(404);
  }
  res.json(user);
}

export const controller = {
  update: (req, res) => {
    const patch = req.body as User;
    res.sendStatus(204);
  },
};
"#,
        ),
        (
            "models/index.ts",
            "export * from './user';\n",
        ),
        (
            "models/user.ts",
            "export interface User {\n  /** Unique id */\n  id: string;\n  name: string;\n}\n",
        ),
    ]);

    let doc = generate_from(&temp_dir.path().join("app.ts"));
    let get = &doc["paths"]["/users/{id}"]["get"];
    assert_eq!(get["summary"], "Fetch one user");
    assert_eq!(get["operationId"], "getUser");
    assert_eq!(get["responses"]["404"]["description"], "Not Found");

    let put = &doc["paths"]["/users/{id}"]["put"];
    assert_eq!(put["responses"]["204"]["description"], "No Content");
    assert_eq!(
        put["requestBody"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/User"})
    );

    assert_eq!(
        doc["components"]["schemas"]["User"]["properties"]["id"],
        json!({"type": "string", "description": "Unique id"})
    );
}

#[test]
fn test_declaration_files_are_not_crawled() {
    let temp_dir = create_test_project(vec![
        (
            "app.ts",
            "import { external } from './types';\nimport legacy from './types';\napp.get('/external', external);\napp.use('/legacy', legacy);\napp.get('/own', (req, res) => res.send());\n",
        ),
        (
            "types.d.ts",
            "export declare function external(req: any, res: any): void;\ndeclare const legacy: any;\nexport default legacy;\n",
        ),
    ]);

    let doc = generate_from(&temp_dir.path().join("app.ts"));
    assert_eq!(path_keys(&doc), vec!["/own"]);
}

#[test]
fn test_tsconfig_paths_through_cli() {
    let temp_dir = create_test_project(vec![
        (
            "tsconfig.json",
            r#"{
  // comments and trailing commas are allowed
  "compilerOptions": {
    "baseUrl": ".",
    "paths": {
      "@models/*": ["src/models/*"],
    },
  },
}"#,
        ),
        (
            "src/app.ts",
            r#"
import { Product } from '@models/product';

app.get('/products', (req, res) => {
  const products: Product[] = [];
  res.json(products);
});
"#,
        ),
        (
            "src/models/product.ts",
            "export interface Product {\n  sku: string;\n  price: number;\n}\n",
        ),
        (
            "openapi.config.json",
            r#"{
  "info": { "title": "Shop", "version": "3.1.0" },
  "servers": [{ "url": "https://shop.example.com" }],
  "components": {
    "schemas": {
      "Error": { "type": "object", "properties": { "message": { "type": "string" } } }
    }
  }
}"#,
        ),
    ]);

    let args = CliArgs {
        entry: temp_dir.path().join("src/app.ts"),
        output: temp_dir.path().join("out/openapi.json"),
        project: None,
        config: Some(temp_dir.path().join("openapi.config.json")),
        format: None,
        title: None,
        api_version: None,
        servers: Vec::new(),
        verbose: false,
    };
    let document = generate(&args).unwrap();
    let doc: Value = serde_json::from_str(&serialize_json(&document).unwrap()).unwrap();

    assert_eq!(doc["info"], json!({"title": "Shop", "version": "3.1.0"}));
    assert_eq!(doc["servers"], json!([{"url": "https://shop.example.com"}]));
    assert_eq!(
        doc["paths"]["/products"]["get"]["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/Product"}})
    );
    assert_eq!(
        doc["components"]["schemas"]["Product"]["required"],
        json!(["sku", "price"])
    );
    assert!(doc["components"]["schemas"]["Error"].is_object());
}

#[test]
fn test_run_writes_yaml_output() {
    let temp_dir = create_test_project(vec![(
        "app.js",
        "const express = require('express');\nconst app = express();\napp.get('/ping', function (req, res) { res.status(200).send('pong'); });\n",
    )]);

    let output = temp_dir.path().join("openapi.yaml");
    let args = CliArgs {
        entry: temp_dir.path().join("app.js"),
        output: output.clone(),
        project: None,
        config: None,
        format: None,
        title: Some("Ping".to_string()),
        api_version: None,
        servers: vec!["http://localhost:3000".to_string()],
        verbose: false,
    };
    openapi_route_crawler::cli::run(args).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    let doc: Value = serde_yaml::from_str(&content).unwrap();
    assert_eq!(doc["openapi"], "3.0.0");
    assert_eq!(doc["info"]["title"], "Ping");
    assert_eq!(doc["servers"][0]["url"], "http://localhost:3000");
    assert!(doc["paths"]["/ping"]["get"].is_object());
}
