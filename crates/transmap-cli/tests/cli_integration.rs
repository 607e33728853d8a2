//! End-to-end tests running the transmap binary

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use transmap_core::{build_openapi_mapping, key_chain, MappingPair, MappingType};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "created_by = \"cli-test\"\n\n[stores]\ngraph = {:?}\nmappings = {:?}\n",
            dir.path().join("graph.json"),
            dir.path().join("mappings.json"),
        );
        std::fs::write(dir.path().join("transmap.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_transmap"))
            .arg("--config")
            .arg(self.path("transmap.toml"))
            .args(["--output", "json", "--no-color"])
            .args(args)
            .env_remove("RUST_LOG")
            .env_remove("TRANSMAP_LOG_FILE")
            .output()
            .unwrap()
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "transmap {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn as_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn pair(provided: &str, required: &str, code: &str) -> MappingPair {
    let chain = |dotted: &str| key_chain(dotted.split('.'));
    MappingPair::with_code(
        vec![chain(provided)],
        chain(required),
        code,
        transmap_core::CreationType::Manual,
    )
}

#[test]
fn test_tree_lists_schema_leaves() {
    let ws = Workspace::new();
    let schema = ws.write_json(
        "pet.json",
        &json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        }),
    );

    let leaves = ws.run_json(&["tree", as_str(&schema), "--interface", "pet_get_200"]);
    assert_eq!(leaves, json!(["pet_get_200.id", "pet_get_200.tags"]));
}

#[test]
fn test_expr_invert_and_classify() {
    let ws = Workspace::new();
    let inverse = ws.run_json(&["expr", "invert", "erp.cents", "shop.price * 100"]);
    assert_eq!(inverse, json!({"inverse": "(erp.cents / 100)"}));

    let classification = ws.run_json(&["expr", "classify", "$uppercase(shop.name)"]);
    assert_eq!(classification["invertible"], json!(false));
}

#[test]
fn test_graph_learns_and_composes() {
    let ws = Workspace::new();
    let added = ws.run_json(&["graph", "add", "a.grams", "b.kg", "a.grams / 1000"]);
    assert_eq!(added["recorded"], json!(true));
    ws.run_json(&["graph", "add", "b.kg", "c.tons", "b.kg / 1000"]);

    let path = ws.run_json(&["graph", "path", "c.tons", "a.grams"]);
    assert_eq!(path["edges"].as_array().unwrap().len(), 2);
    assert_eq!(
        path["transformation"],
        json!("((c.tons * 1000) * 1000)")
    );

    let skipped = ws.run_json(&["graph", "add", "a.name", "b.label", "$uppercase(a.name)"]);
    assert_eq!(skipped["recorded"], json!(false));
}

#[test]
fn test_import_chain_and_execute() {
    let ws = Workspace::new();
    let first = build_openapi_mapping(
        "shop_order_200",
        &["pet_get_200".to_string()],
        &[pair(
            "shop_order_200.parameters.item",
            "pet_get_200.parameters.petId",
            "shop_order_200.parameters.item - 1000",
        )],
        &[],
        MappingType::Transformation,
        None,
    )
    .unwrap();
    let second = build_openapi_mapping(
        "pet_get_200",
        &["inv_fetch_200".to_string()],
        &[pair(
            "pet_get_200.parameters.petId",
            "inv_fetch_200.parameters.animalId",
            "pet_get_200.parameters.petId",
        )],
        &[],
        MappingType::Transformation,
        None,
    )
    .unwrap();
    let first_file = ws.write_json("first.json", &serde_json::to_value(&first).unwrap());
    let second_file = ws.write_json("second.json", &serde_json::to_value(&second).unwrap());

    let imported = ws.run_json(&["mappings", "import", as_str(&first_file), "--learn"]);
    assert_eq!(imported["learned"], json!(1));
    ws.run_json(&["mappings", "import", as_str(&second_file)]);

    let listed = ws.run_json(&["mappings", "list", "--type", "transformation"]);
    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert_eq!(listed[0]["createdBy"], json!("cli-test"));

    let chained = ws.run_json(&["chain", "shop_order_200", "inv_fetch_200"]);
    assert_eq!(chained["chain"].as_array().unwrap().len(), 2);
    assert_eq!(chained["mapping"]["type"], json!("AUTO"));

    let composed = ws.write_json("composed.json", &chained["mapping"]);
    let payload = ws.write_json(
        "payload.json",
        &json!({"shop_order_200": {"parameters": {"item": 1042}}}),
    );
    let request = ws.run_json(&["execute", as_str(&composed), as_str(&payload)]);
    assert_eq!(
        request,
        json!({"inv_fetch_200": {"parameters": {"animalId": 42}}})
    );
}

#[test]
fn test_missing_chain_exits_with_not_found_code() {
    let ws = Workspace::new();
    let output = ws.run(&["chain", "nowhere_op_200", "elsewhere_op_200"]);
    assert_eq!(output.status.code(), Some(8));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No mapping found"));
}

#[test]
fn test_validate_reports_incomplete_mapping() {
    let ws = Workspace::new();
    let mapping = build_openapi_mapping(
        "pet_get_200",
        &["inv_fetch_200".to_string()],
        &[],
        &[pair("inv_fetch_200.body.id", "pet_get_200.body.id", "inv_fetch_200.body.id")],
        MappingType::Manual,
        None,
    )
    .unwrap();
    let mapping_file = ws.write_json("mapping.json", &serde_json::to_value(&mapping).unwrap());
    let schemas = ws.write_json(
        "schemas.json",
        &json!({
            "request": {"inv_fetch_200": {"parameters": {"animalId": "integer"}}},
            "response": {"pet_get_200": {"body": {"id": "integer", "name": "string"}}}
        }),
    );

    let output = ws.run(&["validate", as_str(&mapping_file), "--schemas", as_str(&schemas)]);
    assert_eq!(output.status.code(), Some(7));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], json!(false));
    assert_eq!(
        report["missing"],
        json!(["inv_fetch_200.parameters.animalId", "pet_get_200.body.name"])
    );
}
