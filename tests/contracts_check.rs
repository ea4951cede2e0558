mod common;

use common::{binary_stl, ServerGuard, TestEnv};
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

fn url(env: &TestEnv) -> String {
    format!("http://127.0.0.1:{}/scanned", env.port)
}

#[test]
fn listing_endpoint_matches_contract() {
    let env = TestEnv::new();
    fs::write(env.sync.join("cube.stl"), binary_stl(3)).unwrap();
    let _server = ServerGuard::start(&env);

    let resp = reqwest::blocking::get(url(&env)).unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().unwrap();
    validate("listing.schema.json", &body);
    assert_eq!(body["scanned_files"], json!(["cube.stl"]));
    assert_eq!(body["files"][0]["size"], 234);
}

#[test]
fn remove_endpoint_matches_contract() {
    let env = TestEnv::new();
    fs::write(env.sync.join("cube.stl"), binary_stl(1)).unwrap();
    let _server = ServerGuard::start(&env);
    let http = reqwest::blocking::Client::new();

    let request = json!({"remove": ["cube.stl"]});
    validate("remove-request.schema.json", &request);
    let ok = http.post(url(&env)).json(&request).send().unwrap();
    assert_eq!(ok.status().as_u16(), 200);
    let body: Value = ok.json().unwrap();
    validate("remove-response.schema.json", &body);
    assert_eq!(body["status"], "success");

    let bad = http
        .post(url(&env))
        .json(&json!({"remove": ["../cube.stl"]}))
        .send()
        .unwrap();
    assert_eq!(bad.status().as_u16(), 400);
    let body: Value = bad.json().unwrap();
    validate("remove-response.schema.json", &body);
    assert_eq!(body["errors"][0], "../cube.stl: invalid file name");
}

#[test]
fn cli_failures_match_error_envelope() {
    let env = TestEnv::new();
    let out = env
        .cmd()
        .args(["--json", "listing", "ack", ".."])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let body: Value = serde_json::from_slice(&out).expect("valid json output");
    validate("error-envelope.schema.json", &body);
}

#[test]
fn intake_check_output_is_tagged() {
    let env = TestEnv::new();
    let path = env.root.join("cube.stl");
    fs::write(&path, binary_stl(2)).unwrap();
    let out = env.run_json(&["intake", "check", path.to_str().unwrap()]);
    assert_eq!(
        out["data"][0],
        json!({
            "file": path.display().to_string(),
            "result": "valid",
            "format": "binary_stl",
            "count": 2
        })
    );
}
