//! End-to-end tests for `xref bundle`.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xref_bundler::get_hash;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("schemas")).unwrap();
    fs::write(
        dir.path().join("openapi.json"),
        r#"{
            "openapi": "3.1.0",
            "components": { "schemas": { "User": { "$ref": "./schemas/user.json#/User" } } }
        }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("schemas/user.json"),
        r#"{ "User": { "type": "object" }, "Unused": { "type": "string" } }"#,
    )
    .unwrap();
    dir
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

fn bucket(identifier: &str) -> String {
    get_hash(identifier)
}

#[test]
fn test_bundles_file_to_stdout() {
    let dir = project();

    let output = cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let document = stdout_json(&output.stdout);
    let key = bucket("schemas/user.json");
    assert_eq!(
        document["components"]["schemas"]["User"],
        json!({ "$ref": format!("#/x-ext/{key}/User") })
    );
    assert_eq!(
        document["x-ext"][&key],
        json!({ "User": { "type": "object" }, "Unused": { "type": "string" } })
    );
}

#[test]
fn test_tree_shake_flag() {
    let dir = project();

    let output = cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json", "--tree-shake"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let document = stdout_json(&output.stdout);
    assert_eq!(
        document["x-ext"][bucket("schemas/user.json")],
        json!({ "User": { "type": "object" } })
    );
}

#[test]
fn test_writes_yaml_output_file() {
    let dir = project();

    cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json", "-o", "dist/bundle.yaml", "--url-map"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Bundled openapi.json"));

    let written = fs::File::open(dir.path().join("dist/bundle.yaml")).unwrap();
    let document: Value = serde_yaml::from_reader(written).unwrap();
    let key = bucket("schemas/user.json");
    assert_eq!(document["x-ext-urls"][&key], json!("schemas/user.json"));
}

#[test]
fn test_config_file_is_picked_up() {
    let dir = project();
    fs::write(
        dir.path().join("xref.config.json"),
        r#"{ "tree_shake": true, "format": "yaml" }"#,
    )
    .unwrap();

    let output = cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let document: Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert!(document["x-ext"][bucket("schemas/user.json")].get("Unused").is_none());
}

#[test]
fn test_env_overrides_config_file() {
    let dir = project();
    fs::write(dir.path().join("xref.config.json"), r#"{ "format": "yaml" }"#).unwrap();

    let output = cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .env("XREF_FORMAT", "json")
        .args(["bundle", "openapi.json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(serde_json::from_slice::<Value>(&output.stdout).is_ok());
}

#[test]
fn test_invalid_config_fails() {
    let dir = project();
    fs::write(dir.path().join("xref.config.json"), r#"{ "concurrency": 0 }"#).unwrap();

    cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_unresolved_ref_is_kept_by_default() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("openapi.json"),
        r#"{ "a": { "$ref": "./missing.json#/A" } }"#,
    )
    .unwrap();

    let output = cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output.stdout),
        json!({ "a": { "$ref": "./missing.json#/A" } })
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to resolve external reference"));
}

#[test]
fn test_strict_fails_on_unresolved_refs() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("openapi.json"),
        r#"{ "a": { "$ref": "./missing.json#/A" } }"#,
    )
    .unwrap();

    cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "openapi.json", "--strict", "--no-color"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("could not be resolved"))
        .stderr(predicate::str::contains("./missing.json#/A"));
}

#[test]
fn test_quiet_hides_warnings() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("openapi.json"), r#"{ "a": { "$ref": "./missing.json" } }"#).unwrap();

    cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["-q", "bundle", "openapi.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to resolve").not());
}

#[test]
fn test_missing_input_file_fails() {
    let dir = TempDir::new().unwrap();

    cargo_bin_cmd!("xref")
        .current_dir(dir.path())
        .args(["bundle", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.json"));
}

#[test]
fn test_unloadable_input_fails() {
    cargo_bin_cmd!("xref")
        .args(["bundle", "#/components"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no loader can process it"));
}

#[test]
fn test_raw_json_input_with_origin() {
    let dir = project();
    let origin = dir.path().join("openapi.json");

    let output = cargo_bin_cmd!("xref")
        .args([
            "bundle",
            r#"{ "user": { "$ref": "./schemas/user.json#/User" } }"#,
            "--origin",
            origin.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let document = stdout_json(&output.stdout);
    let identifier = dir.path().join("schemas/user.json");
    let key = bucket(&identifier.to_string_lossy().replace('\\', "/"));
    assert_eq!(document["x-ext"][&key]["User"], json!({ "type": "object" }));
}

#[test]
fn test_help_lists_bundle_command() {
    cargo_bin_cmd!("xref")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bundle"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bundles_remote_input_with_configured_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pet": { "$ref": "./pet.json" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pet.json"))
        .and(header("x-api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "object" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let host = server.address().to_string();
    write_headers_config(dir.path(), &host);

    let input = format!("{}/openapi.json", server.uri());
    let cwd = dir.path().to_path_buf();
    let cmd_input = input.clone();
    let output = tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("xref")
            .current_dir(cwd)
            .args(["bundle", &cmd_input, "--concurrency", "1"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let document = stdout_json(&output.stdout);
    let pet = format!("{}/pet.json", server.uri());
    assert_eq!(document["pet"], json!({ "$ref": format!("#/x-ext/{}", bucket(&pet)) }));
    assert_eq!(document["x-ext"][bucket(&pet)], json!({ "type": "object" }));
}

fn write_headers_config(dir: &Path, host: &str) {
    let config = json!({
        "headers": [{ "domains": [host], "headers": { "x-api-key": "secret" } }]
    });
    fs::write(dir.join("xref.config.json"), config.to_string()).unwrap();
}
