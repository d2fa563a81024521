use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const CATALOG: &str = r#"{
    "platforms": [
        {"name": "javaee-7.0"},
        {"name": "javaee-8.0"}
    ],
    "features": [
        {"name": "servlet-3.1", "singleton": true, "platforms": ["javaee-7.0"]},
        {"name": "servlet-4.0", "singleton": true, "platforms": ["javaee-8.0"]},
        {"name": "servlet", "versionless": true},
        {
            "name": "jsp-2.3",
            "singleton": true,
            "platforms": ["javaee-7.0"],
            "dependencies": [{"feature": "servlet-3.1"}]
        },
        {"name": "jdbc-4.2"}
    ]
}"#;

const BROKEN_CATALOG: &str = r#"{
    "features": [
        {"name": "jsp-2.3", "dependencies": [{"feature": "servlet-3.1"}]},
        {"name": "json-1.0"},
        {"name": "json-2.0"}
    ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("catalog.json"), CATALOG).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_featres"));
        command
            .args(args)
            .env("FEATRES_CATALOG", self.path("catalog.json"))
            .env_remove("PREFERRED_PLATFORM_VERSIONS")
            .env_remove("PREFERRED_FEATURE_VERSIONS")
            .env_remove("RUST_LOG");
        for (key, value) in env {
            command.env(key, value);
        }
        command.output().unwrap()
    }
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_resolve_closure() {
    let fixture = Fixture::new();
    let output = fixture.run(&["resolve", "-f", "jsp-2.3", "--format-json"]);

    assert_eq!(output.status.code(), Some(0));
    let result = json(&output);
    assert_eq!(names(&result["resolved_features"]), vec!["jsp-2.3", "servlet-3.1"]);
    assert_eq!(names(&result["chains"]["servlet-3.1"]["path"]), vec!["jsp-2.3"]);
}

#[test]
fn test_resolve_versionless_with_platform() {
    let fixture = Fixture::new();
    let output = fixture.run(&["resolve", "-f", "servlet", "-p", "javaee-8.0", "--format-json"]);

    assert_eq!(output.status.code(), Some(0));
    let result = json(&output);
    assert_eq!(result["versionless"]["servlet"], "servlet-4.0");
    assert_eq!(names(&result["resolved_platforms"]), vec!["javaee-8.0"]);
    assert_eq!(result["info"][0]["code"], "resolved-platforms-info");
}

#[test]
fn test_resolve_reports_problems_with_exit_code() {
    let fixture = Fixture::new();

    let output = fixture.run(&["resolve", "-f", "servlet", "--format-json"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json(&output)["conflicts"][0]["code"], "no-configured-platform");

    let output = fixture.run(&["resolve", "-f", "nosuch-1.0", "--format-json"]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json(&output)["missing"][0]["code"], "missing-root-feature");

    let output = fixture.run(&["resolve", "-f", "jsp-2.3,servlet-4.0", "--format-json"]);
    assert_eq!(output.status.code(), Some(1));
    let conflict = &json(&output)["conflicts"][0];
    assert_eq!(conflict["code"], "singleton-conflict");
    assert_eq!(names(&conflict["features"]), vec!["servlet-3.1", "servlet-4.0"]);
}

#[test]
fn test_server_descriptor_and_environment() {
    let fixture = Fixture::new();
    let server = fixture.write("server.toml", "features = [\"servlet\", \"jdbc-4.2\"]\n");
    let server = server.to_str().unwrap();

    let output = fixture.run_with_env(
        &["resolve", "-s", server, "--format-json"],
        &[("PREFERRED_PLATFORM_VERSIONS", "javaee-7.0")],
    );
    assert_eq!(output.status.code(), Some(0));
    let result = json(&output);
    assert_eq!(result["versionless"]["servlet"], "servlet-3.1");
    assert!(names(&result["resolved_features"]).contains(&"jdbc-4.2".to_string()));

    // Command line preference wins over the environment
    let output = fixture.run_with_env(
        &["resolve", "-s", server, "--preferred-platforms", "javaee-8.0", "--format-json"],
        &[("PREFERRED_PLATFORM_VERSIONS", "javaee-7.0")],
    );
    assert_eq!(json(&output)["versionless"]["servlet"], "servlet-4.0");
}

#[test]
fn test_resolve_human_output() {
    let fixture = Fixture::new();
    let output = fixture.run(&["resolve", "-f", "jsp-2.3", "--timing"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("servlet-3.1"));
    assert!(stdout.contains("via jsp-2.3"));
    assert!(stdout.contains("total"));
}

#[test]
fn test_resolve_with_cache_dir() {
    let fixture = Fixture::new();
    let cache = fixture.path("cache");
    let cache_arg = cache.to_str().unwrap();

    let first = fixture.run(&["resolve", "-f", "jsp-2.3", "--cache-dir", cache_arg, "--format-json"]);
    let second = fixture.run(&["resolve", "-f", "jsp-2.3", "--cache-dir", cache_arg, "--format-json"]);

    assert_eq!(first.status.code(), Some(0));
    assert_eq!(json(&first), json(&second));
    assert_eq!(fs::read_dir(&cache).unwrap().count(), 1);
}

#[test]
fn test_why() {
    let fixture = Fixture::new();
    let output = fixture.run(&["why", "servlet-3.1", "-f", "jsp-2.3", "--format-json"]);

    assert_eq!(output.status.code(), Some(0));
    let explanation = json(&output);
    assert_eq!(explanation["feature"], "servlet-3.1");
    assert_eq!(names(&explanation["chain"]["path"]), vec!["jsp-2.3"]);
    assert_eq!(names(&explanation["required_by"]), vec!["jsp-2.3"]);

    // Versionless names map to the chosen version
    let output = fixture.run(&["why", "servlet", "-f", "servlet", "-p", "javaee-7.0", "--format-json"]);
    assert_eq!(json(&output)["feature"], "servlet-3.1");

    let output = fixture.run(&["why", "jdbc-4.2", "-f", "jsp-2.3"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_validate() {
    let fixture = Fixture::new();
    let output = fixture.run(&["validate", "--format-json"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json(&output)["valid"], true);

    let broken = fixture.write("broken.json", BROKEN_CATALOG);
    let output = fixture.run(&["validate", "-c", broken.to_str().unwrap(), "--format-json"]);
    assert_eq!(output.status.code(), Some(1));
    let report = json(&output);
    assert_eq!(report["valid"], false);
    assert_eq!(report["errors"][0]["feature"], "jsp-2.3");
    assert_eq!(report["warnings"][0]["level"], "warning");
}

#[test]
fn test_platforms() {
    let fixture = Fixture::new();
    let output = fixture.run(&["platforms", "--format-json"]);

    assert_eq!(output.status.code(), Some(0));
    let listings = json(&output);
    assert_eq!(listings[0]["name"], "javaee-7.0");
    assert_eq!(names(&listings[0]["features"]), vec!["jsp-2.3", "servlet-3.1"]);
    assert_eq!(names(&listings[1]["features"]), vec!["servlet-4.0"]);
}

#[test]
fn test_extension_layer() {
    let fixture = Fixture::new();
    let extension = fixture.write(
        "extension.json",
        r#"{"features": [{"name": "batch-1.0", "dependencies": [{"feature": "jdbc-4.2"}]}]}"#,
    );

    let output = fixture.run(&[
        "resolve",
        "--extension",
        extension.to_str().unwrap(),
        "-f",
        "batch-1.0",
        "--format-json",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(names(&json(&output)["resolved_features"]), vec!["batch-1.0", "jdbc-4.2"]);
}

#[test]
fn test_fatal_errors() {
    let fixture = Fixture::new();
    let output = fixture.run(&["resolve", "-c", "/nonexistent/catalog.json", "-f", "jsp-2.3"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load catalog"));

    let output = fixture.run(&["resolve", "-f", "bad name"]);
    assert_eq!(output.status.code(), Some(2));
}
