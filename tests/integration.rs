use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const CONTENTFUL_VARS: &[&str] = &[
    "CONTENTFUL_SPACE_ID",
    "CONTENTFUL_ACCESS_TOKEN",
    "CONTENTFUL_ENVIRONMENT",
    "CONTENTFUL_HOME_PAGE_ID",
    "CONTENTFUL_BASE_URL",
    "STOREFRONT_LOG",
];

fn storefront_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_storefront"))
}

/// Config pointing at a closed local port, so any live fetch fails fast.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[contentful]
space_id = "space"
access_token = "token"
home_page_id = "H1"
base_url = "http://127.0.0.1:9"
timeout_secs = 5

[export]
assets_dir = "{root}/assets/contentful"
data_dir = "{root}/assets/data"
routes_path = "{root}/assets/routes.json"
"#,
        root = root.display()
    );

    let config_path = root.join("storefront.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn write_snapshot(root: &Path) {
    let data_dir = root.join("assets/data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("data.json"),
        r#"{
  "homepage": {
    "sys": { "id": "H1", "type": "Entry" },
    "fields": {
      "internalName": "Home",
      "heroBannerHeadline": "Spring collection",
      "heroBannerImage": {
        "sys": { "id": "A1", "type": "Asset" },
        "fields": { "file": { "url": "/assets/contentful/A1_hero.jpg" } }
      }
    }
  },
  "products": [
    { "sys": { "id": "P1", "type": "Entry" }, "fields": { "name": "Mug", "price": 12 } },
    { "sys": { "id": "P2", "type": "Entry" }, "fields": { "name": "Cup", "price": 9.5 } }
  ],
  "meta": { "exportDate": "2024-05-01T10:00:00.000Z", "assetCount": 1, "productCount": 2 }
}"#,
    )
    .unwrap();
}

fn run_storefront(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = storefront_binary();
    let mut command = Command::new(&binary);
    command
        .arg("--config")
        .arg(config_path)
        .args(args)
        .current_dir(config_path.parent().unwrap());
    for var in CONTENTFUL_VARS {
        command.env_remove(var);
    }
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("Failed to run storefront binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_home_serves_snapshot_without_network() {
    let (tmp, config_path) = setup_test_env();
    write_snapshot(tmp.path());

    let (stdout, stderr, success) = run_storefront(&config_path, &["home"]);
    assert!(success, "home failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stderr.contains("served from snapshot"));

    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["sys"]["id"], "H1");
    assert_eq!(page["fields"]["heroBannerHeadline"], "Spring collection");
    assert_eq!(page["fields"]["products"].as_array().unwrap().len(), 2);
    assert_eq!(
        page["fields"]["heroBannerImage"]["fields"]["file"]["url"],
        "/assets/contentful/A1_hero.jpg"
    );
}

#[test]
fn test_home_fails_when_snapshot_and_api_unavailable() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_storefront(&config_path, &["home"]);
    assert!(!success, "home should fail: stdout={}", stdout);
    assert!(stderr.contains("storefront error"));
    assert!(stdout.is_empty());
}

#[test]
fn test_export_root_failure_exits_nonzero_without_snapshot() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_storefront(&config_path, &["export", "--progress", "off"]);
    assert!(!success);
    assert!(stderr.contains("failed to fetch home page"), "stderr={}", stderr);
    assert!(!tmp.path().join("assets/data/data.json").exists());
}

#[test]
fn test_routes_requires_reachable_home_page() {
    let (tmp, config_path) = setup_test_env();

    let (_, _, success) = run_storefront(&config_path, &["routes"]);
    assert!(!success);
    assert!(!tmp.path().join("assets/routes.json").exists());
}

#[test]
fn test_missing_credentials_are_reported() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("absent.toml");

    let (_, stderr, success) = run_storefront(&config_path, &["home"]);
    assert!(!success);
    assert!(
        stderr.contains("CONTENTFUL_SPACE_ID"),
        "stderr={}",
        stderr
    );
}

#[test]
fn test_entries_rejects_excessive_include() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_storefront(&config_path, &["entries", "pageProduct", "--include", "11"]);
    assert!(!success);
    assert!(stderr.contains("--include"));
}

#[test]
fn test_dotenv_log_filter_applies() {
    let (tmp, config_path) = setup_test_env();
    write_snapshot(tmp.path());
    fs::write(tmp.path().join(".env"), "STOREFRONT_LOG=debug\n").unwrap();

    let (_, stderr, success) = run_storefront(&config_path, &["home"]);
    assert!(success, "stderr={}", stderr);
    assert!(stderr.contains("serving home page from snapshot"), "stderr={}", stderr);
}

#[test]
fn test_malformed_dotenv_is_reported() {
    let (tmp, config_path) = setup_test_env();
    write_snapshot(tmp.path());
    fs::write(tmp.path().join(".env"), "BROKEN LINE\n").unwrap();

    let (_, stderr, success) = run_storefront(&config_path, &["home"]);
    assert!(!success);
    assert!(stderr.contains(".env"), "stderr={}", stderr);
}
