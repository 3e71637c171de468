//! Tests for the pure, non-database command helpers.
//!
//! `Config::from_env` reads process-wide environment variables, so these
//! tests share one lock to avoid racing each other's `env::set_var` calls
//! under cargo's default multi-threaded test runner.

use std::sync::Mutex;

use saleradar_cli::commands::sources_validate;
use saleradar_common::Config;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn config_with_stores_file(contents: &str) -> (std::sync::MutexGuard<'static, ()>, tempfile::TempDir, Config) {
    let guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stores.yaml");
    std::fs::write(&path, contents).unwrap();

    std::env::set_var("DATABASE_URL", "postgres://localhost/unused");
    std::env::set_var("STORES_FILE", &path);
    std::env::set_var("PREFERENCES_FILE", dir.path().join("preferences.yaml"));
    std::env::set_var("PAYLOAD_DIR", dir.path().join("payloads"));
    std::env::set_var("DIGEST_ARCHIVE_DIR", dir.path().join("archive"));
    let config = Config::from_env().expect("config loads from env with only required vars set");
    (guard, dir, config)
}

#[test]
fn sources_validate_accepts_a_well_formed_catalog() {
    let (_guard, _dir, config) = config_with_stores_file(
        r#"
stores:
  - slug: acme
    name: Acme
    active: true
    sources:
      - source_type: sitemap
        tier: 1
        url: "https://acme.example/sitemap.xml"
"#,
    );
    assert!(sources_validate(&config).is_ok());
}

#[test]
fn sources_validate_rejects_unknown_source_type() {
    let (_guard, _dir, config) = config_with_stores_file(
        r#"
stores:
  - slug: acme
    name: Acme
    active: true
    sources:
      - source_type: carrier_pigeon
        tier: 1
        url: "https://acme.example/feed"
"#,
    );
    assert!(sources_validate(&config).is_err(), "an unknown source_type must fail validation");
}

#[test]
fn sources_validate_rejects_duplicate_store_slugs() {
    let (_guard, _dir, config) = config_with_stores_file(
        r#"
stores:
  - slug: acme
    name: Acme One
    active: true
    sources:
      - source_type: rss
        tier: 1
        url: "https://acme.example/feed.xml"
  - slug: acme
    name: Acme Two
    active: true
    sources:
      - source_type: rss
        tier: 1
        url: "https://acme.example/other.xml"
"#,
    );
    assert!(sources_validate(&config).is_err(), "duplicate slugs must fail validation");
}
