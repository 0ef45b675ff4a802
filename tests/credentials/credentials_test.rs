//! Coverage for credential loading and permission checks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use heartchat::config::{RuntimePaths, ServiceConfig};
use heartchat::credentials::{load_credentials, load_runtime_credentials, Credentials, KeySource};

fn write_env(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join(".env");
    fs::write(&path, contents).expect("should write .env");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
            .expect("should restrict permissions");
    }
    path
}

#[test]
fn loads_env_credentials() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = write_env(tmp.path(), "HEARTCHAT_API_KEY=abc123\n# comment\nOTHER=\"quoted\"\n");

    let credentials = match load_credentials(&path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };
    assert_eq!(credentials.get("HEARTCHAT_API_KEY"), Some("abc123"));
    assert_eq!(credentials.get("OTHER"), Some("quoted"));
}

#[test]
fn missing_file_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    assert!(load_credentials(&tmp.path().join(".env")).is_err());
}

#[cfg(unix)]
#[test]
fn world_readable_file_is_rejected() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = write_env(tmp.path(), "HEARTCHAT_API_KEY=abc123\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644))
        .expect("should loosen permissions");

    let err = match load_credentials(&path) {
        Ok(_) => panic!("0644 credentials should be rejected"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("must be 0600"));
}

#[test]
fn require_rejects_blank_values() {
    let mut vars = BTreeMap::new();
    vars.insert("HEARTCHAT_BLANK_TEST_KEY".to_owned(), "   ".to_owned());
    let credentials = Credentials::from_map(vars);
    assert!(credentials.require("HEARTCHAT_BLANK_TEST_KEY").is_err());
    assert!(credentials.require("HEARTCHAT_ABSENT_TEST_KEY").is_err());
}

#[test]
fn debug_output_hides_values() {
    let mut vars = BTreeMap::new();
    vars.insert("HEARTCHAT_API_KEY".to_owned(), "super-secret".to_owned());
    let debug = format!("{:?}", Credentials::from_map(vars));
    assert!(debug.contains("HEARTCHAT_API_KEY"));
    assert!(!debug.contains("super-secret"));
}

#[test]
fn runtime_credentials_without_env_file_are_empty() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let paths = RuntimePaths::under(tmp.path().to_path_buf());
    let credentials = match load_runtime_credentials(&paths) {
        Ok(credentials) => credentials,
        Err(err) => panic!("absent .env should not fail: {err}"),
    };
    assert_eq!(credentials.get("HEARTCHAT_API_KEY"), None);
}

#[test]
fn runtime_credentials_read_env_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let paths = RuntimePaths::under(tmp.path().to_path_buf());
    write_env(tmp.path(), "HEARTCHAT_API_KEY=from-file\n");
    let credentials = match load_runtime_credentials(&paths) {
        Ok(credentials) => credentials,
        Err(err) => panic!("runtime credentials should load: {err}"),
    };
    assert_eq!(credentials.get("HEARTCHAT_API_KEY"), Some("from-file"));
}

#[test]
fn api_key_follows_configured_variable_name() {
    let service = ServiceConfig {
        api_key_env: "HEARTCHAT_CUSTOM_TEST_KEY".to_owned(),
        ..ServiceConfig::default()
    };
    let mut vars = BTreeMap::new();
    vars.insert("HEARTCHAT_API_KEY".to_owned(), "wrong".to_owned());
    vars.insert("HEARTCHAT_CUSTOM_TEST_KEY".to_owned(), "right".to_owned());
    let credentials = Credentials::from_map(vars);

    assert_eq!(credentials.api_key_for(&service).ok(), Some("right".to_owned()));
    assert_eq!(
        credentials.lookup("HEARTCHAT_CUSTOM_TEST_KEY"),
        Some(("right".to_owned(), KeySource::EnvFile))
    );
}

#[test]
fn api_key_error_names_the_variable() {
    let service = ServiceConfig {
        api_key_env: "HEARTCHAT_UNSET_TEST_KEY".to_owned(),
        ..ServiceConfig::default()
    };
    let err = match Credentials::default().api_key_for(&service) {
        Ok(_) => panic!("unset key should fail"),
        Err(err) => err,
    };
    assert!(err.to_string().contains("HEARTCHAT_UNSET_TEST_KEY"));
}
