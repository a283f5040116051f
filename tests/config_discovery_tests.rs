//! Config lookup from the process working directory.
//!
//! These tests change the current directory, so they run serially.

use assetflow::config::loader::{find_config, CONFIG_FILE};
use assetflow::config::load_config;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Restores the working directory when dropped.
struct CwdGuard(PathBuf);

impl CwdGuard {
    fn enter(dir: &std::path::Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        CwdGuard(previous)
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.0);
    }
}

#[test]
#[serial]
fn test_find_config_from_nested_cwd() {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    fs::write(root.join(CONFIG_FILE), "[project]\nname = \"nested\"\n").unwrap();
    let nested = root.join("src").join("css");
    fs::create_dir_all(&nested).unwrap();

    let _guard = CwdGuard::enter(&nested);
    let found = find_config().expect("config should be found in an ancestor");
    assert_eq!(fs::canonicalize(&found).unwrap(), root.join(CONFIG_FILE));
}

#[test]
#[serial]
fn test_load_config_none_uses_cwd() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(CONFIG_FILE), "[server]\nport = 8123\n").unwrap();

    let _guard = CwdGuard::enter(temp.path());
    let config = load_config(None).unwrap();
    assert_eq!(config.server.port, 8123);
}
