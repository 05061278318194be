//! Storage layout and error-message integration tests.

use assert_fs::prelude::*;
use launchkit_core::{StorageError, StorageService};
use predicates::prelude::*;

fn app_root(home: &assert_fs::TempDir) -> assert_fs::fixture::ChildPath {
    home.child("Contoso.Viewer")
}

// ---------------------------------------------------------------------------
// 1. Layout
// ---------------------------------------------------------------------------

#[test]
fn application_root_is_created_on_demand() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let storage = StorageService::new(app_root(&home).path());

    app_root(&home).assert(predicate::path::missing());
    let root = storage.application_root_path().expect("root");
    assert_eq!(root, app_root(&home).path());
    app_root(&home).assert(predicate::path::is_dir());
}

#[test]
fn versions_folder_path_does_not_create_versions_folder() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let storage = StorageService::new(app_root(&home).path());

    let versions = storage.versions_folder_path().expect("versions path");
    assert_eq!(versions, app_root(&home).path().join("versions"));
    app_root(&home).child("versions").assert(predicate::path::missing());
}

#[test]
fn values_land_in_the_documented_files() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let storage = StorageService::new(app_root(&home).path());

    storage.update_current_version("1.4.0").expect("version");
    storage.update_current_executable("C:/apps/viewer/viewer.exe").expect("exe");
    storage.update_current_root("C:/apps/viewer").expect("root");
    storage.update_pending_version("1.5.0").expect("pending version");
    storage.update_pending_executable("C:/apps/viewer.1.5.0/viewer.exe").expect("pending exe");
    storage.update_pending_root("C:/apps/viewer.1.5.0").expect("pending root");

    let root = app_root(&home);
    root.child("current.txt").assert("1.4.0");
    root.child("run.bat").assert("C:/apps/viewer/viewer.exe");
    root.child("currentroot.txt").assert("C:/apps/viewer");
    root.child("pendingversion.txt").assert("1.5.0");
    root.child("pendingexe.txt").assert("C:/apps/viewer.1.5.0/viewer.exe");
    root.child("pendingroot.txt").assert("C:/apps/viewer.1.5.0");
}

// ---------------------------------------------------------------------------
// 2. Pending lifecycle
// ---------------------------------------------------------------------------

#[test]
fn clear_pending_removes_every_pending_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let storage = StorageService::new(app_root(&home).path());
    storage.update_pending_version("1.5.0").expect("pending version");
    storage.update_pending_executable("viewer.exe").expect("pending exe");
    storage.update_pending_root("root").expect("pending root");

    storage.clear_pending();

    let root = app_root(&home);
    root.child("pendingversion.txt").assert(predicate::path::missing());
    root.child("pendingexe.txt").assert(predicate::path::missing());
    root.child("pendingroot.txt").assert(predicate::path::missing());
}

#[test]
fn clear_pending_with_nothing_staged_is_harmless() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let storage = StorageService::new(app_root(&home).path());
    storage.clear_pending();
    assert!(!storage.state_snapshot().expect("snapshot").has_pending());
}

// ---------------------------------------------------------------------------
// 3. Error messages
// ---------------------------------------------------------------------------

#[test]
fn missing_executable_message_names_the_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let storage = StorageService::new(app_root(&home).path());

    let err = storage.get_current_executable().unwrap_err();
    assert!(matches!(err, StorageError::MissingState { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("run.bat"), "must contain file path, got: {msg}");
    assert!(msg.contains("unknown install state"), "got: {msg}");
}

#[test]
fn clean_then_versions_folder_is_gone() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let root = app_root(&home);
    root.child("versions").child("contoso.viewer.1.0.0").create_dir_all().expect("mkdir");
    root.child("current.txt").write_str("1.0.0").expect("write");

    StorageService::new(root.path()).clean().expect("clean");

    root.child("versions").assert(predicate::path::missing());
    root.child("current.txt").assert(predicate::path::missing());
}
