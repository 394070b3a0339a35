// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use assemblage_core::BuildOutcome;
use tempfile::tempdir;

fn name(s: &str) -> ClientName {
    ClientName::new(s).unwrap()
}

fn request(repo: &str, tags: &[&str]) -> AssemblyRequest {
    AssemblyRequest {
        repository: repo.to_string(),
        revision: "abc123".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[test]
fn clients_are_created_and_found() {
    let store = Store::in_memory();
    let id = store.create_client(&name("builder-1"), ClientKind::Worker, &["linux".into()]).unwrap();

    let record = store.find_client("builder-1").unwrap().unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.kind, ClientKind::Worker);
    assert_eq!(record.tags, vec!["linux".to_string()]);
    assert!(store.find_client("nobody").unwrap().is_none());
}

#[test]
fn client_ids_are_distinct() {
    let store = Store::in_memory();
    let a = store.create_client(&name("builder-1"), ClientKind::Worker, &[]).unwrap();
    let b = store.create_client(&name("repo-main"), ClientKind::Repository, &[]).unwrap();
    assert_ne!(a, b);
}

#[test]
fn duplicate_client_is_rejected() {
    let store = Store::in_memory();
    store.create_client(&name("builder-1"), ClientKind::Worker, &[]).unwrap();
    let err = store.create_client(&name("builder-1"), ClientKind::Worker, &[]).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateClient(ref n) if n == "builder-1"));
}

#[test]
fn assembly_results_are_recorded() {
    let store = Store::in_memory();
    let worker = store.create_client(&name("builder-1"), ClientKind::Worker, &[]).unwrap();
    let descriptor = store.create_assembly(request("app", &["linux"])).unwrap();
    assert_eq!(store.assembly(descriptor.id).unwrap(), Some(descriptor.clone()));
    assert!(store.assembly_result(descriptor.id).unwrap().is_none());

    let result = AssemblyResult::failed(descriptor.id, "tests failed");
    store.record_assembly_result(worker, &result).unwrap();

    let recorded = store.assembly_result(descriptor.id).unwrap().unwrap();
    assert_eq!(recorded.outcome, BuildOutcome::Failed);
    assert_eq!(store.snapshot().assemblies[&descriptor.id].built_by, Some(worker));
}

#[test]
fn result_for_unknown_assembly_fails() {
    let store = Store::in_memory();
    let result = AssemblyResult::succeeded(AssemblyId(42), "ok");
    let err = store.record_assembly_result(ClientId(1), &result).unwrap_err();
    assert!(matches!(err, StoreError::UnknownAssembly(AssemblyId(42))));
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db/assemblage.json");
    {
        let store = Store::create(&path).unwrap();
        store.create_client(&name("builder-1"), ClientKind::Worker, &["linux".into()]).unwrap();
        store.create_assembly(request("app", &[])).unwrap();
    }

    let reopened = Store::open(&path).unwrap();
    assert!(reopened.find_client("builder-1").unwrap().is_some());
    let next = reopened.create_assembly(request("lib", &[])).unwrap();
    assert_eq!(next.id, AssemblyId(2));
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn create_refuses_existing_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assemblage.json");
    Store::create(&path).unwrap();
    assert!(matches!(Store::create(&path), Err(StoreError::AlreadyExists(_))));
}

#[test]
fn open_missing_file_starts_empty() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("absent.json")).unwrap();
    assert_eq!(store.snapshot(), MetaState::default());
}

#[test]
fn failed_mutation_leaves_state_untouched() {
    let store = Store::in_memory();
    store.create_client(&name("builder-1"), ClientKind::Worker, &[]).unwrap();
    let before = store.snapshot();
    let _ = store.create_client(&name("builder-1"), ClientKind::Repository, &[]);
    assert_eq!(store.snapshot(), before);
}

#[test]
fn stores_sharing_a_file_see_each_others_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assemblage.json");
    let running = Store::create(&path).unwrap();
    running.create_client(&name("repo-main"), ClientKind::Repository, &[]).unwrap();

    let other = Store::open(&path).unwrap();
    other.create_client(&name("builder-1"), ClientKind::Worker, &[]).unwrap();

    assert!(running.find_client("builder-1").unwrap().is_some());
    let descriptor = running.create_assembly(request("app", &[])).unwrap();

    let reopened = Store::open(&path).unwrap();
    assert!(reopened.find_client("builder-1").unwrap().is_some());
    assert!(reopened.find_client("repo-main").unwrap().is_some());
    assert_eq!(reopened.assembly(descriptor.id).unwrap(), Some(descriptor));
}
