// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;

use super::*;
use tempfile::tempdir;

#[test]
fn saved_identity_loads_with_secret() {
    let dir = tempdir().unwrap();
    let identity = Identity::generate("builder-1");
    identity.save_public(&dir.path().join("id.toml")).unwrap();
    identity.save_secret(&dir.path().join("id.key")).unwrap();

    let loaded = Identity::load(&dir.path().join("id.toml"), Some(&dir.path().join("id.key"))).unwrap();

    assert_eq!(loaded.name(), "builder-1");
    assert_eq!(loaded.public_key(), identity.public_key());
    assert!(loaded.secret().is_some());
}

#[test]
fn secret_file_is_owner_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("id.key");
    Identity::generate("builder-1").save_secret(&path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn saving_over_existing_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("id.toml");
    Identity::generate("first").save_public(&path).unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    let err = Identity::generate("second").save_public(&path).unwrap_err();

    assert!(matches!(err, AuthError::AlreadyExists(_)));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn public_only_identity_has_no_secret_to_save() {
    let dir = tempdir().unwrap();
    let public = Identity::generate("peer").public_key().to_owned();
    let identity = Identity::from_public("peer", public);
    assert!(matches!(identity.save_secret(&dir.path().join("x.key")), Err(AuthError::NoSecret(_))));
}

#[test]
fn mismatched_secret_is_rejected() {
    let dir = tempdir().unwrap();
    Identity::generate("one").save_public(&dir.path().join("one.toml")).unwrap();
    Identity::generate("two").save_secret(&dir.path().join("two.key")).unwrap();

    let err = Identity::load(&dir.path().join("one.toml"), Some(&dir.path().join("two.key"))).unwrap_err();
    assert!(matches!(err, AuthError::Malformed { .. }));
}

#[test]
fn public_key_hex_round_trips() {
    let identity = Identity::generate("peer");
    let parsed = parse_public_key(&identity.public_key_hex()).unwrap();
    assert_eq!(&parsed, identity.public_key());
}

#[test]
fn bad_hex_keys_are_rejected() {
    assert!(matches!(parse_public_key("zz"), Err(AuthError::InvalidKey(_))));
    assert!(matches!(parse_public_key("abcd"), Err(AuthError::InvalidKey(_))));
}

#[test]
fn find_by_key_scans_directory() {
    let dir = tempdir().unwrap();
    let wanted = Identity::generate("wanted");
    Identity::generate("other").save_public(&dir.path().join("other.toml")).unwrap();
    wanted.save_public(&dir.path().join("wanted.toml")).unwrap();

    let found = find_by_key(dir.path(), wanted.public_key()).unwrap().unwrap();
    assert_eq!(found.name(), "wanted");

    let stranger = Identity::generate("stranger");
    assert!(find_by_key(dir.path(), stranger.public_key()).unwrap().is_none());
}

#[test]
fn find_by_key_skips_malformed_files() {
    let dir = tempdir().unwrap();
    let wanted = Identity::generate("builder-1");
    wanted.save_public(&dir.path().join("builder-1.toml")).unwrap();
    std::fs::write(dir.path().join("aaa-stray.toml"), "not = [valid").unwrap();

    let found = find_by_key(dir.path(), wanted.public_key()).unwrap().unwrap();
    assert_eq!(found.name(), "builder-1");
}

#[test]
fn find_by_key_in_missing_directory_finds_nothing() {
    let dir = tempdir().unwrap();
    let key = Identity::generate("x").public_key().to_owned();
    assert!(find_by_key(&dir.path().join("absent"), &key).unwrap().is_none());
}

#[test]
fn debug_output_omits_secret() {
    let text = format!("{:?}", Identity::generate("peer"));
    assert!(text.contains("has_secret: true"));
    assert!(!text.contains("secret_key"));
}
