// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::CommandFactory;
use commands::add::AddCommand;
use commands::RoleArg;
use std::path::PathBuf;
use yare::parameterized;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("assemblage").chain(args.iter().copied())).unwrap()
}

#[test]
fn command_definition_is_valid() {
    Cli::command().debug_assert();
}

#[parameterized(
    server = { &["create", "server", "/srv/build"], RoleArg::Server, Some("/srv/build") },
    worker_default_dir = { &["create", "worker"], RoleArg::Worker, None },
)]
fn create_parses_role_and_dir(args: &[&str], role: RoleArg, dir: Option<&str>) {
    let Commands::Create(create) = parse(args).command else {
        panic!("expected create");
    };
    assert_eq!(create.role, role);
    assert_eq!(create.dir, dir.map(PathBuf::from));
}

#[test]
fn add_worker_splits_tags() {
    let Commands::Add(add) = parse(&["add", "worker", "builder-1", "ab12", "/srv", "--tags", "linux,x86_64"]).command
    else {
        panic!("expected add");
    };
    match add.command {
        AddCommand::Worker { name, key, dir, tags } => {
            assert_eq!(name, "builder-1");
            assert_eq!(key, "ab12");
            assert_eq!(dir, Some(PathBuf::from("/srv")));
            assert_eq!(tags, vec!["linux".to_string(), "x86_64".to_string()]);
        }
        _ => panic!("expected add worker"),
    }
}

#[test]
fn add_server_takes_url_and_key() {
    let Commands::Add(add) = parse(&["add", "server", "tcp://10.0.0.1:7700", "ab12"]).command else {
        panic!("expected add");
    };
    assert!(matches!(
        add.command,
        AddCommand::Server { url, key, dir: None } if url == "tcp://10.0.0.1:7700" && key == "ab12"
    ));
}

#[parameterized(
    unknown_role = { &["start", "client"] },
    missing_key = { &["add", "worker", "builder-1"] },
    no_command = { &[] },
)]
fn invalid_arguments_are_rejected(args: &[&str]) {
    assert!(Cli::try_parse_from(std::iter::once("assemblage").chain(args.iter().copied())).is_err());
}

#[test]
fn create_then_key_round_trip() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("worker");
    let dir_arg = dir.to_string_lossy().to_string();

    run(parse(&["create", "worker", &dir_arg])).unwrap();
    run(parse(&["key", "worker", &dir_arg])).unwrap();
    assert!(run(parse(&["create", "worker", &dir_arg])).is_err(), "directory is no longer empty");
}
