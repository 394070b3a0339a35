// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    hello = { "hello", Command::Hello },
    goodbye = { "goodbye", Command::Goodbye },
    status = { "status", Command::Status },
    status_report = { "status_report", Command::StatusReport },
    push = { "push", Command::Push },
    assembly_result = { "assembly_result", Command::AssemblyResult },
)]
fn command_parses_its_own_name(name: &str, expected: Command) {
    assert_eq!(name.parse::<Command>(), Ok(expected));
    assert_eq!(expected.as_str(), name);
}

#[test]
fn unknown_command_names_the_type() {
    let err = "bogus".parse::<Command>().unwrap_err();
    assert_eq!(err, UnknownCommand("bogus".to_string()));
    assert_eq!(err.to_string(), "unknown command: bogus");
}

#[test]
fn every_type_name_is_a_valid_message_type() {
    for c in Command::ALL {
        assert!(crate::is_valid_type(c.as_str()), "{c}");
    }
    for n in Notice::ALL {
        assert!(crate::is_valid_type(n.as_str()), "{n}");
    }
}

#[test]
fn notice_parse() {
    assert_eq!(Notice::parse("new_assembly"), Some(Notice::NewAssembly));
    assert_eq!(Notice::parse("status"), None);
}

#[test]
fn control_action_from_payload() {
    assert_eq!(ControlAction::from_payload(&json!(["disconnect"])), Some(ControlAction::Disconnect));
    assert_eq!(ControlAction::from_payload(&json!(["reboot"])), None);
    assert_eq!(ControlAction::from_payload(&json!(null)), None);
}
