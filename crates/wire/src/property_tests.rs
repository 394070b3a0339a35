// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the message envelope.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::{decode, encode, Header};

fn type_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{1,15}"
}

proptest! {
    #[test]
    fn valid_messages_survive_encoding(
        kind in type_strategy(),
        text in ".{0,40}",
        number in any::<i64>(),
        extra in "[a-z]{1,8}",
    ) {
        prop_assume!(extra != "type" && extra != "version");
        let payload = json!({"text": text, "n": number});
        let header = Header::new().with(extra.clone(), Value::Bool(true));

        let msg = decode(&encode(&kind, &payload, header).unwrap()).unwrap();

        prop_assert_eq!(msg.kind, kind);
        prop_assert_eq!(msg.payload, payload);
        prop_assert_eq!(msg.header.get(&extra), Some(&Value::Bool(true)));
    }

    #[test]
    fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode(&bytes);
    }
}
