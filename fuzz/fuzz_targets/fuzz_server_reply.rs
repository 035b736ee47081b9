//! Fuzz target: server reply handling
//!
//! Parses arbitrary bytes as a BrickServer reply and extracts commands and
//! feature feedback.  Nothing may panic; only codes 11 and 12 may come out
//! as commands and feedback never carries the request list.
//!
//! cargo fuzz run fuzz_server_reply

#![no_main]

use brickos::net::protocol;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(doc) = protocol::parse_object(data) else {
        return;
    };
    for cmd in protocol::commands(&doc) {
        assert!(matches!(cmd.code(), 11 | 12));
    }
    assert!(!protocol::feedback(&doc).contains_key(protocol::KEY_REQUESTS));
});
