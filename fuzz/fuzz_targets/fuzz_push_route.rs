//! Fuzz target: Activator request routing
//!
//! The first byte picks the method and the accepted flag, the rest splits
//! into path and body at the first NUL.  Every reply must be a JSON ack and
//! nothing may be dispatched once a push was accepted.
//!
//! cargo fuzz run fuzz_push_route

#![no_main]

use brickos::app::ports::{Method, PushRequest};
use brickos::net::activator::{Route, route};
use brickos::net::protocol;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&head, rest)) = data.split_first() else {
        return;
    };
    let method = match head & 0x07 {
        0 => Method::Get,
        1 => Method::Post,
        2 => Method::Put,
        3 => Method::Delete,
        _ => Method::Other,
    };
    let accepted = head & 0x80 != 0;
    let (path, body) = match rest.iter().position(|&b| b == 0) {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (rest, &[][..]),
    };
    let req = PushRequest {
        method,
        path: String::from_utf8_lossy(path).into_owned(),
        body: body.to_vec(),
    };

    match route(&req, accepted) {
        Route::Dispatch(_) => {
            assert!(!accepted, "dispatched after acceptance");
            assert_eq!(req.method, Method::Post);
        }
        Route::Reject(reply) => {
            assert!(reply.status >= 400);
            assert!(protocol::parse_object(reply.body.as_bytes()).is_some());
        }
    }
});
