//! Activator window: a short period after the exchange during which the
//! server may push one document to the brick.
//!
//! ```text
//!   open ─▶ [service ─▶ delay]* ─▶ close
//!              │
//!              └─ first accepted push: drain, close early
//! ```
//!
//! | Request                        | Reply                               |
//! |--------------------------------|-------------------------------------|
//! | `POST /`, JSON object body     | `200 {"s":0}`, dispatched           |
//! | `POST /`, anything else        | `400 {"s":4,"m":"malformed body"}`  |
//! | other method on `/`            | `405 {"s":2,"m":"wrong method"}`    |
//! | any other path                 | `404 {"s":1,"m":"wrong url"}`       |
//! | anything after an accepted push| `503 {"s":3,"m":"window closed"}`   |

use log::{info, warn};

use crate::app::ports::{ActivatorPort, Clock, Method, PushReply, PushRequest, StoragePort};
use crate::config::OsConfig;
use crate::features::FeatureRegistry;
use crate::net::protocol::{self, Document};
use crate::persist::DurableRegions;

/// What the router decided for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Accept and hand the document to the features.
    Dispatch(Document),
    /// Reject with this reply.
    Reject(PushReply),
}

/// Summary of one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowOutcome {
    /// A push was accepted and dispatched.
    pub pushed: bool,
    /// Requests answered with an error status.
    pub rejected: u32,
    /// Seconds the window stayed open (poll count).
    pub polls: u32,
    /// A feature asked for the durable configuration to be written.
    pub durable_write: bool,
}

fn reply(status: u16, s: u8, message: &str) -> PushReply {
    PushReply {
        status,
        body: protocol::ack(s, Some(message)),
    }
}

/// Decide how to answer `req`.  `accepted` is whether this window already
/// took a push.
pub fn route(req: &PushRequest, accepted: bool) -> Route {
    if accepted {
        return Route::Reject(reply(503, 3, "window closed"));
    }
    let path = req.path.split('?').next().unwrap_or("");
    if path != "/" {
        return Route::Reject(reply(404, 1, "wrong url"));
    }
    if req.method != Method::Post {
        return Route::Reject(reply(405, 2, "wrong method"));
    }
    match protocol::parse_object(&req.body) {
        Some(doc) => Route::Dispatch(doc),
        None => Route::Reject(reply(400, 4, "malformed body")),
    }
}

pub struct ActivatorWindow {
    port: u16,
    poll_ms: u32,
}

impl ActivatorWindow {
    pub fn new(config: &OsConfig) -> Self {
        Self {
            port: config.activator_port,
            poll_ms: config.activator_poll_ms,
        }
    }

    /// Keep the listener open for up to `secs` polls.  Closes early after
    /// the first accepted push.  The listener is always closed on return.
    pub fn run<S: StoragePort>(
        &self,
        activator: &mut impl ActivatorPort,
        clock: &mut impl Clock,
        secs: u32,
        features: &mut FeatureRegistry,
        durable: &mut DurableRegions<S>,
    ) -> WindowOutcome {
        let mut outcome = WindowOutcome::default();
        if secs == 0 {
            return outcome;
        }
        if let Err(e) = activator.open(self.port) {
            warn!("ACTIVATOR: listener failed to open ({})", e);
            return outcome;
        }
        info!("ACTIVATOR: window open for {}s on port {}", secs, self.port);

        for _ in 0..secs {
            Self::service(activator, &mut outcome, features, durable);
            outcome.polls += 1;
            if outcome.pushed {
                // Answer whatever arrived alongside the push before closing.
                Self::service(activator, &mut outcome, features, durable);
                break;
            }
            clock.delay_ms(self.poll_ms);
        }

        activator.close();
        info!(
            "ACTIVATOR: window closed after {} polls (pushed={})",
            outcome.polls, outcome.pushed
        );
        outcome
    }

    fn service<S: StoragePort>(
        activator: &mut impl ActivatorPort,
        outcome: &mut WindowOutcome,
        features: &mut FeatureRegistry,
        durable: &mut DurableRegions<S>,
    ) {
        activator.service(&mut |req: &PushRequest| match route(req, outcome.pushed) {
            Route::Dispatch(doc) => {
                outcome.pushed = true;
                outcome.durable_write |= features.feedback(&protocol::feedback(&doc), durable);
                info!("ACTIVATOR: push accepted ({} keys)", doc.len());
                PushReply {
                    status: 200,
                    body: protocol::ack(0, None),
                }
            }
            Route::Reject(r) => {
                outcome.rejected += 1;
                warn!("ACTIVATOR: {:?} {} -> {}", req.method, req.path, r.status);
                r
            }
        });
    }
}
