//! Activator listener adapter.
//!
//! Implements [`ActivatorPort`].  Requests are answered by the foreground
//! boot cycle, never by the listener itself:
//!
//! ```text
//!  httpd task ──PushRequest──▶ queue ──▶ service(handler) ──PushReply──▶ httpd task
//! ```
//!
//! - **`target_os = "espidf"`**: `EspHttpServer` with a wildcard handler per
//!   method.  The handler blocks on a reply channel until the foreground
//!   drains the queue; requests still queued at `close()` get a 503.
//! - **all other targets**: an in-memory queue fed by [`ActivatorAdapter::inject`].

use log::info;

use crate::app::ports::{ActivatorPort, PushReply, PushRequest};
use crate::error::TransportError;

#[cfg(target_os = "espidf")]
use log::warn;

/// Reply sent when a request cannot reach the foreground in time.
fn unavailable() -> PushReply {
    PushReply {
        status: 503,
        body: crate::net::protocol::ack(3, Some("window closed")),
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF adapter
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
type Pending = (PushRequest, std::sync::mpsc::SyncSender<PushReply>);

#[cfg(target_os = "espidf")]
pub struct ActivatorAdapter {
    max_body: usize,
    reply_timeout_ms: u32,
    server: Option<esp_idf_svc::http::server::EspHttpServer<'static>>,
    queue: Option<std::sync::mpsc::Receiver<Pending>>,
}

#[cfg(target_os = "espidf")]
impl ActivatorAdapter {
    pub fn new(config: &crate::config::OsConfig) -> Self {
        Self {
            max_body: config.max_body_len,
            reply_timeout_ms: config.activator_poll_ms.saturating_mul(3),
            server: None,
            queue: None,
        }
    }
}

#[cfg(target_os = "espidf")]
fn to_method(m: esp_idf_svc::http::Method) -> crate::app::ports::Method {
    use crate::app::ports::Method;
    use esp_idf_svc::http::Method as M;
    match m {
        M::Get => Method::Get,
        M::Post => Method::Post,
        M::Put => Method::Put,
        M::Delete => Method::Delete,
        _ => Method::Other,
    }
}

#[cfg(target_os = "espidf")]
impl ActivatorPort for ActivatorAdapter {
    fn open(&mut self, port: u16) -> Result<(), TransportError> {
        use embedded_svc::io::{Read, Write};
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::server::{Configuration, EspHttpServer};
        use std::sync::mpsc;
        use std::time::Duration;

        let conf = Configuration {
            http_port: port,
            uri_match_wildcard: true,
            stack_size: 8 * 1024,
            ..Default::default()
        };
        let mut server = EspHttpServer::new(&conf).map_err(|e| {
            warn!("ACTIVATOR: server start failed ({})", e);
            TransportError::Connect
        })?;

        let (tx, rx) = mpsc::sync_channel::<Pending>(4);
        for method in [Method::Get, Method::Post, Method::Put, Method::Delete] {
            let tx = tx.clone();
            let max_body = self.max_body;
            let wait = Duration::from_millis(u64::from(self.reply_timeout_ms));
            server
                .fn_handler::<anyhow::Error, _>("/*", method, move |mut req| {
                    let len = req.content_len().unwrap_or(0) as usize;
                    let mut body = vec![0u8; len.min(max_body)];
                    if !body.is_empty() {
                        req.read_exact(&mut body)?;
                    }
                    let push = PushRequest {
                        method: to_method(req.method()),
                        path: req.uri().into(),
                        body,
                    };
                    let (reply_tx, reply_rx) = mpsc::sync_channel(1);
                    let reply = match tx.try_send((push, reply_tx)) {
                        Ok(()) => reply_rx.recv_timeout(wait).unwrap_or_else(|_| unavailable()),
                        Err(_) => unavailable(),
                    };
                    req.into_response(
                        reply.status,
                        None,
                        &[("Content-Type", "application/json")],
                    )?
                    .write_all(reply.body.as_bytes())?;
                    Ok(())
                })
                .map_err(|_| TransportError::Connect)?;
        }

        self.server = Some(server);
        self.queue = Some(rx);
        info!("ACTIVATOR: listening on :{}", port);
        Ok(())
    }

    fn service(&mut self, handler: &mut dyn FnMut(&PushRequest) -> PushReply) {
        let Some(queue) = self.queue.as_ref() else {
            return;
        };
        while let Ok((req, reply)) = queue.try_recv() {
            // The httpd task may have given up waiting; nothing to do then.
            let _ = reply.send(handler(&req));
        }
    }

    fn close(&mut self) {
        if let Some(queue) = self.queue.take() {
            while let Ok((_, reply)) = queue.try_recv() {
                let _ = reply.send(unavailable());
            }
        }
        self.server = None;
        info!("ACTIVATOR: listener stopped");
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct ActivatorAdapter {
    port: Option<u16>,
    queue: std::collections::VecDeque<PushRequest>,
    answered: Vec<(PushRequest, PushReply)>,
}

#[cfg(not(target_os = "espidf"))]
impl ActivatorAdapter {
    pub fn new(_config: &crate::config::OsConfig) -> Self {
        Self::default()
    }

    /// Queue a request as if a client had sent it.  Ignored while closed.
    pub fn inject(&mut self, req: PushRequest) -> bool {
        if self.port.is_none() {
            return false;
        }
        self.queue.push_back(req);
        true
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Every request answered so far with its reply.
    pub fn answered(&self) -> &[(PushRequest, PushReply)] {
        &self.answered
    }
}

#[cfg(not(target_os = "espidf"))]
impl ActivatorPort for ActivatorAdapter {
    fn open(&mut self, port: u16) -> Result<(), TransportError> {
        self.port = Some(port);
        info!("ACTIVATOR(sim): listening on :{}", port);
        Ok(())
    }

    fn service(&mut self, handler: &mut dyn FnMut(&PushRequest) -> PushReply) {
        while let Some(req) = self.queue.pop_front() {
            let reply = handler(&req);
            self.answered.push((req, reply));
        }
    }

    fn close(&mut self) {
        for req in self.queue.drain(..) {
            self.answered.push((req, unavailable()));
        }
        self.port = None;
    }
}
