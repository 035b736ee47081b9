//! HTTP client adapter.
//!
//! Implements [`HttpPort`] (the per-boot JSON exchange) and
//! [`FirmwareSource`] (the streaming image download) on one type.
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`,
//!   one connection per request.
//! - **all other targets**: scripted replies and an in-memory image.

use log::{debug, warn};

use crate::app::ports::{FirmwareSource, HttpPort};
use crate::error::TransportError;

// ───────────────────────────────────────────────────────────────
// ESP-IDF adapter
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct HttpAdapter {
    timeout_ms: u32,
    max_body: usize,
    download: Option<esp_idf_svc::http::client::EspHttpConnection>,
}

#[cfg(target_os = "espidf")]
impl HttpAdapter {
    pub fn new(config: &crate::config::OsConfig) -> Self {
        Self {
            timeout_ms: config.http_timeout_ms,
            max_body: config.max_body_len,
            download: None,
        }
    }

    fn connection(&self) -> Result<esp_idf_svc::http::client::EspHttpConnection, TransportError> {
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        EspHttpConnection::new(&Configuration {
            timeout: Some(core::time::Duration::from_millis(u64::from(self.timeout_ms))),
            ..Default::default()
        })
        .map_err(|e| {
            warn!("HTTP: connection setup failed ({})", e);
            TransportError::Connect
        })
    }
}

/// Hand the reply body on regardless of status.  A server may attach
/// feedback or commands to an error reply.
fn reply_body(url: &str, status: u16, body: Vec<u8>) -> Vec<u8> {
    if !(200..300).contains(&status) {
        warn!("HTTP: POST {} answered {}", url, status);
    }
    body
}

#[cfg(target_os = "espidf")]
fn check_status(status: u16) -> Result<(), TransportError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(TransportError::Status(status))
    }
}

#[cfg(target_os = "espidf")]
impl HttpPort for HttpAdapter {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        use embedded_svc::http::Method;
        use embedded_svc::io::{Read, Write};

        let mut conn = self.connection()?;
        let len = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", len.as_str()),
        ];
        conn.initiate_request(Method::Post, url, &headers)
            .map_err(|_| TransportError::Connect)?;
        conn.write_all(body).map_err(|_| TransportError::Io)?;
        conn.initiate_response().map_err(|_| TransportError::Timeout)?;
        let status = conn.status();

        let mut reply = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = conn.read(&mut chunk).map_err(|_| TransportError::Io)?;
            if n == 0 {
                break;
            }
            if reply.len() + n > self.max_body {
                return Err(TransportError::BodyTooLarge);
            }
            reply.extend_from_slice(&chunk[..n]);
        }
        debug!("HTTP: POST {} -> {} {} bytes", url, status, reply.len());
        Ok(reply_body(url, status, reply))
    }
}

#[cfg(target_os = "espidf")]
impl FirmwareSource for HttpAdapter {
    fn open(&mut self, url: &str) -> Result<Option<u32>, TransportError> {
        use embedded_svc::http::Method;

        self.download = None;
        let mut conn = self.connection()?;
        conn.initiate_request(Method::Get, url, &[])
            .map_err(|_| TransportError::Connect)?;
        conn.initiate_response().map_err(|_| TransportError::Timeout)?;
        check_status(conn.status())?;
        let len = conn
            .header("Content-Length")
            .or_else(|| conn.header("content-length"))
            .and_then(|v| v.parse::<u32>().ok());
        self.download = Some(conn);
        Ok(len)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        use embedded_svc::io::Read;

        let conn = self.download.as_mut().ok_or(TransportError::Io)?;
        let n = conn.read(buf).map_err(|_| TransportError::Io)?;
        if n == 0 {
            self.download = None;
        }
        Ok(n)
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct HttpAdapter {
    max_body: usize,
    replies: std::collections::VecDeque<Result<(u16, Vec<u8>), TransportError>>,
    sent: Vec<(String, Vec<u8>)>,
    image: Vec<u8>,
    cursor: Option<usize>,
}

#[cfg(not(target_os = "espidf"))]
impl HttpAdapter {
    pub fn new(config: &crate::config::OsConfig) -> Self {
        Self {
            max_body: config.max_body_len,
            replies: Default::default(),
            sent: Vec::new(),
            image: Vec::new(),
            cursor: None,
        }
    }

    /// Queue the outcome of the next POST.  An empty queue answers `{}`.
    pub fn push_reply(&mut self, reply: Result<Vec<u8>, TransportError>) {
        self.replies.push_back(reply.map(|body| (200, body)));
    }

    /// Queue a reply carrying a non-default HTTP status.
    pub fn push_status_reply(&mut self, status: u16, body: Vec<u8>) {
        self.replies.push_back(Ok((status, body)));
    }

    /// Image served by the next download.
    pub fn set_image(&mut self, image: Vec<u8>) {
        self.image = image;
    }

    /// Every POST so far as `(url, body)`.
    pub fn sent(&self) -> &[(String, Vec<u8>)] {
        &self.sent
    }
}

#[cfg(not(target_os = "espidf"))]
impl HttpPort for HttpAdapter {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.sent.push((url.into(), body.to_vec()));
        let (status, reply) = self
            .replies
            .pop_front()
            .unwrap_or_else(|| Ok((200, b"{}".to_vec())))?;
        if reply.len() > self.max_body {
            return Err(TransportError::BodyTooLarge);
        }
        debug!("HTTP(sim): POST {} -> {} {} bytes", url, status, reply.len());
        Ok(reply_body(url, status, reply))
    }
}

#[cfg(not(target_os = "espidf"))]
impl FirmwareSource for HttpAdapter {
    fn open(&mut self, url: &str) -> Result<Option<u32>, TransportError> {
        if self.image.is_empty() {
            warn!("HTTP(sim): no image behind {}", url);
            return Err(TransportError::Status(404));
        }
        self.cursor = Some(0);
        Ok(u32::try_from(self.image.len()).ok())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let pos = self.cursor.ok_or(TransportError::Io)?;
        let n = buf.len().min(self.image.len() - pos);
        buf[..n].copy_from_slice(&self.image[pos..pos + n]);
        self.cursor = Some(pos + n);
        Ok(n)
    }
}
