//! BrickServer wire protocol.
//!
//! One exchange per boot cycle: the brick POSTs a compact JSON report and
//! the server answers with a JSON object that may carry feedback for the
//! features plus OS requests under `r`.
//!
//! Reserved keys:
//!
//! | Direction | Key | Meaning                                    |
//! |-----------|-----|--------------------------------------------|
//! | out       | `id`| brick identity, sent after a cold boot     |
//! | out       | `m` | firmware build id, sent when requested     |
//! | in        | `r` | array of request codes (see [`Command`])   |
//! | ack       | `s` | status, `0` = success                      |
//! | ack       | `m` | human readable message                     |

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::ports::HttpPort;
use crate::error::ExchangeError;

/// A JSON object as sent to or received from the server.
pub type Document = Map<String, Value>;

pub const KEY_ID: &str = "id";
pub const KEY_FIRMWARE_ID: &str = "m";
pub const KEY_REQUESTS: &str = "r";
pub const KEY_STATUS: &str = "s";
pub const KEY_MESSAGE: &str = "m";

/// OS-level requests the server can make through `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Code 11: include the firmware build id in the next report.
    SendFirmwareId,
    /// Code 12: flash new firmware on the next boot.
    Update,
}

impl Command {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            11 => Some(Self::SendFirmwareId),
            12 => Some(Self::Update),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::SendFirmwareId => 11,
            Self::Update => 12,
        }
    }
}

/// Perform one POST of `report` to `url` and parse the reply.
///
/// An empty report serializes to exactly `{}`.  No retries.
pub fn exchange(
    http: &mut impl HttpPort,
    url: &str,
    report: &Document,
) -> Result<Document, ExchangeError> {
    if url.is_empty() {
        return Err(ExchangeError::NoEndpoint);
    }
    let body = serde_json::to_vec(report).map_err(|_| ExchangeError::Encode)?;
    debug!("PROTO: -> {} bytes", body.len());
    let reply = http.post_json(url, &body)?;
    debug!("PROTO: <- {} bytes", reply.len());
    parse_object(&reply).ok_or_else(|| {
        warn!("PROTO: reply is not a JSON object");
        ExchangeError::Malformed
    })
}

/// Parse `raw` as a JSON object; anything else yields `None`.
pub fn parse_object(raw: &[u8]) -> Option<Document> {
    match serde_json::from_slice::<Value>(raw).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Known commands in `doc["r"]`, in order.  Unknown codes and non-integer
/// entries are skipped.
pub fn commands(doc: &Document) -> Vec<Command> {
    doc.get(KEY_REQUESTS)
        .and_then(Value::as_array)
        .map(|codes| {
            codes
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(Command::from_code)
                .collect()
        })
        .unwrap_or_default()
}

/// The part of `doc` addressed to features: everything except `r`.
pub fn feedback(doc: &Document) -> Document {
    let mut fb = doc.clone();
    fb.remove(KEY_REQUESTS);
    fb
}

#[derive(Serialize)]
struct Ack<'a> {
    s: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    m: Option<&'a str>,
}

/// Acknowledgement body: `{"s":status}` or `{"s":status,"m":message}`.
pub fn ack(status: u8, message: Option<&str>) -> String {
    serde_json::to_string(&Ack { s: status, m: message }).unwrap_or_default()
}
