//! Mock platform for integration tests.
//!
//! Every port records into one shared [`Trace`], so tests can assert on the
//! order of side effects across ports (e.g. "warm invalidated before the
//! firmware fetch") without touching real flash, radio or GPIO.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use brickos::app::events::BrickEvent;
use brickos::app::ports::{
    ActivatorPort, Clock, Credentials, EventSink, FirmwareSource, FlashWriter, HttpPort,
    LinkInfo, Method, Platform, PushReply, PushRequest, RadioPort, StatusIndicator,
    StorageError, StoragePort, SystemPort, WarmMemory,
};
use brickos::app::{Brick, Ports};
use brickos::config::OsConfig;
use brickos::error::{ConnectivityError, TransportError};
use brickos::features::{BrickFeature, DelayFeature, FeatureRegistry};
use brickos::persist::DurableRegions;
use brickos::update::ota::OtaError;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StorageWrite,
    /// `valid` is whether the stored frame starts with the warm magic.
    WarmStore { valid: bool },
    RadioWake,
    RadioSleep,
    RadioBegin { fast_path: bool },
    RadioDisconnect,
    Post { url: String, body: String },
    FirmwareOpen(String),
    ActivatorOpen(u16),
    ActivatorClose,
    FlashBegin(Option<u32>),
    FlashFinalize,
    FlashAbort,
}

pub type Trace = Rc<RefCell<Vec<Call>>>;

pub fn position(trace: &Trace, pred: impl Fn(&Call) -> bool) -> Option<usize> {
    trace.borrow().iter().position(pred)
}

pub fn count(trace: &Trace, pred: impl Fn(&Call) -> bool) -> usize {
    trace.borrow().iter().filter(|c| pred(c)).count()
}

/// Bodies of every report posted so far, in order.
pub fn posted(trace: &Trace) -> Vec<String> {
    trace
        .borrow()
        .iter()
        .filter_map(|c| match c {
            Call::Post { body, .. } => Some(body.clone()),
            _ => None,
        })
        .collect()
}

// ── Storage ───────────────────────────────────────────────────

pub struct MockStorage {
    trace: Trace,
    map: HashMap<String, Vec<u8>>,
    pub fail_writes: bool,
}

impl MockStorage {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            map: HashMap::new(),
            fail_writes: false,
        }
    }
}

impl StoragePort for MockStorage {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .map
            .get(&format!("{}::{}", ns, key))
            .ok_or(StorageError::NotFound)?;
        let n = v.len().min(buf.len());
        buf[..n].copy_from_slice(&v[..n]);
        Ok(n)
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.trace.borrow_mut().push(Call::StorageWrite);
        self.map.insert(format!("{}::{}", ns, key), data.to_vec());
        Ok(())
    }
}

// ── Warm memory ───────────────────────────────────────────────

pub const WARM_LEN: usize = 256;

pub struct MockWarm {
    trace: Trace,
    pub bytes: Vec<u8>,
}

impl MockWarm {
    /// Power-up contents: arbitrary, never a valid frame.
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            bytes: vec![0xA5; WARM_LEN],
        }
    }
}

impl WarmMemory for MockWarm {
    fn capacity(&self) -> usize {
        WARM_LEN
    }

    fn load(&self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.bytes.len());
        buf[..n].copy_from_slice(&self.bytes[..n]);
        n
    }

    fn store(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > self.bytes.len() {
            return Err(StorageError::Full);
        }
        self.trace.borrow_mut().push(Call::WarmStore {
            valid: data.starts_with(b"BRKW"),
        });
        self.bytes[..data.len()].copy_from_slice(data);
        Ok(())
    }
}

// ── Radio ─────────────────────────────────────────────────────

pub const HOME_AP: LinkInfo = LinkInfo {
    channel: 6,
    bssid: [0x02, 0, 0, 0, 0, 0x01],
};

/// Simulated station.  A join comes up on the `join_polls + 1`-th poll,
/// unless it pins a channel/BSSID other than `ap` or `reachable` is false.
pub struct MockRadio {
    trace: Trace,
    pub ap: LinkInfo,
    pub join_polls: u32,
    pub reachable: bool,
    pub fail_wake: bool,
    pub polls: u32,
    pub last_creds: Option<Credentials>,
    awake: bool,
    joining: Option<Option<LinkInfo>>,
    connected: bool,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            ap: HOME_AP,
            join_polls: 3,
            reachable: true,
            fail_wake: false,
            polls: 0,
            last_creds: None,
            awake: false,
            joining: None,
            connected: false,
        }
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }
}

impl RadioPort for MockRadio {
    fn wake(&mut self) -> Result<(), ConnectivityError> {
        if self.fail_wake {
            return Err(ConnectivityError::RadioFailed);
        }
        self.trace.borrow_mut().push(Call::RadioWake);
        self.awake = true;
        Ok(())
    }

    fn sleep(&mut self) {
        self.trace.borrow_mut().push(Call::RadioSleep);
        self.awake = false;
        self.joining = None;
        self.connected = false;
    }

    fn begin(
        &mut self,
        creds: &Credentials,
        fast_path: Option<LinkInfo>,
    ) -> Result<(), ConnectivityError> {
        if !self.awake {
            return Err(ConnectivityError::RadioFailed);
        }
        self.trace.borrow_mut().push(Call::RadioBegin {
            fast_path: fast_path.is_some(),
        });
        self.last_creds = Some(creds.clone());
        self.joining = Some(fast_path);
        self.polls = 0;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        if self.connected {
            return true;
        }
        let Some(fast_path) = self.joining else {
            return false;
        };
        self.polls += 1;
        let target_ok = fast_path.is_none_or(|l| l == self.ap);
        if self.reachable && target_ok && self.polls > self.join_polls {
            self.connected = true;
        }
        self.connected
    }

    fn link_info(&self) -> Option<LinkInfo> {
        self.connected.then_some(self.ap)
    }

    fn disconnect(&mut self) {
        self.trace.borrow_mut().push(Call::RadioDisconnect);
        self.joining = None;
        self.connected = false;
    }
}

// ── HTTP client + firmware source ─────────────────────────────

pub struct MockHttp {
    trace: Trace,
    replies: VecDeque<Result<Vec<u8>, TransportError>>,
    pub image: Option<Vec<u8>>,
    /// Fail the read after this many bytes have been served.
    pub fail_after: Option<usize>,
    cursor: usize,
}

#[allow(dead_code)]
impl MockHttp {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            replies: VecDeque::new(),
            image: None,
            fail_after: None,
            cursor: 0,
        }
    }

    /// Queue the next server reply.  An empty queue answers `{}`.
    pub fn reply(&mut self, body: &str) {
        self.replies.push_back(Ok(body.as_bytes().to_vec()));
    }

    pub fn reply_err(&mut self, e: TransportError) {
        self.replies.push_back(Err(e));
    }
}

impl HttpPort for MockHttp {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.trace.borrow_mut().push(Call::Post {
            url: url.into(),
            body: String::from_utf8_lossy(body).into_owned(),
        });
        self.replies.pop_front().unwrap_or_else(|| Ok(b"{}".to_vec()))
    }
}

impl FirmwareSource for MockHttp {
    fn open(&mut self, url: &str) -> Result<Option<u32>, TransportError> {
        self.trace.borrow_mut().push(Call::FirmwareOpen(url.into()));
        self.cursor = 0;
        match &self.image {
            Some(img) => Ok(Some(img.len() as u32)),
            None => Err(TransportError::Status(404)),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let img = self.image.as_deref().unwrap_or_default();
        if self.fail_after.is_some_and(|n| self.cursor >= n) {
            return Err(TransportError::Io);
        }
        let n = buf.len().min(img.len() - self.cursor);
        buf[..n].copy_from_slice(&img[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

// ── Activator listener ────────────────────────────────────────

/// Push listener driven by a script of `(service call index, request)`.
/// A request is delivered on the first `service` call whose index reaches
/// its own, and only while the listener is open.
pub struct MockActivator {
    trace: Trace,
    script: VecDeque<(u32, PushRequest)>,
    services: u32,
    open: bool,
    pub fail_open: bool,
    pub answered: Vec<(PushRequest, PushReply)>,
}

#[allow(dead_code)]
impl MockActivator {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            script: VecDeque::new(),
            services: 0,
            open: false,
            fail_open: false,
            answered: Vec::new(),
        }
    }

    pub fn schedule(&mut self, at: u32, method: Method, path: &str, body: &str) {
        self.script.push_back((
            at,
            PushRequest {
                method,
                path: path.into(),
                body: body.as_bytes().to_vec(),
            },
        ));
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Scripted requests that were never delivered.
    pub fn undelivered(&self) -> usize {
        self.script.len()
    }

    pub fn statuses(&self) -> Vec<u16> {
        self.answered.iter().map(|(_, r)| r.status).collect()
    }
}

impl ActivatorPort for MockActivator {
    fn open(&mut self, port: u16) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::Connect);
        }
        self.trace.borrow_mut().push(Call::ActivatorOpen(port));
        self.open = true;
        self.services = 0;
        Ok(())
    }

    fn service(&mut self, handler: &mut dyn FnMut(&PushRequest) -> PushReply) {
        if !self.open {
            return;
        }
        while self.script.front().is_some_and(|(at, _)| *at <= self.services) {
            if let Some((_, req)) = self.script.pop_front() {
                let reply = handler(&req);
                self.answered.push((req, reply));
            }
        }
        self.services += 1;
    }

    fn close(&mut self) {
        self.trace.borrow_mut().push(Call::ActivatorClose);
        self.open = false;
    }
}

// ── Flash ─────────────────────────────────────────────────────

pub struct MockFlash {
    trace: Trace,
    pub image: Vec<u8>,
    pub finalized: bool,
}

impl MockFlash {
    pub fn new(trace: &Trace) -> Self {
        Self {
            trace: trace.clone(),
            image: Vec::new(),
            finalized: false,
        }
    }
}

impl FlashWriter for MockFlash {
    fn begin(&mut self, size: Option<u32>) -> Result<(), OtaError> {
        self.trace.borrow_mut().push(Call::FlashBegin(size));
        self.image.clear();
        self.finalized = false;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<u32, OtaError> {
        self.image.extend_from_slice(data);
        Ok(self.image.len() as u32)
    }

    fn finalize(&mut self) -> Result<(), OtaError> {
        self.trace.borrow_mut().push(Call::FlashFinalize);
        self.finalized = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.trace.borrow_mut().push(Call::FlashAbort);
        self.image.clear();
    }
}

// ── Clock, LED, system, events ────────────────────────────────

/// Virtual clock: time only moves when the code under test waits.
#[derive(Default)]
pub struct MockClock {
    pub now: u64,
    pub delays: Vec<u32>,
}

#[allow(dead_code)]
impl MockClock {
    pub fn waits_of(&self, ms: u32) -> usize {
        self.delays.iter().filter(|&&d| d == ms).count()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now += u64::from(ms);
        self.delays.push(ms);
    }
}

#[derive(Default)]
pub struct MockLed {
    on: bool,
    pub history: Vec<bool>,
}

impl StatusIndicator for MockLed {
    fn set(&mut self, on: bool) {
        self.on = on;
        self.history.push(on);
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

pub const TEST_MAC: [u8; 6] = [0x24, 0x6F, 0x28, 0x01, 0x02, 0x03];
pub const TEST_FIRMWARE: &str = "fw-test-1";

#[derive(Default)]
pub struct MockSystem {
    pub setup_held: bool,
    pub edges_enabled: bool,
}

impl SystemPort for MockSystem {
    fn setup_asserted(&mut self) -> bool {
        self.setup_held
    }

    fn enable_setup_edges(&mut self) -> Result<(), brickos::error::Error> {
        self.edges_enabled = true;
        Ok(())
    }

    fn mac_address(&self) -> [u8; 6] {
        TEST_MAC
    }

    fn firmware_id(&self) -> &str {
        TEST_FIRMWARE
    }

    fn restart(&mut self) -> ! {
        panic!("restart requested");
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<BrickEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn has(&self, event: &BrickEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &BrickEvent) {
        self.events.push(event.clone());
    }
}

// ── Platform ──────────────────────────────────────────────────

pub struct MockPlatform;

impl Platform for MockPlatform {
    type Storage = MockStorage;
    type Warm = MockWarm;
    type Radio = MockRadio;
    type Http = MockHttp;
    type Activator = MockActivator;
    type Flash = MockFlash;
    type Clock = MockClock;
    type Led = MockLed;
    type System = MockSystem;
    type Events = RecordingSink;
}

pub const SSID: &str = "home";
pub const SECRET: &str = "hunter22";
pub const SERVER: &str = "http://10.0.0.5:8081";
pub const IDENT: &str = "brick-7";

/// Fresh ports sharing `trace`: empty flash, garbage RTC memory.
pub fn ports(trace: &Trace) -> Ports<MockPlatform> {
    Ports {
        storage: MockStorage::new(trace),
        warm: MockWarm::new(trace),
        radio: MockRadio::new(trace),
        http: MockHttp::new(trace),
        activator: MockActivator::new(trace),
        flash: MockFlash::new(trace),
        clock: MockClock::default(),
        led: MockLed::default(),
        system: MockSystem::default(),
        events: RecordingSink::default(),
    }
}

/// Ports whose durable storage already holds a complete configuration.
pub fn provisioned(trace: &Trace) -> Ports<MockPlatform> {
    let mut p = ports(trace);
    let mut durable = DurableRegions::load(p.storage);
    durable.set("os", "ssid", SSID);
    durable.set("os", "pass", SECRET);
    durable.set("os", "url", SERVER);
    durable.set("os", "id", IDENT);
    durable.write().unwrap();
    p.storage = durable.into_storage();
    trace.borrow_mut().clear();
    p
}

pub fn features(window_secs: u32) -> FeatureRegistry {
    let mut r = FeatureRegistry::new();
    r.register(BrickFeature::Delay(DelayFeature::new(window_secs)))
        .unwrap();
    r
}

pub fn brick(ports: Ports<MockPlatform>, window_secs: u32) -> Brick<MockPlatform> {
    Brick::new(OsConfig::default(), ports, features(window_secs))
}

/// Software restart: the adapters (and with them flash and RTC contents)
/// survive, everything in RAM is rebuilt.
pub fn reboot(brick: Brick<MockPlatform>, window_secs: u32) -> Brick<MockPlatform> {
    let mut p = brick.into_ports();
    p.events.events.clear();
    p.clock.delays.clear();
    self::brick(p, window_secs)
}
