//! Boot orchestrator: one pass through the Brick lifecycle per boot.
//!
//! ```text
//!  init ──▶ update requested? ──yes──▶ update ──────────────────────────▶ restart
//!    │
//!    ├──▶ setup input / missing config ──▶ configuration mode (forever)
//!    │
//!    └──▶ connect ─▶ report ─▶ await link ─▶ exchange ─▶ feedback + commands
//!              ─▶ persist ─▶ features end ─▶ Activator window ─▶ persist ─▶ restart
//! ```
//!
//! [`Brick::run_cycle`] performs everything up to the terminal action and
//! reports it as a [`CycleEnd`]; [`Brick::run`] carries it out.  Host tests
//! drive `run_cycle` against mock ports.

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::OsConfig;
use crate::features::FeatureRegistry;
use crate::net::activator::ActivatorWindow;
use crate::net::connection::ConnectionManager;
use crate::net::protocol::{self, Command, Document, KEY_FIRMWARE_ID, KEY_ID};
use crate::persist::{DurableRegions, WarmRegion, WarmState};
use crate::safety::{EdgeOutcome, RESET_COUNTER, ResetCircuit};
use crate::setup::{SetupConsole, SetupOps};
use crate::update::UpdateTrigger;

use super::events::{BrickEvent, RestartReason, SetupReason, Tier};
use super::ports::{EventSink, Platform, StatusIndicator, SystemPort};

/// Terminal action of one boot cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEnd {
    Restart(RestartReason),
    EnterSetup(SetupReason),
}

/// Concrete adapters for every port, handed to [`Brick::new`].
pub struct Ports<P: Platform> {
    pub storage: P::Storage,
    pub warm: P::Warm,
    pub radio: P::Radio,
    pub http: P::Http,
    pub activator: P::Activator,
    pub flash: P::Flash,
    pub clock: P::Clock,
    pub led: P::Led,
    pub system: P::System,
    pub events: P::Events,
}

pub struct Brick<P: Platform> {
    config: OsConfig,
    durable: DurableRegions<P::Storage>,
    warm: WarmRegion<P::Warm, WarmState>,
    radio: P::Radio,
    http: P::Http,
    activator: P::Activator,
    flash: P::Flash,
    clock: P::Clock,
    led: P::Led,
    system: P::System,
    events: P::Events,
    features: FeatureRegistry,
    connection: ConnectionManager,
    window: ActivatorWindow,
    update: UpdateTrigger,
    cold_boot: bool,
}

impl<P: Platform> Brick<P> {
    /// Load both persistence tiers.  Nothing else touches hardware yet.
    pub fn new(config: OsConfig, ports: Ports<P>, features: FeatureRegistry) -> Self {
        Self {
            durable: DurableRegions::load(ports.storage),
            warm: WarmRegion::load(ports.warm),
            radio: ports.radio,
            http: ports.http,
            activator: ports.activator,
            flash: ports.flash,
            clock: ports.clock,
            led: ports.led,
            system: ports.system,
            events: ports.events,
            features,
            connection: ConnectionManager::new(&config),
            window: ActivatorWindow::new(&config),
            update: UpdateTrigger::new(&config),
            cold_boot: true,
            config,
        }
    }

    /// Run the boot cycle and carry out its terminal action.
    pub fn run<C: SetupConsole>(mut self, console: &mut C) -> ! {
        match self.run_cycle() {
            CycleEnd::Restart(reason) => self.restart(reason),
            CycleEnd::EnterSetup(_) => self.run_setup(console),
        }
    }

    /// One boot cycle up to (not including) its terminal action.
    pub fn run_cycle(&mut self) -> CycleEnd {
        self.init();

        if self.warm.data().update_requested {
            return CycleEnd::Restart(self.run_update());
        }

        if let Some(reason) = self.setup_reason() {
            info!("BOOT: configuration mode ({:?})", reason);
            self.events.emit(&BrickEvent::SetupEntered(reason));
            return CycleEnd::EnterSetup(reason);
        }

        self.network_cycle();
        CycleEnd::Restart(RestartReason::CycleComplete)
    }

    // ── Steps ─────────────────────────────────────────────────

    fn init(&mut self) {
        if self.durable.ensure_os_defaults() {
            debug!("BOOT: os region initialised");
        }
        self.cold_boot = !self.warm.is_valid();
        if self.cold_boot {
            let warm = self.warm.data_mut();
            warm.firmware_id_requested = false;
            warm.update_requested = false;
        }
        self.features.begin(&mut self.durable);
        self.events.emit(&BrickEvent::Booted {
            cold: self.cold_boot,
        });
    }

    fn setup_reason(&mut self) -> Option<SetupReason> {
        if self.system.setup_asserted() {
            Some(SetupReason::PinAsserted)
        } else if self.durable.ssid().is_empty() {
            Some(SetupReason::MissingSsid)
        } else if self.durable.server_url().is_empty() {
            Some(SetupReason::MissingServer)
        } else {
            None
        }
    }

    fn network_cycle(&mut self) {
        let joined = self.durable.credentials().and_then(|creds| {
            self.connection
                .connect(&mut self.radio, creds, self.warm.data(), self.warm.is_valid())
        });
        if let Err(e) = joined {
            self.events.emit(&BrickEvent::ConnectFailed(e));
        }
        self.features.start();

        let report = self.build_report();
        let response = if joined.is_ok() {
            self.exchange(&report)
        } else {
            Document::new()
        };

        let mut durable_dirty = self
            .features
            .feedback(&protocol::feedback(&response), &mut self.durable);
        for cmd in protocol::commands(&response) {
            self.events.emit(&BrickEvent::CommandReceived(cmd.code()));
            let warm = self.warm.data_mut();
            match cmd {
                Command::SendFirmwareId => warm.firmware_id_requested = true,
                Command::Update => warm.update_requested = true,
            }
        }
        durable_dirty = self.persist(durable_dirty);

        self.features.end();

        let secs = self.features.activator_window_secs();
        let outcome = self.window.run(
            &mut self.activator,
            &mut self.clock,
            secs,
            &mut self.features,
            &mut self.durable,
        );
        if secs > 0 {
            self.events.emit(&BrickEvent::ActivatorClosed {
                pushed: outcome.pushed,
                rejected: outcome.rejected,
            });
        }
        self.persist(durable_dirty || outcome.durable_write);
    }

    fn build_report(&mut self) -> Document {
        let mut report = Document::new();
        self.features.deliver(&mut report);
        let id = self.durable.brick_id();
        if self.cold_boot && !id.is_empty() {
            report.insert(KEY_ID.into(), Value::from(id));
        }
        if self.warm.data().firmware_id_requested {
            report.insert(
                KEY_FIRMWARE_ID.into(),
                Value::from(self.system.firmware_id()),
            );
            self.warm.data_mut().firmware_id_requested = false;
        }
        report
    }

    /// Wait for the link and run the single exchange.  Any failure yields an
    /// empty document.
    fn exchange(&mut self, report: &Document) -> Document {
        match self
            .connection
            .await_connected(&mut self.radio, &mut self.clock, self.warm.data_mut())
        {
            Ok(link) => {
                if link.fell_back {
                    self.events.emit(&BrickEvent::FastPathAbandoned);
                }
                self.events.emit(&BrickEvent::Connected {
                    mode: link.mode,
                    polls: link.polls,
                });
            }
            Err(e) => {
                self.events.emit(&BrickEvent::ConnectFailed(e));
                return Document::new();
            }
        }

        match protocol::exchange(&mut self.http, self.durable.server_url(), report) {
            Ok(doc) => {
                self.events.emit(&BrickEvent::Exchanged { ok: true });
                doc
            }
            Err(e) => {
                self.events.emit(&BrickEvent::ExchangeFailed(e));
                self.events.emit(&BrickEvent::Exchanged { ok: false });
                Document::new()
            }
        }
    }

    /// Write the warm region, and the durable one if `durable` is set.
    /// Returns `true` if a durable write is still pending.
    fn persist(&mut self, durable: bool) -> bool {
        if let Err(e) = self.warm.write() {
            warn!("PERSIST: warm write failed ({})", e);
            self.events.emit(&BrickEvent::PersistFailed(Tier::Warm));
        }
        if !durable {
            return false;
        }
        match self.durable.write() {
            Ok(()) => false,
            Err(e) => {
                warn!("PERSIST: durable write failed ({})", e);
                self.events.emit(&BrickEvent::PersistFailed(Tier::Durable));
                true
            }
        }
    }

    fn run_update(&mut self) -> RestartReason {
        self.events.emit(&BrickEvent::UpdateStarted);
        if self.update.consume_request(&mut self.warm).is_err() {
            self.events.emit(&BrickEvent::PersistFailed(Tier::Warm));
        }

        let linked = self
            .durable
            .credentials()
            .and_then(|creds| {
                self.connection
                    .connect(&mut self.radio, creds, self.warm.data(), self.warm.is_valid())
            })
            .and_then(|_| {
                self.connection
                    .await_connected(&mut self.radio, &mut self.clock, self.warm.data_mut())
            });
        if let Err(e) = linked {
            self.events.emit(&BrickEvent::ConnectFailed(e));
            return RestartReason::UpdateFailed;
        }

        // The new image may lay out the warm region differently.
        if self.warm.destroy().is_err() {
            self.events.emit(&BrickEvent::PersistFailed(Tier::Warm));
        }

        match self.update.flash_from_server(
            self.durable.server_url(),
            &mut self.http,
            &mut self.flash,
            &mut self.led,
        ) {
            Ok(bytes) => {
                self.events.emit(&BrickEvent::UpdateFinished { bytes });
                RestartReason::UpdateFinished
            }
            Err(e) => {
                self.events.emit(&BrickEvent::UpdateFailed(e));
                RestartReason::UpdateFailed
            }
        }
    }

    // ── Configuration mode ────────────────────────────────────

    fn run_setup<C: SetupConsole>(&mut self, console: &mut C) -> ! {
        let mut circuit = self.enter_setup(&RESET_COUNTER);
        loop {
            if self.setup_step(console, &mut circuit) == EdgeOutcome::Destroyed {
                self.restart(RestartReason::ConfigDestroyed);
            }
        }
    }

    /// LED on, setup edges enabled, reset circuit armed on `counter`.
    pub fn enter_setup<'c>(&mut self, counter: &'c crate::safety::ResetCounter) -> ResetCircuit<'c> {
        self.led.set(true);
        if let Err(e) = self.system.enable_setup_edges() {
            warn!("SETUP: reset input unavailable ({})", e);
        }
        let mut circuit = ResetCircuit::new(&self.config, counter);
        circuit.arm();
        circuit
    }

    /// One console step followed by one reset-circuit poll.
    pub fn setup_step<C: SetupConsole>(
        &mut self,
        console: &mut C,
        circuit: &mut ResetCircuit<'_>,
    ) -> EdgeOutcome {
        console.step(&mut self.setup_ops());
        let outcome = circuit.poll(&mut self.led, &mut self.clock, &mut self.durable, &mut self.warm);
        self.note_reset(outcome)
    }

    /// Feed one setup-input edge at `edge_ms` straight into `circuit`.
    pub fn reset_edge(&mut self, circuit: &mut ResetCircuit<'_>, edge_ms: u32) -> EdgeOutcome {
        let outcome = circuit.handle_edge(
            edge_ms,
            &mut self.led,
            &mut self.clock,
            &mut self.durable,
            &mut self.warm,
        );
        self.note_reset(outcome)
    }

    fn note_reset(&mut self, outcome: EdgeOutcome) -> EdgeOutcome {
        match outcome {
            EdgeOutcome::Counted(n) => self.events.emit(&BrickEvent::ResetRequest(n)),
            EdgeOutcome::Destroyed => self.events.emit(&BrickEvent::ConfigDestroyed),
            EdgeOutcome::Ignored | EdgeOutcome::Bounce => {}
        }
        outcome
    }

    pub fn setup_ops(&mut self) -> SetupOps<'_, P> {
        SetupOps {
            durable: &mut self.durable,
            warm: &mut self.warm,
            radio: &mut self.radio,
            http: &mut self.http,
            clock: &mut self.clock,
            system: &self.system,
            features: &self.features,
            connection: &mut self.connection,
        }
    }

    fn restart(&mut self, reason: RestartReason) -> ! {
        self.events.emit(&BrickEvent::Restarting(reason));
        self.system.restart()
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &OsConfig {
        &self.config
    }

    pub fn is_cold_boot(&self) -> bool {
        self.cold_boot
    }

    pub fn durable(&self) -> &DurableRegions<P::Storage> {
        &self.durable
    }

    pub fn durable_mut(&mut self) -> &mut DurableRegions<P::Storage> {
        &mut self.durable
    }

    pub fn warm(&self) -> &WarmRegion<P::Warm, WarmState> {
        &self.warm
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    pub fn radio(&self) -> &P::Radio {
        &self.radio
    }

    pub fn http(&self) -> &P::Http {
        &self.http
    }

    pub fn activator(&self) -> &P::Activator {
        &self.activator
    }

    pub fn flash(&self) -> &P::Flash {
        &self.flash
    }

    pub fn clock(&self) -> &P::Clock {
        &self.clock
    }

    pub fn led(&self) -> &P::Led {
        &self.led
    }

    pub fn events(&self) -> &P::Events {
        &self.events
    }

    /// Tear the brick down to its adapters, as a restart would.
    pub fn into_ports(self) -> Ports<P> {
        Ports {
            storage: self.durable.into_storage(),
            warm: self.warm.into_memory(),
            radio: self.radio,
            http: self.http,
            activator: self.activator,
            flash: self.flash,
            clock: self.clock,
            led: self.led,
            system: self.system,
            events: self.events,
        }
    }
}
