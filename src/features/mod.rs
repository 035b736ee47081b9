//! Feature plugins.
//!
//! A feature contributes to the report, consumes server feedback and may
//! ask for a longer Activator window.  Each one owns the durable region
//! named after it.  The OS calls every feature in registration order at
//! fixed points of the boot cycle and never re-enters one.
//!
//! The set of features is closed: [`BrickFeature`] lists every variant the
//! firmware can carry and [`FeatureRegistry`] dispatches to them.

pub mod delay;

use core::fmt;

use heapless::Vec;
use serde_json::{Map, Value};

use crate::app::ports::StoragePort;
use crate::net::protocol::Document;
use crate::persist::DurableRegions;

pub use delay::DelayFeature;

/// Most features a single firmware image registers.
pub const MAX_FEATURES: usize = 8;

/// Capabilities every feature provides.
pub trait Feature {
    /// Durable region name and report key namespace.
    fn name(&self) -> &'static str;
    fn version(&self) -> &'static str;

    /// Once per boot, before any network activity.  Fill in region defaults.
    fn begin(&mut self, _region: &mut Map<String, Value>) {}

    /// Once the radio join has been started.
    fn start(&mut self) {}

    /// Add this feature's values to the outbound report.
    fn deliver(&mut self, _report: &mut Document) {}

    /// Consume server (or Activator) feedback.  Returns `true` if the
    /// durable configuration must be persisted.
    fn feedback(&mut self, _doc: &Document, _region: &mut Map<String, Value>) -> bool {
        false
    }

    /// After the exchange, before the Activator window.
    fn end(&mut self) {}

    /// Seconds this feature wants the Activator window kept open.
    fn activator_window_secs(&self) -> u32 {
        0
    }

    /// Brick type id announced on the configuration console.
    fn brick_type(&self) -> Option<u16> {
        None
    }

    fn print_warm(&self, _out: &mut dyn fmt::Write) -> fmt::Result {
        Ok(())
    }

    fn print_durable(&self, region: &Map<String, Value>, out: &mut dyn fmt::Write) -> fmt::Result {
        for (k, v) in region {
            writeln!(out, "  {}.{} = {}", self.name(), k, v)?;
        }
        Ok(())
    }
}

/// Every feature this firmware knows about.
#[derive(Debug, Clone)]
pub enum BrickFeature {
    Delay(DelayFeature),
}

impl BrickFeature {
    fn inner(&self) -> &dyn Feature {
        match self {
            Self::Delay(f) => f,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Feature {
        match self {
            Self::Delay(f) => f,
        }
    }
}

/// Ordered set of registered features.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: Vec<BrickFeature, MAX_FEATURES>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature.  Returns it back if the registry is full.
    pub fn register(&mut self, feature: BrickFeature) -> Result<(), BrickFeature> {
        self.features.push(feature)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn begin<S: StoragePort>(&mut self, durable: &mut DurableRegions<S>) {
        for f in &mut self.features {
            let f = f.inner_mut();
            let name = f.name();
            f.begin(durable.region(name));
        }
    }

    pub fn start(&mut self) {
        self.features.iter_mut().for_each(|f| f.inner_mut().start());
    }

    pub fn deliver(&mut self, report: &mut Document) {
        self.features
            .iter_mut()
            .for_each(|f| f.inner_mut().deliver(report));
    }

    /// Dispatch `doc` to every feature.  Returns `true` if any requested a
    /// durable write.
    pub fn feedback<S: StoragePort>(
        &mut self,
        doc: &Document,
        durable: &mut DurableRegions<S>,
    ) -> bool {
        let mut write = false;
        for f in &mut self.features {
            let f = f.inner_mut();
            let name = f.name();
            write |= f.feedback(doc, durable.region(name));
        }
        write
    }

    pub fn end(&mut self) {
        self.features.iter_mut().for_each(|f| f.inner_mut().end());
    }

    /// Longest window any feature asks for.
    pub fn activator_window_secs(&self) -> u32 {
        self.features
            .iter()
            .map(|f| f.inner().activator_window_secs())
            .max()
            .unwrap_or(0)
    }

    /// Type of the first feature that declares one.
    pub fn brick_type(&self) -> Option<u16> {
        self.features.iter().find_map(|f| f.inner().brick_type())
    }

    /// `(name, version)` of every feature, in registration order.
    pub fn versions(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.features
            .iter()
            .map(|f| (f.inner().name(), f.inner().version()))
    }

    pub fn print_warm(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        self.features
            .iter()
            .try_for_each(|f| f.inner().print_warm(out))
    }

    pub fn print_durable<S: StoragePort>(
        &self,
        durable: &DurableRegions<S>,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        let empty = Map::new();
        for f in &self.features {
            let f = f.inner();
            f.print_durable(durable.region_ref(f.name()).unwrap_or(&empty), out)?;
        }
        Ok(())
    }
}
