use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dom::dom_model::{Document, NodeId};
use crate::error::{AutofillError, Result};
use crate::fill::applier::{Applier, DEFAULT_FIELD_DELAY};
use crate::fill::fill_model::FillReport;
use crate::fill::sanitizer::describe_region;
use crate::oracle::{MappingOracle, MappingRequest};
use crate::profile::profile_model::ProfileSource;
use crate::profile::store::ProfileStore;
use crate::screen::aggregator::detect_and_mark;
use crate::screen::screen_model::{DetectionConfig, Region};
use crate::session::mutation::needs_rescan;
use crate::session::scheduler::{DEFAULT_DEBOUNCE, RescanScheduler};
use crate::session::trigger::{DEFAULT_REVERT_AFTER, RegionKey, Trigger, TriggerRegistry};

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutofillSettings {
    /// Master switch; when off, detection never runs.
    pub enabled: bool,
    /// Fill newly detected regions without waiting for a trigger press.
    pub auto_fill: bool,
}

impl Default for AutofillSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_fill: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub settings: AutofillSettings,
    pub detection: DetectionConfig,
    pub debounce: Duration,
    pub field_delay: Duration,
    pub revert_after: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settings: AutofillSettings::default(),
            detection: DetectionConfig::default(),
            debounce: DEFAULT_DEBOUNCE,
            field_delay: DEFAULT_FIELD_DELAY,
            revert_after: DEFAULT_REVERT_AFTER,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// One page under autofill: detection, triggers, rescans and fills.
///
/// All timing is driven by the `now` values callers pass in.
pub struct AutofillSession {
    doc: Document,
    settings: AutofillSettings,
    detection: DetectionConfig,
    oracle: Box<dyn MappingOracle>,
    store: Box<dyn ProfileStore>,
    applier: Applier,
    triggers: TriggerRegistry,
    scheduler: RescanScheduler,
    regions: Vec<(RegionKey, Region)>,
}

impl AutofillSession {
    pub fn new(
        doc: Document,
        oracle: Box<dyn MappingOracle>,
        store: Box<dyn ProfileStore>,
        options: SessionOptions,
    ) -> Self {
        let applier = Applier::new(options.detection.prune.clone(), options.field_delay);
        Self {
            doc,
            settings: options.settings,
            detection: options.detection,
            oracle,
            store,
            applier,
            triggers: TriggerRegistry::new(options.revert_after),
            scheduler: RescanScheduler::new(options.debounce),
            regions: Vec::new(),
        }
    }

    pub fn with_applier(mut self, applier: Applier) -> Self {
        self.applier = applier;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn store(&self) -> &dyn ProfileStore {
        self.store.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled && self.store.enabled()
    }

    /// Regions found by the most recent scan, with their keys.
    pub fn regions(&self) -> &[(RegionKey, Region)] {
        &self.regions
    }

    pub fn trigger(&self, key: &RegionKey) -> Option<&Trigger> {
        self.triggers.get(key)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn scheduler(&self) -> &RescanScheduler {
        &self.scheduler
    }

    /// Run a detection pass, attach triggers to new regions and, when
    /// auto-fill is on, fill regions seen for the first time.
    pub fn scan(&mut self, now: Instant) -> Vec<RegionKey> {
        if !self.is_enabled() {
            debug!("autofill disabled, skipping detection");
            self.regions.clear();
            return Vec::new();
        }

        let regions = detect_and_mark(&mut self.doc, &self.detection);
        let mut fresh = Vec::new();
        self.regions = regions
            .into_iter()
            .map(|region| {
                let key = RegionKey::for_region(&region);
                if self.triggers.ensure(key.clone()) && !region.already_processed {
                    fresh.push(key.clone());
                }
                (key, region)
            })
            .collect();

        info!(
            regions = self.regions.len(),
            new = fresh.len(),
            "detection pass"
        );

        if self.settings.auto_fill {
            for key in &fresh {
                if let Err(e) = self.fill_region(key, now) {
                    warn!(region = %key, error = %e, "auto-fill failed");
                }
            }
        }

        self.regions.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Drain the document's mutation log and arm a rescan when it matters.
    pub fn notify_mutations(&mut self, now: Instant) -> bool {
        let records = self.doc.take_mutations();
        let relevant = needs_rescan(&self.doc, &records);
        if relevant {
            debug!(records = records.len(), "mutation requests rescan");
            self.scheduler.request(now);
        }
        relevant
    }

    /// Advance time: revert settled triggers and run a due rescan.
    /// Returns the region keys when a rescan ran.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<RegionKey>> {
        self.triggers.tick_all(now);
        if !self.scheduler.start(now) {
            return None;
        }
        let keys = self.scan(now);
        self.scheduler.finish();
        Some(keys)
    }

    /// Press the trigger for `key`: describe, ask the oracle, apply.
    ///
    /// `now` is the instant the fill settles, used for the revert timer. On
    /// error the trigger moves to Failure and fields already written stay.
    pub fn fill_region(&mut self, key: &RegionKey, now: Instant) -> Result<FillReport> {
        let root = self.region_root(key)?;
        self.triggers
            .get_mut(key)
            .ok_or_else(|| AutofillError::RegionNotFound(key.to_string()))?
            .begin()?;

        let outcome = self.run_fill(key, root);

        if let Some(trigger) = self.triggers.get_mut(key) {
            match &outcome {
                Ok(_) => trigger.succeed(now),
                Err(e) => {
                    warn!(region = %key, error = %e, "fill failed");
                    trigger.fail(now);
                }
            }
        }
        outcome
    }

    fn region_root(&self, key: &RegionKey) -> Result<NodeId> {
        self.regions
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, region)| region.root)
            .ok_or_else(|| AutofillError::RegionNotFound(key.to_string()))
    }

    fn run_fill(&mut self, key: &RegionKey, root: NodeId) -> Result<FillReport> {
        let profile = ProfileSource::Categorized(self.store.active_profile()?);

        let request = MappingRequest {
            fields: describe_region(&self.doc, root, &self.detection.prune),
            profile_keys: profile.profile_keys(),
        };
        let mapping = self.oracle.get_mapping(&request)?;
        debug!(region = %key, entries = mapping.len(), "mapping received");

        Ok(self
            .applier
            .apply(&mut self.doc, root, &key.to_string(), &mapping, &profile))
    }
}
