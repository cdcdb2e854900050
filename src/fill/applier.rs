use std::time::Duration;

use tracing::{debug, info};

use crate::dom::dom_model::{Document, EventType, NodeId};
use crate::fill::fill_model::{FieldOutcome, FieldResult, FillReport, FormMapping};
use crate::fill::selector::{Selector, resolve};
use crate::profile::profile_model::ProfileSource;
use crate::screen::classifier::is_eligible_control;
use crate::screen::screen_model::PruneRules;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Delay between consecutive field writes.
pub const DEFAULT_FIELD_DELAY: Duration = Duration::from_millis(50);

/// Events dispatched after each write, in this exact order.
const FILL_EVENTS: [EventType; 3] = [EventType::Input, EventType::Change, EventType::Blur];

/// Writes profile values into resolved controls, one field at a time.
pub struct Applier {
    pub rules: PruneRules,
    pub field_delay: Duration,
    pub tracer: Option<TraceLogger>,
}

impl Default for Applier {
    fn default() -> Self {
        Self {
            rules: PruneRules::default(),
            field_delay: DEFAULT_FIELD_DELAY,
            tracer: None,
        }
    }
}

impl Applier {
    pub fn new(rules: PruneRules, field_delay: Duration) -> Self {
        Self {
            rules,
            field_delay,
            tracer: None,
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Apply `mapping` to the region rooted at `root`.
    ///
    /// Entries are processed strictly in mapping order. A missing or empty
    /// profile value, or a selector that does not land on a fillable control,
    /// skips that entry only.
    pub fn apply(
        &self,
        doc: &mut Document,
        root: NodeId,
        region_key: &str,
        mapping: &FormMapping,
        profile: &ProfileSource,
    ) -> FillReport {
        let mut report = FillReport::default();

        for (step, (raw_selector, profile_key)) in mapping.iter().enumerate() {
            let (outcome, target) = self.apply_entry(doc, root, raw_selector, profile_key, profile);

            debug!(selector = raw_selector, profile_key, ?outcome, "mapping entry");
            if let Some(tracer) = &self.tracer {
                tracer.log(
                    &TraceEvent::now(step as u64, region_key)
                        .with_selector(raw_selector)
                        .with_profile_key(profile_key)
                        .with_outcome(outcome),
                );
            }

            report.results.push(FieldResult {
                selector: raw_selector.to_string(),
                profile_key: profile_key.to_string(),
                outcome,
                target,
            });
        }

        info!(
            region = region_key,
            filled = report.filled(),
            entries = mapping.len(),
            "fill complete"
        );
        report
    }

    fn apply_entry(
        &self,
        doc: &mut Document,
        root: NodeId,
        raw_selector: &str,
        profile_key: &str,
        profile: &ProfileSource,
    ) -> (FieldOutcome, Option<NodeId>) {
        let value = match profile.value_for(profile_key) {
            Some(v) if !v.is_empty() => v,
            _ => return (FieldOutcome::SkippedEmptyValue, None),
        };

        let selector = Selector::parse(raw_selector);
        let target = match resolve(doc, root, &selector, &self.rules) {
            Some(node) if is_eligible_control(doc, node) => node,
            _ => return (FieldOutcome::SkippedUnresolved, None),
        };

        fill_control(doc, target, value);
        if !self.field_delay.is_zero() {
            std::thread::sleep(self.field_delay);
        }
        (FieldOutcome::Filled, Some(target))
    }
}

/// Set a control's value and notify the page as if the user had typed it.
pub fn fill_control(doc: &mut Document, target: NodeId, value: &str) {
    doc.set_value(target, value);
    for event in FILL_EVENTS {
        doc.dispatch_event(target, event);
    }
}
