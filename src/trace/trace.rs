use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fill::fill_model::FieldOutcome;

/// One line of the JSONL fill trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub region: String,

    pub selector: Option<String>,
    pub profile_key: Option<String>,
    pub outcome: Option<FieldOutcome>,
}

impl TraceEvent {
    pub fn now(step: u64, region: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            region: region.to_string(),
            selector: None,
            profile_key: None,
            outcome: None,
        }
    }

    pub fn with_selector(mut self, selector: impl ToString) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn with_profile_key(mut self, key: impl ToString) -> Self {
        self.profile_key = Some(key.to_string());
        self
    }

    pub fn with_outcome(mut self, outcome: FieldOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}
