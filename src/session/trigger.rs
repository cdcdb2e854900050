use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::dom::dom_model::NodeId;
use crate::screen::screen_model::{Region, RegionKind};

/// How long Success/Failure stays visible before reverting to Idle.
pub const DEFAULT_REVERT_AFTER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("trigger is busy processing a fill")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerState {
    Idle,
    Processing,
    Success,
    Failure,
}

impl TriggerState {
    pub fn label(self) -> &'static str {
        match self {
            TriggerState::Idle => "🤖 Auto Fill with LLM",
            TriggerState::Processing => "🔄 Processing...",
            TriggerState::Success => "✅ Filled!",
            TriggerState::Failure => "❌ Failed",
        }
    }
}

/// Per-region fill button. Time is always passed in, never read here.
#[derive(Debug, Clone)]
pub struct Trigger {
    state: TriggerState,
    settled_at: Option<Instant>,
    revert_after: Duration,
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new(DEFAULT_REVERT_AFTER)
    }
}

impl Trigger {
    pub fn new(revert_after: Duration) -> Self {
        Self {
            state: TriggerState::Idle,
            settled_at: None,
            revert_after,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn label(&self) -> &'static str {
        self.state.label()
    }

    pub fn is_disabled(&self) -> bool {
        self.state == TriggerState::Processing
    }

    /// Enter Processing. Refused while a fill is already running; allowed
    /// from Success/Failure without waiting for the revert.
    pub fn begin(&mut self) -> Result<(), TriggerError> {
        if self.is_disabled() {
            return Err(TriggerError::Busy);
        }
        self.state = TriggerState::Processing;
        self.settled_at = None;
        Ok(())
    }

    pub fn succeed(&mut self, now: Instant) {
        self.settle(TriggerState::Success, now);
    }

    pub fn fail(&mut self, now: Instant) {
        self.settle(TriggerState::Failure, now);
    }

    fn settle(&mut self, state: TriggerState, now: Instant) {
        self.state = state;
        self.settled_at = Some(now);
    }

    /// Revert a settled trigger to Idle once `revert_after` has passed.
    /// Returns true when the state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.settled_at {
            Some(at) if now.saturating_duration_since(at) >= self.revert_after => {
                self.state = TriggerState::Idle;
                self.settled_at = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Region keys
// ============================================================================

/// Identity of a region across rescans: its root plus a fingerprint of the
/// controls it owns, so two look-alike forms never share a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegionKey {
    pub root: NodeId,
    pub fingerprint: String,
}

impl RegionKey {
    pub fn for_region(region: &Region) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(match region.kind {
            RegionKind::Form => b"form".as_slice(),
            RegionKind::Container => b"container".as_slice(),
        });
        for control in &region.controls {
            hasher.update(control.kind.tag().as_bytes());
            hasher.update(b"|");
            hasher.update(control.input_type.as_bytes());
            hasher.update(b"|");
            hasher.update(control.name.as_deref().unwrap_or("").as_bytes());
            hasher.update(b"|");
            hasher.update(control.id.as_deref().unwrap_or("").as_bytes());
            hasher.update(b";");
        }
        let digest = hasher.finalize();
        let fingerprint = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();

        Self {
            root: region.root,
            fingerprint,
        }
    }
}

impl std::fmt::Display for RegionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}-{}", self.root.index(), self.fingerprint)
    }
}

/// At most one trigger per region key.
#[derive(Debug)]
pub struct TriggerRegistry {
    triggers: HashMap<RegionKey, Trigger>,
    revert_after: Duration,
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REVERT_AFTER)
    }
}

impl TriggerRegistry {
    pub fn new(revert_after: Duration) -> Self {
        Self {
            triggers: HashMap::new(),
            revert_after,
        }
    }

    /// Attach a trigger for `key` unless one exists. Returns true when a new
    /// trigger was created.
    pub fn ensure(&mut self, key: RegionKey) -> bool {
        if self.triggers.contains_key(&key) {
            return false;
        }
        self.triggers.insert(key, Trigger::new(self.revert_after));
        true
    }

    pub fn get(&self, key: &RegionKey) -> Option<&Trigger> {
        self.triggers.get(key)
    }

    pub fn get_mut(&mut self, key: &RegionKey) -> Option<&mut Trigger> {
        self.triggers.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RegionKey> {
        self.triggers.keys()
    }

    /// Tick every trigger; returns how many reverted.
    pub fn tick_all(&mut self, now: Instant) -> usize {
        self.triggers
            .values_mut()
            .map(|t| t.tick(now))
            .filter(|changed| *changed)
            .count()
    }
}
