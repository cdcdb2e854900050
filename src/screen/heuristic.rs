use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::screen::screen_model::ControlNode;

static FORM_LIKE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)name", r"(?i)email", r"(?i)phone", r"(?i)address", r"(?i)city", r"(?i)state",
        r"(?i)zip", r"(?i)postal", r"(?i)first", r"(?i)last", r"(?i)company", r"(?i)job",
        r"(?i)birth", r"(?i)date", r"(?i)passport", r"(?i)license", r"(?i)id", r"(?i)ssn",
        r"(?i)tax", r"(?i)card", r"(?i)member", r"(?i)payment", r"(?i)billing",
        r"(?i)shipping", r"(?i)account", r"(?i)user", r"(?i)login", r"(?i)register",
        r"(?i)signup",
    ])
    .expect("form-like patterns are valid")
});

static FILTER_LIKE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)filter", r"(?i)search", r"(?i)query", r"(?i)find", r"(?i)sort", r"(?i)tag",
    ])
    .expect("filter-like patterns are valid")
});

/// Per-group pattern hit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormLikeness {
    pub total: usize,
    pub form_like: usize,
    pub filter_like: usize,
}

impl FormLikeness {
    /// One positive anywhere is enough; a filter signal only vetoes when
    /// every control carries it.
    pub fn accepted(&self) -> bool {
        self.form_like > 0 && self.filter_like < self.total
    }
}

pub fn score(controls: &[ControlNode]) -> FormLikeness {
    let mut form_like = 0;
    let mut filter_like = 0;

    for control in controls {
        let text = control.composite_text();
        if FORM_LIKE.is_match(&text) {
            form_like += 1;
        }
        if FILTER_LIKE.is_match(&text) {
            filter_like += 1;
        }
    }

    FormLikeness {
        total: controls.len(),
        form_like,
        filter_like,
    }
}

/// Whether a group of controls looks like genuine data entry rather than a
/// search or filter widget.
pub fn is_form_like(controls: &[ControlNode]) -> bool {
    score(controls).accepted()
}
