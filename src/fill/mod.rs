pub mod applier;
pub mod fill_model;
pub mod sanitizer;
pub mod selector;
