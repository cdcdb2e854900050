pub mod cli;
pub mod dom;
pub mod error;
pub mod fill;
pub mod oracle;
pub mod profile;
pub mod screen;
pub mod session;
pub mod trace;

pub use error::{AutofillError, Result};
