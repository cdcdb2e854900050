pub mod controller;
pub mod mutation;
pub mod scheduler;
pub mod trigger;
