pub mod aggregator;
pub mod classifier;
pub mod heuristic;
pub mod screen_model;
