pub mod pattern_loader;
pub mod sample_loader;
