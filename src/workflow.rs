pub mod engine;
pub mod transition;
