//! Search orchestration: independent retrieval strategies plus the engine
//! that fans queries out, merges, and ranks.

pub mod engine;
pub mod strategies;

pub use engine::{EngineStats, SearchEngine, SearchOptions};
pub use strategies::DEFAULT_FUZZY_THRESHOLD;
