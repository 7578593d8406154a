pub mod outcome;
pub mod request;

pub use outcome::FetchOutcome;
pub use request::{CleanOptions, FetchRequest, StrategyId};
