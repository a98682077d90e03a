pub mod rolling;

pub use rolling::{RollingStat, StatSummary};
