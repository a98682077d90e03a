pub mod error;
pub mod state;

pub use error::{Result, TegraError};
pub use state::{Device, Reading, SamplerState, Snapshot, StopReason};
