//! Page state engine: async page sources and the threaded machine driver.
mod engine;
mod fetch;
mod reachability;
mod retry;
mod types;

pub use engine::PageStateDriver;
pub use fetch::{AsyncPageSource, RuntimePageSource};
pub use reachability::{Reachability, ReachabilityGate, StaticReachability};
pub use retry::RetryOnce;
pub use types::{DriverError, DriverSettings, DriverSnapshot};
