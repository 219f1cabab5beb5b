pub mod host;
pub mod scenario;

pub use host::{HostEvent, SimHost};
pub use scenario::{Scenario, ScenarioSummary};
