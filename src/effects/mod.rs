pub mod behavior;
pub mod engine;
pub mod group;
pub mod ids;
pub mod kinds;
pub mod movement;
pub mod overlap;
pub mod placement;
pub mod presence;
pub mod scheduler;
pub mod slots;
pub mod teardown;
pub mod tickset;
pub mod transfer;
pub mod unit;

pub use engine::{Engine, UnitDamage};
pub use movement::RemovalReason;
pub use placement::PlaceRequest;
pub use scheduler::TickReport;
