//! The message migration pipeline: collect → resolve thread → replay → delete.

pub mod collector;
pub mod coordinator;
pub mod deletion;
pub mod replicator;
pub mod report;
pub mod request;
pub mod resolver;

pub use coordinator::MigrationCoordinator;
pub use report::{MigrationOutcome, MigrationReport};
pub use request::{MigrationRequest, ResponsePlan};
