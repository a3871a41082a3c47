pub mod engine;
pub mod plan;
pub mod report;


pub use engine::{SyncEngine, SyncOptions};
pub use report::SyncReport;
