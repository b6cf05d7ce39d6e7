pub mod analytics;
pub mod intent;
pub mod orchestrator;
pub mod report;
pub mod response;
pub mod sqlgen;
pub mod viz;
