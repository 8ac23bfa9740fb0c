pub mod confirmation;
pub mod telemetry;
pub mod types;
pub mod utils;
