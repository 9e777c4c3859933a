pub mod telemetry;
pub mod zone;

pub use telemetry::*;
pub use zone::*;
