pub mod traits;

// Re-export commonly used types
pub use traits::{downcast_unit, ProcessUnit};
