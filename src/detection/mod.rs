pub mod parser;
pub mod threshold;

pub use parser::AttemptParser;
pub use threshold::ThresholdCounter;
