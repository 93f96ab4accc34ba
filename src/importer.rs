pub mod forest;
pub mod processor;
pub mod report;

pub use forest::CodeForest;
pub use processor::{MissingParentPolicy, Processor, ProcessorParams};
pub use report::{NodeOutcome, RunReport};
