pub mod file_store;
pub mod job_queue;

pub use file_store::*;
pub use job_queue::*;
