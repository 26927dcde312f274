pub mod job;

pub use job::{CurationResult, JobField, JobRecord};
