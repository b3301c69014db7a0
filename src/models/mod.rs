pub mod job;
pub mod target;
