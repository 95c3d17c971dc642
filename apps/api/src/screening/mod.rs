pub mod batch;
pub mod candidate;
pub mod handlers;
