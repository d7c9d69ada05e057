pub mod cache_operations;
pub mod operation;
