pub mod batch;
pub mod import;
pub mod resolution;
pub mod store;
