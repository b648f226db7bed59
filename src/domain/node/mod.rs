pub mod access;
pub mod snapshot;
