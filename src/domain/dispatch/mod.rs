pub mod dispatcher;
pub mod launcher;
