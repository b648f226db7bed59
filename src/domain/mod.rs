pub mod channel;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod net;
pub mod node;
pub mod schedule;
pub mod sim;
pub mod utils;
