pub mod network;
pub mod sim_launcher;
