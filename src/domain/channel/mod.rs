pub mod bus;
pub mod listen;
pub mod protocol;
