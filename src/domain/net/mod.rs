pub mod probe;
pub mod scanner;
pub mod selector;
