pub mod assess;
pub mod entry;
pub mod planner;
