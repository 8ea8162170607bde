pub mod ids;
pub mod patch;
pub mod poll;
