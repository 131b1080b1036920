pub mod layouts;
pub mod parse;
pub mod process;
