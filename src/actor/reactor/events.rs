pub mod command;
pub mod output;
pub mod toplevel;
