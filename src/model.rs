pub mod container;
pub mod output;
pub mod tag;
pub mod toplevel;
