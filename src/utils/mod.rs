pub mod common;
pub mod path;
pub mod sanitize;
