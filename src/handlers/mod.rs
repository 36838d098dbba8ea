pub mod file;
pub mod health;
