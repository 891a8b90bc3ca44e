pub mod check;
pub mod config;
pub mod constants;
pub mod env_file;
pub mod error;
pub mod host;
pub mod ownership;
pub mod permissions;
pub mod provision;
pub mod runner;
pub mod scaffold;
pub mod service;
pub mod sync;

pub use error::{Result, RiggerError};
