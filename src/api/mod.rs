//! Statement API
//!
//! The statement object handed to the host, the parameter binder behind its
//! `bind_parameters`, and statement configuration.

mod bind;
mod config;
mod stmt;

pub use bind::*;
pub use config::*;
pub use stmt::*;
