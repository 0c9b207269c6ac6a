//! JRE provisioning for containers: installs a verified JRE and derives the
//! `-Xmx` heap flag from the container memory limit.

pub mod config;
pub mod error;
pub mod services;
pub mod templates;
pub mod utils;
