//! opsbot: a chat-operated helper for inspecting Kubernetes applications.
//!
//! Users bind themselves to an application and namespace, then ask the bot
//! for logs or a description of the pod currently serving it.

pub mod agent;
pub mod bootstrap;
pub mod channels;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod db;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
