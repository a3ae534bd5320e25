#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod app;
pub mod audit;
pub mod cli;
pub mod command;
pub mod config;
pub mod containment;
pub mod device;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod events;
pub mod lock;
pub mod platform;
pub mod transport;
pub mod uplink;
pub mod wifi;

pub use config::Config;
pub use engine::DeviceEngine;
pub use error::{AgentError, ErrorKind};
