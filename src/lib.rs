#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod actions;
pub mod app;
pub mod audit;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod feed;
pub mod http;
pub mod oracle;
pub mod scheduler;
pub mod session;
pub mod social;

pub use config::Config;
pub use error::WardenError;
