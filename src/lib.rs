//! Latlab - synthetic latency and payload server
//!
//! Serves placeholder stylesheets, scripts, images and JSON endpoints after
//! an artificial delay, so a frontend can compare perceived latency across
//! simulated protocols and network conditions.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::field_reassign_with_default,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod latency;
pub mod network;
pub mod params;
pub mod payload;
pub mod response;

pub use error::{LabError, Result};
