//! Decision logic of the fever monitor
//!
//! - [`threshold`]: per-device comparison value, or the configured default
//! - [`alert`]: the NONE / ACTIVE alert state machine
//! - [`status`]: live status derived from the latest reading

pub mod alert;
pub mod status;
pub mod threshold;
