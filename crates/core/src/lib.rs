//! Domain types for weave jobs.
//!
//! Pure data: the asset bundle a caller assembles (primary media, sound
//! palette, numeric configuration), the job-lifecycle vocabulary (states,
//! progress events, terminal outcomes), and the validation errors raised
//! before a submission touches the network. No IO lives in this crate.

pub mod bundle;
pub mod config;
pub mod error;
pub mod job;
