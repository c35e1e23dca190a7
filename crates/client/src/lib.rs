//! Client library for the weaving service.
//!
//! Provides the multipart upload wrapper, the WebSocket progress channel
//! with typed message classification, the job controller state machine
//! that sequences the two, and a demo asset loader for pre-populating a
//! bundle from static storage.

pub mod channel;
pub mod controller;
pub mod demo;
pub mod endpoints;
pub mod messages;
pub mod upload;
