//! Message types exchanged across the broker boundary
//!
//! Requests, results and status payloads shared by the dispatcher, the
//! vacancy sources and the front-ends that call into the broker.

pub mod messages;

pub use messages::*;
