//! Replaying recorded inbound events against in-memory collaborators.
//!
//! Used by the `frame-relay` binary and by tests to exercise whole protocol conversations from
//! JSON.

/// Event scripts and the replay driver.
pub mod script;
