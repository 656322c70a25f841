//! The compositor's layer tree, as seen by the relay.

/// In-memory layer tree for tests, replays and embedders' own harnesses.
pub mod memory;
/// Layer-tree collaborator trait and texture mailboxes.
pub mod tree;
