//! Message lifecycle: send, history, per-viewer soft delete, hard delete.
//!
//! The write path always persists before it fans out, so a client fetching
//! history after a push sees a superset of what was pushed, never a gap.

pub mod db;
pub mod handlers;
