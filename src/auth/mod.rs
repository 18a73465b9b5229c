//! Authentication: user accounts, bcrypt password hashing and JWT sessions.
//!
//! The same token issued here is presented both as the HTTP bearer
//! credential and in the socket `setup` event, so the realtime layer binds
//! identities from a verified credential rather than a client-asserted id.

pub mod handlers;
pub mod sessions;
pub mod users;

pub use handlers::{get_me, login, signup};
pub use sessions::{create_token, verify_token, Claims};
