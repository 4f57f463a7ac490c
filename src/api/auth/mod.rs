//! Authentication and authorization.
//!
//! Credentials live in `password`, stateless tokens in `token`, issuance in
//! `session`, per-request enforcement in `principal`, and resource-level
//! decisions in `policy`. `state` holds the process-wide signing
//! configuration shared by all of them.

pub mod state;
pub mod types;

pub(crate) mod password;
pub(crate) mod policy;
pub(crate) mod principal;
pub(crate) mod session;
pub(crate) mod storage;
pub(crate) mod token;

pub use self::state::AuthConfig;
pub use self::principal::Principal;
