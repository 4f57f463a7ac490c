//! # Biglietti
//!
//! `biglietti` is a small ticketing REST backend. Tickets and users are plain
//! CRUD; the interesting part is the authentication and authorization
//! subsystem:
//!
//! - **Stateless tokens**: signed, time-bound access/refresh pairs. No
//!   server-side session store; a token is valid until it expires or the
//!   subject account is deactivated.
//! - **Auth gate**: every request resolves to `Anonymous` or
//!   `Authenticated(user)` by decoding the bearer token and re-reading the
//!   live user row, so deactivation and role changes take effect on the very
//!   next request.
//! - **Authorization policy**: pure decision functions gating ticket and user
//!   mutations (admin-or-creator for tickets, allow-listed self-updates,
//!   admin self-delete prohibition).
//!
//! There is intentionally no revocation list: deactivating an account is the
//! only instant-revocation mechanism.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
