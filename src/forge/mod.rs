//! Forge Client — GitHub repo/branch creation and probing (spec.md §4.1).

mod client;
mod credentials;
mod error;

pub use client::Client;
pub use credentials::{Credential, source_credential};
pub use error::{Existence, ForgeError, OwnerKind, TokenValidity};
