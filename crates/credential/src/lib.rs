#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Credential
//!
//! The `Credential`/`Model` verification join used by the `LLMService`
//! node type's fail-closed credential resolution (spec §9c). Credential
//! CRUD, encryption at rest, and rotation are external collaborators
//! (spec §1 Non-goals) this crate does not implement.

pub mod context;
pub mod metadata;
pub mod resolver;
pub mod verification;

pub use context::CredentialContext;
pub use metadata::CredentialMetadata;
pub use resolver::resolve_credential;
pub use verification::{ModelVerification, VerificationRepo};
