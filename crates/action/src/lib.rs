#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Action
//!
//! The uniform node execution contract the engine schedules against
//! (spec §4.1, §9): an [`Action`] receives an [`ActionContext`] and
//! returns an [`ActionOutput`] or an error. Node types themselves (HTTP
//! request, transform, if-branch, ...) live outside this crate and are
//! registered with the engine by type tag.

pub mod action;
pub mod context;
pub mod metadata;
pub mod result;

pub use action::Action;
pub use context::ActionContext;
pub use metadata::ActionMetadata;
pub use result::ActionOutput;
