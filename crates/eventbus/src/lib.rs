#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Moduly Eventbus
//!
//! In-process driver for the [`moduly_ports::EventBus`] port: a
//! `DashMap` of per-run `tokio::sync::broadcast` channels (spec §4.2).
//! Out-of-process transport is left to whatever deployment wraps this
//! driver; nothing in this crate is Redis-specific.

pub mod bus;

pub use bus::BroadcastEventBus;
