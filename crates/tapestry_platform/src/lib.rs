#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! Read client for the external chat platform.
//!
//! The platform is the source of truth for threads, messages, and reactions.
//! This crate provides the [`PlatformGateway`] trait the backfill engine
//! consumes, the [`HttpPlatformClient`] implementation, and the serde wire
//! models shared with the live event feed.

mod client;
mod gateway;
mod wire;

pub use client::HttpPlatformClient;
pub use gateway::{PAGE_SIZE, PlatformGateway};
pub use wire::{WireChannel, WireMessage, WireReaction, WireThread, WireUser};
