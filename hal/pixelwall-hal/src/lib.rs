//! Pixelwall Hardware Abstraction Layer
//!
//! This crate defines the ports the board-agnostic engine talks to. Board
//! support code implements them for a concrete LED matrix, flash chip and
//! time source; tests implement them with fakes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Engine (pixelwall-core)                │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pixelwall-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board crate  │       │  host fakes   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`storage::KeyValueStore`] - Persistent key/value store
//! - [`clock::Clock`] - Uptime and local wall-clock time
//! - [`display::FrameBuffer`] - Pixel matrix frame buffer

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod display;
#[cfg(feature = "flash")]
pub mod flash;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
pub use display::FrameBuffer;
#[cfg(feature = "flash")]
pub use flash::FlashStore;
pub use storage::{KeyValueStore, NoopStore, StorageError, StorageKey};
