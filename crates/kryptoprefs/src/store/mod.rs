//! Backing stores for preference files
//!
//! This module provides two backends:
//! 1. JSON file per preference name (persistent)
//! 2. In-memory map (tests, ephemeral data)
//!
//! Stores only see hashed entry names and already-encrypted values.

mod traits;
mod file;
mod memory;

pub use traits::PreferenceStore;
pub use file::{default_prefs_dir, FilePreferenceStore};
pub use memory::MemoryPreferenceStore;
