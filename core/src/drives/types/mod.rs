// Media-specific wipe strategies
//
// The orchestrator classifies a disk as rotational or solid-state and hands it
// to one of these.

pub mod hdd;
pub mod ssd;

// Re-exports for convenience
pub use hdd::HDDWipe;
pub use ssd::SSDWipe;
