// Drive detection and operations module
//
// Organized structure:
// - detection.rs: Whole-disk enumeration and media classification
// - types/: Media-specific wipe strategies (HDD, SSD)
// - operations/: External tool wrappers (discard, overwrite, secure erase, unmount)

// Core functionality
pub mod detection;


// Drive types
pub mod types;

// Drive operations
pub mod operations;

pub use detection::DriveDetector;

pub use types::{HDDWipe, SSDWipe};

pub use operations::{
    ATASecureErase, DriveCommands, OverwriteOperations, SystemCommands, TrimOperations,
    UnmountOperations,
};
