//! Backup creation and rotation pipeline.

pub mod archiver;
pub mod rotation;

pub use archiver::BackupArchiver;
pub use rotation::BackupRotator;
