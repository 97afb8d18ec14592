pub mod format;
pub mod paths;
