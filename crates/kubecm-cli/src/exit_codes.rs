//! Standard exit codes for CLI operations
//!
//! Failures of the external tools exit with the tool's own code instead.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - invalid release options or lookup key
pub const VALIDATION_ERROR: i32 = 2;

/// Template error - data template rendering failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Data error - invalid kubecm.yaml, data layer or resource
pub const DATA_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
