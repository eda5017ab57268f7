//! Shared primitive types used across the refresh engine.

/// Warehouse surrogate key. All entity identifiers are monotonically
/// increasing integers assigned by the generators.
pub type EntityId = i64;

/// The name of a refresh source, keying one watermark row.
pub type SourceName = String;
