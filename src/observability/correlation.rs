//! Correlation ID allocation.
//!
//! Every inbound request gets a fresh UUID v4. Allocation needs no shared
//! counter, so any number of concurrent requests can call it at once.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Opaque per-request correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of correlation IDs.
pub trait CorrelationAllocator: Send + Sync {
    fn allocate(&self) -> CorrelationId;
}

/// Allocates random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidAllocator;

impl CorrelationAllocator for UuidAllocator {
    fn allocate(&self) -> CorrelationId {
        CorrelationId(Uuid::new_v4().to_string())
    }
}
