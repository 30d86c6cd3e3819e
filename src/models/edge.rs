// src/models/edge.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered `parent -> child` link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

impl Edge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// Stored form of an edge, keyed on `(parent, child)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub parent: String,
    pub child: String,
    /// Number of times the edge has been upserted
    pub occurrences: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl EdgeRecord {
    /// First insert of an edge.
    pub fn first(edge: &Edge, now: DateTime<Utc>) -> Self {
        Self {
            parent: edge.parent.clone(),
            child: edge.child.clone(),
            occurrences: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Record another occurrence. Identity fields are left alone.
    pub fn bump(&mut self, now: DateTime<Utc>) {
        self.occurrences += 1;
        self.last_seen = now;
    }
}
