//! Error types for the diff and planning engine.

/// Errors that can occur while diffing catalogs or planning a script.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The dependency graph over the change set contains a cycle that
    /// cannot be linearized. The participating stable identifiers are
    /// reported so the offending objects can be inspected.
    #[error("unresolvable dependency cycle involving: {}", .ids.join(", "))]
    DependencyCycle {
        /// Stable identifiers of the changes stuck in the cycle.
        ids: Vec<String>,
    },

    /// A single GRANT/REVOKE was asked to mix grantable and
    /// non-grantable privileges, which SQL cannot express in one
    /// statement.
    #[error("cannot mix grantable and non-grantable privileges in one statement for {object}")]
    MixedGrantability {
        /// Stable identifier of the privilege target.
        object: String,
    },

    /// A privilege change was constructed with an empty privilege list.
    #[error("privilege change for {object} carries no privileges")]
    EmptyPrivileges {
        /// Stable identifier of the privilege target.
        object: String,
    },

    /// Failed to parse a catalog snapshot.
    #[error("invalid catalog snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// IO error while reading a snapshot file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for diff and planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;
