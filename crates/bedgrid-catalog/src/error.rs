//! Error types for catalog loading.

use bedgrid_types::HospitalId;

/// Errors that can occur while building a [`crate::Catalog`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to read the catalog file from disk.
    #[error("failed to read catalog file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("failed to parse catalog JSON: {source}")]
    Json {
        /// The underlying JSON parse error.
        #[from]
        source: serde_json::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse catalog YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// The source contained no profiles.
    #[error("catalog contains no hospitals")]
    Empty,

    /// Two profiles share an id.
    #[error("duplicate hospital id {id}")]
    DuplicateId {
        /// The repeated id.
        id: HospitalId,
    },

    /// A profile carries numbers the simulation cannot work with.
    #[error("invalid profile for hospital {id}: {reason}")]
    InvalidProfile {
        /// The offending hospital.
        id: HospitalId,
        /// What is wrong with it.
        reason: String,
    },
}
