use thiserror::Error;

/// The error taxonomy of the catalog and graph engine.
///
/// Every operation either completes fully or returns one of these kinds with
/// no partial mutation left behind. Message formatting for users is the
/// caller's concern; the variants carry the data needed to format one.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The resource path is syntactically malformed.
    #[error("Bad descriptor path: {0}")]
    BadDescriptorPath(String),

    /// Well-formed path, but no such database exists.
    #[error("Invalid database name: '{0}'")]
    InvalidDatabaseName(String),

    /// Well-formed path, but no such branch exists.
    #[error("Invalid branch name: '{0}'")]
    InvalidBranchName(String),

    /// A named resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A create collided with an existing resource.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The organization still owns databases and cannot be deleted.
    #[error("The organization {0} still owns databases and cannot be deleted")]
    OrganizationNotEmpty(String),

    /// The authorization gate denied the action.
    #[error("Subject '{subject}' is not authorized to {action} {resource}")]
    Unauthorized {
        subject: String,
        action: String,
        resource: String,
    },

    /// A write was rejected by schema enforcement rules.
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// The default branch cannot be deleted.
    #[error("The default branch '{0}' cannot be deleted")]
    DefaultBranchProtected(String),

    /// An opaque storage-layer failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
