use crate::error::CatalogError;
use crate::model::vocab::sys;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path literal naming the system database.
pub const SYSTEM_PATH: &str = "_system";

/// Addresses one database's graph set in the store. Branch descriptors map to
/// their database's graph set; branches share graphs and differ by head.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DatabaseRef {
    System,
    User {
        organization: String,
        database: String,
    },
}

impl DatabaseRef {
    pub fn user(organization: impl Into<String>, database: impl Into<String>) -> Self {
        DatabaseRef::User {
            organization: organization.into(),
            database: database.into(),
        }
    }
}

impl fmt::Display for DatabaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseRef::System => write!(f, "{}", SYSTEM_PATH),
            DatabaseRef::User {
                organization,
                database,
            } => write!(f, "{}/{}", organization, database),
        }
    }
}

/// A typed resource identifier produced by descriptor resolution.
///
/// `parse` only ever yields `System`, `Database` or `Branch`; organizations
/// are addressed by bare name in catalog operations and the variant exists so
/// authorization can scope grants at the organization level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Descriptor {
    System,
    Organization {
        organization: String,
    },
    Database {
        organization: String,
        database: String,
    },
    Branch {
        organization: String,
        database: String,
        branch: String,
    },
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Descriptor {
    /// Parse a path string into a typed descriptor. This is purely syntactic;
    /// existence of the named resources is checked by the resolver.
    ///
    /// Accepted shapes are the literal `_system`,
    /// `organization/database` and `organization/database/local/branch/name`.
    pub fn parse(path: &str) -> Result<Self, CatalogError> {
        if path == SYSTEM_PATH {
            return Ok(Descriptor::System);
        }
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            [org, db] if valid_segment(org) && valid_segment(db) => Ok(Descriptor::Database {
                organization: (*org).to_string(),
                database: (*db).to_string(),
            }),
            [org, db, "local", "branch", branch]
                if valid_segment(org) && valid_segment(db) && valid_segment(branch) =>
            {
                Ok(Descriptor::Branch {
                    organization: (*org).to_string(),
                    database: (*db).to_string(),
                    branch: (*branch).to_string(),
                })
            }
            _ => Err(CatalogError::BadDescriptorPath(path.to_string())),
        }
    }

    /// Validate a bare organization name and build its descriptor.
    pub fn organization(name: &str) -> Result<Self, CatalogError> {
        if !valid_segment(name) {
            return Err(CatalogError::BadDescriptorPath(name.to_string()));
        }
        Ok(Descriptor::Organization {
            organization: name.to_string(),
        })
    }

    /// The graph set this descriptor addresses. Organizations own no graphs.
    pub fn database_ref(&self) -> Option<DatabaseRef> {
        match self {
            Descriptor::System => Some(DatabaseRef::System),
            Descriptor::Organization { .. } => None,
            Descriptor::Database {
                organization,
                database,
            }
            | Descriptor::Branch {
                organization,
                database,
                ..
            } => Some(DatabaseRef::user(organization.clone(), database.clone())),
        }
    }

    /// The resource URI this descriptor denotes in the system graph.
    pub fn resource_uri(&self) -> String {
        match self {
            Descriptor::System => sys::SYSTEM.to_string(),
            Descriptor::Organization { organization } => sys::organization_uri(organization),
            Descriptor::Database {
                organization,
                database,
            } => sys::database_uri(organization, database),
            Descriptor::Branch {
                organization,
                database,
                branch,
            } => sys::branch_uri(organization, database, branch),
        }
    }

    /// The URI chain a grant may be scoped at to cover this resource, from
    /// the resource itself up to the store-wide scope. An organization-scoped
    /// grant covers all of its databases and their branches.
    pub fn scope_uris(&self) -> Vec<String> {
        let mut uris = vec![self.resource_uri()];
        match self {
            Descriptor::System | Descriptor::Organization { .. } => {}
            Descriptor::Database { organization, .. } => {
                uris.push(sys::organization_uri(organization));
            }
            Descriptor::Branch {
                organization,
                database,
                ..
            } => {
                uris.push(sys::database_uri(organization, database));
                uris.push(sys::organization_uri(organization));
            }
        }
        if !matches!(self, Descriptor::System) {
            uris.push(sys::SYSTEM.to_string());
        }
        uris
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::System => write!(f, "{}", SYSTEM_PATH),
            Descriptor::Organization { organization } => write!(f, "{}", organization),
            Descriptor::Database {
                organization,
                database,
            } => write!(f, "{}/{}", organization, database),
            Descriptor::Branch {
                organization,
                database,
                branch,
            } => write!(f, "{}/{}/local/branch/{}", organization, database, branch),
        }
    }
}
