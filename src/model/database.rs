use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the branch every database is created with.
pub const DEFAULT_BRANCH: &str = "main";

/// Schema enforcement state of a database. Always exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Writes against the schema graph describe a real schema; the schema
    /// root carries no sentinel type.
    Enforced,
    /// Schema checking is off. The schema graph holds only the nil sentinel
    /// on the schema root.
    Free,
}

impl SchemaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaMode::Enforced => "enforced",
            SchemaMode::Free => "free",
        }
    }

    pub fn from_str_value(value: &str) -> Option<Self> {
        match value {
            "enforced" => Some(SchemaMode::Enforced),
            "free" => Some(SchemaMode::Free),
            _ => None,
        }
    }
}

impl Default for SchemaMode {
    fn default() -> Self {
        SchemaMode::Enforced
    }
}

impl fmt::Display for SchemaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creation options for a new database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseOptions {
    pub label: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub schema_mode: SchemaMode,
}

/// A partial update of database metadata. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseUpdate {
    pub label: Option<String>,
    pub comment: Option<String>,
    pub public: Option<bool>,
    pub schema_mode: Option<SchemaMode>,
}

impl DatabaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.comment.is_none()
            && self.public.is_none()
            && self.schema_mode.is_none()
    }
}

/// One row of a database listing. Branch names are included on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseListing {
    pub organization: String,
    pub name: String,
    pub path: String,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub public: bool,
    pub schema_mode: SchemaMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<String>>,
}

/// The identity a request acts as. Grants attached to the anonymous subject
/// apply to every caller; grants attached to a named user apply to that user
/// alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Anonymous,
    User(String),
}

impl Subject {
    pub fn user(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == crate::model::vocab::sys::ANONYMOUS_USER {
            Subject::Anonymous
        } else {
            Subject::User(name)
        }
    }

    pub fn admin() -> Self {
        Subject::User(crate::model::vocab::sys::ADMIN_USER.to_string())
    }

    pub fn uri(&self) -> String {
        match self {
            Subject::Anonymous => {
                crate::model::vocab::sys::user_uri(crate::model::vocab::sys::ANONYMOUS_USER)
            }
            Subject::User(name) => crate::model::vocab::sys::user_uri(name),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Anonymous => write!(f, "{}", crate::model::vocab::sys::ANONYMOUS_USER),
            Subject::User(name) => write!(f, "{}", name),
        }
    }
}
