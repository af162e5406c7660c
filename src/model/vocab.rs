//! IRI vocabulary for the system graph.
//!
//! Catalog records, users, roles and capability grants are ordinary quads in
//! the `_system` data graph. The constants and URI builders here are the only
//! place their shape is spelled out; everything else queries them.

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// Root node every database's schema graph hangs off. In schema-free mode it
/// carries the `rdf:nil` sentinel type.
pub const SCHEMA_ROOT: &str = "quaddb://data/Schema";

pub mod sys {
    //! Nodes and predicates of the system vocabulary.

    /// The store-wide scope. A grant scoped here covers every resource.
    pub const SYSTEM: &str = "quaddb://system";

    // Classes
    pub const ORGANIZATION: &str = "quaddb://system#Organization";
    pub const DATABASE: &str = "quaddb://system#Database";
    pub const BRANCH: &str = "quaddb://system#Branch";
    pub const USER: &str = "quaddb://system#User";
    pub const ROLE: &str = "quaddb://system#Role";

    // Predicates
    pub const NAME: &str = "quaddb://system#name";
    pub const LABEL: &str = "quaddb://system#label";
    pub const COMMENT: &str = "quaddb://system#comment";
    pub const ORGANIZATION_OF: &str = "quaddb://system#organization";
    pub const BRANCH_OF: &str = "quaddb://system#branch";
    pub const HEAD: &str = "quaddb://system#head";
    pub const SCHEMA_MODE: &str = "quaddb://system#schema_mode";
    pub const CREATED: &str = "quaddb://system#created";
    pub const CAPABILITY: &str = "quaddb://system#capability";
    pub const ROLE_OF: &str = "quaddb://system#role";
    pub const SCOPE: &str = "quaddb://system#scope";

    // Well-known names
    pub const ADMIN_ORGANIZATION: &str = "admin";
    pub const ADMIN_USER: &str = "admin";
    pub const ANONYMOUS_USER: &str = "anonymous";
    pub const ADMIN_ROLE: &str = "admin";
    pub const CONSUMER_ROLE: &str = "consumer";

    pub fn organization_uri(name: &str) -> String {
        format!("{}/Organization/{}", SYSTEM, name)
    }

    pub fn database_uri(organization: &str, database: &str) -> String {
        format!("{}/Database/{}/{}", SYSTEM, organization, database)
    }

    pub fn branch_uri(organization: &str, database: &str, branch: &str) -> String {
        format!("{}/Branch/{}/{}/{}", SYSTEM, organization, database, branch)
    }

    pub fn user_uri(name: &str) -> String {
        format!("{}/User/{}", SYSTEM, name)
    }

    pub fn role_uri(name: &str) -> String {
        format!("{}/Role/{}", SYSTEM, name)
    }

    pub fn capability_uri(id: &str) -> String {
        format!("{}/Capability/{}", SYSTEM, id)
    }
}
