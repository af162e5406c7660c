use crate::error::CatalogError;
use crate::model::vocab::{self, sys};
use crate::model::{DatabaseRef, Descriptor, Quad, Term, SYSTEM_PATH};
use crate::store::GraphStore;

/// Turns path strings into typed descriptors, distinguishing malformed
/// syntax from well-formed paths that name nothing.
pub struct Resolver;

impl Resolver {
    /// Parse and existence-check a resource path. Malformed input fails with
    /// `BadDescriptorPath`; a missing database or branch fails with
    /// `InvalidDatabaseName` or `InvalidBranchName` carrying the full path.
    /// No side effects.
    pub async fn resolve<S: GraphStore>(
        store: &S,
        path: &str,
    ) -> Result<Descriptor, CatalogError> {
        let descriptor = Descriptor::parse(path)?;
        match &descriptor {
            Descriptor::System => {
                if !store.graphs_exist(&DatabaseRef::System).await? {
                    return Err(CatalogError::NotFound(SYSTEM_PATH.to_string()));
                }
            }
            Descriptor::Organization { organization } => {
                if !Self::organization_exists(store, organization).await? {
                    return Err(CatalogError::NotFound(organization.clone()));
                }
            }
            Descriptor::Database {
                organization,
                database,
            } => {
                if !Self::database_exists(store, organization, database).await? {
                    return Err(CatalogError::InvalidDatabaseName(path.to_string()));
                }
            }
            Descriptor::Branch {
                organization,
                database,
                branch,
            } => {
                if !Self::database_exists(store, organization, database).await? {
                    return Err(CatalogError::InvalidDatabaseName(path.to_string()));
                }
                if !Self::branch_exists(store, organization, database, branch).await? {
                    return Err(CatalogError::InvalidBranchName(path.to_string()));
                }
            }
        }
        Ok(descriptor)
    }

    pub async fn organization_exists<S: GraphStore>(
        store: &S,
        name: &str,
    ) -> Result<bool, CatalogError> {
        Self::record_exists(store, &sys::organization_uri(name), sys::ORGANIZATION).await
    }

    pub async fn database_exists<S: GraphStore>(
        store: &S,
        organization: &str,
        database: &str,
    ) -> Result<bool, CatalogError> {
        Self::record_exists(store, &sys::database_uri(organization, database), sys::DATABASE).await
    }

    pub async fn branch_exists<S: GraphStore>(
        store: &S,
        organization: &str,
        database: &str,
        branch: &str,
    ) -> Result<bool, CatalogError> {
        Self::record_exists(
            store,
            &sys::branch_uri(organization, database, branch),
            sys::BRANCH,
        )
        .await
    }

    async fn record_exists<S: GraphStore>(
        store: &S,
        uri: &str,
        class: &str,
    ) -> Result<bool, CatalogError> {
        let quad = Quad::in_data(Term::iri(uri), vocab::RDF_TYPE, Term::iri(class));
        Ok(store.contains(&DatabaseRef::System, &quad).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let ops = vec![
            StoreOp::CreateGraphs(DatabaseRef::System),
            StoreOp::Insert(
                DatabaseRef::System,
                Quad::in_data(
                    Term::iri(sys::organization_uri("acme")),
                    vocab::RDF_TYPE,
                    Term::iri(sys::ORGANIZATION),
                ),
            ),
            StoreOp::Insert(
                DatabaseRef::System,
                Quad::in_data(
                    Term::iri(sys::database_uri("acme", "catalog")),
                    vocab::RDF_TYPE,
                    Term::iri(sys::DATABASE),
                ),
            ),
            StoreOp::Insert(
                DatabaseRef::System,
                Quad::in_data(
                    Term::iri(sys::branch_uri("acme", "catalog", "main")),
                    vocab::RDF_TYPE,
                    Term::iri(sys::BRANCH),
                ),
            ),
        ];
        store.apply(ops).await.unwrap();
        store
    }

    #[tokio::test]
    async fn resolves_existing_resources() {
        let store = seeded_store().await;
        assert_eq!(
            Resolver::resolve(&store, "_system").await.unwrap(),
            Descriptor::System
        );
        assert!(matches!(
            Resolver::resolve(&store, "acme/catalog").await.unwrap(),
            Descriptor::Database { .. }
        ));
        assert!(matches!(
            Resolver::resolve(&store, "acme/catalog/local/branch/main")
                .await
                .unwrap(),
            Descriptor::Branch { .. }
        ));
    }

    #[tokio::test]
    async fn malformed_and_missing_fail_with_distinct_kinds() {
        let store = seeded_store().await;

        // Syntax errors never turn into existence errors.
        assert!(matches!(
            Resolver::resolve(&store, "no-slashes-here").await,
            Err(CatalogError::BadDescriptorPath(_))
        ));

        match Resolver::resolve(&store, "acme/nope").await {
            Err(CatalogError::InvalidDatabaseName(path)) => assert_eq!(path, "acme/nope"),
            other => panic!("expected InvalidDatabaseName, got {:?}", other.map(|_| ())),
        }

        match Resolver::resolve(&store, "acme/catalog/local/branch/nope").await {
            Err(CatalogError::InvalidBranchName(path)) => {
                assert_eq!(path, "acme/catalog/local/branch/nope")
            }
            other => panic!("expected InvalidBranchName, got {:?}", other.map(|_| ())),
        }

        // A branch path on a missing database reports the database, not the
        // branch.
        assert!(matches!(
            Resolver::resolve(&store, "acme/nope/local/branch/main").await,
            Err(CatalogError::InvalidDatabaseName(_))
        ));
    }
}
