use crate::error::CatalogError;
use crate::logic::authorization::{AuthorizationGate, Role};
use crate::model::vocab::{self, sys};
use crate::model::{DatabaseRef, Quad, Term, SYSTEM_PATH};
use crate::store::{GraphStore, StoreOp};
use chrono::Utc;

/// Bootstrap the system database.
///
/// Creates the `_system` graph set and seeds it with the admin organization,
/// the admin and anonymous users, the two built-in roles, and the grant that
/// makes admin a superuser (admin role scoped at the store-wide scope).
///
/// With `force` an already initialized store is wiped first, user databases
/// included. Without it, initializing twice fails with `AlreadyExists`.
pub async fn initialize_system<S: GraphStore>(store: &S, force: bool) -> Result<(), CatalogError> {
    if store.graphs_exist(&DatabaseRef::System).await? {
        if !force {
            return Err(CatalogError::AlreadyExists(SYSTEM_PATH.to_string()));
        }
        store.reset().await?;
    }

    let now = Utc::now().to_rfc3339();
    let mut ops = vec![StoreOp::CreateGraphs(DatabaseRef::System)];

    let org_uri = sys::organization_uri(sys::ADMIN_ORGANIZATION);
    ops.extend([
        record(&org_uri, sys::ORGANIZATION),
        literal(&org_uri, sys::NAME, sys::ADMIN_ORGANIZATION),
        insert(Quad::in_data(
            Term::iri(org_uri.clone()),
            sys::CREATED,
            Term::datetime(now.clone()),
        )),
    ]);

    for user in [sys::ADMIN_USER, sys::ANONYMOUS_USER] {
        let user_uri = sys::user_uri(user);
        ops.extend([
            record(&user_uri, sys::USER),
            literal(&user_uri, sys::NAME, user),
        ]);
    }

    for role in [sys::ADMIN_ROLE, sys::CONSUMER_ROLE] {
        let role_uri = sys::role_uri(role);
        ops.extend([
            record(&role_uri, sys::ROLE),
            literal(&role_uri, sys::NAME, role),
        ]);
    }

    ops.extend(AuthorizationGate::grant_ops(
        &sys::user_uri(sys::ADMIN_USER),
        Role::Admin,
        sys::SYSTEM,
    ));

    store.apply(ops).await?;
    log::info!("initialized system database");
    Ok(())
}

fn record(uri: &str, class: &str) -> StoreOp {
    insert(Quad::in_data(
        Term::iri(uri),
        vocab::RDF_TYPE,
        Term::iri(class),
    ))
}

fn literal(uri: &str, predicate: &str, value: &str) -> StoreOp {
    insert(Quad::in_data(
        Term::iri(uri),
        predicate,
        Term::string(value),
    ))
}

fn insert(quad: Quad) -> StoreOp {
    StoreOp::Insert(DatabaseRef::System, quad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::authorization::Action;
    use crate::model::{Descriptor, Subject};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn initialize_seeds_the_admin_superuser() {
        let store = MemoryStore::new();
        initialize_system(&store, false).await.unwrap();

        assert!(store.graphs_exist(&DatabaseRef::System).await.unwrap());
        let admin = Subject::admin();
        for action in [
            Action::CreateOrganization,
            Action::CreateDatabase,
            Action::WriteData,
        ] {
            assert!(
                AuthorizationGate::authorize(&store, &admin, action, &Descriptor::System)
                    .await
                    .unwrap()
            );
        }
        // Anonymous starts with no grants at all.
        assert!(!AuthorizationGate::authorize(
            &store,
            &Subject::Anonymous,
            Action::QueryData,
            &Descriptor::System
        )
        .await
        .unwrap());
    }

    #[tokio::test]
    async fn double_initialize_requires_force() {
        let store = MemoryStore::new();
        initialize_system(&store, false).await.unwrap();
        assert!(matches!(
            initialize_system(&store, false).await,
            Err(CatalogError::AlreadyExists(_))
        ));
        initialize_system(&store, true).await.unwrap();
    }
}
