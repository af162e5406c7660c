use crate::error::CatalogError;
use crate::model::vocab::sys;
use crate::model::{DatabaseRef, Descriptor, PatternTerm, Quad, QuadPattern, Subject, Term};
use crate::store::{GraphStore, StoreOp};
use std::fmt;
use uuid::Uuid;

/// Everything the gate can be asked to permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOrganization,
    DeleteOrganization,
    CreateDatabase,
    DeleteDatabase,
    UpdateDatabase,
    CreateBranch,
    DeleteBranch,
    ReadMetadata,
    QueryData,
    WriteData,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateOrganization => "create organization",
            Action::DeleteOrganization => "delete organization",
            Action::CreateDatabase => "create database",
            Action::DeleteDatabase => "delete database",
            Action::UpdateDatabase => "update database",
            Action::CreateBranch => "create branch",
            Action::DeleteBranch => "delete branch",
            Action::ReadMetadata => "read metadata of",
            Action::QueryData => "query",
            Action::WriteData => "write to",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Roles a capability can confer. The role-to-action policy is fixed here;
/// the grants themselves are data in the system graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Consumer,
}

impl Role {
    pub fn uri(&self) -> String {
        match self {
            Role::Admin => sys::role_uri(sys::ADMIN_ROLE),
            Role::Consumer => sys::role_uri(sys::CONSUMER_ROLE),
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        if uri == sys::role_uri(sys::ADMIN_ROLE) {
            Some(Role::Admin)
        } else if uri == sys::role_uri(sys::CONSUMER_ROLE) {
            Some(Role::Consumer)
        } else {
            None
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Consumer => matches!(action, Action::ReadMetadata | Action::QueryData),
        }
    }
}

/// Decides whether a subject may act on a resource by querying the grants in
/// the system graph. There is no other source of authority.
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Whether `subject` holding some granted capability may perform `action`
    /// on `resource`. A grant applies when its scope is the resource itself
    /// or any ancestor, so an organization-scoped grant covers all of the
    /// organization's databases and their branches. Grants attached to the
    /// anonymous subject apply to every caller.
    pub async fn authorize<S: GraphStore>(
        store: &S,
        subject: &Subject,
        action: Action,
        resource: &Descriptor,
    ) -> Result<bool, CatalogError> {
        let scopes = resource.scope_uris();
        let mut subject_uris = vec![subject.uri()];
        let anonymous = Subject::Anonymous.uri();
        if subject_uris[0] != anonymous {
            subject_uris.push(anonymous);
        }

        for subject_uri in subject_uris {
            let patterns = vec![
                QuadPattern::new(
                    PatternTerm::bound(Term::iri(subject_uri)),
                    PatternTerm::bound(Term::iri(sys::CAPABILITY)),
                    PatternTerm::var("cap"),
                    crate::model::GraphName::data_default(),
                ),
                QuadPattern::new(
                    PatternTerm::var("cap"),
                    PatternTerm::bound(Term::iri(sys::ROLE_OF)),
                    PatternTerm::var("role"),
                    crate::model::GraphName::data_default(),
                ),
                QuadPattern::new(
                    PatternTerm::var("cap"),
                    PatternTerm::bound(Term::iri(sys::SCOPE)),
                    PatternTerm::var("scope"),
                    crate::model::GraphName::data_default(),
                ),
            ];
            for row in store.solve(&DatabaseRef::System, &patterns).await? {
                let role = row
                    .get("role")
                    .and_then(Term::as_iri)
                    .and_then(Role::from_uri);
                let scope = row.get("scope").and_then(Term::as_iri);
                if let (Some(role), Some(scope)) = (role, scope) {
                    if role.allows(action) && scopes.iter().any(|s| s == scope) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Like [`authorize`](Self::authorize) but failing with `Unauthorized`.
    pub async fn check<S: GraphStore>(
        store: &S,
        subject: &Subject,
        action: Action,
        resource: &Descriptor,
    ) -> Result<(), CatalogError> {
        if Self::authorize(store, subject, action, resource).await? {
            Ok(())
        } else {
            Err(CatalogError::Unauthorized {
                subject: subject.to_string(),
                action: action.to_string(),
                resource: resource.to_string(),
            })
        }
    }

    /// Ops inserting a fresh grant: subject, a new capability node, role and
    /// scope, all in the system graph.
    pub fn grant_ops(subject_uri: &str, role: Role, scope_uri: &str) -> Vec<StoreOp> {
        let capability = sys::capability_uri(&Uuid::new_v4().to_string());
        vec![
            StoreOp::Insert(
                DatabaseRef::System,
                Quad::in_data(
                    Term::iri(subject_uri),
                    sys::CAPABILITY,
                    Term::iri(capability.clone()),
                ),
            ),
            StoreOp::Insert(
                DatabaseRef::System,
                Quad::in_data(Term::iri(capability.clone()), sys::ROLE_OF, Term::iri(role.uri())),
            ),
            StoreOp::Insert(
                DatabaseRef::System,
                Quad::in_data(Term::iri(capability), sys::SCOPE, Term::iri(scope_uri)),
            ),
        ]
    }

    /// Ops removing every grant matching subject, role and scope exactly.
    /// Grants for the same subject with a different role or scope stay.
    pub async fn revoke_ops<S: GraphStore>(
        store: &S,
        subject_uri: &str,
        role: Role,
        scope_uri: &str,
    ) -> Result<Vec<StoreOp>, CatalogError> {
        let patterns = vec![
            QuadPattern::new(
                PatternTerm::bound(Term::iri(subject_uri)),
                PatternTerm::bound(Term::iri(sys::CAPABILITY)),
                PatternTerm::var("cap"),
                crate::model::GraphName::data_default(),
            ),
            QuadPattern::new(
                PatternTerm::var("cap"),
                PatternTerm::bound(Term::iri(sys::ROLE_OF)),
                PatternTerm::bound(Term::iri(role.uri())),
                crate::model::GraphName::data_default(),
            ),
            QuadPattern::new(
                PatternTerm::var("cap"),
                PatternTerm::bound(Term::iri(sys::SCOPE)),
                PatternTerm::bound(Term::iri(scope_uri)),
                crate::model::GraphName::data_default(),
            ),
        ];
        let mut ops = Vec::new();
        for row in store.solve(&DatabaseRef::System, &patterns).await? {
            let Some(capability) = row.get("cap").and_then(Term::as_iri) else {
                continue;
            };
            ops.push(StoreOp::Remove(
                DatabaseRef::System,
                Quad::in_data(
                    Term::iri(subject_uri),
                    sys::CAPABILITY,
                    Term::iri(capability),
                ),
            ));
            ops.push(StoreOp::Remove(
                DatabaseRef::System,
                Quad::in_data(Term::iri(capability), sys::ROLE_OF, Term::iri(role.uri())),
            ));
            ops.push(StoreOp::Remove(
                DatabaseRef::System,
                Quad::in_data(Term::iri(capability), sys::SCOPE, Term::iri(scope_uri)),
            ));
        }
        Ok(ops)
    }

    /// Whether the database carries the anonymous consumer grant that the
    /// public flag stands for.
    pub async fn has_public_grant<S: GraphStore>(
        store: &S,
        organization: &str,
        database: &str,
    ) -> Result<bool, CatalogError> {
        let patterns = vec![
            QuadPattern::new(
                PatternTerm::bound(Term::iri(Subject::Anonymous.uri())),
                PatternTerm::bound(Term::iri(sys::CAPABILITY)),
                PatternTerm::var("cap"),
                crate::model::GraphName::data_default(),
            ),
            QuadPattern::new(
                PatternTerm::var("cap"),
                PatternTerm::bound(Term::iri(sys::ROLE_OF)),
                PatternTerm::bound(Term::iri(Role::Consumer.uri())),
                crate::model::GraphName::data_default(),
            ),
            QuadPattern::new(
                PatternTerm::var("cap"),
                PatternTerm::bound(Term::iri(sys::SCOPE)),
                PatternTerm::bound(Term::iri(sys::database_uri(organization, database))),
                crate::model::GraphName::data_default(),
            ),
        ];
        Ok(!store.solve(&DatabaseRef::System, &patterns).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn store_with_system() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .apply(vec![StoreOp::CreateGraphs(DatabaseRef::System)])
            .await
            .unwrap();
        store
    }

    fn db_descriptor(org: &str, db: &str) -> Descriptor {
        Descriptor::Database {
            organization: org.to_string(),
            database: db.to_string(),
        }
    }

    #[tokio::test]
    async fn consumer_grant_covers_reads_only() {
        let store = store_with_system().await;
        let carol = Subject::user("carol");
        store
            .apply(AuthorizationGate::grant_ops(
                &carol.uri(),
                Role::Consumer,
                &sys::database_uri("acme", "catalog"),
            ))
            .await
            .unwrap();

        let resource = db_descriptor("acme", "catalog");
        assert!(
            AuthorizationGate::authorize(&store, &carol, Action::QueryData, &resource)
                .await
                .unwrap()
        );
        assert!(
            !AuthorizationGate::authorize(&store, &carol, Action::WriteData, &resource)
                .await
                .unwrap()
        );
        assert!(
            !AuthorizationGate::authorize(&store, &carol, Action::DeleteDatabase, &resource)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn organization_scope_covers_contained_databases() {
        let store = store_with_system().await;
        let carol = Subject::user("carol");
        store
            .apply(AuthorizationGate::grant_ops(
                &carol.uri(),
                Role::Consumer,
                &sys::organization_uri("acme"),
            ))
            .await
            .unwrap();

        assert!(AuthorizationGate::authorize(
            &store,
            &carol,
            Action::QueryData,
            &db_descriptor("acme", "anything")
        )
        .await
        .unwrap());
        assert!(!AuthorizationGate::authorize(
            &store,
            &carol,
            Action::QueryData,
            &db_descriptor("other", "anything")
        )
        .await
        .unwrap());
    }

    #[tokio::test]
    async fn anonymous_grants_apply_to_named_users() {
        let store = store_with_system().await;
        store
            .apply(AuthorizationGate::grant_ops(
                &Subject::Anonymous.uri(),
                Role::Consumer,
                &sys::database_uri("acme", "public-db"),
            ))
            .await
            .unwrap();

        let resource = db_descriptor("acme", "public-db");
        for subject in [Subject::Anonymous, Subject::user("carol")] {
            assert!(
                AuthorizationGate::authorize(&store, &subject, Action::ReadMetadata, &resource)
                    .await
                    .unwrap()
            );
        }
        // But nothing flows the other way: a named user's grant does not
        // reach anonymous.
        assert!(!AuthorizationGate::authorize(
            &store,
            &Subject::Anonymous,
            Action::WriteData,
            &resource
        )
        .await
        .unwrap());
    }

    #[tokio::test]
    async fn revoke_removes_only_the_exact_grant() {
        let store = store_with_system().await;
        let scope = sys::database_uri("acme", "catalog");
        let anon = Subject::Anonymous.uri();
        store
            .apply(AuthorizationGate::grant_ops(&anon, Role::Consumer, &scope))
            .await
            .unwrap();
        store
            .apply(AuthorizationGate::grant_ops(
                &sys::user_uri("carol"),
                Role::Consumer,
                &scope,
            ))
            .await
            .unwrap();

        let ops = AuthorizationGate::revoke_ops(&store, &anon, Role::Consumer, &scope)
            .await
            .unwrap();
        store.apply(ops).await.unwrap();

        assert!(!AuthorizationGate::has_public_grant(&store, "acme", "catalog")
            .await
            .unwrap());
        // Carol's grant on the same database survives.
        assert!(AuthorizationGate::authorize(
            &store,
            &Subject::user("carol"),
            Action::QueryData,
            &db_descriptor("acme", "catalog")
        )
        .await
        .unwrap());
    }
}
