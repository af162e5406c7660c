use crate::error::CatalogError;
use crate::logic::authorization::{Action, AuthorizationGate, Role};
use crate::logic::resolver::Resolver;
use crate::logic::schema_mode::SchemaModeController;
use crate::model::vocab::{self, sys};
use crate::model::{
    Binding, DatabaseListing, DatabaseOptions, DatabaseRef, DatabaseUpdate, Descriptor, GraphName,
    PatternTerm, Quad, QuadPattern, SchemaMode, Subject, Term, DEFAULT_BRANCH,
};
use crate::store::{hash_quads, GraphStore, StoreOp};
use chrono::Utc;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The resource catalog: organizations, databases and branches, stored as
/// quads in the system graph and manipulated only through quad operations.
///
/// Every operation resolves its target through the descriptor machinery and
/// passes the authorization gate before touching state. Mutations serialize
/// behind one async lock; reads go straight to store snapshots and therefore
/// see either the state before a mutation or after it, never between.
pub struct Catalog<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: GraphStore> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bootstrap the system database. With `force`, an initialized store is
    /// wiped and rebuilt.
    pub async fn initialize(&self, force: bool) -> Result<(), CatalogError> {
        let _guard = self.write_lock.lock().await;
        crate::seed::initialize_system(self.store.as_ref(), force).await
    }

    pub async fn is_initialized(&self) -> Result<bool, CatalogError> {
        Ok(self.store.graphs_exist(&DatabaseRef::System).await?)
    }

    pub async fn create_organization(
        &self,
        subject: &Subject,
        name: &str,
    ) -> Result<(), CatalogError> {
        let descriptor = Descriptor::organization(name)?;
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::CreateOrganization,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        if Resolver::organization_exists(self.store.as_ref(), name).await? {
            return Err(CatalogError::AlreadyExists(name.to_string()));
        }

        let org_uri = sys::organization_uri(name);
        let ops = vec![
            system_insert(Quad::in_data(
                Term::iri(org_uri.clone()),
                vocab::RDF_TYPE,
                Term::iri(sys::ORGANIZATION),
            )),
            system_insert(Quad::in_data(
                Term::iri(org_uri.clone()),
                sys::NAME,
                Term::string(name),
            )),
            system_insert(Quad::in_data(
                Term::iri(org_uri),
                sys::CREATED,
                Term::datetime(Utc::now().to_rfc3339()),
            )),
        ];
        self.store.apply(ops).await?;
        log::info!("created organization {}", name);
        Ok(())
    }

    /// Delete an organization. Refused while it still owns databases.
    pub async fn delete_organization(
        &self,
        subject: &Subject,
        name: &str,
    ) -> Result<(), CatalogError> {
        let descriptor = Descriptor::organization(name)?;
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::DeleteOrganization,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        if !Resolver::organization_exists(self.store.as_ref(), name).await? {
            return Err(CatalogError::NotFound(name.to_string()));
        }

        let org_uri = sys::organization_uri(name);
        let owned = self
            .store
            .solve(
                &DatabaseRef::System,
                &[system_pattern(
                    PatternTerm::var("db"),
                    sys::ORGANIZATION_OF,
                    PatternTerm::bound(Term::iri(org_uri.clone())),
                )],
            )
            .await?;
        if !owned.is_empty() {
            return Err(CatalogError::OrganizationNotEmpty(name.to_string()));
        }

        let mut roots = BTreeSet::new();
        roots.insert(org_uri);
        let ops = self.removal_ops(&roots).await?;
        self.store.apply(ops).await?;
        log::info!("deleted organization {}", name);
        Ok(())
    }

    pub async fn create_database(
        &self,
        subject: &Subject,
        organization: &str,
        name: &str,
        options: DatabaseOptions,
    ) -> Result<(), CatalogError> {
        let path = format!("{}/{}", organization, name);
        let descriptor = Descriptor::parse(&path)?;
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::CreateDatabase,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        if !Resolver::organization_exists(self.store.as_ref(), organization).await? {
            return Err(CatalogError::NotFound(organization.to_string()));
        }
        if Resolver::database_exists(self.store.as_ref(), organization, name).await? {
            return Err(CatalogError::AlreadyExists(path));
        }

        let db_ref = DatabaseRef::user(organization, name);
        let db_uri = sys::database_uri(organization, name);
        let now = Utc::now().to_rfc3339();

        let mut ops = vec![StoreOp::CreateGraphs(db_ref.clone())];
        ops.extend([
            system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                vocab::RDF_TYPE,
                Term::iri(sys::DATABASE),
            )),
            system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                sys::NAME,
                Term::string(name),
            )),
            system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                sys::ORGANIZATION_OF,
                Term::iri(sys::organization_uri(organization)),
            )),
            system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                sys::SCHEMA_MODE,
                Term::string(options.schema_mode.as_str()),
            )),
            system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                sys::CREATED,
                Term::datetime(now.clone()),
            )),
        ]);
        if let Some(label) = &options.label {
            ops.push(system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                sys::LABEL,
                Term::string(label),
            )));
        }
        if let Some(comment) = &options.comment {
            ops.push(system_insert(Quad::in_data(
                Term::iri(db_uri.clone()),
                sys::COMMENT,
                Term::string(comment),
            )));
        }

        ops.extend(self.branch_record_ops(
            organization,
            name,
            DEFAULT_BRANCH,
            &hash_quads(std::iter::empty()),
            &now,
        ));
        ops.extend(SchemaModeController::initial_ops(
            &db_ref,
            options.schema_mode,
        ));
        if options.public {
            ops.extend(AuthorizationGate::grant_ops(
                &Subject::Anonymous.uri(),
                Role::Consumer,
                &db_uri,
            ));
        }

        self.store.apply(ops).await?;
        log::info!("created database {}", path);
        Ok(())
    }

    /// Delete a database with all its branches, graphs and any grants scoped
    /// to it or its branches.
    pub async fn delete_database(
        &self,
        subject: &Subject,
        organization: &str,
        name: &str,
    ) -> Result<(), CatalogError> {
        let path = format!("{}/{}", organization, name);
        let descriptor = Descriptor::parse(&path)?;
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::DeleteDatabase,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        if !Resolver::database_exists(self.store.as_ref(), organization, name).await? {
            return Err(CatalogError::NotFound(path));
        }

        let db_uri = sys::database_uri(organization, name);
        let mut roots = BTreeSet::new();
        for branch in self.branch_uris(&db_uri).await? {
            roots.insert(branch);
        }
        roots.insert(db_uri);

        let mut ops = self.removal_ops(&roots).await?;
        ops.push(StoreOp::DropGraphs(DatabaseRef::user(organization, name)));
        self.store.apply(ops).await?;
        log::info!("deleted database {}", path);
        Ok(())
    }

    /// Apply a metadata update. Setting `public` toggles exactly the
    /// anonymous consumer grant for this database; schema mode changes run
    /// the mode controller's transition in the same atomic batch.
    pub async fn update_database(
        &self,
        subject: &Subject,
        path: &str,
        update: DatabaseUpdate,
    ) -> Result<(), CatalogError> {
        let descriptor = Resolver::resolve(self.store.as_ref(), path).await?;
        if update.is_empty() {
            return Ok(());
        }
        let Descriptor::Database {
            organization,
            database,
        } = descriptor.clone()
        else {
            return Err(CatalogError::BadDescriptorPath(path.to_string()));
        };
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::UpdateDatabase,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        // The database may have been dropped between resolution and here.
        if !Resolver::database_exists(self.store.as_ref(), &organization, &database).await? {
            return Err(CatalogError::InvalidDatabaseName(path.to_string()));
        }

        let db_uri = sys::database_uri(&organization, &database);
        let db_ref = DatabaseRef::user(&organization, &database);
        let mut ops = Vec::new();

        if let Some(label) = &update.label {
            ops.extend(self.replace_literal_ops(&db_uri, sys::LABEL, label).await?);
        }
        if let Some(comment) = &update.comment {
            ops.extend(
                self.replace_literal_ops(&db_uri, sys::COMMENT, comment)
                    .await?,
            );
        }
        if let Some(mode) = update.schema_mode {
            let current = self.schema_mode_of(&db_uri).await?;
            if mode != current {
                ops.extend(
                    self.replace_literal_ops(&db_uri, sys::SCHEMA_MODE, mode.as_str())
                        .await?,
                );
                ops.extend(SchemaModeController::transition_ops(&db_ref, current, mode));
            }
        }
        if let Some(public) = update.public {
            let currently_public =
                AuthorizationGate::has_public_grant(self.store.as_ref(), &organization, &database)
                    .await?;
            if public && !currently_public {
                ops.extend(AuthorizationGate::grant_ops(
                    &Subject::Anonymous.uri(),
                    Role::Consumer,
                    &db_uri,
                ));
            } else if !public && currently_public {
                ops.extend(
                    AuthorizationGate::revoke_ops(
                        self.store.as_ref(),
                        &Subject::Anonymous.uri(),
                        Role::Consumer,
                        &db_uri,
                    )
                    .await?,
                );
            }
        }

        if !ops.is_empty() {
            self.store.apply(ops).await?;
            log::info!("updated database {}", path);
        }
        Ok(())
    }

    /// List databases, optionally restricted to the given descriptor paths.
    /// Databases the subject may not read are filtered out, never errors.
    pub async fn list_databases(
        &self,
        subject: &Subject,
        filters: &[String],
        include_branches: bool,
    ) -> Result<Vec<DatabaseListing>, CatalogError> {
        let mut targets: Vec<(String, String)> = Vec::new();
        if filters.is_empty() {
            let patterns = vec![
                system_pattern(
                    PatternTerm::var("db"),
                    vocab::RDF_TYPE,
                    PatternTerm::bound(Term::iri(sys::DATABASE)),
                ),
                system_pattern(
                    PatternTerm::var("db"),
                    sys::NAME,
                    PatternTerm::var("name"),
                ),
                system_pattern(
                    PatternTerm::var("db"),
                    sys::ORGANIZATION_OF,
                    PatternTerm::var("org"),
                ),
                system_pattern(
                    PatternTerm::var("org"),
                    sys::NAME,
                    PatternTerm::var("org_name"),
                ),
            ];
            for row in self.store.solve(&DatabaseRef::System, &patterns).await? {
                if let (Some(org), Some(name)) = (
                    row.get("org_name").and_then(Term::as_literal),
                    row.get("name").and_then(Term::as_literal),
                ) {
                    targets.push((org.to_string(), name.to_string()));
                }
            }
        } else {
            for path in filters.iter().unique() {
                match Resolver::resolve(self.store.as_ref(), path).await? {
                    Descriptor::Database {
                        organization,
                        database,
                    }
                    | Descriptor::Branch {
                        organization,
                        database,
                        ..
                    } => targets.push((organization, database)),
                    Descriptor::System | Descriptor::Organization { .. } => {
                        return Err(CatalogError::BadDescriptorPath(path.clone()));
                    }
                }
            }
        }

        let mut listings = Vec::new();
        for (organization, name) in targets.into_iter().unique() {
            let descriptor = Descriptor::Database {
                organization: organization.clone(),
                database: name.clone(),
            };
            let visible = AuthorizationGate::authorize(
                self.store.as_ref(),
                subject,
                Action::ReadMetadata,
                &descriptor,
            )
            .await?;
            if !visible {
                continue;
            }
            listings.push(
                self.read_listing(&organization, &name, include_branches)
                    .await?,
            );
        }
        listings.sort_by(|a, b| {
            (a.organization.as_str(), a.name.as_str()).cmp(&(b.organization.as_str(), b.name.as_str()))
        });
        Ok(listings)
    }

    /// Create an additional branch. Its head starts at the database's
    /// current data version.
    pub async fn create_branch(
        &self,
        subject: &Subject,
        organization: &str,
        database: &str,
        branch: &str,
    ) -> Result<(), CatalogError> {
        let path = format!("{}/{}/local/branch/{}", organization, database, branch);
        let descriptor = Descriptor::parse(&path)?;
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::CreateBranch,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        if !Resolver::database_exists(self.store.as_ref(), organization, database).await? {
            return Err(CatalogError::InvalidDatabaseName(format!(
                "{}/{}",
                organization, database
            )));
        }
        if Resolver::branch_exists(self.store.as_ref(), organization, database, branch).await? {
            return Err(CatalogError::AlreadyExists(path));
        }

        let db_ref = DatabaseRef::user(organization, database);
        let snapshot = self.store.snapshot(&db_ref).await?;
        let head = hash_quads(snapshot.iter().filter(|q| !q.graph.is_schema()));
        let ops = self.branch_record_ops(
            organization,
            database,
            branch,
            &head,
            &Utc::now().to_rfc3339(),
        );
        self.store.apply(ops).await?;
        log::info!("created branch {}", path);
        Ok(())
    }

    pub async fn delete_branch(
        &self,
        subject: &Subject,
        organization: &str,
        database: &str,
        branch: &str,
    ) -> Result<(), CatalogError> {
        let path = format!("{}/{}/local/branch/{}", organization, database, branch);
        let descriptor = Descriptor::parse(&path)?;
        AuthorizationGate::check(
            self.store.as_ref(),
            subject,
            Action::DeleteBranch,
            &descriptor,
        )
        .await?;

        let _guard = self.write_lock.lock().await;
        if !Resolver::database_exists(self.store.as_ref(), organization, database).await? {
            return Err(CatalogError::InvalidDatabaseName(format!(
                "{}/{}",
                organization, database
            )));
        }
        if !Resolver::branch_exists(self.store.as_ref(), organization, database, branch).await? {
            return Err(CatalogError::InvalidBranchName(path));
        }
        if branch == DEFAULT_BRANCH {
            return Err(CatalogError::DefaultBranchProtected(branch.to_string()));
        }

        let mut roots = BTreeSet::new();
        roots.insert(sys::branch_uri(organization, database, branch));
        let ops = self.removal_ops(&roots).await?;
        self.store.apply(ops).await?;
        log::info!("deleted branch {}", path);
        Ok(())
    }

    /// Evaluate a conjunctive pattern query against the addressed resource's
    /// graphs. Results are a deterministic, lazily consumable sequence.
    pub async fn query(
        &self,
        subject: &Subject,
        path: &str,
        patterns: &[QuadPattern],
    ) -> Result<Box<dyn Iterator<Item = Binding> + Send>, CatalogError> {
        let descriptor = Resolver::resolve(self.store.as_ref(), path).await?;
        let Some(db_ref) = descriptor.database_ref() else {
            return Err(CatalogError::BadDescriptorPath(path.to_string()));
        };
        AuthorizationGate::check(self.store.as_ref(), subject, Action::QueryData, &descriptor)
            .await?;

        let rows = self.store.solve(&db_ref, patterns).await?;
        Ok(Box::new(rows.into_iter()))
    }

    /// Insert quads into the addressed resource's graphs and advance the
    /// addressed branch's head.
    pub async fn insert_quads(
        &self,
        subject: &Subject,
        path: &str,
        quads: Vec<Quad>,
    ) -> Result<(), CatalogError> {
        self.write_quads(subject, path, quads, true).await
    }

    /// Remove quads. Absent quads are skipped silently.
    pub async fn remove_quads(
        &self,
        subject: &Subject,
        path: &str,
        quads: Vec<Quad>,
    ) -> Result<(), CatalogError> {
        self.write_quads(subject, path, quads, false).await
    }

    async fn write_quads(
        &self,
        subject: &Subject,
        path: &str,
        quads: Vec<Quad>,
        insert: bool,
    ) -> Result<(), CatalogError> {
        let descriptor = Resolver::resolve(self.store.as_ref(), path).await?;
        let Some(db_ref) = descriptor.database_ref() else {
            return Err(CatalogError::BadDescriptorPath(path.to_string()));
        };
        AuthorizationGate::check(self.store.as_ref(), subject, Action::WriteData, &descriptor)
            .await?;

        let _guard = self.write_lock.lock().await;

        // Schema authoring is only possible while enforcement is on; in free
        // mode the schema graph belongs to the mode controller.
        if quads.iter().any(|q| q.graph.is_schema()) {
            if let Descriptor::Database {
                organization,
                database,
            }
            | Descriptor::Branch {
                organization,
                database,
                ..
            } = &descriptor
            {
                let mode = self
                    .schema_mode_of(&sys::database_uri(organization, database))
                    .await?;
                if mode == SchemaMode::Free {
                    return Err(CatalogError::SchemaViolation(format!(
                        "schema of {} is disabled",
                        path
                    )));
                }
            }
        }

        let mut staged = self.store.snapshot(&db_ref).await?;
        let mut ops = Vec::new();
        for quad in quads {
            if insert {
                staged.insert(quad.clone());
                ops.push(StoreOp::Insert(db_ref.clone(), quad));
            } else {
                staged.remove(&quad);
                ops.push(StoreOp::Remove(db_ref.clone(), quad));
            }
        }

        // Advance the head pointer of the branch this write addresses.
        if let Descriptor::Database {
            organization,
            database,
        }
        | Descriptor::Branch {
            organization,
            database,
            ..
        } = &descriptor
        {
            let branch = match &descriptor {
                Descriptor::Branch { branch, .. } => branch.as_str(),
                _ => DEFAULT_BRANCH,
            };
            let head = hash_quads(staged.iter().filter(|q| !q.graph.is_schema()));
            ops.extend(
                self.set_head_ops(&sys::branch_uri(organization, database, branch), &head)
                    .await?,
            );
        }

        self.store.apply(ops).await?;
        Ok(())
    }

    async fn read_listing(
        &self,
        organization: &str,
        name: &str,
        include_branches: bool,
    ) -> Result<DatabaseListing, CatalogError> {
        let db_uri = sys::database_uri(organization, name);
        let label = self.literal_of(&db_uri, sys::LABEL).await?;
        let comment = self.literal_of(&db_uri, sys::COMMENT).await?;
        let schema_mode = self.schema_mode_of(&db_uri).await?;
        let public =
            AuthorizationGate::has_public_grant(self.store.as_ref(), organization, name).await?;

        let branches = if include_branches {
            let patterns = vec![
                system_pattern(
                    PatternTerm::bound(Term::iri(db_uri.clone())),
                    sys::BRANCH_OF,
                    PatternTerm::var("branch"),
                ),
                system_pattern(
                    PatternTerm::var("branch"),
                    sys::NAME,
                    PatternTerm::var("name"),
                ),
            ];
            let names: Vec<String> = self
                .store
                .solve(&DatabaseRef::System, &patterns)
                .await?
                .iter()
                .filter_map(|row| row.get("name").and_then(Term::as_literal))
                .map(str::to_string)
                .sorted()
                .collect();
            Some(names)
        } else {
            None
        };

        Ok(DatabaseListing {
            organization: organization.to_string(),
            name: name.to_string(),
            path: format!("{}/{}", organization, name),
            label,
            comment,
            public,
            schema_mode,
            branches,
        })
    }

    fn branch_record_ops(
        &self,
        organization: &str,
        database: &str,
        branch: &str,
        head: &str,
        created: &str,
    ) -> Vec<StoreOp> {
        let branch_uri = sys::branch_uri(organization, database, branch);
        let db_uri = sys::database_uri(organization, database);
        vec![
            system_insert(Quad::in_data(
                Term::iri(branch_uri.clone()),
                vocab::RDF_TYPE,
                Term::iri(sys::BRANCH),
            )),
            system_insert(Quad::in_data(
                Term::iri(branch_uri.clone()),
                sys::NAME,
                Term::string(branch),
            )),
            system_insert(Quad::in_data(
                Term::iri(db_uri),
                sys::BRANCH_OF,
                Term::iri(branch_uri.clone()),
            )),
            system_insert(Quad::in_data(
                Term::iri(branch_uri.clone()),
                sys::HEAD,
                Term::string(head),
            )),
            system_insert(Quad::in_data(
                Term::iri(branch_uri),
                sys::CREATED,
                Term::datetime(created),
            )),
        ]
    }

    async fn branch_uris(&self, db_uri: &str) -> Result<Vec<String>, CatalogError> {
        let rows = self
            .store
            .solve(
                &DatabaseRef::System,
                &[system_pattern(
                    PatternTerm::bound(Term::iri(db_uri)),
                    sys::BRANCH_OF,
                    PatternTerm::var("branch"),
                )],
            )
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("branch").and_then(Term::as_iri))
            .map(str::to_string)
            .collect())
    }

    /// Removal ops for every system-graph quad whose subject or object is one
    /// of the given resource URIs, including capability grants scoped to
    /// them. Keeps the system graph free of dangling references.
    async fn removal_ops(&self, roots: &BTreeSet<String>) -> Result<Vec<StoreOp>, CatalogError> {
        let snapshot = self.store.snapshot(&DatabaseRef::System).await?;
        let mut targets = roots.clone();

        // Capability nodes scoped to a deleted resource go with it.
        for quad in &snapshot {
            if quad.predicate.as_iri() == Some(sys::SCOPE) {
                if let (Some(capability), Some(scope)) =
                    (quad.subject.as_iri(), quad.object.as_iri())
                {
                    if roots.contains(scope) {
                        targets.insert(capability.to_string());
                    }
                }
            }
        }

        let mut ops = Vec::new();
        for quad in &snapshot {
            let subject_hit = quad
                .subject
                .as_iri()
                .map(|iri| targets.contains(iri))
                .unwrap_or(false);
            let object_hit = quad
                .object
                .as_iri()
                .map(|iri| targets.contains(iri))
                .unwrap_or(false);
            if subject_hit || object_hit {
                ops.push(StoreOp::Remove(DatabaseRef::System, quad.clone()));
            }
        }
        Ok(ops)
    }

    async fn replace_literal_ops(
        &self,
        db_uri: &str,
        predicate: &str,
        value: &str,
    ) -> Result<Vec<StoreOp>, CatalogError> {
        let mut ops = Vec::new();
        let existing = self
            .store
            .solve(
                &DatabaseRef::System,
                &[system_pattern(
                    PatternTerm::bound(Term::iri(db_uri)),
                    predicate,
                    PatternTerm::var("value"),
                )],
            )
            .await?;
        for row in existing {
            if let Some(old) = row.get("value") {
                ops.push(StoreOp::Remove(
                    DatabaseRef::System,
                    Quad::in_data(Term::iri(db_uri), predicate, old.clone()),
                ));
            }
        }
        ops.push(system_insert(Quad::in_data(
            Term::iri(db_uri),
            predicate,
            Term::string(value),
        )));
        Ok(ops)
    }

    async fn set_head_ops(
        &self,
        branch_uri: &str,
        head: &str,
    ) -> Result<Vec<StoreOp>, CatalogError> {
        let mut ops = Vec::new();
        let existing = self
            .store
            .solve(
                &DatabaseRef::System,
                &[system_pattern(
                    PatternTerm::bound(Term::iri(branch_uri)),
                    sys::HEAD,
                    PatternTerm::var("head"),
                )],
            )
            .await?;
        for row in existing {
            if let Some(old) = row.get("head") {
                ops.push(StoreOp::Remove(
                    DatabaseRef::System,
                    Quad::in_data(Term::iri(branch_uri), sys::HEAD, old.clone()),
                ));
            }
        }
        ops.push(system_insert(Quad::in_data(
            Term::iri(branch_uri),
            sys::HEAD,
            Term::string(head),
        )));
        Ok(ops)
    }

    async fn literal_of(
        &self,
        uri: &str,
        predicate: &str,
    ) -> Result<Option<String>, CatalogError> {
        let rows = self
            .store
            .solve(
                &DatabaseRef::System,
                &[system_pattern(
                    PatternTerm::bound(Term::iri(uri)),
                    predicate,
                    PatternTerm::var("value"),
                )],
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("value"))
            .and_then(Term::as_literal)
            .map(str::to_string))
    }

    async fn schema_mode_of(&self, db_uri: &str) -> Result<SchemaMode, CatalogError> {
        Ok(self
            .literal_of(db_uri, sys::SCHEMA_MODE)
            .await?
            .as_deref()
            .and_then(SchemaMode::from_str_value)
            .unwrap_or_default())
    }
}

fn system_insert(quad: Quad) -> StoreOp {
    StoreOp::Insert(DatabaseRef::System, quad)
}

fn system_pattern(subject: PatternTerm, predicate: &str, object: PatternTerm) -> QuadPattern {
    QuadPattern::new(
        subject,
        PatternTerm::bound(Term::iri(predicate)),
        object,
        GraphName::data_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SYSTEM_PATH;
    use crate::store::MemoryStore;

    async fn catalog() -> Catalog<MemoryStore> {
        let catalog = Catalog::new(Arc::new(MemoryStore::new()));
        catalog.initialize(false).await.unwrap();
        catalog
    }

    fn admin() -> Subject {
        Subject::admin()
    }

    /// The four-clause join the public flag stands for: database by name,
    /// capability scoped to it, consumer role, attached to anonymous.
    fn public_grant_patterns(db_name: &str) -> Vec<QuadPattern> {
        vec![
            system_pattern(
                PatternTerm::var("db"),
                sys::NAME,
                PatternTerm::bound(Term::string(db_name)),
            ),
            system_pattern(
                PatternTerm::var("cap"),
                sys::SCOPE,
                PatternTerm::var("db"),
            ),
            system_pattern(
                PatternTerm::var("cap"),
                sys::ROLE_OF,
                PatternTerm::bound(Term::iri(sys::role_uri(sys::CONSUMER_ROLE))),
            ),
            system_pattern(
                PatternTerm::bound(Term::iri(Subject::Anonymous.uri())),
                sys::CAPABILITY,
                PatternTerm::var("cap"),
            ),
        ]
    }

    fn schema_root_patterns() -> Vec<QuadPattern> {
        vec![QuadPattern::new(
            PatternTerm::bound(Term::iri(vocab::SCHEMA_ROOT)),
            PatternTerm::bound(Term::iri(vocab::RDF_TYPE)),
            PatternTerm::var("X"),
            GraphName::Schema,
        )]
    }

    #[tokio::test]
    async fn created_database_lists_with_main_branch() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();

        let listings = catalog
            .list_databases(&admin(), &["admin/widgets".to_string()], true)
            .await
            .unwrap();
        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.path, "admin/widgets");
        assert_eq!(listing.schema_mode, SchemaMode::Enforced);
        assert!(!listing.public);
        assert_eq!(
            listing.branches.as_deref(),
            Some(&[DEFAULT_BRANCH.to_string()][..])
        );
    }

    #[tokio::test]
    async fn duplicate_create_and_missing_org_fail() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();
        assert!(matches!(
            catalog
                .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
                .await,
            Err(CatalogError::AlreadyExists(_))
        ));
        assert!(matches!(
            catalog
                .create_database(&admin(), "ghost", "widgets", DatabaseOptions::default())
                .await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn organization_delete_blocked_until_empty() {
        let catalog = catalog().await;
        catalog.create_organization(&admin(), "acme").await.unwrap();
        catalog
            .create_database(&admin(), "acme", "inventory", DatabaseOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            catalog.delete_organization(&admin(), "acme").await,
            Err(CatalogError::OrganizationNotEmpty(name)) if name == "acme"
        ));

        catalog
            .delete_database(&admin(), "acme", "inventory")
            .await
            .unwrap();
        catalog.delete_organization(&admin(), "acme").await.unwrap();
        assert!(matches!(
            catalog.delete_organization(&admin(), "acme").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn metadata_updates_round_trip() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();
        catalog
            .update_database(
                &admin(),
                "admin/widgets",
                DatabaseUpdate {
                    label: Some("goo".to_string()),
                    comment: Some("gah".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let listings = catalog
            .list_databases(&admin(), &["admin/widgets".to_string()], false)
            .await
            .unwrap();
        assert_eq!(listings[0].label.as_deref(), Some("goo"));
        assert_eq!(listings[0].comment.as_deref(), Some("gah"));

        // Updating again replaces, not accumulates.
        catalog
            .update_database(
                &admin(),
                "admin/widgets",
                DatabaseUpdate {
                    label: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let listings = catalog
            .list_databases(&admin(), &["admin/widgets".to_string()], false)
            .await
            .unwrap();
        assert_eq!(listings[0].label.as_deref(), Some("renamed"));
        assert_eq!(listings[0].comment.as_deref(), Some("gah"));
    }

    #[tokio::test]
    async fn schema_toggle_swaps_the_nil_sentinel() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();
        let branch_path = "admin/widgets/local/branch/main";

        // Enforced: the schema root carries no type.
        let rows: Vec<Binding> = catalog
            .query(&admin(), branch_path, &schema_root_patterns())
            .await
            .unwrap()
            .collect();
        assert!(rows.is_empty());

        catalog
            .update_database(
                &admin(),
                "admin/widgets",
                DatabaseUpdate {
                    schema_mode: Some(SchemaMode::Free),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let rows: Vec<Binding> = catalog
            .query(&admin(), branch_path, &schema_root_patterns())
            .await
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("X"), Some(&Term::iri(vocab::RDF_NIL)));

        catalog
            .update_database(
                &admin(),
                "admin/widgets",
                DatabaseUpdate {
                    schema_mode: Some(SchemaMode::Enforced),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let rows: Vec<Binding> = catalog
            .query(&admin(), branch_path, &schema_root_patterns())
            .await
            .unwrap()
            .collect();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn public_flag_round_trips_through_the_capability_store() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();

        catalog
            .update_database(
                &admin(),
                "admin/widgets",
                DatabaseUpdate {
                    public: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let rows: Vec<Binding> = catalog
            .query(&admin(), SYSTEM_PATH, &public_grant_patterns("widgets"))
            .await
            .unwrap()
            .collect();
        assert_eq!(rows.len(), 1);

        catalog
            .update_database(
                &admin(),
                "admin/widgets",
                DatabaseUpdate {
                    public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let rows: Vec<Binding> = catalog
            .query(&admin(), SYSTEM_PATH, &public_grant_patterns("widgets"))
            .await
            .unwrap()
            .collect();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn listing_filters_report_path_errors() {
        let catalog = catalog().await;
        assert!(matches!(
            catalog
                .list_databases(&admin(), &["no-slash".to_string()], false)
                .await,
            Err(CatalogError::BadDescriptorPath(_))
        ));
        assert!(matches!(
            catalog
                .list_databases(&admin(), &["admin/ghost".to_string()], false)
                .await,
            Err(CatalogError::InvalidDatabaseName(_))
        ));
    }

    #[tokio::test]
    async fn anonymous_sees_only_public_databases() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "private-db", DatabaseOptions::default())
            .await
            .unwrap();
        catalog
            .create_database(
                &admin(),
                "admin",
                "public-db",
                DatabaseOptions {
                    public: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let all = catalog
            .list_databases(&admin(), &[], false)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let visible = catalog
            .list_databases(&Subject::Anonymous, &[], false)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "public-db");
        assert!(visible[0].public);

        // An explicit filter for an invisible database filters, not errors.
        let filtered = catalog
            .list_databases(
                &Subject::Anonymous,
                &["admin/private-db".to_string()],
                false,
            )
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_subjects_cannot_mutate() {
        let catalog = catalog().await;
        let mallory = Subject::user("mallory");
        assert!(matches!(
            catalog
                .create_database(&mallory, "admin", "intruded", DatabaseOptions::default())
                .await,
            Err(CatalogError::Unauthorized { .. })
        ));
        assert!(matches!(
            catalog.create_organization(&mallory, "lair").await,
            Err(CatalogError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn branch_lifecycle() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();
        catalog
            .create_branch(&admin(), "admin", "widgets", "dev")
            .await
            .unwrap();

        let listings = catalog
            .list_databases(&admin(), &["admin/widgets".to_string()], true)
            .await
            .unwrap();
        assert_eq!(
            listings[0].branches.as_deref(),
            Some(&["dev".to_string(), DEFAULT_BRANCH.to_string()][..])
        );

        assert!(matches!(
            catalog
                .delete_branch(&admin(), "admin", "widgets", DEFAULT_BRANCH)
                .await,
            Err(CatalogError::DefaultBranchProtected(_))
        ));
        catalog
            .delete_branch(&admin(), "admin", "widgets", "dev")
            .await
            .unwrap();
        assert!(matches!(
            catalog
                .delete_branch(&admin(), "admin", "widgets", "dev")
                .await,
            Err(CatalogError::InvalidBranchName(_))
        ));
        assert!(matches!(
            catalog.create_branch(&admin(), "admin", "ghost", "dev").await,
            Err(CatalogError::InvalidDatabaseName(_))
        ));
    }

    #[tokio::test]
    async fn data_writes_advance_the_branch_head() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();

        let head_patterns = vec![
            system_pattern(
                PatternTerm::bound(Term::iri(sys::branch_uri("admin", "widgets", "main"))),
                sys::HEAD,
                PatternTerm::var("head"),
            ),
        ];
        let before: Vec<Binding> = catalog
            .query(&admin(), SYSTEM_PATH, &head_patterns)
            .await
            .unwrap()
            .collect();
        assert_eq!(before.len(), 1);

        catalog
            .insert_quads(
                &admin(),
                "admin/widgets",
                vec![Quad::in_data(
                    Term::iri("quaddb://data/widget-1"),
                    sys::NAME,
                    Term::string("sprocket"),
                )],
            )
            .await
            .unwrap();

        let after: Vec<Binding> = catalog
            .query(&admin(), SYSTEM_PATH, &head_patterns)
            .await
            .unwrap()
            .collect();
        assert_eq!(after.len(), 1);
        assert_ne!(before[0].get("head"), after[0].get("head"));
    }

    #[tokio::test]
    async fn schema_writes_rejected_in_free_mode() {
        let catalog = catalog().await;
        catalog
            .create_database(
                &admin(),
                "admin",
                "widgets",
                DatabaseOptions {
                    schema_mode: SchemaMode::Free,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = catalog
            .insert_quads(
                &admin(),
                "admin/widgets",
                vec![Quad::in_schema(
                    Term::iri("Widget"),
                    vocab::RDF_TYPE,
                    Term::iri("Class"),
                )],
            )
            .await;
        assert!(matches!(result, Err(CatalogError::SchemaViolation(_))));
    }

    #[tokio::test]
    async fn deleting_a_database_drops_its_grants() {
        let catalog = catalog().await;
        catalog
            .create_database(
                &admin(),
                "admin",
                "widgets",
                DatabaseOptions {
                    public: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        catalog
            .delete_database(&admin(), "admin", "widgets")
            .await
            .unwrap();

        // No capability quads scoped to the dead database linger.
        let rows: Vec<Binding> = catalog
            .query(&admin(), SYSTEM_PATH, &public_grant_patterns("widgets"))
            .await
            .unwrap()
            .collect();
        assert!(rows.is_empty());
        assert!(matches!(
            catalog.delete_database(&admin(), "admin", "widgets").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn force_initialize_resets_the_store() {
        let catalog = catalog().await;
        catalog
            .create_database(&admin(), "admin", "widgets", DatabaseOptions::default())
            .await
            .unwrap();
        assert!(matches!(
            catalog.initialize(false).await,
            Err(CatalogError::AlreadyExists(_))
        ));

        catalog.initialize(true).await.unwrap();
        let listings = catalog.list_databases(&admin(), &[], false).await.unwrap();
        assert!(listings.is_empty());
    }
}
