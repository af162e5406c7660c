use crate::model::{solve, Binding, DatabaseRef, GraphName, Quad, QuadPattern};
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// One mutation against the store. Batches passed to [`GraphStore::apply`]
/// take effect atomically, so a multi-quad catalog operation is never
/// observable half done.
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Allocate the (empty) graph set for a database.
    CreateGraphs(DatabaseRef),
    /// Drop a database's graph set with everything in it.
    DropGraphs(DatabaseRef),
    Insert(DatabaseRef, Quad),
    Remove(DatabaseRef, Quad),
    /// Remove every quad in one graph of a database.
    Clear(DatabaseRef, GraphName),
}

/// Content hash over a set of quads, used for branch head pointers. The set
/// ordering makes the digest independent of insertion order.
pub fn hash_quads<'a>(quads: impl IntoIterator<Item = &'a Quad>) -> String {
    let mut hasher = Sha256::new();
    for quad in quads {
        hasher.update(quad.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Storage seam for graph sets of quads.
///
/// Reads are served from consistent snapshots; a snapshot of a database that
/// does not exist is simply empty, never an error. Duplicate inserts and
/// removes of absent quads are no-ops.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply a batch of mutations atomically. Either every op takes effect
    /// or none do.
    async fn apply(&self, ops: Vec<StoreOp>) -> Result<()>;

    /// A consistent snapshot of one database's quads across all its graphs.
    async fn snapshot(&self, db: &DatabaseRef) -> Result<BTreeSet<Quad>>;

    /// Whether the database's graph set has been allocated. Distinct from
    /// emptiness: a freshly created database exists with zero quads.
    async fn graphs_exist(&self, db: &DatabaseRef) -> Result<bool>;

    /// Drop every graph set. Used when re-initializing the store.
    async fn reset(&self) -> Result<()>;

    async fn insert(&self, db: &DatabaseRef, quad: Quad) -> Result<()> {
        self.apply(vec![StoreOp::Insert(db.clone(), quad)]).await
    }

    async fn remove(&self, db: &DatabaseRef, quad: Quad) -> Result<()> {
        self.apply(vec![StoreOp::Remove(db.clone(), quad)]).await
    }

    async fn contains(&self, db: &DatabaseRef, quad: &Quad) -> Result<bool> {
        Ok(self.snapshot(db).await?.contains(quad))
    }

    /// Match a single pattern, yielding one binding per matching quad in
    /// deterministic order.
    async fn query(
        &self,
        db: &DatabaseRef,
        pattern: &QuadPattern,
    ) -> Result<Box<dyn Iterator<Item = Binding> + Send>> {
        let snapshot = self.snapshot(db).await?;
        let pattern = pattern.clone();
        Ok(Box::new(
            snapshot
                .into_iter()
                .filter_map(move |quad| pattern.matches(&quad)),
        ))
    }

    /// Evaluate a conjunction of patterns as a join over one snapshot.
    async fn solve(&self, db: &DatabaseRef, patterns: &[QuadPattern]) -> Result<Vec<Binding>> {
        let snapshot = self.snapshot(db).await?;
        Ok(solve(&snapshot, patterns))
    }

    /// Content hash of one graph within a database.
    async fn content_hash(&self, db: &DatabaseRef, graph: &GraphName) -> Result<String> {
        let snapshot = self.snapshot(db).await?;
        Ok(hash_quads(snapshot.iter().filter(|q| &q.graph == graph)))
    }
}
