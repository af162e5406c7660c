use crate::model::{DatabaseRef, Quad};
use crate::store::traits::{GraphStore, StoreOp};
use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The in-memory reference store: one ordered quad set per database.
///
/// A write batch clones the affected state, applies every op to the clone and
/// swaps it in under the write lock, so readers only ever observe complete
/// batches. Mutations across databases in one batch (catalog record plus the
/// database's own graphs) are therefore atomic as a whole.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graphs: Arc<RwLock<HashMap<DatabaseRef, BTreeSet<Quad>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_op(graphs: &mut HashMap<DatabaseRef, BTreeSet<Quad>>, op: StoreOp) -> Result<()> {
    match op {
        StoreOp::CreateGraphs(db) => {
            if graphs.contains_key(&db) {
                return Err(anyhow!("graph set already exists for {}", db));
            }
            graphs.insert(db, BTreeSet::new());
        }
        StoreOp::DropGraphs(db) => {
            if graphs.remove(&db).is_none() {
                return Err(anyhow!("no graph set for {}", db));
            }
        }
        StoreOp::Insert(db, quad) => {
            let set = graphs
                .get_mut(&db)
                .ok_or_else(|| anyhow!("no graph set for {}", db))?;
            // Set semantics: re-inserting an existing quad is a no-op.
            set.insert(quad);
        }
        StoreOp::Remove(db, quad) => {
            let set = graphs
                .get_mut(&db)
                .ok_or_else(|| anyhow!("no graph set for {}", db))?;
            // Removing an absent quad is a no-op as well.
            set.remove(&quad);
        }
        StoreOp::Clear(db, graph) => {
            let set = graphs
                .get_mut(&db)
                .ok_or_else(|| anyhow!("no graph set for {}", db))?;
            set.retain(|quad| quad.graph != graph);
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn apply(&self, ops: Vec<StoreOp>) -> Result<()> {
        let mut guard = self.graphs.write().await;
        let mut staged = guard.clone();
        for op in ops {
            apply_op(&mut staged, op)?;
        }
        *guard = staged;
        Ok(())
    }

    async fn snapshot(&self, db: &DatabaseRef) -> Result<BTreeSet<Quad>> {
        let guard = self.graphs.read().await;
        Ok(guard.get(db).cloned().unwrap_or_default())
    }

    async fn graphs_exist(&self, db: &DatabaseRef) -> Result<bool> {
        let guard = self.graphs.read().await;
        Ok(guard.contains_key(db))
    }

    async fn reset(&self) -> Result<()> {
        let mut guard = self.graphs.write().await;
        guard.clear();
        Ok(())
    }
}
