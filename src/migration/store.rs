//! Storage seam for the migration
//!
//! The orchestrator only talks to a [`ProjectStore`]. Production runs use
//! [`MongoProjectStore`]; tests and rehearsals use [`InMemoryProjectStore`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bson::{oid::ObjectId, DateTime, Document};
use mongodb::Collection;
use tokio::sync::RwLock;
use tracing::info;

use crate::db::mongo::{read_all, Timestamped};
use crate::db::schemas::{
    LegacySource, ProjectDoc, LEGACY_OTHER_COLLECTION, LEGACY_PREPARATION_COLLECTION,
    PROJECT_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{MigrationError, Result};

/// Names of the three collections involved in a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub preparation: String,
    pub other: String,
    pub unified: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            preparation: LEGACY_PREPARATION_COLLECTION.to_string(),
            other: LEGACY_OTHER_COLLECTION.to_string(),
            unified: PROJECT_COLLECTION.to_string(),
        }
    }
}

impl CollectionNames {
    pub fn legacy(&self, source: LegacySource) -> &str {
        match source {
            LegacySource::InternalPreparation => &self.preparation,
            LegacySource::OtherProject => &self.other,
        }
    }
}

/// Everything the migration needs from the database
#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    /// Read a whole legacy collection, `batch_size` documents per round trip
    async fn load_legacy(&self, source: LegacySource, batch_size: u32) -> Result<Vec<Document>>;

    /// Read the unified collection as raw documents
    async fn load_unified(&self, batch_size: u32) -> Result<Vec<Document>>;

    /// Number of documents in the unified collection
    async fn count_unified(&self) -> Result<u64>;

    /// Persist one unified project, returning its new id
    async fn insert_project(&self, project: ProjectDoc) -> Result<ObjectId>;

    /// Delete every unified document, returning how many were removed
    async fn clear_unified(&self) -> Result<u64>;

    /// Re-insert raw unified documents exactly as captured
    async fn restore_unified(&self, docs: Vec<Document>) -> Result<u64>;

    /// Release the underlying connection
    async fn close(&self) -> Result<()>;
}

/// Opens a store; one connection per migration run
#[async_trait::async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: ProjectStore;

    async fn connect(&self) -> Result<Self::Store>;
}

// ============================================================================
// MongoDB
// ============================================================================

/// Store backed by the three MongoDB collections
pub struct MongoProjectStore {
    client: MongoClient,
    projects: MongoCollection<ProjectDoc>,
    preparation: Collection<Document>,
    other: Collection<Document>,
}

impl MongoProjectStore {
    /// Open the collections on an existing client
    pub async fn open(client: MongoClient, names: &CollectionNames) -> Result<Self> {
        let projects = client.collection::<ProjectDoc>(&names.unified).await?;
        let preparation = client.raw_collection(&names.preparation);
        let other = client.raw_collection(&names.other);

        Ok(Self {
            client,
            projects,
            preparation,
            other,
        })
    }
}

#[async_trait::async_trait]
impl ProjectStore for MongoProjectStore {
    async fn load_legacy(&self, source: LegacySource, batch_size: u32) -> Result<Vec<Document>> {
        let collection = match source {
            LegacySource::InternalPreparation => &self.preparation,
            LegacySource::OtherProject => &self.other,
        };
        read_all(collection, batch_size).await
    }

    async fn load_unified(&self, batch_size: u32) -> Result<Vec<Document>> {
        read_all(&self.projects.raw(), batch_size).await
    }

    async fn count_unified(&self) -> Result<u64> {
        self.projects.count(bson::doc! {}).await
    }

    async fn insert_project(&self, project: ProjectDoc) -> Result<ObjectId> {
        self.projects.insert_one(project).await
    }

    async fn clear_unified(&self) -> Result<u64> {
        self.projects.delete_all().await
    }

    async fn restore_unified(&self, docs: Vec<Document>) -> Result<u64> {
        if docs.is_empty() {
            return Ok(0);
        }
        let result = self
            .projects
            .raw()
            .insert_many(docs)
            .await
            .map_err(|e| MigrationError::Database(format!("Restore failed: {}", e)))?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

/// Connects to MongoDB from configuration
#[derive(Debug, Clone)]
pub struct MongoConnector {
    pub uri: String,
    pub db_name: String,
    pub names: CollectionNames,
    pub timeout_ms: u64,
}

#[async_trait::async_trait]
impl StoreConnector for MongoConnector {
    type Store = MongoProjectStore;

    async fn connect(&self) -> Result<MongoProjectStore> {
        let client = MongoClient::new(&self.uri, &self.db_name, self.timeout_ms).await?;
        info!(
            db = %client.db_name(),
            preparation = %self.names.preparation,
            other = %self.names.other,
            unified = %self.names.unified,
            "Opening project collections"
        );
        MongoProjectStore::open(client, &self.names).await
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Store operations, recorded in order by [`InMemoryProjectStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Legacy collection read, with the batch size asked for
    LegacyRead(LegacySource, u32),
    UnifiedRead(u32),
    UnifiedCount,
    Insert(String),
    Clear,
    Restore(usize),
    Close,
}

#[derive(Default)]
struct MemoryState {
    legacy: HashMap<LegacySource, Vec<Document>>,
    unified: Vec<Document>,
    events: Vec<StoreEvent>,
    failing_names: HashSet<String>,
    fail_legacy_reads: bool,
    fail_restores: bool,
    closed: bool,
}

/// In-memory store; clones share the same data
#[derive(Clone, Default)]
pub struct InMemoryProjectStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a legacy collection
    pub async fn seed_legacy(&self, source: LegacySource, docs: Vec<Document>) {
        self.state.write().await.legacy.insert(source, docs);
    }

    /// Seed the unified collection with raw documents
    pub async fn seed_unified(&self, docs: Vec<Document>) {
        self.state.write().await.unified.extend(docs);
    }

    /// Make inserts of projects with this name fail
    pub async fn fail_inserts_named(&self, name: &str) {
        self.state.write().await.failing_names.insert(name.to_string());
    }

    /// Make every legacy read fail
    pub async fn fail_legacy_reads(&self) {
        self.state.write().await.fail_legacy_reads = true;
    }

    /// Make every restore fail
    pub async fn fail_restores(&self) {
        self.state.write().await.fail_restores = true;
    }

    pub async fn unified(&self) -> Vec<Document> {
        self.state.read().await.unified.clone()
    }

    pub async fn legacy(&self, source: LegacySource) -> Vec<Document> {
        self.state
            .read()
            .await
            .legacy
            .get(&source)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn events(&self) -> Vec<StoreEvent> {
        self.state.read().await.events.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}

#[async_trait::async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn load_legacy(&self, source: LegacySource, batch_size: u32) -> Result<Vec<Document>> {
        let mut state = self.state.write().await;
        if state.fail_legacy_reads {
            return Err(MigrationError::Database(format!(
                "read of {} records refused",
                source
            )));
        }
        state.events.push(StoreEvent::LegacyRead(source, batch_size));
        Ok(state.legacy.get(&source).cloned().unwrap_or_default())
    }

    async fn load_unified(&self, batch_size: u32) -> Result<Vec<Document>> {
        let mut state = self.state.write().await;
        state.events.push(StoreEvent::UnifiedRead(batch_size));
        Ok(state.unified.clone())
    }

    async fn count_unified(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        state.events.push(StoreEvent::UnifiedCount);
        Ok(state.unified.len() as u64)
    }

    async fn insert_project(&self, mut project: ProjectDoc) -> Result<ObjectId> {
        let mut state = self.state.write().await;
        if state.failing_names.contains(&project.name) {
            return Err(MigrationError::Database(format!(
                "insert of '{}' rejected",
                project.name
            )));
        }

        let id = ObjectId::new();
        project.id = Some(id);
        project.stamp(DateTime::now());
        let doc = bson::to_document(&project)?;

        state.events.push(StoreEvent::Insert(project.name));
        state.unified.push(doc);
        Ok(id)
    }

    async fn clear_unified(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let removed = state.unified.len() as u64;
        state.unified.clear();
        state.events.push(StoreEvent::Clear);
        Ok(removed)
    }

    async fn restore_unified(&self, docs: Vec<Document>) -> Result<u64> {
        let mut state = self.state.write().await;
        if state.fail_restores {
            return Err(MigrationError::Database("restore refused".into()));
        }
        let count = docs.len();
        state.unified.extend(docs);
        state.events.push(StoreEvent::Restore(count));
        Ok(count as u64)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.closed = true;
        state.events.push(StoreEvent::Close);
        Ok(())
    }
}

/// Hands out a shared in-memory store, or refuses to connect
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    pub store: InMemoryProjectStore,
    pub refuse: bool,
}

impl InMemoryConnector {
    pub fn new(store: InMemoryProjectStore) -> Self {
        Self {
            store,
            refuse: false,
        }
    }
}

#[async_trait::async_trait]
impl StoreConnector for InMemoryConnector {
    type Store = InMemoryProjectStore;

    async fn connect(&self) -> Result<InMemoryProjectStore> {
        if self.refuse {
            return Err(MigrationError::Database("connection refused".into()));
        }
        Ok(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{PreparationDetails, ProjectKind};
    use crate::registry::{Department, Importance, ProjectSource, ProjectStatus};
    use bson::doc;

    fn project(name: &str) -> ProjectDoc {
        ProjectDoc::new(
            name.to_string(),
            Department::TransferInvestmentDept1,
            ProjectSource::Hospital,
            Importance::VeryImportant,
            ProjectStatus::EarlyStage,
            ProjectKind::InternalPreparation(PreparationDetails {
                composition: "柴胡".into(),
                function: "疏肝".into(),
                leader: None,
            }),
            ObjectId::new(),
        )
    }

    #[test]
    fn test_collection_names_default() {
        let names = CollectionNames::default();
        assert_eq!(names.legacy(LegacySource::InternalPreparation), "internalpreparationprojects");
        assert_eq!(names.legacy(LegacySource::OtherProject), "otherprojects");
        assert_eq!(names.unified, "projects");
    }

    #[tokio::test]
    async fn test_in_memory_insert_stamps_and_assigns_id() {
        let store = InMemoryProjectStore::new();
        let id = store.insert_project(project("舒肝和胃丸")).await.unwrap();

        let unified = store.unified().await;
        assert_eq!(unified.len(), 1);
        assert_eq!(unified[0].get_object_id("_id").unwrap(), id);
        assert!(unified[0].get_datetime("createTime").is_ok());
        assert!(unified[0].get_datetime("updateTime").is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_failure_injection() {
        let store = InMemoryProjectStore::new();
        store.fail_inserts_named("bad").await;
        assert!(store.insert_project(project("bad")).await.is_err());
        assert!(store.insert_project(project("good")).await.is_ok());
        assert_eq!(store.count_unified().await.unwrap(), 1);

        store.fail_legacy_reads().await;
        assert!(store.load_legacy(LegacySource::OtherProject, 100).await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_clear_and_restore() {
        let store = InMemoryProjectStore::new();
        store.seed_unified(vec![doc! { "name": "a" }, doc! { "name": "b" }]).await;

        assert_eq!(store.clear_unified().await.unwrap(), 2);
        assert_eq!(store.count_unified().await.unwrap(), 0);

        assert_eq!(store.restore_unified(vec![doc! { "name": "a" }]).await.unwrap(), 1);
        assert_eq!(store.unified().await, vec![doc! { "name": "a" }]);
    }

    #[tokio::test]
    async fn test_connector_shares_store() {
        let connector = InMemoryConnector::new(InMemoryProjectStore::new());
        let store = connector.connect().await.unwrap();
        store.close().await.unwrap();
        assert!(connector.store.is_closed().await);

        let refusing = InMemoryConnector {
            refuse: true,
            ..Default::default()
        };
        assert!(refusing.connect().await.is_err());
    }
}
