//! Durable pre-migration backup
//!
//! Captures both legacy collections and the current unified collection,
//! then writes them to a JSON file before the first unified write. Documents
//! are stored as canonical extended JSON so ObjectIds, dates and numeric
//! types survive the round trip unchanged.

use std::path::{Path, PathBuf};

use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::schemas::LegacySource;
use crate::migration::store::ProjectStore;
use crate::types::{MigrationError, Result};

/// Everything the migration could touch, as it was before the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub run_id: Uuid,
    pub taken_at: DateTime<Utc>,
    #[serde(with = "extjson_docs")]
    pub internal_preparation: Vec<Document>,
    #[serde(with = "extjson_docs")]
    pub other_project: Vec<Document>,
    /// Unified documents present before the run; what a restore goes back to
    #[serde(with = "extjson_docs")]
    pub unified: Vec<Document>,
}

impl BackupSnapshot {
    /// Read both legacy collections and the unified collection into memory
    pub async fn capture<S: ProjectStore + ?Sized>(
        store: &S,
        run_id: Uuid,
        batch_size: u32,
    ) -> Result<Self> {
        let internal_preparation =
            read_for_backup(store, LegacySource::InternalPreparation, batch_size).await?;
        let other_project = read_for_backup(store, LegacySource::OtherProject, batch_size).await?;
        let unified = store
            .load_unified(batch_size)
            .await
            .map_err(|e| MigrationError::Backup(format!("reading unified projects: {}", e)))?;

        info!(
            internal_preparation = internal_preparation.len(),
            other_project = other_project.len(),
            unified = unified.len(),
            "Backup captured"
        );

        Ok(Self {
            run_id,
            taken_at: Utc::now(),
            internal_preparation,
            other_project,
            unified,
        })
    }

    /// Legacy documents of one source
    pub fn legacy(&self, source: LegacySource) -> &[Document] {
        match source {
            LegacySource::InternalPreparation => &self.internal_preparation,
            LegacySource::OtherProject => &self.other_project,
        }
    }

    /// File name for this snapshot, unique per run
    pub fn file_name(&self) -> String {
        format!(
            "backup-{}-{}.json",
            self.taken_at.format("%Y%m%dT%H%M%SZ"),
            self.run_id.simple()
        )
    }

    /// Write the snapshot under `dir`, returning the file path
    ///
    /// Written to a temporary name first and renamed, so a crash never
    /// leaves a truncated backup behind under the final name.
    pub async fn persist(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            MigrationError::Backup(format!("creating {}: {}", dir.display(), e))
        })?;

        let path = dir.join(self.file_name());
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(self)?;

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| MigrationError::Backup(format!("writing {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| MigrationError::Backup(format!("renaming {}: {}", tmp.display(), e)))?;

        info!(path = %path.display(), "Backup written");
        Ok(path)
    }

    /// Read a snapshot written by [`BackupSnapshot::persist`]
    pub async fn load(path: &Path) -> Result<Self> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| MigrationError::Backup(format!("reading {}: {}", path.display(), e)))?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn read_for_backup<S: ProjectStore + ?Sized>(
    store: &S,
    source: LegacySource,
    batch_size: u32,
) -> Result<Vec<Document>> {
    store
        .load_legacy(source, batch_size)
        .await
        .map_err(|e| MigrationError::Backup(format!("reading {} records: {}", source, e)))
}

mod extjson_docs {
    use super::*;
    use serde::{de::Error as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        docs: &[Document],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let values: Vec<serde_json::Value> = docs
            .iter()
            .map(|doc| Bson::Document(doc.clone()).into_canonical_extjson())
            .collect();
        values.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<Document>, D::Error> {
        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        values
            .into_iter()
            .map(|value| match Bson::try_from(value) {
                Ok(Bson::Document(doc)) => Ok(doc),
                Ok(other) => Err(D::Error::custom(format!(
                    "expected a document, found {:?}",
                    other.element_type()
                ))),
                Err(e) => Err(D::Error::custom(e)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::store::{InMemoryProjectStore, StoreEvent};
    use bson::{doc, oid::ObjectId};

    async fn seeded() -> InMemoryProjectStore {
        let store = InMemoryProjectStore::new();
        store
            .seed_legacy(
                LegacySource::InternalPreparation,
                vec![doc! {
                    "_id": ObjectId::new(),
                    "name": "舒肝和胃丸",
                    "createTime": bson::DateTime::from_millis(1_600_000_000_000),
                    "followUpWeeks": 12_i64,
                    "dose": 1.5,
                }],
            )
            .await;
        store
            .seed_legacy(LegacySource::OtherProject, vec![doc! { "name": "AI辅助诊断系统" }])
            .await;
        store
    }

    #[tokio::test]
    async fn test_capture_reads_everything() {
        let store = seeded().await;
        let run_id = Uuid::new_v4();
        let snapshot = BackupSnapshot::capture(&store, run_id, 50).await.unwrap();

        assert_eq!(snapshot.run_id, run_id);
        assert_eq!(snapshot.legacy(LegacySource::InternalPreparation).len(), 1);
        assert_eq!(snapshot.legacy(LegacySource::OtherProject).len(), 1);
        assert!(snapshot.unified.is_empty());
    }

    #[tokio::test]
    async fn test_capture_reads_with_requested_batch_size() {
        let store = seeded().await;
        BackupSnapshot::capture(&store, Uuid::new_v4(), 7).await.unwrap();

        assert_eq!(
            store.events().await,
            vec![
                StoreEvent::LegacyRead(LegacySource::InternalPreparation, 7),
                StoreEvent::LegacyRead(LegacySource::OtherProject, 7),
                StoreEvent::UnifiedRead(7),
            ]
        );
    }

    #[tokio::test]
    async fn test_capture_failure_is_a_backup_error() {
        let store = seeded().await;
        store.fail_legacy_reads().await;

        let err = BackupSnapshot::capture(&store, Uuid::new_v4(), 50).await.unwrap_err();
        assert!(matches!(err, MigrationError::Backup(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_persist_and_load_preserve_bson_types() {
        let store = seeded().await;
        let snapshot = BackupSnapshot::capture(&store, Uuid::new_v4(), 50).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = snapshot.persist(dir.path()).await.unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = BackupSnapshot::load(&path).await.unwrap();
        assert_eq!(loaded, snapshot);

        let doc = &loaded.internal_preparation[0];
        assert!(doc.get_object_id("_id").is_ok());
        assert!(doc.get_datetime("createTime").is_ok());
        assert_eq!(doc.get_i64("followUpWeeks").unwrap(), 12);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BackupSnapshot::load(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, MigrationError::Backup(_)));
    }
}
