//! Rollback
//!
//! Legacy collections are never written by a migration, so undoing one only
//! concerns the unified collection. [`rollback`] empties it so a migration
//! can be re-run; [`rollback_to_snapshot`] also puts back whatever the
//! unified collection held before the run.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::migration::backup::BackupSnapshot;
use crate::migration::store::{ProjectStore, StoreConnector};
use crate::types::Result;

/// What a rollback changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutcome {
    pub removed: u64,
    pub restored: u64,
}

/// Delete every unified record
pub async fn rollback<S: ProjectStore + ?Sized>(store: &S) -> Result<RollbackOutcome> {
    let removed = store.clear_unified().await?;
    warn!(removed, "Unified collection cleared");
    Ok(RollbackOutcome {
        removed,
        restored: 0,
    })
}

/// Delete every unified record, then restore the ones captured in `snapshot`
pub async fn rollback_to_snapshot<S: ProjectStore + ?Sized>(
    store: &S,
    snapshot: &BackupSnapshot,
) -> Result<RollbackOutcome> {
    let RollbackOutcome { removed, .. } = rollback(store).await?;
    let restored = match store.restore_unified(snapshot.unified.clone()).await {
        Ok(restored) => restored,
        Err(e) => {
            // The unified collection is empty at this point
            error!(
                run_id = %snapshot.run_id,
                taken_at = %snapshot.taken_at,
                file = %snapshot.file_name(),
                removed,
                error = %e,
                "Restore failed after clearing; re-run `rollback --from-backup` with this backup"
            );
            return Err(e);
        }
    };
    info!(
        run_id = %snapshot.run_id,
        taken_at = %snapshot.taken_at,
        removed,
        restored,
        "Unified collection restored from backup"
    );
    Ok(RollbackOutcome { removed, restored })
}

/// Connect, roll back and close, releasing the connection on every path
pub async fn run_rollback<C: StoreConnector>(
    connector: &C,
    snapshot: Option<&BackupSnapshot>,
) -> Result<RollbackOutcome> {
    let store = connector.connect().await?;

    let outcome = match snapshot {
        Some(snapshot) => rollback_to_snapshot(&store, snapshot).await,
        None => rollback(&store).await,
    };

    if let Err(e) = store.close().await {
        warn!(error = %e, "Closing the connection failed");
    }
    outcome
}
