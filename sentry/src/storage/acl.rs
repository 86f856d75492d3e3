//! ACL policy file with timestamped backups.
//!
//! A best-effort side file: every overwrite is preceded by a backup of the
//! previous policy, and only the newest backups are retained. Failures in
//! backup pruning are logged, never surfaced.

use chrono::Utc;
use tracing::warn;

use crate::errors::SentryError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Number of timestamped backups kept per policy file.
const MAX_BACKUPS: usize = 10;

/// On-disk ACL policy store.
pub struct AclStore {
    policy_file: File,
    backup_dir: Dir,
}

impl AclStore {
    pub fn new(policy_file: File, backup_dir: Dir) -> Self {
        Self {
            policy_file,
            backup_dir,
        }
    }

    /// Read the current policy document.
    pub async fn read(&self) -> Result<serde_json::Value, SentryError> {
        self.policy_file.read_json().await
    }

    /// Replace the policy, backing up the previous version first.
    ///
    /// The incoming document must be valid JSON; anything else is a
    /// validation error caught before the file is touched.
    pub async fn write(&self, policy: &str) -> Result<(), SentryError> {
        let parsed: serde_json::Value = serde_json::from_str(policy)
            .map_err(|e| SentryError::ValidationError(format!("ACL policy is not valid JSON: {}", e)))?;

        if self.policy_file.exists().await {
            // Microsecond resolution so rapid successive writes never share a
            // backup name.
            let backup_name = format!("acl.json.bak.{}", Utc::now().timestamp_micros());
            let backup = self.backup_dir.file(&backup_name);
            self.policy_file.copy_to(&backup).await?;
            self.prune_backups().await;
        }

        self.policy_file.write_json_atomic(&parsed).await
    }

    /// List backup file names, newest first. No backup directory yet means
    /// no backups.
    pub async fn list_backups(&self) -> Result<Vec<String>, SentryError> {
        if !self.backup_dir.exists().await {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = self
            .backup_dir
            .list_files()
            .await?
            .into_iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .filter(|n| n.starts_with("acl.json.bak."))
            .collect();
        names.sort();
        names.reverse();
        Ok(names)
    }

    /// Restore the policy from a named backup. The current policy is backed
    /// up first, so a restore is itself reversible.
    pub async fn restore(&self, backup_name: &str) -> Result<(), SentryError> {
        if !backup_name.starts_with("acl.json.bak.")
            || backup_name.contains('/')
            || backup_name.contains('\\')
        {
            return Err(SentryError::ValidationError(format!(
                "not a backup file name: {:?}",
                backup_name
            )));
        }

        let backup = self.backup_dir.file(backup_name);
        let contents = backup.read_string().await?;
        self.write(&contents).await
    }

    async fn prune_backups(&self) {
        let names = match self.list_backups().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Could not list ACL backups for pruning");
                return;
            }
        };

        for stale in names.iter().skip(MAX_BACKUPS) {
            if let Err(e) = self.backup_dir.file(stale).delete().await {
                warn!(backup = %stale, error = %e, "Could not prune ACL backup");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> AclStore {
        let base = std::env::temp_dir().join(format!("tailsentry-acl-test-{}", tag));
        AclStore::new(
            File::new(base.join("acl.json")),
            Dir::new(base.join("acl-backups")),
        )
    }

    #[tokio::test]
    async fn test_write_rejects_invalid_json() {
        let store = temp_store("invalid");
        let err = store.write("{not json").await;
        assert!(matches!(err, Err(SentryError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_write_creates_backup_of_previous() {
        let store = temp_store("backup");
        let _ = store.policy_file.delete().await;

        store.write(r#"{"acls": []}"#).await.unwrap();
        store.write(r#"{"acls": [{"action": "accept"}]}"#).await.unwrap();

        let backups = store.list_backups().await.unwrap();
        assert!(!backups.is_empty());

        let current = store.read().await.unwrap();
        assert!(current["acls"].as_array().is_some_and(|a| !a.is_empty()));
    }

    #[tokio::test]
    async fn test_rapid_writes_keep_distinct_backups() {
        let store = temp_store("rapid");
        let _ = store.policy_file.delete().await;
        for backup in store.list_backups().await.unwrap() {
            let _ = store.backup_dir.file(&backup).delete().await;
        }

        store.write(r#"{"acls": []}"#).await.unwrap();
        store.write(r#"{"acls": [{"action": "accept"}]}"#).await.unwrap();
        store.write(r#"{"acls": [{"action": "drop"}]}"#).await.unwrap();

        let backups = store.list_backups().await.unwrap();
        assert_eq!(backups.len(), 2);
    }

    #[tokio::test]
    async fn test_restore_rejects_path_traversal() {
        let store = temp_store("traversal");
        assert!(store.restore("../settings.json").await.is_err());
        assert!(store.restore("acl.json.bak.1/../../x").await.is_err());
    }
}
