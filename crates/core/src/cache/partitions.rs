//! Partition lifecycle: naming, provisioning, enumeration and deletion.

use std::fmt;

use super::connection::PartitionStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Logical role of a partition. Exactly one partition per role is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    /// App shell and other static assets.
    Static,
    /// Responses refreshed by stale-while-revalidate and navigations.
    Dynamic,
    /// API responses.
    Api,
}

impl PartitionRole {
    pub const ALL: [PartitionRole; 3] = [PartitionRole::Static, PartitionRole::Dynamic, PartitionRole::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
            PartitionRole::Api => "api",
        }
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `{static, dynamic, api}` partition names of one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSet {
    version: String,
}

impl PartitionSet {
    pub fn new(version: &str) -> Self {
        Self { version: version.to_string() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the partition for a role, e.g. `static-cache-v1.0.3`.
    pub fn name(&self, role: PartitionRole) -> String {
        format!("{}-cache-v{}", role, self.version)
    }

    pub fn names(&self) -> Vec<String> {
        PartitionRole::ALL.iter().map(|role| self.name(*role)).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        PartitionRole::ALL.iter().any(|role| self.name(*role) == name)
    }
}

/// Handle to an opened partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub(crate) id: i64,
    pub name: String,
}

impl PartitionStore {
    /// Open a partition, creating it if it doesn't exist.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Partition, Error> {
                conn.execute(
                    "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                let id: i64 = conn.query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| {
                    row.get(0)
                })?;
                Ok(Partition { id, name })
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an existing partition without creating it.
    pub async fn find_partition(&self, name: &str) -> Result<Option<Partition>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Partition>, Error> {
                let result = conn.query_row("SELECT id FROM partitions WHERE name = ?1", params![name], |row| {
                    row.get::<_, i64>(0)
                });
                match result {
                    Ok(id) => Ok(Some(Partition { id, name })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all partitions in creation order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if no partition had that name.
    pub async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `current`.
    ///
    /// Returns the deleted names.
    pub async fn delete_all_except(&self, current: &[String]) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.keys().await? {
            if !current.contains(&name) && self.delete(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Delete every partition.
    ///
    /// Returns the number of deleted partitions.
    pub async fn clear_all(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM partitions", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Total body bytes stored across all partitions.
    pub async fn total_size_bytes(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let total: i64 =
                    conn.query_row("SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries", [], |row| row.get(0))?;
                Ok(total as u64)
            })
            .await
            .map_err(Error::from)
    }
}
