//! LibSQL storage backend implementation
//!
//! Each resource kind gets its own table holding the name, the parent name and
//! the record as JSON. Content bytes live in a shared `blobs` table keyed by
//! resource name, so metadata queries never read them. Deleting a spec or an
//! artifact drops its blob through a trigger, inside the same statement.
//!
//! File databases hand every operation its own connection. An in-memory
//! database exists only inside the connection that created it, so that one
//! connection is kept and operations take turns on it.

use crate::config::IN_MEMORY;
use crate::error::{RegistryError, Result};
use crate::filter::{Filter, Filterable};
use crate::names::{
    ApiName, ArtifactName, ArtifactParent, ProjectName, SpecName, VersionName, WILDCARD,
};
use crate::pagination::{decode_cursor, page_of, Page, PageOptions};
use crate::storage::StorageBackend;
use crate::types::{Api, Artifact, Project, Spec, Version};
use async_trait::async_trait;
use libsql::{params, Builder, Connection, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::Deref;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (name TEXT PRIMARY KEY, parent TEXT NOT NULL, body TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS apis (name TEXT PRIMARY KEY, parent TEXT NOT NULL, body TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS versions (name TEXT PRIMARY KEY, parent TEXT NOT NULL, body TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS specs (name TEXT PRIMARY KEY, parent TEXT NOT NULL, body TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS artifacts (name TEXT PRIMARY KEY, parent TEXT NOT NULL, body TEXT NOT NULL);
CREATE TABLE IF NOT EXISTS blobs (name TEXT PRIMARY KEY, contents BLOB NOT NULL);
CREATE INDEX IF NOT EXISTS idx_apis_parent ON apis(parent);
CREATE INDEX IF NOT EXISTS idx_versions_parent ON versions(parent);
CREATE INDEX IF NOT EXISTS idx_specs_parent ON specs(parent);
CREATE INDEX IF NOT EXISTS idx_artifacts_parent ON artifacts(parent);
CREATE TRIGGER IF NOT EXISTS specs_drop_blob AFTER DELETE ON specs
BEGIN DELETE FROM blobs WHERE name = old.name; END;
CREATE TRIGGER IF NOT EXISTS artifacts_drop_blob AFTER DELETE ON artifacts
BEGIN DELETE FROM blobs WHERE name = old.name; END;
"#;

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Literal part of a pattern before its first wildcard segment
fn literal_prefix(pattern: &str) -> String {
    let mut prefix = String::new();
    for segment in pattern.split('/') {
        if segment == WILDCARD {
            return prefix;
        }
        prefix.push_str(segment);
        prefix.push('/');
    }
    prefix
}

/// Connection lent to a single operation
enum Conn<'a> {
    Fresh(Connection),
    Pinned(MutexGuard<'a, Connection>),
}

impl Deref for Conn<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Conn::Fresh(conn) => conn,
            Conn::Pinned(guard) => &**guard,
        }
    }
}

/// LibSQL storage backend
pub struct LibsqlStorage {
    db: Database,
    path: String,
    pinned: Option<Mutex<Connection>>,
}

impl LibsqlStorage {
    /// Open (creating if needed) a local database and apply the schema
    ///
    /// `":memory:"` gives a private in-memory database that lives as long as
    /// this value.
    pub async fn open(path: &str) -> Result<Self> {
        info!("Opening registry database at {}", path);
        let db = Builder::new_local(path).build().await.map_err(|e| {
            RegistryError::Unavailable(format!("failed to open database {}: {}", path, e))
        })?;
        let mut storage = Self {
            db,
            path: path.to_string(),
            pinned: None,
        };
        if path == IN_MEMORY {
            storage.pinned = Some(Mutex::new(storage.connect()?));
        } else {
            let conn = storage.conn().await?;
            conn.query("PRAGMA journal_mode=WAL", ()).await?;
        }
        storage.conn().await?.execute_batch(SCHEMA).await?;
        Ok(storage)
    }

    fn connect(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| {
            RegistryError::Unavailable(format!("failed to connect to {}: {}", self.path, e))
        })
    }

    /// Connection for one operation
    async fn conn(&self) -> Result<Conn<'_>> {
        if let Some(pinned) = &self.pinned {
            return Ok(Conn::Pinned(pinned.lock().await));
        }
        let conn = self.connect()?;
        conn.query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS), ())
            .await?;
        Ok(Conn::Fresh(conn))
    }

    async fn get_record<T: DeserializeOwned>(&self, table: &str, kind: &str, name: &str) -> Result<T> {
        let sql = format!("SELECT body FROM {} WHERE name = ?1", table);
        let conn = self.conn().await?;
        let mut rows = conn.query(&sql, params![name]).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("{} {} not found", kind, name)))?;
        let body: String = row.get(0)?;
        serde_json::from_str(&body)
            .map_err(|e| RegistryError::internal(format!("corrupt {} record {}: {}", kind, name, e)))
    }

    async fn save_record<T: Serialize>(
        &self,
        table: &str,
        name: String,
        parent: String,
        record: &T,
    ) -> Result<()> {
        let body = serde_json::to_string(record)?;
        let sql = format!(
            "INSERT OR REPLACE INTO {} (name, parent, body) VALUES (?1, ?2, ?3)",
            table
        );
        self.conn()
            .await?
            .execute(&sql, params![name, parent, body])
            .await?;
        Ok(())
    }

    async fn delete_record(&self, table: &str, kind: &str, name: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE name = ?1", table);
        let deleted = self.conn().await?.execute(&sql, params![name]).await?;
        if deleted == 0 {
            return Err(RegistryError::not_found(format!("{} {} not found", kind, name)));
        }
        Ok(())
    }

    /// One page of records whose parent starts with `prefix`
    ///
    /// The cursor is applied in SQL. Rows come back in batches of one more
    /// than the page size; `keep` and the filter run on each batch until a
    /// page and one extra match are found or the rows run out.
    async fn list_page<T>(
        &self,
        table: &str,
        prefix: &str,
        options: &PageOptions,
        keep: impl Fn(&T) -> bool,
    ) -> Result<Page<T>>
    where
        T: DeserializeOwned + Filterable,
    {
        let filter = Filter::for_type::<T>(&options.filter)?;
        let mut after = decode_cursor(&options.token, &options.filter)?.unwrap_or_default();
        let size = options.size.max(1);
        let batch = size + 1;
        let sql = format!(
            "SELECT name, body FROM {} \
             WHERE substr(parent || '/', 1, length(?1)) = ?1 AND name > ?2 \
             ORDER BY name LIMIT ?3",
            table
        );

        let conn = self.conn().await?;
        let mut matches = Vec::new();
        loop {
            let mut rows = conn
                .query(&sql, params![prefix, after.clone(), batch as i64])
                .await?;
            let mut fetched = 0;
            while let Some(row) = rows.next().await? {
                fetched += 1;
                after = row.get::<String>(0)?;
                let body: String = row.get(1)?;
                let record: T = serde_json::from_str(&body)?;
                if keep(&record) && filter.matches(&record) {
                    matches.push(record);
                }
            }
            if matches.len() > size || fetched < batch {
                break;
            }
            debug!("{} scan continues after {}", table, after);
        }
        Ok(page_of(matches, size, &options.filter))
    }

    async fn get_blob(&self, name: &str) -> Result<Vec<u8>> {
        let conn = self.conn().await?;
        let mut rows = conn
            .query("SELECT contents FROM blobs WHERE name = ?1", params![name])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("contents for {} not found", name)))?;
        Ok(row.get::<Vec<u8>>(0)?)
    }

    async fn put_blob(&self, name: String, contents: &[u8]) -> Result<()> {
        debug!("Saving {} bytes of contents for {}", contents.len(), name);
        self.conn()
            .await?
            .execute(
                "INSERT OR REPLACE INTO blobs (name, contents) VALUES (?1, ?2)",
                params![name, contents.to_vec()],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LibsqlStorage {
    async fn get_project(&self, name: &ProjectName) -> Result<Project> {
        self.get_record("projects", "project", &name.to_string()).await
    }

    async fn save_project(&self, project: &Project) -> Result<()> {
        self.save_record("projects", project.name.to_string(), String::new(), project)
            .await
    }

    async fn delete_project(&self, name: &ProjectName) -> Result<()> {
        self.delete_record("projects", "project", &name.to_string()).await
    }

    async fn list_projects(&self, options: &PageOptions) -> Result<Page<Project>> {
        self.list_page("projects", "", options, |_: &Project| true)
            .await
    }

    async fn get_api(&self, name: &ApiName) -> Result<Api> {
        self.get_record("apis", "api", &name.to_string()).await
    }

    async fn save_api(&self, api: &Api) -> Result<()> {
        self.save_record("apis", api.name.to_string(), api.name.project().to_string(), api)
            .await
    }

    async fn delete_api(&self, name: &ApiName) -> Result<()> {
        self.delete_record("apis", "api", &name.to_string()).await
    }

    async fn list_apis(&self, parent: &ProjectName, options: &PageOptions) -> Result<Page<Api>> {
        let prefix = literal_prefix(&parent.to_string());
        self.list_page("apis", &prefix, options, |a: &Api| {
            parent.matches(&a.name.project())
        })
        .await
    }

    async fn get_version(&self, name: &VersionName) -> Result<Version> {
        self.get_record("versions", "version", &name.to_string()).await
    }

    async fn save_version(&self, version: &Version) -> Result<()> {
        self.save_record(
            "versions",
            version.name.to_string(),
            version.name.api().to_string(),
            version,
        )
        .await
    }

    async fn delete_version(&self, name: &VersionName) -> Result<()> {
        self.delete_record("versions", "version", &name.to_string()).await
    }

    async fn list_versions(
        &self,
        parent: &ApiName,
        options: &PageOptions,
    ) -> Result<Page<Version>> {
        let prefix = literal_prefix(&parent.to_string());
        self.list_page("versions", &prefix, options, |v: &Version| {
            parent.matches(&v.name.api())
        })
        .await
    }

    async fn get_spec(&self, name: &SpecName) -> Result<Spec> {
        self.get_record("specs", "spec", &name.to_string()).await
    }

    async fn save_spec(&self, spec: &Spec) -> Result<()> {
        self.save_record(
            "specs",
            spec.name.to_string(),
            spec.name.version().to_string(),
            &spec.basic(),
        )
        .await
    }

    async fn delete_spec(&self, name: &SpecName) -> Result<()> {
        self.delete_record("specs", "spec", &name.to_string()).await
    }

    async fn list_specs(&self, parent: &VersionName, options: &PageOptions) -> Result<Page<Spec>> {
        let prefix = literal_prefix(&parent.to_string());
        self.list_page("specs", &prefix, options, |s: &Spec| {
            parent.matches(&s.name.version())
        })
        .await
    }

    async fn get_spec_contents(&self, name: &SpecName) -> Result<Vec<u8>> {
        self.get_blob(&name.to_string()).await
    }

    async fn save_spec_contents(&self, name: &SpecName, contents: &[u8]) -> Result<()> {
        self.put_blob(name.to_string(), contents).await
    }

    async fn get_artifact(&self, name: &ArtifactName) -> Result<Artifact> {
        self.get_record("artifacts", "artifact", &name.to_string()).await
    }

    async fn save_artifact(&self, artifact: &Artifact) -> Result<()> {
        self.save_record(
            "artifacts",
            artifact.name.to_string(),
            artifact.subject(),
            &artifact.basic(),
        )
        .await
    }

    async fn delete_artifact(&self, name: &ArtifactName) -> Result<()> {
        self.delete_record("artifacts", "artifact", &name.to_string()).await
    }

    async fn list_artifacts(
        &self,
        parent: &ArtifactParent,
        options: &PageOptions,
    ) -> Result<Page<Artifact>> {
        let prefix = literal_prefix(&parent.to_string());
        self.list_page("artifacts", &prefix, options, |a: &Artifact| {
            parent.matches(a.name.parent())
        })
        .await
    }

    async fn get_artifact_contents(&self, name: &ArtifactName) -> Result<Vec<u8>> {
        self.get_blob(&name.to_string()).await
    }

    async fn save_artifact_contents(&self, name: &ArtifactName, contents: &[u8]) -> Result<()> {
        self.put_blob(name.to_string(), contents).await
    }
}
