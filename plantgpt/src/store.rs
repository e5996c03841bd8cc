//! Persistent scheme store: an SQLite table of (name, code, image) records.
//!
//! The rendered image is kept twice: as a file in the images directory and as
//! bytes in the database, so a stored scheme survives `clean-images`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tokio::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schemes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    code TEXT NOT NULL,
    image_path TEXT NOT NULL,
    image_data BLOB
)";

/// A stored diagram. Image bytes stay in the database; see [`SchemeStore::image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheme {
    /// Identifier, unique and increasing in insertion order. Never reused.
    pub id: i64,
    /// File name the scheme was generated under; unique in the store.
    pub name: String,
    /// Diagram source.
    pub code: String,
    /// Where the image was stored when the scheme was recorded.
    pub image_path: PathBuf,
}

impl Scheme {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            image_path: PathBuf::from(row.get::<_, String>(3)?),
        })
    }

    fn image_file_name(&self) -> String {
        let extension = self
            .image_path
            .extension()
            .map_or_else(|| "png".to_string(), |e| e.to_string_lossy().into_owned());
        format!("{}.{extension}", self.name)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scheme database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No scheme with id {0}")]
    NotFound(i64),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Destination for successfully rendered diagrams.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Records `source` and its rendered image under `name`, replacing any
    /// previous record with that name.
    ///
    /// # Errors
    /// Returns `StoreError` if the record cannot be persisted.
    async fn store(&self, name: &str, source: &str, artifact_path: &Path) -> Result<(), StoreError>;
}

/// SQLite-backed scheme store.
///
/// Clones share one connection behind a lock, so writers through any clone
/// are serialized.
#[derive(Debug, Clone)]
pub struct SchemeStore {
    db_path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SchemeStore {
    /// Opens (creating if needed) the database at `db_path`.
    ///
    /// # Errors
    /// Returns `StoreError` if the directory cannot be created or the file is
    /// not a usable SQLite database.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Inserts or replaces the scheme called `name` and returns the stored record.
    ///
    /// The image at `image_path` is read into the database when it exists. A
    /// replaced record gets a fresh id, so it lists first again.
    ///
    /// # Errors
    /// Returns `StoreError` if the image exists but cannot be read, or the
    /// database write fails.
    pub async fn upsert(&self, name: &str, code: &str, image_path: &Path) -> Result<Scheme, StoreError> {
        let image_data = match tokio::fs::read(image_path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(io_error(image_path)(e)),
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO schemes (name, code, image_path, image_data) VALUES (?1, ?2, ?3, ?4)",
            params![name, code, image_path.to_string_lossy().into_owned(), image_data],
        )?;
        let id = conn.last_insert_rowid();

        tracing::info!(
            event = "scheme_stored",
            id,
            name,
            image_bytes = image_data.as_ref().map_or(0, Vec::len),
            "scheme_stored"
        );
        Ok(Scheme {
            id,
            name: name.to_string(),
            code: code.to_string(),
            image_path: image_path.to_path_buf(),
        })
    }

    /// All schemes, newest first.
    ///
    /// # Errors
    /// Returns `StoreError` if the query fails.
    pub async fn list(&self) -> Result<Vec<Scheme>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, name, code, image_path FROM schemes ORDER BY id DESC")?;
        let schemes = stmt
            .query_map([], Scheme::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schemes)
    }

    /// # Errors
    /// Returns `StoreError::NotFound` if no scheme has this id.
    pub async fn get(&self, id: i64) -> Result<Scheme, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, code, image_path FROM schemes WHERE id = ?1",
            [id],
            Scheme::from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound(id))
    }

    /// # Errors
    /// Returns `StoreError` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Scheme>, StoreError> {
        let conn = self.conn.lock().await;
        Ok(conn
            .query_row(
                "SELECT id, name, code, image_path FROM schemes WHERE name = ?1",
                [name],
                Scheme::from_row,
            )
            .optional()?)
    }

    /// Image bytes kept for scheme `id`, if the image existed when it was stored.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no scheme has this id.
    pub async fn image(&self, id: i64) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT image_data FROM schemes WHERE id = ?1", [id], |row| {
            row.get::<_, Option<Vec<u8>>>(0)
        })
        .optional()?
        .ok_or(StoreError::NotFound(id))
    }

    /// Removes a scheme and its image file, returning the removed record.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if no scheme has this id.
    pub async fn delete(&self, id: i64) -> Result<Scheme, StoreError> {
        let scheme = self.get(id).await?;
        self.conn
            .lock()
            .await
            .execute("DELETE FROM schemes WHERE id = ?1", [id])?;

        if scheme.image_path.is_file() {
            if let Err(e) = tokio::fs::remove_file(&scheme.image_path).await {
                tracing::warn!(
                    event = "scheme_image_not_removed",
                    path = %scheme.image_path.display(),
                    error = %e,
                    "scheme_image_not_removed"
                );
            }
        }

        tracing::info!(event = "scheme_deleted", id, name = %scheme.name, "scheme_deleted");
        Ok(scheme)
    }

    /// Writes `<name>.uml` and `<name>.<ext>` into `out_dir`.
    ///
    /// The image comes from the bytes stored with the scheme, or from the
    /// image file for records stored without them. Returns the files written.
    ///
    /// # Errors
    /// Returns `StoreError` if the scheme does not exist or a file cannot be written.
    pub async fn export(&self, id: i64, out_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let scheme = self.get(id).await?;
        let stored_image = self.image(id).await?;
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(io_error(out_dir))?;

        let mut written = Vec::new();

        let source_path = out_dir.join(format!("{}.uml", scheme.name));
        tokio::fs::write(&source_path, &scheme.code)
            .await
            .map_err(io_error(&source_path))?;
        written.push(source_path);

        let image_copy = out_dir.join(scheme.image_file_name());
        match stored_image {
            Some(bytes) => {
                tokio::fs::write(&image_copy, bytes)
                    .await
                    .map_err(io_error(&image_copy))?;
                written.push(image_copy);
            }
            None if scheme.image_path.is_file() => {
                if image_copy != scheme.image_path {
                    tokio::fs::copy(&scheme.image_path, &image_copy)
                        .await
                        .map_err(io_error(&image_copy))?;
                }
                written.push(image_copy);
            }
            None => {
                tracing::warn!(
                    event = "scheme_image_missing",
                    id,
                    path = %scheme.image_path.display(),
                    "scheme_image_missing"
                );
            }
        }

        Ok(written)
    }
}

#[async_trait]
impl ArtifactSink for SchemeStore {
    async fn store(&self, name: &str, source: &str, artifact_path: &Path) -> Result<(), StoreError> {
        self.upsert(name, source, artifact_path).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> SchemeStore {
        SchemeStore::open(dir.join("DB/plantuml_schemes.db")).unwrap()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.db_path().is_file());
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(store.get(1).await, Err(StoreError::NotFound(1))));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.upsert("a", "@startuml\n@enduml", Path::new("/i/a.png")).await.unwrap();
        store.upsert("b", "@startuml\n@enduml", Path::new("/i/b.png")).await.unwrap();

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_store_is_idempotent_upsert_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.store("login", "v1", Path::new("/i/login.png")).await.unwrap();
        store.store("other", "x", Path::new("/i/other.png")).await.unwrap();
        store.store("login", "v2", Path::new("/i/login.png")).await.unwrap();
        store.store("login", "v2", Path::new("/i/login.png")).await.unwrap();

        let schemes = store.list().await.unwrap();
        assert_eq!(schemes.len(), 2);
        assert_eq!(schemes[0].name, "login");
        assert_eq!(schemes[0].code, "v2");

        let login = store.get_by_name("login").await.unwrap().unwrap();
        assert!(login.id > schemes[1].id);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_in(dir.path()).upsert("a", "x", Path::new("/i/a.png")).await.unwrap();

        let reopened = store_in(dir.path());
        assert_eq!(reopened.get(stored.id).await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_ids_never_reused_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let first = store.upsert("a", "x", Path::new("/i/a.png")).await.unwrap();
        store.delete(first.id).await.unwrap();
        let second = store.upsert("b", "x", Path::new("/i/b.png")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_delete_removes_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"png").unwrap();
        let store = store_in(dir.path());
        let scheme = store.upsert("a", "x", &image).await.unwrap();

        let removed = store.delete(scheme.id).await.unwrap();

        assert_eq!(removed.name, "a");
        assert!(!image.exists());
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(store.delete(scheme.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_export_writes_source_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("seq.png");
        std::fs::write(&image, b"png-bytes").unwrap();
        let store = store_in(dir.path());
        let scheme = store.upsert("seq", "@startuml\nA -> B\n@enduml", &image).await.unwrap();

        let out = dir.path().join("export");
        let written = store.export(scheme.id, &out).await.unwrap();

        assert_eq!(written, vec![out.join("seq.uml"), out.join("seq.png")]);
        assert_eq!(
            std::fs::read_to_string(out.join("seq.uml")).unwrap(),
            "@startuml\nA -> B\n@enduml"
        );
        assert_eq!(std::fs::read(out.join("seq.png")).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_export_uses_stored_bytes_after_image_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("flow.svg");
        std::fs::write(&image, b"<svg/>").unwrap();
        let store = store_in(dir.path());
        let scheme = store.upsert("flow", "x", &image).await.unwrap();
        std::fs::remove_file(&image).unwrap();

        let out = dir.path().join("export");
        let written = store.export(scheme.id, &out).await.unwrap();

        assert_eq!(written, vec![out.join("flow.uml"), out.join("flow.svg")]);
        assert_eq!(std::fs::read(out.join("flow.svg")).unwrap(), b"<svg/>");
        assert_eq!(store.image(scheme.id).await.unwrap().as_deref(), Some(&b"<svg/>"[..]));
    }

    #[tokio::test]
    async fn test_export_skips_image_that_never_existed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let scheme = store.upsert("gone", "x", &dir.path().join("gone.png")).await.unwrap();

        assert_eq!(store.image(scheme.id).await.unwrap(), None);
        let written = store.export(scheme.id, dir.path()).await.unwrap();
        assert_eq!(written, vec![dir.path().join("gone.uml")]);
    }

    #[tokio::test]
    async fn test_non_database_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DB/plantuml_schemes.db");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not a database\n".repeat(512)).unwrap();

        assert!(matches!(SchemeStore::open(&path), Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn test_concurrent_writers_through_clones() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .upsert(&format!("s{i}"), "x", Path::new("/i/x.png"))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let schemes = store.list().await.unwrap();
        assert_eq!(schemes.len(), 8);
        let mut ids: Vec<i64> = schemes.iter().map(|s| s.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
