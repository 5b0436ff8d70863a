use crate::domain::session::Session;
use crate::error::Result;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Fixed name the session is persisted under.
pub const SESSION_KEY: &str = "userSession";

/// Persistence for the single authenticated session. The session is always
/// read and written as a whole.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    async fn get(&self) -> Result<Option<Session>>;

    async fn set(&self, session: &Session) -> Result<()>;

    // Removing an absent session is not an error.
    async fn clear(&self) -> Result<()>;
}

/// Stores the session as JSON in `<dir>/userSession.json`.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    // Serializes writers so a clear cannot interleave with a rename.
    lock: tokio::sync::Mutex<()>,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{SESSION_KEY}.json")), lock: tokio::sync::Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn remove_file(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self) -> Result<Option<Session>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::error!(error = %e, path = %self.path.display(), "Discarding unreadable session");
                let _guard = self.lock.lock().await;
                self.remove_file().await?;
                Ok(None)
            }
        }
    }

    #[tracing::instrument(err, skip(self, session), fields(path = %self.path.display()), level = "debug")]
    async fn set(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_vec_pretty(session)?;
        let _guard = self.lock.lock().await;

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.remove_file().await
    }
}

/// Keeps the session in process memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self { session: RwLock::new(Some(session)) }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn set(&self, session: &Session) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }
}
