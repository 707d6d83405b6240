// akeno-admin/src/auth/store.rs
use crate::models::Session;
use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Where the current session survives between restarts.
pub trait SessionStore: Send + Sync {
    /// A missing or unreadable session is `None`, never an error.
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

// Session persisted as a JSON file
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        if !self.path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                error!("❌ Failed to read session file {:?}: {:?}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("⚠️ Ignoring unparsable session file {:?}: {:?}", self.path, e);
                None
            }
        }
    }

    fn save(&self, session: &Session) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating session directory {:?}", parent);
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(session)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, json)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// Session kept only for the life of the process
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, session: &Session) -> io::Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Lock error: {:?}", e)))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Lock error: {:?}", e)))?;
        *guard = None;
        Ok(())
    }
}
