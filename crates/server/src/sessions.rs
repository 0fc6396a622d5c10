//! Open sessions, one per signed-in user.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use chrono::NaiveDate;
use engine::Engine;
use ingest::{IngestError, Session};
use tokio::sync::Mutex;

pub(crate) type SessionHandle = Arc<Mutex<Session>>;

#[derive(Clone, Default)]
pub(crate) struct SessionRegistry {
    sessions: Arc<StdMutex<HashMap<String, SessionHandle>>>,
}

impl SessionRegistry {
    fn get(&self, username: &str) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .map(|sessions| sessions.get(username).cloned())
            .unwrap_or_default()
    }

    /// Returns the user's session, opening it on first use.
    pub(crate) async fn open(
        &self,
        engine: &Engine,
        username: &str,
        today: NaiveDate,
    ) -> Result<SessionHandle, IngestError> {
        if let Some(handle) = self.get(username) {
            return Ok(handle);
        }

        let session = Session::open(engine.clone(), username, today).await?;
        let handle = Arc::new(Mutex::new(session));
        let Ok(mut sessions) = self.sessions.lock() else {
            return Ok(handle);
        };
        // A concurrent request may have opened one meanwhile; keep the first.
        Ok(sessions
            .entry(username.to_string())
            .or_insert(handle)
            .clone())
    }

    pub(crate) fn close(&self, username: &str) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.remove(username))
    }
}
