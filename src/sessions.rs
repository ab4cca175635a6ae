use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct Session {
    user_id: String,
    created_at: Instant,
}

/// Login sessions keyed by the random token stored in the `sessionid`
/// cookie. Sessions live only as long as the process and expire after the
/// configured lifetime.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a session for the user. Expired sessions are swept first.
    pub async fn create(&self, user_id: &str) -> String {
        let token = new_token();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at.elapsed() < self.ttl);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "expired sessions removed");
        }
        sessions.insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                created_at: Instant::now(),
            },
        );
        token
    }

    pub async fn user_id(&self, token: &str) -> Option<String> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.created_at.elapsed() < self.ttl => {
                    return Some(session.user_id.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(token);
        None
    }

    pub async fn destroy(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
