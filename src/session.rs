use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::{
    auth::new_id,
    calendar::AvailabilityCalendar,
    models::{DisplayLanguage, ProfileRecord},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionContext {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub language: DisplayLanguage,
    pub display_language: DisplayLanguage,
    pub profile: ProfileRecord,
    pub calendar: AvailabilityCalendar,
    pub flashes: Vec<Flash>,
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Clone, Debug, Default)]
pub struct SessionSeed {
    pub user_id: String,
    pub email: String,
    pub language: DisplayLanguage,
    pub profile: ProfileRecord,
    pub calendar: AvailabilityCalendar,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionContext>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create(&self, seed: SessionSeed) -> SessionContext {
        let now = Utc::now();
        let context = SessionContext {
            token: new_id(),
            user_id: seed.user_id,
            email: seed.email,
            language: seed.language,
            display_language: seed.language,
            profile: seed.profile,
            calendar: seed.calendar,
            flashes: Vec::new(),
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| !session.is_expired(now));
        sessions.insert(context.token.clone(), context.clone());
        context
    }

    /// Expired sessions are dropped and reported as absent.
    pub async fn get(&self, token: &str) -> Option<SessionContext> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(token);
        None
    }

    pub async fn update<F, R>(&self, token: &str, apply: F) -> Option<R>
    where
        F: FnOnce(&mut SessionContext) -> R,
    {
        let mut sessions = self.sessions.write().await;
        if sessions.get(token)?.is_expired(Utc::now()) {
            sessions.remove(token);
            return None;
        }
        sessions.get_mut(token).map(apply)
    }

    pub async fn remove(&self, token: &str) -> Option<SessionContext> {
        self.sessions.write().await.remove(token)
    }

    pub async fn push_flash(&self, token: &str, flash: Flash) {
        self.update(token, |session| session.flashes.push(flash)).await;
    }

    pub async fn take_flashes(&self, token: &str) -> Vec<Flash> {
        self.update(token, |session| std::mem::take(&mut session.flashes))
            .await
            .unwrap_or_default()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
