use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use authwatch::prelude::*;
use authwatch::{EventCodec, InactivityConfig, JsonEventCodec, RefreshConfig, ScoreSync, UserId};
use chrono::Utc;
use rand::Rng;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// In-memory identity provider
// ---------------------------------------------------------------------------

struct Account {
    password: String,
    user: User,
}

#[derive(Default)]
struct Inner {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Grant>>,
    events: Mutex<Option<mpsc::Sender<AuthEvent>>>,
}

/// A provider that keeps accounts in memory and mints random tokens.
/// Behaves like a hosted provider: every state change is also pushed to
/// the subscriber.
#[derive(Clone)]
struct LocalProvider {
    inner: Arc<Inner>,
    ttl: chrono::Duration,
    latency: Duration,
}

impl LocalProvider {
    fn new(ttl: chrono::Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
            latency: Duration::from_millis(150),
        }
    }

    fn mint(&self, user_id: &UserId) -> Result<Session, ProviderError> {
        let now = Utc::now();
        Session::new(
            generate_token(),
            Some(generate_token()),
            user_id.clone(),
            now,
            Some(now + self.ttl),
        )
    }

    fn emit(&self, event: AuthEvent) {
        let tx = self.inner.events.lock().ok().and_then(|guard| guard.clone());
        if let Some(tx) = tx {
            if tx.try_send(event).is_err() {
                tracing::warn!("subscriber lagging, event dropped");
            }
        }
    }

    fn set_current(&self, grant: Option<Grant>) {
        if let Ok(mut current) = self.inner.current.lock() {
            *current = grant;
        }
    }

    /// Simulates a raw push payload arriving from another tab.
    fn push_raw(&self, payload: &[u8]) {
        match JsonEventCodec.decode_event(payload) {
            Ok(event) => self.emit(event),
            Err(e) => tracing::warn!(error = %e, "bad push payload"),
        }
    }
}

impl IdentityProvider for LocalProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Grant, ProviderError> {
        tokio::time::sleep(self.latency).await;
        let user = {
            let accounts = self
                .inner
                .accounts
                .lock()
                .map_err(|_| ProviderError::Unavailable("account table poisoned".into()))?;
            match accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(ProviderError::Rejected("invalid login credentials".into())),
            }
        };
        let grant = Grant::new(self.mint(&user.id)?, user);
        self.set_current(Some(grant.clone()));
        self.emit(AuthEvent::SignedIn(grant.clone()));
        Ok(grant)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<SignUp, ProviderError> {
        tokio::time::sleep(self.latency).await;
        let mut user = User::new(format!("u-{}", &generate_token()[..8]), email);
        if let Some(name) = display_name {
            user = user.with_display_name(name);
        }
        {
            let mut accounts = self
                .inner
                .accounts
                .lock()
                .map_err(|_| ProviderError::Unavailable("account table poisoned".into()))?;
            if accounts.contains_key(email) {
                return Err(ProviderError::Rejected("user already registered".into()));
            }
            accounts.insert(
                email.to_owned(),
                Account {
                    password: password.to_owned(),
                    user: user.clone(),
                },
            );
        }
        let session = self.mint(&user.id)?;
        let grant = Grant::new(session.clone(), user.clone());
        self.set_current(Some(grant.clone()));
        self.emit(AuthEvent::SignedIn(grant));
        Ok(SignUp {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> bool {
        tokio::time::sleep(self.latency).await;
        self.set_current(None);
        self.emit(AuthEvent::SignedOut);
        true
    }

    async fn get_session(&self) -> Result<Option<Grant>, ProviderError> {
        tokio::time::sleep(self.latency).await;
        self.inner
            .current
            .lock()
            .map(|current| current.clone())
            .map_err(|_| ProviderError::Unavailable("session table poisoned".into()))
    }

    async fn refresh_session(&self) -> Result<Session, ProviderError> {
        tokio::time::sleep(self.latency).await;
        let user = self
            .inner
            .current
            .lock()
            .ok()
            .and_then(|current| current.as_ref().map(|g| g.user.clone()))
            .ok_or_else(|| ProviderError::Rejected("no refresh token".into()))?;
        let session = self.mint(&user.id)?;
        let grant = Grant::new(session.clone(), user);
        self.set_current(Some(grant.clone()));
        self.emit(AuthEvent::TokenRefreshed(grant));
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, kind: OAuthProvider) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable(format!("{kind} is not configured offline")))
    }

    fn subscribe(&self, capacity: usize) -> Result<mpsc::Receiver<AuthEvent>, ProviderError> {
        let (tx, rx) = mpsc::channel(capacity);
        let mut events = self
            .inner
            .events
            .lock()
            .map_err(|_| ProviderError::Unavailable("subscriber table poisoned".into()))?;
        *events = Some(tx);
        Ok(rx)
    }
}

/// 16 random bytes as lowercase hex.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Score service stand-in that just logs.
struct LogScores;

impl ScoreSync for LogScores {
    async fn sync_score(&self, session: &Session, score: u64, stars: u8, nickname: &str) -> bool {
        tracing::info!(user_id = %session.user_id(), score, stars, nickname, "score uploaded");
        true
    }
}

// ---------------------------------------------------------------------------
// Scripted session
// ---------------------------------------------------------------------------

/// Short timings so the whole lifecycle fits in under a minute.
fn demo_config() -> AuthConfig {
    AuthConfig {
        refresh: RefreshConfig {
            lead: Duration::from_secs(5),
        },
        inactivity: InactivityConfig {
            idle_timeout: Duration::from_secs(8),
            warning_secs: 5,
            tick: Duration::from_secs(1),
        },
        ..AuthConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let provider = LocalProvider::new(chrono::Duration::seconds(15));
    let auth = AuthController::spawn(provider.clone(), demo_config());

    let mut changes = auth.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let s = changes.borrow_and_update().clone();
            let who = s.user.as_ref().map(|u| u.email.as_str()).unwrap_or("-");
            match s.warning_remaining() {
                Some(secs) => tracing::warn!(secs, "inactive, signing out soon"),
                None => tracing::info!(phase = ?s.phase, user = who, last_logout = ?s.last_logout, "state"),
            }
        }
    });

    auth.wait_until_loaded().await?;

    let user = auth
        .register("ada@example.com", "correct horse", Some("Ada"))
        .await?;
    tracing::info!(user_id = %user.id, "registered");
    auth.logout().await?;

    if let Err(e) = auth.login("ada@example.com", "wrong").await {
        tracing::warn!(error = %e, "login refused");
    }
    auth.login("ada@example.com", "correct horse").await?;
    auth.sync_score(&LogScores, 4200, 3, "ada").await?;

    // Busy for 12 seconds: no warning, and one refresh along the way.
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(2)).await;
        auth.record_activity(ActivitySignal::KeyDown);
    }

    // Another tab renames the user.
    let payload = format!(
        r#"{{"event":"USER_UPDATED","session":{{"access_token":"-","user":{{
            "id":"{}","email":"ada@example.com",
            "user_metadata":{{"display_name":"Ada Lovelace"}}}}}}}}"#,
        user.id.as_str()
    );
    provider.push_raw(payload.as_bytes());

    // Idle: the warning shows, gets dismissed once, then runs out.
    let mut rx = auth.subscribe();
    rx.wait_for(|s| s.warning_remaining() == Some(3)).await?;
    auth.dismiss_warning().await?;
    tracing::info!("still here");

    let state = rx.wait_for(|s| s.last_logout.is_some()).await?.clone();
    tracing::info!(reason = ?state.last_logout, "session ended");

    if let Err(e) = auth.sync_score(&LogScores, 10, 1, "ada").await {
        tracing::info!(error = %e, "score not uploaded");
    }

    auth.shutdown().await?;
    Ok(())
}
