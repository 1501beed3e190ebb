//! The application-facing handle to a running auth controller.

use authwatch_activity::ActivitySignal;
use authwatch_provider::{OAuthProvider, ScoreSync, Session, User};
use tokio::sync::{mpsc, oneshot, watch};

use crate::controller::Command;
use crate::{AuthError, AuthSnapshot};

/// Handle to a running auth controller. Used to send actions to it and
/// read its state.
///
/// Cheap to clone: an `mpsc::Sender` plus a `watch::Receiver`. The
/// controller stops when [`shutdown`](Self::shutdown) is called or the
/// last handle is dropped.
#[derive(Clone)]
pub struct AuthHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<AuthSnapshot>,
}

impl AuthHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>, state: watch::Receiver<AuthSnapshot>) -> Self {
        Self { commands, state }
    }

    /// Sends `cmd` and waits for the controller's reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, AuthError>>) -> Command,
    ) -> Result<T, AuthError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| AuthError::ControllerClosed)?;
        reply_rx.await.map_err(|_| AuthError::ControllerClosed)?
    }

    /// Email/password sign-in. On success the session is stored and timers
    /// are armed before this returns.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.request(|reply| Command::Login {
            email: email.to_owned(),
            password: password.to_owned(),
            reply,
        })
        .await
    }

    /// Creates an account. The user is logged in only if the provider
    /// returned a session (no email confirmation pending).
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User, AuthError> {
        self.request(|reply| Command::Register {
            email: email.to_owned(),
            password: password.to_owned(),
            display_name: display_name.map(str::to_owned),
            reply,
        })
        .await
    }

    /// Starts an OAuth sign-in. Completion shows up later in the state
    /// stream, when the provider pushes `SIGNED_IN`.
    pub async fn login_with_provider(&self, kind: OAuthProvider) -> Result<(), AuthError> {
        self.request(|reply| Command::LoginWithProvider { kind, reply }).await
    }

    /// Logs out. Local state is cleared immediately, even if the provider
    /// can't be reached.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.request(|reply| Command::Logout { reply }).await
    }

    /// Refreshes the session now instead of waiting for the scheduled
    /// refresh. Joins a refresh that is already running.
    pub async fn refresh_now(&self) -> Result<Session, AuthError> {
        self.request(|reply| Command::RefreshNow { reply }).await
    }

    /// The "I'm still here" action from the inactivity warning.
    ///
    /// Returns `true` if a warning was showing and has been dismissed.
    pub async fn dismiss_warning(&self) -> Result<bool, AuthError> {
        self.request(|reply| Command::DismissWarning { reply }).await
    }

    /// Reports a user input signal. Never blocks.
    ///
    /// Signals are lossy: if the command queue is full the signal is
    /// dropped and `false` is returned. The next one will do.
    pub fn record_activity(&self, signal: ActivitySignal) -> bool {
        self.commands.try_send(Command::Activity(signal)).is_ok()
    }

    /// Uploads a score on behalf of the signed-in user.
    ///
    /// Refused with [`AuthError::NotAuthenticated`] while nobody is logged
    /// in; otherwise returns whatever the score service reports.
    pub async fn sync_score<S: ScoreSync>(
        &self,
        sync: &S,
        score: u64,
        stars: u8,
        nickname: &str,
    ) -> Result<bool, AuthError> {
        let session = self.snapshot().session.ok_or(AuthError::NotAuthenticated)?;
        let accepted = sync.sync_score(&session, score, stars, nickname).await;
        if !accepted {
            tracing::warn!(user_id = %session.user_id(), score, "score sync rejected");
        }
        Ok(accepted)
    }

    /// The current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Waits until the initial session check has resolved (or the startup
    /// watchdog gave up on it).
    pub async fn wait_until_loaded(&self) -> Result<AuthSnapshot, AuthError> {
        let mut rx = self.state.clone();
        let snapshot = rx
            .wait_for(|s| !s.is_loading())
            .await
            .map_err(|_| AuthError::ControllerClosed)?;
        Ok(snapshot.clone())
    }

    /// Tells the controller to stop. Pending timers are cancelled and the
    /// provider subscription is dropped.
    pub async fn shutdown(&self) -> Result<(), AuthError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| AuthError::ControllerClosed)
    }

    /// `true` once the controller task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
