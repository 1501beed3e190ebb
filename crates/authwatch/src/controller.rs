//! The auth controller actor: reconciles provider events, timers and user
//! actions into one consistent session state.
//!
//! The controller runs as a single Tokio task that owns everything mutable:
//! the session store, the refresh scheduler, the activity monitor, the
//! inactivity machine, the init watchdog and the provider subscription.
//! The outside world talks to it through an mpsc channel (the
//! [`AuthHandle`]) and reads its state through a `watch` channel.
//!
//! ```text
//!   AuthHandle ──Command──┐
//!   provider ──AuthEvent──┤
//!   call tasks ─Outcome───┼──→ select! loop ──→ watch<AuthSnapshot>
//!   timers (slots) ───────┘
//! ```
//!
//! Every handler runs to completion before the next source is polled, so
//! cancelling a timer inside a handler is final: the slot is empty before
//! the loop can poll it again. Provider calls are never awaited inline;
//! each runs on its own task and reports back as an [`Outcome`].

use std::sync::Arc;

use authwatch_activity::{ActivityMonitor, ActivitySignal, InactivityMachine, Transition};
use authwatch_provider::{
    AuthEvent, Grant, IdentityProvider, OAuthProvider, ProviderError, Session, SignUp, User,
};
use authwatch_session::{RefreshScheduler, SessionPhase, SessionStore};
use authwatch_timer::{TimerFired, TimerRole, TimerSlot};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{AuthConfig, AuthError, AuthHandle, AuthSnapshot, LogoutReason};

type Reply<T> = oneshot::Sender<Result<T, AuthError>>;

/// Requests sent from an [`AuthHandle`] to the controller.
pub(crate) enum Command {
    Login {
        email: String,
        password: String,
        reply: Reply<User>,
    },
    Register {
        email: String,
        password: String,
        display_name: Option<String>,
        reply: Reply<User>,
    },
    LoginWithProvider {
        kind: OAuthProvider,
        reply: Reply<()>,
    },
    Logout {
        reply: Reply<()>,
    },
    RefreshNow {
        reply: Reply<Session>,
    },
    DismissWarning {
        reply: Reply<bool>,
    },
    Activity(ActivitySignal),
    Shutdown,
}

/// Results of provider calls running on their own tasks.
enum Outcome {
    InitialSession {
        epoch: u64,
        result: Result<Option<Grant>, ProviderError>,
    },
    SignedIn {
        result: Result<Grant, ProviderError>,
        reply: Reply<User>,
    },
    SignedUp {
        result: Result<SignUp, ProviderError>,
        reply: Reply<User>,
    },
    Refreshed {
        epoch: u64,
        result: Result<Session, ProviderError>,
    },
}

/// Spawns auth controllers.
pub struct AuthController;

impl AuthController {
    /// Spawns a controller around a constructed provider client.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn spawn<P: IdentityProvider>(provider: P, config: AuthConfig) -> AuthHandle {
        Self::spawn_with(Ok(provider), config)
    }

    /// Spawns a controller from the result of constructing the provider.
    ///
    /// If construction failed, the controller still runs but stays
    /// `Unauthenticated`, and every action reports
    /// [`AuthError::Unavailable`]. The app keeps working without sign-in.
    pub fn spawn_with<P: IdentityProvider>(
        provider: Result<P, ProviderError>,
        config: AuthConfig,
    ) -> AuthHandle {
        let config = config.validated();
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_capacity);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(AuthSnapshot::loading());

        let provider = match provider {
            Ok(p) => Some(Arc::new(p)),
            Err(e) => {
                tracing::error!(error = %e, "identity provider unavailable, sign-in disabled");
                None
            }
        };

        let mut actor = Controller {
            refresh: RefreshScheduler::new(config.refresh.clone()),
            config,
            provider,
            store: SessionStore::new(),
            monitor: ActivityMonitor::new(),
            machine: None,
            watchdog: TimerSlot::new(TimerRole::InitWatchdog),
            events: None,
            commands: cmd_rx,
            outcomes: outcome_rx,
            outcome_tx,
            state_tx,
            epoch: 0,
            refresh_in_flight: None,
            refresh_waiters: Vec::new(),
            last_logout: None,
        };
        actor.start();
        tokio::spawn(actor.run());

        AuthHandle::new(cmd_tx, state_rx)
    }
}

/// Actor state. Lives inside the controller task.
struct Controller<P: IdentityProvider> {
    config: AuthConfig,
    /// `None` when the provider client could not be constructed.
    provider: Option<Arc<P>>,
    store: SessionStore,
    refresh: RefreshScheduler,
    monitor: ActivityMonitor,
    /// Exists only while authenticated.
    machine: Option<InactivityMachine>,
    watchdog: TimerSlot,
    /// `None` if subscribing failed, or the provider closed the stream.
    events: Option<mpsc::Receiver<AuthEvent>>,
    commands: mpsc::Receiver<Command>,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    state_tx: watch::Sender<AuthSnapshot>,
    /// Bumped whenever a session lineage ends. Provider results tagged
    /// with an older epoch are discarded.
    epoch: u64,
    /// Epoch of the refresh call currently running, if any.
    refresh_in_flight: Option<u64>,
    refresh_waiters: Vec<Reply<Session>>,
    last_logout: Option<LogoutReason>,
}

impl<P: IdentityProvider> Controller<P> {
    /// Startup: fetch the existing session, subscribe, arm the watchdog.
    fn start(&mut self) {
        let Some(provider) = self.provider.clone() else {
            self.store.resolve_loading();
            self.publish();
            return;
        };

        let tx = self.outcome_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = provider.get_session().await;
            let _ = tx.send(Outcome::InitialSession { epoch, result });
        });

        if let Some(provider) = &self.provider {
            match provider.subscribe(self.config.event_capacity) {
                Ok(rx) => {
                    tracing::debug!(capacity = self.config.event_capacity, "subscribed to provider events");
                    self.events = Some(rx);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "provider event subscription failed, out-of-band changes will be missed"
                    );
                }
            }
        }

        self.watchdog.rearm(self.config.init_timeout);
    }

    /// Runs the actor loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!("auth controller started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some(outcome) = self.outcomes.recv() => self.handle_outcome(outcome),
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.apply_event(event),
                    None => {
                        tracing::warn!("provider event stream closed");
                        self.events = None;
                    }
                },
                _ = self.refresh.wait() => self.on_refresh_due(),
                fired = wait_inactivity(&mut self.machine) => self.on_inactivity_timer(fired),
                _ = self.watchdog.wait() => self.on_watchdog(),
            }
        }

        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.refresh.disarm();
        self.watchdog.cancel();
        if let Some(mut machine) = self.machine.take() {
            machine.cancel_all();
        }
        self.monitor.uninstall();
        for waiter in self.refresh_waiters.drain(..) {
            let _ = waiter.send(Err(AuthError::ControllerClosed));
        }
        if self.events.take().is_some() {
            tracing::debug!("unsubscribed from provider events");
        }
        tracing::info!("auth controller stopped");
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Login { email, password, reply } => {
                let Some((provider, reply)) = self.provider_or_reply(reply) else { return };
                let tx = self.outcome_tx.clone();
                tokio::spawn(async move {
                    let result = provider.sign_in(&email, &password).await;
                    let _ = tx.send(Outcome::SignedIn { result, reply });
                });
            }
            Command::Register { email, password, display_name, reply } => {
                let Some((provider, reply)) = self.provider_or_reply(reply) else { return };
                let tx = self.outcome_tx.clone();
                tokio::spawn(async move {
                    let result = provider
                        .sign_up(&email, &password, display_name.as_deref())
                        .await;
                    let _ = tx.send(Outcome::SignedUp { result, reply });
                });
            }
            Command::LoginWithProvider { kind, reply } => {
                let Some((provider, reply)) = self.provider_or_reply(reply) else { return };
                tracing::info!(provider = %kind, "starting OAuth sign-in");
                // Completion arrives later as SIGNED_IN; nothing to reconcile here.
                tokio::spawn(async move {
                    let result = provider.sign_in_with_oauth(kind).await;
                    let _ = reply.send(result.map_err(AuthError::from));
                });
            }
            Command::Logout { reply } => {
                let Some((provider, reply)) = self.provider_or_reply(reply) else { return };
                self.teardown(LogoutReason::UserRequested);
                tokio::spawn(async move {
                    if !provider.sign_out().await {
                        tracing::warn!("provider sign-out failed, local session already cleared");
                    }
                    let _ = reply.send(Ok(()));
                });
            }
            Command::RefreshNow { reply } => {
                if self.provider.is_none() {
                    let _ = reply.send(Err(AuthError::Unavailable));
                    return;
                }
                if !self.store.is_authenticated() {
                    let _ = reply.send(Err(AuthError::NotAuthenticated));
                    return;
                }
                self.refresh_waiters.push(reply);
                self.start_refresh();
            }
            Command::DismissWarning { reply } => {
                if self.provider.is_none() {
                    let _ = reply.send(Err(AuthError::Unavailable));
                    return;
                }
                let dismissed = self.machine.as_mut().is_some_and(|m| m.dismiss());
                if dismissed {
                    self.publish();
                }
                let _ = reply.send(Ok(dismissed));
            }
            Command::Activity(signal) => {
                if let Some(machine) = self.machine.as_mut() {
                    self.monitor.observe(signal, machine);
                }
            }
            Command::Shutdown => {}
        }
    }

    /// Returns the provider, or answers `reply` with `Unavailable`.
    fn provider_or_reply<T>(&self, reply: Reply<T>) -> Option<(Arc<P>, Reply<T>)> {
        match &self.provider {
            Some(p) => Some((Arc::clone(p), reply)),
            None => {
                let _ = reply.send(Err(AuthError::Unavailable));
                None
            }
        }
    }

    // -----------------------------------------------------------------
    // Provider call outcomes
    // -----------------------------------------------------------------

    fn handle_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::InitialSession { epoch, result } => self.on_initial_session(epoch, result),
            Outcome::SignedIn { result, reply } => match result {
                Ok(grant) => {
                    let user = grant.user.clone();
                    tracing::info!(user_id = %user.id, "signed in");
                    self.adopt(grant);
                    let _ = reply.send(Ok(user));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "sign-in failed");
                    let _ = reply.send(Err(e.into()));
                }
            },
            Outcome::SignedUp { result, reply } => match result {
                Ok(SignUp { user, session: Some(session) }) => {
                    tracing::info!(user_id = %user.id, "registered and signed in");
                    self.adopt(Grant::new(session, user.clone()));
                    let _ = reply.send(Ok(user));
                }
                Ok(SignUp { user, session: None }) => {
                    tracing::info!(user_id = %user.id, "registered, awaiting confirmation");
                    let _ = reply.send(Ok(user));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "sign-up failed");
                    let _ = reply.send(Err(e.into()));
                }
            },
            Outcome::Refreshed { epoch, result } => self.on_refreshed(epoch, result),
        }
    }

    /// Applies the startup `get_session` result. Any teardown since startup
    /// bumps the epoch, so a fetch that outlived a logout is ignored.
    fn on_initial_session(&mut self, epoch: u64, result: Result<Option<Grant>, ProviderError>) {
        match result {
            Ok(Some(grant)) => {
                if epoch == self.epoch && self.store.grant().is_none() {
                    let late = self.store.phase() != SessionPhase::Loading;
                    tracing::info!(user_id = %grant.user.id, late, "restored existing session");
                    self.adopt(grant);
                } else {
                    tracing::debug!(epoch, current = self.epoch, "initial session ignored, state already moved on");
                }
            }
            Ok(None) => tracing::debug!("no existing session"),
            Err(e) => tracing::warn!(error = %e, "initial session check failed"),
        }
        self.resolve_loading();
    }

    fn on_refreshed(&mut self, epoch: u64, result: Result<Session, ProviderError>) {
        if self.refresh_in_flight == Some(epoch) {
            self.refresh_in_flight = None;
        }
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "discarding refresh for ended session");
            return;
        }

        match result {
            Ok(session) => {
                let Some(user) = self.store.grant().map(|g| g.user.clone()) else {
                    return;
                };
                tracing::info!(user_id = %user.id, "session refreshed");
                self.refresh.arm(&session);
                self.store.set(session.clone(), user);
                for waiter in self.refresh_waiters.drain(..) {
                    let _ = waiter.send(Ok(session.clone()));
                }
                self.publish();
            }
            Err(e) => {
                tracing::error!(error = %e, "session refresh failed, signing out");
                let reason = e.to_string();
                for waiter in self.refresh_waiters.drain(..) {
                    let _ = waiter.send(Err(AuthError::RefreshFailed(reason.clone())));
                }
                self.force_logout(LogoutReason::RefreshFailed);
            }
        }
    }

    // -----------------------------------------------------------------
    // Provider events
    // -----------------------------------------------------------------

    /// Applies one pushed event. Called strictly in arrival order.
    fn apply_event(&mut self, event: AuthEvent) {
        tracing::debug!(event = %event, "provider event");
        match event {
            AuthEvent::InitialSession(grant) => {
                if let Some(grant) = grant {
                    self.adopt(grant);
                }
                self.resolve_loading();
            }
            AuthEvent::SignedIn(grant) | AuthEvent::TokenRefreshed(grant) => {
                self.adopt(grant);
            }
            AuthEvent::UserUpdated(user) => {
                if self.store.set_user(user) {
                    self.publish();
                } else {
                    tracing::debug!("USER_UPDATED while signed out, ignoring");
                }
            }
            AuthEvent::SignedOut => {
                self.teardown(LogoutReason::ProviderSignedOut);
            }
        }
    }

    // -----------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------

    fn on_refresh_due(&mut self) {
        tracing::debug!("refresh due");
        self.start_refresh();
    }

    fn on_inactivity_timer(&mut self, fired: TimerFired) {
        let Some(machine) = self.machine.as_mut() else {
            return;
        };
        match machine.on_timer(fired) {
            Transition::LoggedOut => self.force_logout(LogoutReason::Inactivity),
            Transition::None => {}
            Transition::WarningShown { .. } | Transition::Tick { .. } => self.publish(),
        }
    }

    fn on_watchdog(&mut self) {
        if self.store.resolve_loading() {
            tracing::info!(
                timeout_ms = self.config.init_timeout.as_millis() as u64,
                phase = ?self.store.phase(),
                "initial session check timed out, continuing without it"
            );
            self.publish();
        }
    }

    // -----------------------------------------------------------------
    // State transitions
    // -----------------------------------------------------------------

    /// Stores `grant`, re-arms refresh and starts inactivity tracking if it
    /// isn't running yet.
    fn adopt(&mut self, grant: Grant) {
        let switching_user = self
            .store
            .grant()
            .is_some_and(|current| current.user.id != grant.user.id);
        if switching_user {
            // A different user's lineage; stale refresh results must not
            // land on the new session.
            self.epoch += 1;
            self.fail_refresh_waiters();
        }

        self.refresh.arm(&grant.session);
        self.store.set_grant(grant);
        self.last_logout = None;

        if self.machine.is_none() {
            let mut machine = InactivityMachine::new(self.config.inactivity.clone());
            self.monitor.install(&mut machine);
            self.machine = Some(machine);
        }

        self.watchdog.cancel();
        self.publish();
    }

    /// Leaves `Authenticated`: cancels every timer before anything else.
    fn teardown(&mut self, reason: LogoutReason) {
        let was_authenticated = self.store.is_authenticated();

        self.refresh.disarm();
        if let Some(mut machine) = self.machine.take() {
            machine.cancel_all();
        }
        self.monitor.uninstall();
        self.store.clear();
        self.watchdog.cancel();
        self.epoch += 1;
        self.fail_refresh_waiters();

        if was_authenticated {
            tracing::info!(%reason, "signed out");
            self.last_logout = Some(reason);
        }
        self.publish();
    }

    /// Teardown plus a provider sign-out, for logouts the user didn't ask for.
    fn force_logout(&mut self, reason: LogoutReason) {
        self.teardown(reason);
        if let Some(provider) = self.provider.clone() {
            tokio::spawn(async move {
                if !provider.sign_out().await {
                    tracing::warn!(%reason, "provider sign-out failed after forced logout");
                }
            });
        }
    }

    fn start_refresh(&mut self) {
        if self.refresh_in_flight == Some(self.epoch) {
            tracing::debug!("refresh already in flight");
            return;
        }
        let Some(provider) = self.provider.clone() else {
            return;
        };
        let epoch = self.epoch;
        self.refresh_in_flight = Some(epoch);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = provider.refresh_session().await;
            let _ = tx.send(Outcome::Refreshed { epoch, result });
        });
    }

    fn fail_refresh_waiters(&mut self) {
        for waiter in self.refresh_waiters.drain(..) {
            let _ = waiter.send(Err(AuthError::Superseded));
        }
    }

    fn resolve_loading(&mut self) {
        self.watchdog.cancel();
        if self.store.resolve_loading() {
            tracing::debug!(phase = ?self.store.phase(), "initial session resolved");
        }
        self.publish();
    }

    /// Publishes a fresh snapshot if anything visible changed.
    fn publish(&self) {
        let store = self.store.current();
        let next = AuthSnapshot {
            phase: store.phase,
            token_expires_at: store.session().and_then(Session::expires_at),
            user: store.user().cloned(),
            session: store.session().cloned(),
            inactivity: self.machine.as_ref().map(InactivityMachine::state),
            last_logout: self.last_logout,
        };
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Next provider event, or pending forever without a subscription.
async fn next_event(events: &mut Option<mpsc::Receiver<AuthEvent>>) -> Option<AuthEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Next inactivity firing, or pending forever while signed out.
async fn wait_inactivity(machine: &mut Option<InactivityMachine>) -> TimerFired {
    match machine {
        Some(m) => m.wait().await,
        None => std::future::pending().await,
    }
}
