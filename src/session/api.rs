use std::sync::{Arc, Mutex};

use async_lock::Mutex as AsyncMutex;
use once_cell::sync::Lazy;

use crate::api::ApiClient;
use crate::config::ClientOptions;
use crate::error::ClientResult;
use crate::logger::Logger;
use crate::notifications::{EndpointFn, NotificationListener, NotificationStore};
use crate::session::backend::SessionBackend;
use crate::session::model::{DashboardView, SessionState, UserProfile};
use crate::session::persistence::{InMemoryStorage, SessionStorage, StoredSession};
use crate::session::scheduler::{RefreshScheduler, SchedulerConfig, SchedulerState};
use crate::session::token::is_token_expired;
use crate::util::Observers;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("escrow-client/session"));

/// Client-side session: persisted credentials, the refresh timer, the
/// notification channel and the REST client, owned by one context object.
///
/// Build it with [`Session::builder`], call [`Session::initialize`] once at
/// startup and [`Session::dispose`] on shutdown.
pub struct Session {
    options: ClientOptions,
    storage: StoredSession,
    api: ApiClient,
    backend: Arc<dyn SessionBackend>,
    scheduler: RefreshScheduler,
    listener: Option<NotificationListener>,
    notifications: NotificationStore,
    state: Mutex<SessionState>,
    observers: Observers<SessionState>,
    initialized: AsyncMutex<bool>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder(options: ClientOptions) -> SessionBuilder {
        SessionBuilder::new(options)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn storage(&self) -> &StoredSession {
        &self.storage
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    /// `None` when the session was built without the notification channel.
    pub fn listener(&self) -> Option<&NotificationListener> {
        self.listener.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state().profile().cloned()
    }

    pub fn dashboard_view(&self) -> Option<DashboardView> {
        self.profile().as_ref().map(DashboardView::for_profile)
    }

    /// Runs `callback` with the current state and on every later change.
    pub fn on_state_changed<F>(&self, callback: F) -> usize
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        callback(&self.state());
        self.observers.add(callback)
    }

    pub fn remove_state_listener(&self, id: usize) -> bool {
        self.observers.remove(id)
    }

    /// Restores the persisted session.
    ///
    /// A token that is missing ends in [`SessionState::Unauthenticated`]. A
    /// token expiring within the configured skew is refreshed first. On
    /// success the profile is fetched and cached, then the notification
    /// listener and the refresh scheduler start. Any failure clears storage.
    ///
    /// Only the first call does any work; later calls return the current state.
    pub async fn initialize(&self) -> SessionState {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return self.state();
        }
        *initialized = true;

        let state = match self.restore().await {
            Ok(Some(profile)) => {
                self.start_background(&profile);
                SessionState::Authenticated(profile)
            }
            Ok(None) => SessionState::Unauthenticated,
            Err(err) => {
                LOGGER.error(format!("session initialization failed: {err}"));
                self.clear_storage();
                SessionState::Unauthenticated
            }
        };
        self.set_state(state.clone());
        state
    }

    /// Adopts an access token obtained by a sign-in flow outside this crate.
    pub async fn establish(&self, access_token: &str) -> ClientResult<UserProfile> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        self.stop_background();

        self.storage.set_access_token(access_token)?;
        let profile = match self.fetch_and_cache_profile().await {
            Ok(profile) => profile,
            Err(err) => {
                self.clear_storage();
                self.set_state(SessionState::Unauthenticated);
                return Err(err);
            }
        };

        self.start_background(&profile);
        self.set_state(SessionState::Authenticated(profile.clone()));
        Ok(profile)
    }

    pub fn sign_out(&self) {
        self.stop_background();
        self.notifications.clear();
        self.clear_storage();
        self.set_state(SessionState::Unauthenticated);
    }

    /// Cancels the refresh timer and closes the notification socket. Stored
    /// credentials are kept for the next start.
    pub fn dispose(&self) {
        self.stop_background();
        LOGGER.debug("session disposed");
    }

    async fn restore(&self) -> ClientResult<Option<UserProfile>> {
        let Some(token) = self.storage.access_token()? else {
            return Ok(None);
        };

        if is_token_expired(&token, self.options.expiry_skew()) {
            LOGGER.info("stored access token is expired or about to expire, refreshing");
            let refreshed = self.backend.refresh_token().await?;
            self.storage.set_access_token(&refreshed.access_token)?;
        }

        self.fetch_and_cache_profile().await.map(Some)
    }

    async fn fetch_and_cache_profile(&self) -> ClientResult<UserProfile> {
        let profile = self.backend.get_profile().await?;
        self.storage.set_profile(&profile)?;
        Ok(profile)
    }

    fn start_background(&self, profile: &UserProfile) {
        if let Some(listener) = &self.listener {
            listener.set_fallback_user_id(profile.id);
            listener.connect();
        }
        if let Err(err) = self.scheduler.start() {
            LOGGER.warn(format!("failed to schedule token refresh: {err}"));
        }
    }

    fn stop_background(&self) {
        self.scheduler.cancel();
        if let Some(listener) = &self.listener {
            listener.disconnect();
        }
    }

    fn clear_storage(&self) {
        if let Err(err) = self.storage.clear() {
            LOGGER.warn(format!("failed to clear stored session: {err}"));
        }
    }

    fn set_state(&self, state: SessionState) {
        {
            let mut current = self.state.lock().unwrap();
            if *current == state {
                return;
            }
            *current = state.clone();
        }
        self.observers.notify(&state);
    }

    fn handle_scheduler_state(&self, state: &SchedulerState) {
        if *state != SchedulerState::ReauthenticationRequired {
            return;
        }
        LOGGER.warn("token refresh gave up, re-authentication required");
        if let Some(listener) = &self.listener {
            listener.disconnect();
        }
        self.notifications.clear();
        self.set_state(SessionState::ReauthenticationRequired);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_background();
    }
}

pub struct SessionBuilder {
    options: ClientOptions,
    storage: Option<Arc<dyn SessionStorage>>,
    backend: Option<Arc<dyn SessionBackend>>,
    notifications: bool,
}

impl SessionBuilder {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            storage: None,
            backend: None,
            notifications: true,
        }
    }

    /// Where the access token and profile are persisted. Defaults to memory.
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Overrides the refresh/profile calls, which otherwise go through the
    /// REST client.
    pub fn with_backend(mut self, backend: Arc<dyn SessionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn without_notifications(mut self) -> Self {
        self.notifications = false;
        self
    }

    pub fn build(self) -> ClientResult<Arc<Session>> {
        self.options.validate()?;

        let storage = StoredSession::new(
            self.storage
                .unwrap_or_else(|| InMemoryStorage::shared() as Arc<dyn SessionStorage>),
        );
        let api = ApiClient::new(self.options.clone(), storage.clone())?;
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(api.clone()) as Arc<dyn SessionBackend>);
        let scheduler = RefreshScheduler::new(
            backend.clone(),
            storage.clone(),
            SchedulerConfig::from(&self.options),
        );

        let notifications = NotificationStore::new();
        let listener = self.notifications.then(|| {
            let endpoint_api = api.clone();
            let endpoint: EndpointFn = Arc::new(move || endpoint_api.notification_url());
            NotificationListener::new(
                notifications.clone(),
                endpoint,
                self.options.reconnect,
                self.options.max_reconnect_attempts,
            )
        });

        let session = Arc::new(Session {
            options: self.options,
            storage,
            api,
            backend,
            scheduler,
            listener,
            notifications,
            state: Mutex::new(SessionState::Uninitialized),
            observers: Observers::default(),
            initialized: AsyncMutex::new(false),
        });

        let weak = Arc::downgrade(&session);
        session.scheduler.on_state_changed(move |state| {
            if let Some(session) = weak.upgrade() {
                session.handle_scheduler_state(state);
            }
        });

        Ok(session)
    }
}
