use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::config::ClientOptions;
use crate::error::ClientResult;
use crate::logger::Logger;
use crate::platform::runtime::{sleep, spawn_task, TaskHandle};
use crate::session::backend::SessionBackend;
use crate::session::persistence::StoredSession;
use crate::session::token::optimal_refresh_time;
use crate::util::{BackoffConfig, Observers};

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("escrow-client/refresh"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// A refresh fires after `delay`, measured from the moment of scheduling.
    Scheduled { delay: Duration },
    /// Refresh kept failing; the stored session has been cleared.
    ReauthenticationRequired,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub safety_margin: Duration,
    pub retry: BackoffConfig,
    /// Consecutive failures tolerated before giving up. Treated as at least 1.
    pub max_attempts: u32,
}

impl From<&ClientOptions> for SchedulerConfig {
    fn from(options: &ClientOptions) -> Self {
        Self {
            safety_margin: options.refresh_safety_margin(),
            retry: options.refresh_retry,
            max_attempts: options.max_refresh_attempts,
        }
    }
}

/// Refreshes the access token shortly before it expires.
///
/// At most one timer is live: [`RefreshScheduler::start`] replaces any pending
/// one. A rejected refresh credential (401/403) gives up at once; other
/// failures are retried with backoff up to `max_attempts`.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    backend: Arc<dyn SessionBackend>,
    storage: StoredSession,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    task: Mutex<Option<TaskHandle>>,
    observers: Observers<SchedulerState>,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RefreshScheduler {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        storage: StoredSession,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                backend,
                storage,
                config,
                state: Mutex::new(SchedulerState::Idle),
                task: Mutex::new(None),
                observers: Observers::default(),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.state.lock().unwrap().clone()
    }

    /// Registers a callback run on every state transition.
    pub fn on_state_changed<F>(&self, callback: F) -> usize
    where
        F: Fn(&SchedulerState) + Send + Sync + 'static,
    {
        self.inner.observers.add(callback)
    }

    /// Schedules a refresh for the stored token, replacing any pending timer.
    pub fn start(&self) -> ClientResult<SchedulerState> {
        self.cancel_task();

        let Some(token) = self.inner.storage.access_token()? else {
            self.inner.set_state(SchedulerState::Idle);
            return Ok(SchedulerState::Idle);
        };

        let Some(delay) = optimal_refresh_time(&token, self.inner.config.safety_margin) else {
            LOGGER.warn("could not determine refresh time for the stored token");
            self.inner.set_state(SchedulerState::Idle);
            return Ok(SchedulerState::Idle);
        };

        LOGGER.debug(format!("token refresh scheduled in {}s", delay.as_secs()));
        let state = SchedulerState::Scheduled { delay };
        self.inner.set_state(state.clone());
        let inner = self.inner.clone();
        *self.inner.task.lock().unwrap() = Some(spawn_task(refresh_loop(inner, delay)));
        Ok(state)
    }

    /// Same as [`RefreshScheduler::start`]; reads better after an external token change.
    pub fn restart(&self) -> ClientResult<SchedulerState> {
        self.start()
    }

    /// Drops the pending timer. A scheduler that gave up stays in
    /// [`SchedulerState::ReauthenticationRequired`].
    pub fn cancel(&self) {
        self.cancel_task();
        let scheduled = matches!(self.state(), SchedulerState::Scheduled { .. });
        if scheduled {
            self.inner.set_state(SchedulerState::Idle);
        }
    }

    fn cancel_task(&self) {
        if let Some(task) = self.inner.task.lock().unwrap().take() {
            task.cancel();
        }
    }
}

impl SchedulerInner {
    fn set_state(&self, state: SchedulerState) {
        {
            let mut current = self.state.lock().unwrap();
            if *current == state {
                return;
            }
            *current = state.clone();
        }
        self.observers.notify(&state);
    }

    async fn refresh_once(&self) -> ClientResult<String> {
        let response = self.backend.refresh_token().await?;
        self.storage.set_access_token(&response.access_token)?;
        Ok(response.access_token)
    }

    fn give_up(&self) {
        if let Err(err) = self.storage.clear() {
            LOGGER.warn(format!("failed to clear stored session: {err}"));
        }
        self.set_state(SchedulerState::ReauthenticationRequired);
    }
}

async fn refresh_loop(inner: Arc<SchedulerInner>, initial_delay: Duration) {
    let max_attempts = inner.config.max_attempts.max(1);
    let mut delay = initial_delay;
    let mut failures: u32 = 0;

    loop {
        sleep(delay).await;

        match inner.refresh_once().await {
            Ok(token) => {
                failures = 0;
                LOGGER.info("access token refreshed");
                match optimal_refresh_time(&token, inner.config.safety_margin) {
                    Some(next) => {
                        inner.set_state(SchedulerState::Scheduled { delay: next });
                        delay = next;
                    }
                    None => {
                        LOGGER.warn("could not determine refresh time for the refreshed token");
                        inner.set_state(SchedulerState::Idle);
                        return;
                    }
                }
            }
            Err(err) => {
                failures += 1;
                if err.is_auth_failure() || failures >= max_attempts {
                    LOGGER.error(format!(
                        "token refresh failed after {failures} attempt(s), session cleared: {err}"
                    ));
                    inner.give_up();
                    return;
                }
                delay = inner.config.retry.delay(failures - 1);
                LOGGER.warn(format!(
                    "token refresh attempt {failures} failed, retrying in {delay:?}: {err}"
                ));
                inner.set_state(SchedulerState::Scheduled { delay });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::session::persistence::InMemoryStorage;
    use crate::test_support::{token_expiring_in, token_without_expiry, FakeBackend};

    fn config(max_attempts: u32) -> SchedulerConfig {
        SchedulerConfig {
            safety_margin: Duration::from_secs(300),
            retry: BackoffConfig::new(10, 20),
            max_attempts,
        }
    }

    fn storage_with(token: Option<&str>) -> StoredSession {
        let storage = StoredSession::new(InMemoryStorage::shared());
        if let Some(token) = token {
            storage.set_access_token(token).unwrap();
        }
        storage
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn stays_idle_without_token() {
        let backend = Arc::new(FakeBackend::new());
        let scheduler = RefreshScheduler::new(backend.clone(), storage_with(None), config(3));

        assert_eq!(scheduler.start().unwrap(), SchedulerState::Idle);
        assert_eq!(backend.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn stays_idle_for_undecodable_token() {
        let backend = Arc::new(FakeBackend::new());
        let token = token_without_expiry();
        let scheduler =
            RefreshScheduler::new(backend.clone(), storage_with(Some(&token)), config(3));

        assert_eq!(scheduler.start().unwrap(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn refreshes_and_reschedules() {
        let backend = Arc::new(FakeBackend::new());
        let fresh = token_expiring_in(3_600);
        backend.push_refresh(Ok(fresh.clone()));
        let storage = storage_with(Some(&token_expiring_in(2)));
        let scheduler = RefreshScheduler::new(backend.clone(), storage.clone(), config(3));

        let SchedulerState::Scheduled { delay } = scheduler.start().unwrap() else {
            panic!("expected a scheduled refresh");
        };
        assert!(delay <= Duration::from_secs(2));

        wait_for(|| backend.refresh_calls() == 1).await;
        wait_for(|| matches!(scheduler.state(), SchedulerState::Scheduled { delay } if delay > Duration::from_secs(60))).await;
        assert_eq!(storage.access_token().unwrap(), Some(fresh));
        scheduler.cancel();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_and_clears_storage() {
        let backend = Arc::new(FakeBackend::new());
        let storage = storage_with(Some(&token_expiring_in(2)));
        let scheduler = RefreshScheduler::new(backend.clone(), storage.clone(), config(2));
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let seen = transitions.clone();
        scheduler.on_state_changed(move |state| seen.lock().unwrap().push(state.clone()));

        scheduler.start().unwrap();
        wait_for(|| scheduler.state() == SchedulerState::ReauthenticationRequired).await;

        assert_eq!(backend.refresh_calls(), 2);
        assert_eq!(storage.access_token().unwrap(), None);
        assert_eq!(
            transitions.lock().unwrap().last(),
            Some(&SchedulerState::ReauthenticationRequired)
        );

        scheduler.cancel();
        assert_eq!(scheduler.state(), SchedulerState::ReauthenticationRequired);
    }

    #[tokio::test]
    async fn rejected_credential_gives_up_immediately() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_refresh(Err(ClientError::http(401, None, "refresh token expired")));
        let scheduler = RefreshScheduler::new(
            backend.clone(),
            storage_with(Some(&token_expiring_in(2))),
            config(5),
        );

        scheduler.start().unwrap();
        wait_for(|| scheduler.state() == SchedulerState::ReauthenticationRequired).await;
        assert_eq!(backend.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_pending_refresh() {
        let backend = Arc::new(FakeBackend::new());
        let scheduler = RefreshScheduler::new(
            backend.clone(),
            storage_with(Some(&token_expiring_in(2))),
            config(3),
        );

        scheduler.start().unwrap();
        scheduler.cancel();
        sleep(Duration::from_millis(1_500)).await;

        assert_eq!(backend.refresh_calls(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn restart_keeps_a_single_timer() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_refresh(Ok(token_expiring_in(3_600)));
        let scheduler = RefreshScheduler::new(
            backend.clone(),
            storage_with(Some(&token_expiring_in(2))),
            config(3),
        );

        scheduler.start().unwrap();
        scheduler.restart().unwrap();
        scheduler.restart().unwrap();
        wait_for(|| backend.refresh_calls() >= 1).await;
        sleep(Duration::from_millis(300)).await;

        assert_eq!(backend.refresh_calls(), 1);
        scheduler.cancel();
    }
}
