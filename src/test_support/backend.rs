use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::session::backend::{RefreshTokenResponse, SessionBackend};
use crate::session::{UserProfile, UserRole};

/// Scripted [`SessionBackend`]. Refresh results are consumed in order; once the
/// script runs out every refresh fails with a network error.
pub struct FakeBackend {
    refresh: Mutex<VecDeque<ClientResult<String>>>,
    profile: Mutex<ClientResult<UserProfile>>,
    refresh_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            refresh: Mutex::new(VecDeque::new()),
            profile: Mutex::new(Ok(sample_profile())),
            refresh_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_refresh(&self, result: ClientResult<String>) -> &Self {
        self.refresh.lock().unwrap().push_back(result);
        self
    }

    pub fn set_profile(&self, result: ClientResult<UserProfile>) -> &Self {
        *self.profile.lock().unwrap() = result;
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn refresh_token(&self) -> ClientResult<RefreshTokenResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.refresh.lock().unwrap().pop_front();
        match next {
            Some(result) => result.map(|access_token| RefreshTokenResponse { access_token }),
            None => Err(ClientError::Network("connection refused".into())),
        }
    }

    async fn get_profile(&self) -> ClientResult<UserProfile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile.lock().unwrap().clone()
    }
}

pub fn sample_profile() -> UserProfile {
    UserProfile {
        id: 11,
        email: Some("buyer@example.com".into()),
        first_name: Some("Abebe".into()),
        last_name: Some("Kebede".into()),
        activated: true,
        role: UserRole::User,
    }
}
