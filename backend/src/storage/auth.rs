use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::UserProfile;
use tracing::info;

use super::traits::AuthProvider;

/// Auth provider for a single locally configured user.
///
/// Signing in always succeeds with the configured profile; the hosted
/// identity provider is out of scope.
pub struct LocalAuthProvider {
    profile: UserProfile,
    current: Mutex<Option<UserProfile>>,
}

impl LocalAuthProvider {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    fn current_user(&self) -> Option<UserProfile> {
        self.current.lock().ok().and_then(|user| user.clone())
    }

    async fn sign_in(&self) -> Result<UserProfile> {
        let mut current = self.current.lock().map_err(|_| anyhow!("auth state poisoned"))?;
        info!(user = %self.profile.id, "signed in as {}", self.profile.display_name);
        *current = Some(self.profile.clone());
        Ok(self.profile.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        let mut current = self.current.lock().map_err(|_| anyhow!("auth state poisoned"))?;
        if let Some(user) = current.take() {
            info!(user = %user.id, "signed out");
        }
        Ok(())
    }
}
