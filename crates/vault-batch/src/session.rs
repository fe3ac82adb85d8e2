//! Vault session gate.
//!
//! Four states: Checking until the one startup existence query answers, then NeedsSetup or
//! Locked, and Unlocked after a successful create or unlock. Failed calls never move the
//! state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::VaultBackend;
use crate::config::ControllerConfig;
use crate::error::{BackendError, ControllerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultSessionState {
    #[default]
    Checking,
    NeedsSetup,
    Locked,
    Unlocked,
}

impl std::fmt::Display for VaultSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Checking => "being checked",
            Self::NeedsSetup => "not set up",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        };
        f.write_str(name)
    }
}

/// What the user tried to do with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    CreateVault,
    Unlock,
    Lock,
    ChangePassword,
}

impl std::fmt::Display for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateVault => "create a vault",
            Self::Unlock => "unlock",
            Self::Lock => "lock",
            Self::ChangePassword => "change the master password",
        };
        f.write_str(name)
    }
}

pub struct VaultSession<B: VaultBackend> {
    backend: Arc<B>,
    state: VaultSessionState,
    /// Set once the startup existence query has been sent
    queried: bool,
    min_password_length: usize,
}

impl<B: VaultBackend> VaultSession<B> {
    pub fn new(backend: Arc<B>, config: &ControllerConfig) -> Self {
        Self {
            backend,
            state: VaultSessionState::Checking,
            queried: false,
            min_password_length: config.min_password_length,
        }
    }

    pub fn state(&self) -> VaultSessionState {
        self.state
    }

    /// Resolves the startup state. Only the first call asks the backend.
    ///
    /// If the query fails the state stays Checking and the error is returned; later calls
    /// still won't ask again.
    pub async fn check_exists(&mut self) -> Result<VaultSessionState, BackendError> {
        if self.queried {
            return Ok(self.state);
        }
        self.queried = true;
        let exists = self.backend.check_vault_exists().await.inspect_err(|e| {
            log::warn!("check_exists: vault existence query failed: {}", e);
        })?;
        self.state = if exists {
            VaultSessionState::Locked
        } else {
            VaultSessionState::NeedsSetup
        };
        log::info!("check_exists: vault session starts {:?}", self.state);
        Ok(self.state)
    }

    pub async fn create_vault(&mut self, password: &str, confirm: &str) -> Result<(), ControllerError> {
        self.require(VaultSessionState::NeedsSetup, SessionAction::CreateVault)?;
        self.validate_new_password(password, confirm)?;

        self.backend
            .create_vault(password)
            .await
            .map_err(|e| ControllerError::ValidationError {
                message: e.message().to_string(),
            })?;
        self.state = VaultSessionState::Unlocked;
        log::info!("create_vault: vault created and unlocked");
        Ok(())
    }

    pub async fn unlock(&mut self, password: &str) -> Result<(), ControllerError> {
        self.require(VaultSessionState::Locked, SessionAction::Unlock)?;

        self.backend
            .unlock_vault(password)
            .await
            .map_err(|e| ControllerError::AuthError {
                message: e.message().to_string(),
            })?;
        self.state = VaultSessionState::Unlocked;
        log::info!("unlock: vault unlocked");
        Ok(())
    }

    /// Explicit logout.
    pub fn lock(&mut self) -> Result<(), ControllerError> {
        self.require(VaultSessionState::Unlocked, SessionAction::Lock)?;
        self.state = VaultSessionState::Locked;
        log::info!("lock: vault locked");
        Ok(())
    }

    pub async fn change_master_password(
        &mut self,
        old_password: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), ControllerError> {
        self.require(VaultSessionState::Unlocked, SessionAction::ChangePassword)?;
        self.validate_new_password(new_password, confirm)?;

        self.backend
            .change_master_password(old_password, new_password)
            .await
            .map_err(|e| ControllerError::AuthError {
                message: e.message().to_string(),
            })
    }

    fn require(&self, expected: VaultSessionState, action: SessionAction) -> Result<(), ControllerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ControllerError::InvalidSessionTransition {
                from: self.state,
                action,
            })
        }
    }

    fn validate_new_password(&self, password: &str, confirm: &str) -> Result<(), ControllerError> {
        if password.chars().count() < self.min_password_length {
            return Err(ControllerError::PasswordTooShort {
                min_length: self.min_password_length,
            });
        }
        if password != confirm {
            return Err(ControllerError::PasswordMismatch);
        }
        Ok(())
    }
}
