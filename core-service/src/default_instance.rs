//! Process-wide default client.
//!
//! Nothing is installed implicitly: the host installs a client after
//! building it and tears it down on shutdown.

use core_session::BranchClient;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::error::{CoreError, Result};

static DEFAULT_CLIENT: RwLock<Option<BranchClient>> = RwLock::new(None);

/// Register `client` as the process default. Fails if one is installed.
pub fn install_default(client: BranchClient) -> Result<()> {
    let mut slot = DEFAULT_CLIENT.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(CoreError::DefaultAlreadyInstalled);
    }
    *slot = Some(client);
    info!("Default Branch client installed");
    Ok(())
}

/// Handle to the process default client.
pub fn default_client() -> Result<BranchClient> {
    DEFAULT_CLIENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(CoreError::DefaultNotInstalled)
}

/// Remove and return the process default client.
///
/// Handles obtained earlier keep working; they no longer refer to the
/// default.
pub fn teardown_default() -> Option<BranchClient> {
    let removed = DEFAULT_CLIENT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if removed.is_some() {
        info!("Default Branch client removed");
    }
    removed
}
