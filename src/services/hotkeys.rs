//! OS global-hotkey collaborator

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    keybind::TimerAction,
};

/// What a global hotkey does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalAction {
    Timer(TimerAction),
    ToggleLock,
}

/// Registration side of the OS hotkey service.
///
/// Presses are delivered separately, through the channel handed out when the
/// host is created.
#[async_trait]
pub trait HotkeyHost: Send + Sync {
    async fn register(&self, spec: &str, action: GlobalAction) -> Result<()>;
    async fn unregister_all(&self) -> Result<()>;
}

/// A registered spec and its action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredHotkey {
    pub spec: String,
    pub action: GlobalAction,
}

/// In-process hotkey table.
///
/// An external OS hook reports raw presses through [`HotkeyRegistry::press`],
/// which forwards the registered action to the coordinator channel.
#[derive(Debug)]
pub struct HotkeyRegistry {
    table: Mutex<BTreeMap<String, GlobalAction>>,
    /// Specs the OS refuses, e.g. taken by another application
    unavailable: Mutex<BTreeSet<String>>,
    presses_tx: mpsc::Sender<GlobalAction>,
}

impl HotkeyRegistry {
    pub fn new() -> (Self, mpsc::Receiver<GlobalAction>) {
        let (presses_tx, presses_rx) = mpsc::channel(64);
        let registry = Self {
            table: Mutex::new(BTreeMap::new()),
            unavailable: Mutex::new(BTreeSet::new()),
            presses_tx,
        };
        (registry, presses_rx)
    }

    /// Make future registrations of `spec` fail
    pub fn mark_unavailable(&self, spec: impl Into<String>) {
        self.unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(spec.into());
    }

    pub fn registered(&self) -> Vec<RegisteredHotkey> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(spec, action)| RegisteredHotkey {
                spec: spec.clone(),
                action: *action,
            })
            .collect()
    }

    /// Deliver an OS press. Returns false if `spec` is not registered.
    pub fn press(&self, spec: &str) -> bool {
        let action = self
            .table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(spec)
            .copied();
        let Some(action) = action else {
            debug!("Press on unregistered hotkey {}", spec);
            return false;
        };
        if let Err(e) = self.presses_tx.try_send(action) {
            warn!("Dropping hotkey press {}: {}", spec, e);
            return false;
        }
        true
    }
}

#[async_trait]
impl HotkeyHost for HotkeyRegistry {
    async fn register(&self, spec: &str, action: GlobalAction) -> Result<()> {
        if self
            .unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(spec)
        {
            return Err(Error::Host(format!("{spec} is unavailable")));
        }
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table.contains_key(spec) {
            return Err(Error::Host(format!("{spec} is already registered")));
        }
        table.insert(spec.to_string(), action);
        Ok(())
    }

    async fn unregister_all(&self) -> Result<()> {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
