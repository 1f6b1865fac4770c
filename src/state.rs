//! Shared bridge state.
//!
//! One tagged value per bridge: `Unloaded → Loading → Loaded / Failed`,
//! with `Failed → Loading` permitted for retry and `Loaded` terminal for
//! the bridge's lifetime. The loader is the only writer; the dispatcher
//! only reads. The `RwLock` gives readers a before-or-after view of every
//! transition, never a torn one.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::engine::InferenceEngine;

/// The one engine handle shared across detect calls.
///
/// Engine thread-safety is unknown, so every inference goes through this
/// mutex: at most one call executes inside the engine at a time.
pub type EngineCell = Arc<Mutex<Box<dyn InferenceEngine>>>;

/// Lifecycle phases of the model, observable by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

enum BridgeState {
    Unloaded,
    Loading,
    Loaded(EngineCell),
    Failed(String),
}

/// Outcome of asking to start a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoadAdmission {
    /// The state moved to Loading; the caller owns the transition.
    Started,
    /// A load is already Loaded; nothing to do.
    AlreadyLoaded,
    /// Another load is running.
    InFlight,
}

pub(crate) struct SharedState {
    inner: RwLock<BridgeState>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(BridgeState::Unloaded),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        // Writers only ever assign a complete variant, so a guard recovered
        // from a poisoned lock still holds a consistent value.
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            BridgeState::Unloaded => Phase::Unloaded,
            BridgeState::Loading => Phase::Loading,
            BridgeState::Loaded(_) => Phase::Loaded,
            BridgeState::Failed(_) => Phase::Failed,
        }
    }

    /// Engine handle when Loaded, for the dispatcher's admission check.
    pub(crate) fn engine(&self) -> Option<EngineCell> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            BridgeState::Loaded(cell) => Some(cell.clone()),
            _ => None,
        }
    }

    /// Last load failure, retained for diagnostics.
    pub(crate) fn failure(&self) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            BridgeState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Try to take the Loading transition. Single-writer discipline: only
    /// Unloaded and Failed admit a new load.
    pub(crate) fn begin_loading(&self) -> LoadAdmission {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            BridgeState::Loaded(_) => LoadAdmission::AlreadyLoaded,
            BridgeState::Loading => LoadAdmission::InFlight,
            BridgeState::Unloaded | BridgeState::Failed(_) => {
                *guard = BridgeState::Loading;
                LoadAdmission::Started
            }
        }
    }

    /// Loading → Loaded. Called only by the loader that won admission.
    pub(crate) fn complete(&self, engine: EngineCell) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = BridgeState::Loaded(engine);
    }

    /// Loading → Failed. Called only by the loader that won admission.
    pub(crate) fn fail(&self, reason: String) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = BridgeState::Failed(reason);
    }
}
