//! The bridge: model lifecycle plus serialized inference dispatch.
//!
//! Two boundary operations, each returning a per-call receipt with exactly
//! one terminal response:
//!
//! - `load_model`: stages a bundled asset, constructs the engine on a
//!   dedicated loader thread, transitions the shared state.
//! - `detect`: admission-checks against the shared state on the caller's
//!   thread, then runs inference on a bounded worker pool with all calls
//!   serialized through the engine's mutex.
//!
//! Blocking work never runs on the caller's thread, and no worker fault
//! escapes as a panic across the boundary.

mod loader;
mod pool;
pub mod receipt;

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use anyhow::Result;

use crate::config::BridgeConfig;
use crate::engine::{select_engine_backend, DetectionResult, EngineFactory};
use crate::error::{DetectError, LoadError};
use crate::state::{EngineCell, LoadAdmission, Phase, SharedState};

use loader::LoadRequest;
pub use pool::DispatchCounters;
use pool::WorkerPool;
use receipt::Receipt;

/// Receipt for a `load_model` call.
pub type LoadReceipt = Receipt<(), LoadError>;
/// Receipt for a `detect` call.
pub type DetectReceipt = Receipt<DetectionResult, DetectError>;

pub struct Bridge {
    config: BridgeConfig,
    factory: Arc<dyn EngineFactory>,
    state: Arc<SharedState>,
    pool: WorkerPool,
    loader: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Build a bridge around an explicit engine factory.
    pub fn new(config: BridgeConfig, factory: Arc<dyn EngineFactory>) -> Self {
        let pool = WorkerPool::new(config.dispatch.workers, config.dispatch.queue_depth);
        Self {
            config,
            factory,
            state: Arc::new(SharedState::new()),
            pool,
            loader: Mutex::new(None),
        }
    }

    /// Build a bridge with the engine backend named in the configuration.
    pub fn from_config(config: BridgeConfig) -> Result<Self> {
        let factory = select_engine_backend(&config)?;
        Ok(Self::new(config, factory))
    }

    /// Load the model asset named by `asset_id`.
    ///
    /// Admission runs synchronously: Loaded settles success immediately
    /// (loading is terminal, state never regresses), an in-flight load is
    /// rejected, and otherwise the state moves to Loading and the staging
    /// plus engine construction run on a dedicated loader thread.
    pub fn load_model(&self, asset_id: &str) -> LoadReceipt {
        match self.state.begin_loading() {
            LoadAdmission::AlreadyLoaded => return Receipt::settled(Ok(())),
            LoadAdmission::InFlight => return Receipt::settled(Err(LoadError::InProgress)),
            LoadAdmission::Started => {}
        }

        log::info!("loading model asset '{}'", asset_id);
        let (completion, receipt) = Receipt::pair();
        let state = self.state.clone();
        let factory = self.factory.clone();
        let request = LoadRequest::new(&self.config, asset_id);

        let handle = std::thread::Builder::new()
            .name("bridge-loader".to_string())
            .spawn(move || {
                completion.settle(loader::run_load(&state, factory.as_ref(), &request));
            })
            .expect("failed to spawn loader thread");

        // At most one load runs at a time, so the slot only ever holds a
        // finished thread here.
        let mut slot = self.loader.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            let _ = previous.join();
        }
        *slot = Some(handle);

        receipt
    }

    /// `load_model` with the terminal response awaited on this thread.
    pub fn load_model_blocking(&self, asset_id: &str) -> Result<(), LoadError> {
        self.load_model(asset_id).wait()
    }

    /// Run detection on one frame.
    ///
    /// The not-loaded check settles on the caller's thread without touching
    /// the pool. Otherwise the frame and a handle to the engine cell move
    /// into a pool job; the engine mutex serializes concurrent calls.
    pub fn detect(&self, frame: Vec<u8>) -> DetectReceipt {
        let engine = match self.state.engine() {
            Some(cell) => cell,
            None => return Receipt::settled(Err(DetectError::NotLoaded)),
        };

        let (completion, receipt) = Receipt::pair();
        let job = Box::new(move || {
            completion.settle(run_inference(&engine, &frame));
        });

        if self.pool.try_submit(job).is_err() {
            log::warn!("detect call rejected: dispatch queue full");
            return Receipt::settled(Err(DetectError::Overloaded));
        }

        receipt
    }

    /// `detect` with the configured deadline applied on this thread.
    pub fn detect_blocking(&self, frame: Vec<u8>) -> Result<DetectionResult, DetectError> {
        self.detect(frame).wait_timeout(self.config.dispatch.timeout)
    }

    /// Current lifecycle phase, for diagnostics and callers that poll.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Reason of the last failed load, if the bridge is in Failed.
    pub fn failure_reason(&self) -> Option<String> {
        self.state.failure()
    }

    /// Dispatch totals. A detect call rejected at admission never moves
    /// the submitted counter.
    pub fn counters(&self) -> DispatchCounters {
        self.pool.counters()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        let mut slot = self.loader.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            let _ = handle.join();
        }
    }
}

fn run_inference(cell: &EngineCell, frame: &[u8]) -> Result<DetectionResult, DetectError> {
    let mut engine = cell
        .lock()
        .map_err(|_| DetectError::InferenceFailed("engine lock poisoned".to_string()))?;
    log::debug!("running {} inference on {} byte frame", engine.name(), frame.len());
    engine
        .infer(frame)
        .map_err(|err| DetectError::InferenceFailed(err.to_string()))
}
