//! Model loader worker.
//!
//! Runs on its own thread, never on the caller's: resolves the asset,
//! stages it to the cache, constructs the engine, and writes the one state
//! transition the load ends in. The loader that won admission is the only
//! writer until it settles.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::asset::ModelAsset;
use crate::config::BridgeConfig;
use crate::engine::EngineFactory;
use crate::error::LoadError;
use crate::state::{EngineCell, SharedState};

pub(crate) struct LoadRequest {
    pub identifier: String,
    pub asset_root: PathBuf,
    pub cache_dir: PathBuf,
    pub file_name: String,
}

impl LoadRequest {
    pub(crate) fn new(cfg: &BridgeConfig, identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            asset_root: cfg.asset_root.clone(),
            cache_dir: cfg.cache_dir.clone(),
            file_name: cfg.model_file_name.clone(),
        }
    }
}

/// Run one load to its terminal state transition.
///
/// On success the state is Loaded and the engine cell installed; on any
/// failure the state is Failed with the reason and no partially
/// constructed engine is retained.
pub(crate) fn run_load(
    state: &SharedState,
    factory: &dyn EngineFactory,
    request: &LoadRequest,
) -> Result<(), LoadError> {
    let outcome = stage_and_construct(factory, request);
    match outcome {
        Ok(engine) => {
            state.complete(engine);
            log::info!(
                "model '{}' loaded via {} backend",
                request.identifier,
                factory.name()
            );
            Ok(())
        }
        Err(err) => {
            state.fail(err.to_string());
            log::warn!("model '{}' failed to load: {}", request.identifier, err);
            Err(err)
        }
    }
}

fn stage_and_construct(
    factory: &dyn EngineFactory,
    request: &LoadRequest,
) -> Result<EngineCell, LoadError> {
    let asset = ModelAsset::resolve(
        &request.asset_root,
        &request.identifier,
        &request.cache_dir,
        &request.file_name,
    )?;
    let staged = asset.stage()?;

    let mut engine = factory
        .load(&staged)
        .map_err(|err| LoadError::EngineConstruction(err.to_string()))?;
    engine
        .warm_up()
        .map_err(|err| LoadError::EngineConstruction(err.to_string()))?;

    Ok(Arc::new(Mutex::new(engine)))
}
