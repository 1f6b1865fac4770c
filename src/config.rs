use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_ASSET_ROOT: &str = "assets";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_MODEL_FILE_NAME: &str = "model.onnx";
const DEFAULT_ENGINE_BACKEND: &str = "stub";
const DEFAULT_INPUT_WIDTH: u32 = 640;
const DEFAULT_INPUT_HEIGHT: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_WORKERS: usize = 2;
const DEFAULT_QUEUE_DEPTH: usize = 8;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Deserialize, Default)]
struct BridgeConfigFile {
    asset_root: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    model_file_name: Option<String>,
    engine: Option<EngineConfigFile>,
    dispatch: Option<DispatchConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct EngineConfigFile {
    backend: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DispatchConfigFile {
    workers: Option<usize>,
    queue_depth: Option<usize>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub asset_root: PathBuf,
    pub cache_dir: PathBuf,
    pub model_file_name: String,
    pub engine: EngineSettings,
    pub dispatch: DispatchSettings,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub backend: String,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub workers: usize,
    pub queue_depth: usize,
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from_file(BridgeConfigFile::default())
    }
}

impl BridgeConfig {
    /// Load from the file named by `BRIDGE_CONFIG` (if set), then apply
    /// environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BRIDGE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: BridgeConfigFile) -> Self {
        let asset_root = file
            .asset_root
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_ROOT));
        let cache_dir = file
            .cache_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
        let model_file_name = file
            .model_file_name
            .unwrap_or_else(|| DEFAULT_MODEL_FILE_NAME.to_string());
        let engine = EngineSettings {
            backend: file
                .engine
                .as_ref()
                .and_then(|engine| engine.backend.clone())
                .unwrap_or_else(|| DEFAULT_ENGINE_BACKEND.to_string()),
            input_width: file
                .engine
                .as_ref()
                .and_then(|engine| engine.input_width)
                .unwrap_or(DEFAULT_INPUT_WIDTH),
            input_height: file
                .engine
                .as_ref()
                .and_then(|engine| engine.input_height)
                .unwrap_or(DEFAULT_INPUT_HEIGHT),
            confidence_threshold: file
                .engine
                .and_then(|engine| engine.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
        };
        let dispatch = DispatchSettings {
            workers: file
                .dispatch
                .as_ref()
                .and_then(|dispatch| dispatch.workers)
                .unwrap_or(DEFAULT_WORKERS),
            queue_depth: file
                .dispatch
                .as_ref()
                .and_then(|dispatch| dispatch.queue_depth)
                .unwrap_or(DEFAULT_QUEUE_DEPTH),
            timeout: Duration::from_millis(
                file.dispatch
                    .and_then(|dispatch| dispatch.timeout_ms)
                    .unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        };
        Self {
            asset_root,
            cache_dir,
            model_file_name,
            engine,
            dispatch,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var("BRIDGE_ASSET_ROOT") {
            if !root.trim().is_empty() {
                self.asset_root = PathBuf::from(root);
            }
        }
        if let Ok(dir) = std::env::var("BRIDGE_CACHE_DIR") {
            if !dir.trim().is_empty() {
                self.cache_dir = PathBuf::from(dir);
            }
        }
        if let Ok(name) = std::env::var("BRIDGE_MODEL_FILE") {
            if !name.trim().is_empty() {
                self.model_file_name = name;
            }
        }
        if let Ok(backend) = std::env::var("BRIDGE_ENGINE_BACKEND") {
            if !backend.trim().is_empty() {
                self.engine.backend = backend;
            }
        }
        if let Ok(workers) = std::env::var("BRIDGE_WORKERS") {
            self.dispatch.workers = workers
                .parse()
                .map_err(|_| anyhow!("BRIDGE_WORKERS must be an integer"))?;
        }
        if let Ok(depth) = std::env::var("BRIDGE_QUEUE_DEPTH") {
            self.dispatch.queue_depth = depth
                .parse()
                .map_err(|_| anyhow!("BRIDGE_QUEUE_DEPTH must be an integer"))?;
        }
        if let Ok(timeout) = std::env::var("BRIDGE_TIMEOUT_MS") {
            let millis: u64 = timeout
                .parse()
                .map_err(|_| anyhow!("BRIDGE_TIMEOUT_MS must be an integer number of milliseconds"))?;
            self.dispatch.timeout = Duration::from_millis(millis);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.model_file_name.trim().is_empty() {
            return Err(anyhow!("model_file_name must not be empty"));
        }
        if self.engine.backend.trim().is_empty() {
            return Err(anyhow!("engine backend must not be empty"));
        }
        if self.engine.input_width == 0 || self.engine.input_height == 0 {
            return Err(anyhow!("engine input dimensions must be greater than zero"));
        }
        if self.dispatch.workers == 0 {
            return Err(anyhow!("dispatch workers must be greater than zero"));
        }
        if self.dispatch.queue_depth == 0 {
            return Err(anyhow!("dispatch queue_depth must be greater than zero"));
        }
        if self.dispatch.timeout.is_zero() {
            return Err(anyhow!("dispatch timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<BridgeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
