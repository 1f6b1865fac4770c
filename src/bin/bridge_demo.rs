//! bridge_demo - end-to-end synthetic run of the detection bridge

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use detect_bridge::{Bridge, BridgeConfig, StubEngineFactory};

const DEMO_ASSET_NAME: &str = "demo_model.bin";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to run through the bridge.
    #[arg(long, default_value_t = 10)]
    frames: u32,
    /// Bytes per synthetic frame.
    #[arg(long, default_value_t = 64)]
    frame_bytes: usize,
    /// Working directory for the synthetic asset and model cache.
    #[arg(long, default_value = "demo_out")]
    out: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }

    let out_dir = PathBuf::from(&args.out);
    let asset_root = out_dir.join("assets");
    std::fs::create_dir_all(&asset_root).context("failed to create asset dir")?;
    std::fs::write(asset_root.join(DEMO_ASSET_NAME), b"demo stub model weights")
        .context("failed to write demo asset")?;

    let mut config = BridgeConfig::load()?;
    config.asset_root = asset_root;
    config.cache_dir = out_dir.join("cache");

    let bridge = Bridge::new(config, Arc::new(StubEngineFactory::new()));
    bridge
        .load_model_blocking(DEMO_ASSET_NAME)
        .map_err(|err| anyhow!("load failed: {err}"))?;
    log::info!("model loaded, state {:?}", bridge.phase());

    for index in 0..args.frames {
        let frame = synthetic_frame(index, args.frame_bytes);
        match bridge.detect_blocking(frame) {
            Ok(result) => println!("frame {index}: {}", result.to_json()?),
            Err(err) => log::warn!("frame {index}: {err}"),
        }
    }

    let counters = bridge.counters();
    log::info!(
        "done: {} submitted, {} completed",
        counters.submitted,
        counters.completed
    );
    Ok(())
}

fn synthetic_frame(index: u32, len: usize) -> Vec<u8> {
    index
        .to_le_bytes()
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}
