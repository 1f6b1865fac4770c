use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use detect_bridge::{
    Bridge, BridgeConfig, DetectError, DetectionResult, EngineFactory, InferenceEngine,
    LoadError, Phase, StubEngineFactory,
};

type InferFn = Arc<dyn Fn(&[u8]) -> Result<DetectionResult> + Send + Sync>;
type LoadHook = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Engine factory driven by test closures: `load_hook` runs during engine
/// construction, `infer` handles every frame.
struct HookedFactory {
    load_hook: LoadHook,
    infer: InferFn,
}

impl HookedFactory {
    fn new(infer: InferFn) -> Self {
        Self {
            load_hook: Arc::new(|| Ok(())),
            infer,
        }
    }

    fn with_load_hook(mut self, hook: LoadHook) -> Self {
        self.load_hook = hook;
        self
    }
}

impl EngineFactory for HookedFactory {
    fn name(&self) -> &'static str {
        "hooked"
    }

    fn load(&self, _model_path: &Path) -> Result<Box<dyn InferenceEngine>> {
        (self.load_hook)()?;
        Ok(Box::new(HookedEngine {
            infer: self.infer.clone(),
        }))
    }
}

struct HookedEngine {
    infer: InferFn,
}

impl InferenceEngine for HookedEngine {
    fn name(&self) -> &'static str {
        "hooked"
    }

    fn infer(&mut self, frame: &[u8]) -> Result<DetectionResult> {
        (self.infer)(frame)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    config: BridgeConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let asset_root = dir.path().join("assets");
    std::fs::create_dir_all(&asset_root).expect("asset dir");
    std::fs::write(asset_root.join("model.bin"), b"stub model weights").expect("asset");

    let mut config = BridgeConfig::default();
    config.asset_root = asset_root;
    config.cache_dir = dir.path().join("cache");
    config.dispatch.timeout = Duration::from_secs(5);
    Fixture { _dir: dir, config }
}

#[test]
fn every_concurrent_call_gets_exactly_one_response() {
    let fx = fixture();
    let mut config = fx.config.clone();
    config.dispatch.workers = 4;
    config.dispatch.queue_depth = 64;
    let bridge = Arc::new(Bridge::new(config, Arc::new(StubEngineFactory::new())));
    bridge.load_model_blocking("model.bin").expect("load");

    // Mix of valid and malformed frames, issued from multiple caller
    // threads without waiting for prior calls.
    let handles: Vec<_> = (0..16u8)
        .map(|i| {
            let bridge = bridge.clone();
            std::thread::spawn(move || {
                let frame = if i % 4 == 0 { vec![i; 3] } else { vec![i; 64] };
                bridge.detect(frame).wait_timeout(Duration::from_secs(10))
            })
        })
        .collect();

    let mut ok = 0;
    let mut failed = 0;
    for handle in handles {
        // One terminal response per call: join yields it exactly once.
        match handle.join().expect("caller thread") {
            Ok(_) => ok += 1,
            Err(DetectError::InferenceFailed(_)) => failed += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(ok + failed, 16);
    assert_eq!(failed, 4);
    assert_eq!(bridge.counters().submitted, 16);
    assert_eq!(bridge.phase(), Phase::Loaded);
}

#[test]
fn inference_calls_never_overlap_inside_the_engine() {
    let fx = fixture();
    let mut config = fx.config.clone();
    config.dispatch.workers = 4;
    config.dispatch.queue_depth = 64;

    let active = Arc::new(AtomicUsize::new(0));
    let max_overlap = Arc::new(AtomicUsize::new(0));
    let infer: InferFn = {
        let active = active.clone();
        let max_overlap = max_overlap.clone();
        Arc::new(move |_frame: &[u8]| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_overlap.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(DetectionResult::default())
        })
    };

    let bridge = Bridge::new(config, Arc::new(HookedFactory::new(infer)));
    bridge.load_model_blocking("model.bin").expect("load");

    let receipts: Vec<_> = (0..12u8).map(|i| bridge.detect(vec![i; 64])).collect();
    for receipt in receipts {
        receipt.wait_timeout(Duration::from_secs(10)).expect("detect");
    }

    assert_eq!(max_overlap.load(Ordering::SeqCst), 1);
}

#[test]
fn malformed_frames_fail_without_touching_load_state() {
    let fx = fixture();
    let bridge = Bridge::new(fx.config.clone(), Arc::new(StubEngineFactory::new()));
    bridge.load_model_blocking("model.bin").expect("load");

    for _ in 0..10 {
        let err = bridge.detect_blocking(vec![0u8; 3]).unwrap_err();
        assert!(matches!(err, DetectError::InferenceFailed(_)));
    }
    assert_eq!(bridge.phase(), Phase::Loaded);
    bridge.detect_blocking(vec![1u8; 64]).expect("healthy frame still works");
}

#[test]
fn saturated_queue_rejects_with_overloaded() {
    let fx = fixture();
    let mut config = fx.config.clone();
    config.dispatch.workers = 1;
    config.dispatch.queue_depth = 1;

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let started_tx = Mutex::new(started_tx);
    let infer: InferFn = Arc::new(move |_frame: &[u8]| {
        let _ = started_tx.lock().unwrap().send(());
        let _ = release_rx.lock().unwrap().recv();
        Ok(DetectionResult::default())
    });

    let bridge = Bridge::new(config, Arc::new(HookedFactory::new(infer)));
    bridge.load_model_blocking("model.bin").expect("load");

    // First call occupies the only worker, second fills the queue slot.
    let first = bridge.detect(vec![1u8; 64]);
    started_rx.recv_timeout(Duration::from_secs(5)).expect("worker busy");
    let second = bridge.detect(vec![2u8; 64]);

    // The third call is rejected at admission, on the caller's thread.
    let third = bridge.detect(vec![3u8; 64]);
    let rejected = third.try_result().expect("settled synchronously");
    assert!(matches!(rejected, Err(DetectError::Overloaded)));

    release_tx.send(()).unwrap();
    release_tx.send(()).unwrap();
    first.wait_timeout(Duration::from_secs(5)).expect("first");
    second.wait_timeout(Duration::from_secs(5)).expect("second");
}

#[test]
fn slow_inference_times_out_and_next_call_recovers() {
    let fx = fixture();
    let mut config = fx.config.clone();
    config.dispatch.workers = 2;
    config.dispatch.queue_depth = 8;

    // Frames that start with 0xFF stall; everything else returns at once.
    let infer: InferFn = Arc::new(|frame: &[u8]| {
        if frame.first() == Some(&0xFF) {
            std::thread::sleep(Duration::from_millis(300));
        }
        Ok(DetectionResult::default())
    });

    let bridge = Bridge::new(config, Arc::new(HookedFactory::new(infer)));
    bridge.load_model_blocking("model.bin").expect("load");

    let slow = bridge.detect(vec![0xFF; 64]);
    let err = slow.wait_timeout(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, DetectError::Timeout(_)));

    // The engine finishes the stalled frame on its worker and stays
    // consistent for the next call.
    let result = bridge
        .detect(vec![1u8; 64])
        .wait_timeout(Duration::from_secs(5));
    assert!(result.is_ok());
    assert_eq!(bridge.phase(), Phase::Loaded);
}

#[test]
fn teardown_settles_pending_calls_as_closed() {
    let fx = fixture();
    let mut config = fx.config.clone();
    config.dispatch.workers = 1;
    config.dispatch.queue_depth = 2;

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let started_tx = Mutex::new(started_tx);
    let infer: InferFn = Arc::new(move |_frame: &[u8]| {
        let _ = started_tx.lock().unwrap().send(());
        let _ = release_rx.lock().unwrap().recv();
        Ok(DetectionResult::default())
    });

    let bridge = Bridge::new(config, Arc::new(HookedFactory::new(infer)));
    bridge.load_model_blocking("model.bin").expect("load");

    let in_flight = bridge.detect(vec![1u8; 64]);
    started_rx.recv_timeout(Duration::from_secs(5)).expect("worker busy");
    let queued = bridge.detect(vec![2u8; 64]);

    // Tear the bridge down while one call runs and one is queued. The
    // dropper blocks joining the worker, so release the engine shortly
    // after shutdown is flagged.
    let dropper = std::thread::spawn(move || drop(bridge));
    std::thread::sleep(Duration::from_millis(200));
    release_tx.send(()).unwrap();
    dropper.join().expect("drop");

    // The running call delivered its result; the queued one was abandoned
    // with a terminal error, not left unanswered.
    assert!(in_flight.wait_timeout(Duration::from_secs(5)).is_ok());
    assert!(matches!(
        queued.wait_timeout(Duration::from_secs(5)),
        Err(DetectError::BridgeClosed)
    ));
}

#[test]
fn second_load_while_loading_is_rejected() {
    let fx = fixture();

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let started_tx = Mutex::new(started_tx);
    let load_hook: LoadHook = Arc::new(move || {
        let _ = started_tx.lock().unwrap().send(());
        let _ = release_rx.lock().unwrap().recv();
        Ok(())
    });
    let infer: InferFn = Arc::new(|_frame: &[u8]| Ok(DetectionResult::default()));
    let factory = HookedFactory::new(infer).with_load_hook(load_hook);

    let bridge = Bridge::new(fx.config.clone(), Arc::new(factory));

    let first = bridge.load_model("model.bin");
    started_rx.recv_timeout(Duration::from_secs(5)).expect("loading");
    assert_eq!(bridge.phase(), Phase::Loading);

    let second = bridge.load_model("model.bin");
    let rejected = second.try_result().expect("settled synchronously");
    assert!(matches!(rejected, Err(LoadError::InProgress)));

    release_tx.send(()).unwrap();
    first.wait().expect("first load");
    assert_eq!(bridge.phase(), Phase::Loaded);
}

#[test]
fn detect_during_loading_is_not_loaded() {
    let fx = fixture();

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let started_tx = Mutex::new(started_tx);
    let load_hook: LoadHook = Arc::new(move || {
        let _ = started_tx.lock().unwrap().send(());
        let _ = release_rx.lock().unwrap().recv();
        Ok(())
    });
    let infer: InferFn = Arc::new(|_frame: &[u8]| Ok(DetectionResult::default()));
    let factory = HookedFactory::new(infer).with_load_hook(load_hook);

    let bridge = Bridge::new(fx.config.clone(), Arc::new(factory));
    let load = bridge.load_model("model.bin");
    started_rx.recv_timeout(Duration::from_secs(5)).expect("loading");

    let err = bridge.detect(vec![1u8; 64]).wait().unwrap_err();
    assert!(matches!(err, DetectError::NotLoaded));

    release_tx.send(()).unwrap();
    load.wait().expect("load");
    bridge.detect_blocking(vec![1u8; 64]).expect("after load");
}
