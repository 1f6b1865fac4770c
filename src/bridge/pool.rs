//! Bounded worker pool for blocking inference work.
//!
//! A fixed set of threads drains a bounded queue of boxed jobs. Submission
//! never blocks the caller: a full queue is reported back and the
//! dispatcher turns it into an admission error. On shutdown the workers
//! finish their current job and exit; jobs still queued are dropped, which
//! disconnects their completion channels.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Submission/completion totals, readable while the pool runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchCounters {
    pub submitted: u64,
    pub completed: u64,
}

pub(crate) struct WorkerPool {
    queue: Option<mpsc::SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
}

impl WorkerPool {
    pub(crate) fn new(workers: usize, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel::<Job>(queue_depth);
        let rx = Arc::new(Mutex::new(rx));
        let shutdown = Arc::new(AtomicBool::new(false));
        let submitted = Arc::new(AtomicU64::new(0));
        let completed = Arc::new(AtomicU64::new(0));

        let handles = (0..workers.max(1))
            .map(|index| {
                let rx = rx.clone();
                let shutdown = shutdown.clone();
                let completed = completed.clone();
                std::thread::Builder::new()
                    .name(format!("bridge-worker-{index}"))
                    .spawn(move || run_worker(&rx, &shutdown, &completed))
                    .expect("failed to spawn bridge worker")
            })
            .collect();

        Self {
            queue: Some(tx),
            workers: handles,
            shutdown,
            submitted,
            completed,
        }
    }

    /// Hand a job to the pool. `Err(())` means the queue is full; the job
    /// is dropped and the caller reports the rejection itself.
    pub(crate) fn try_submit(&self, job: Job) -> Result<(), ()> {
        let queue = self.queue.as_ref().expect("pool queue taken before drop");
        match queue.try_send(job) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => Err(()),
        }
    }

    pub(crate) fn counters(&self) -> DispatchCounters {
        DispatchCounters {
            submitted: self.submitted.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
        }
    }
}

fn run_worker(rx: &Mutex<mpsc::Receiver<Job>>, shutdown: &AtomicBool, completed: &AtomicU64) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        // Hold the receiver lock only for the dequeue, not the job.
        let job = {
            let guard = rx.lock().unwrap_or_else(PoisonError::into_inner);
            guard.recv_timeout(std::time::Duration::from_millis(50))
        };
        match job {
            Ok(job) => {
                job();
                completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("bridge worker panicked during shutdown");
            }
        }
    }
}
