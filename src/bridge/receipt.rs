//! Per-call completion channels.
//!
//! Every boundary call gets its own single-shot channel: the worker settles
//! it exactly once, and the caller collects the terminal response on its
//! own thread. This is the response-context half of the contract — the
//! caller never observes the bridge's internal threads, only its receipt.

use std::sync::mpsc;
use std::time::Duration;

/// The sending side went away before a result was delivered.
pub struct Closed;

/// The caller's deadline elapsed before a result arrived.
pub struct Elapsed(pub Duration);

/// Receiving half of a call's completion channel.
///
/// Yields exactly one terminal response: the worker's result, `Closed` if
/// the bridge was torn down first, or `Elapsed` on a deadline.
pub struct Receipt<T, E> {
    rx: mpsc::Receiver<Result<T, E>>,
}

/// Sending half, held by the worker. Consumed on settle, so a response can
/// never be delivered twice.
pub(crate) struct Completion<T, E> {
    tx: mpsc::Sender<Result<T, E>>,
}

impl<T, E> Receipt<T, E> {
    pub(crate) fn pair() -> (Completion<T, E>, Receipt<T, E>) {
        let (tx, rx) = mpsc::channel();
        (Completion { tx }, Receipt { rx })
    }

    /// A receipt that already holds its terminal response. Used for
    /// admission failures settled on the caller's thread.
    pub(crate) fn settled(result: Result<T, E>) -> Receipt<T, E> {
        let (completion, receipt) = Receipt::pair();
        completion.settle(result);
        receipt
    }

    /// Block until the terminal response arrives.
    pub fn wait(self) -> Result<T, E>
    where
        E: From<Closed>,
    {
        match self.rx.recv() {
            Ok(result) => result,
            Err(mpsc::RecvError) => Err(E::from(Closed)),
        }
    }

    /// Block until the terminal response arrives or the deadline elapses.
    ///
    /// On a deadline the worker keeps running; its late result is discarded
    /// when the channel's receiving half drops here.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, E>
    where
        E: From<Closed> + From<Elapsed>,
    {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(E::from(Elapsed(timeout))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(E::from(Closed)),
        }
    }

    /// Non-blocking probe. `None` while the call is still in flight.
    pub fn try_result(&self) -> Option<Result<T, E>> {
        self.rx.try_recv().ok()
    }
}

impl<T, E> Completion<T, E> {
    /// Deliver the terminal response. The receiver may already be gone
    /// (deadline elapsed, caller dropped the receipt); the late result is
    /// dropped silently in that case.
    pub(crate) fn settle(self, result: Result<T, E>) {
        let _ = self.tx.send(result);
    }
}
