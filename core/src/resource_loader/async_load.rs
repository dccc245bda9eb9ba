use std::sync::Arc;
use std::sync::mpsc::{self, TryRecvError};
use std::thread::JoinHandle;

use crate::asset::{Asset, LoadedAsset, SlotId};
use crate::compute::{CancellationToken, ThreadPool};
use crate::engine::Engine;

use super::LoadReport;
use super::decode::{self, DecodeOutput, Prepared};

/// An in-flight asynchronous resource load.
///
/// Decoding runs on a background thread; [`update`](Self::update) applies
/// finished results and performs the uploads on the calling thread.
/// Dropping the handle cancels whatever has not been applied yet and
/// blocks like [`cancel`](Self::cancel).
///
/// # Example
///
/// ```no_run
/// # fn frame(resources: &mut redlilium_gltfio::ResourceLoader, asset: &redlilium_gltfio::Asset) {
/// let mut load = resources.begin_async_load(asset).unwrap();
/// while !load.is_finished() {
///     let progress = load.update();
///     log::info!("loading: {:.0}%", progress * 100.0);
///     std::thread::sleep(std::time::Duration::from_millis(16));
/// }
/// let report = load.wait();
/// # }
/// ```
pub struct AsyncLoad {
    engine: Arc<dyn Engine>,
    asset: Asset,
    loaded: Arc<LoadedAsset>,
    receiver: mpsc::Receiver<DecodeOutput>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
    /// Slots whose decode result has not been applied.
    pending: Vec<SlotId>,
    total: usize,
    report: LoadReport,
    recompute_bounds: bool,
    finished: bool,
}

impl AsyncLoad {
    pub(super) fn start(
        engine: Arc<dyn Engine>,
        asset: Asset,
        loaded: Arc<LoadedAsset>,
        prepared: Prepared,
        pool: Arc<ThreadPool>,
        recompute_bounds: bool,
    ) -> Self {
        let pending = prepared.pending();
        let report = prepared.report;
        let total = report.resolved.len() + report.failed.len() + pending.len();
        let token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel();

        let worker = if prepared.jobs.is_empty() {
            None
        } else {
            let jobs = prepared.jobs;
            let job_token = token.clone();
            let spawned = std::thread::Builder::new()
                .name("gltfio-decode".into())
                .spawn(move || {
                    pool.map(jobs, |job| {
                        // The receiver is gone once the load is dropped.
                        let _ = sender.send(job.run(Some(&job_token)));
                    });
                });
            match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::error!("failed to spawn decode thread: {e}");
                    None
                }
            }
        };

        log::debug!(
            "{}: async load of {} slots started ({} decode jobs)",
            asset.id(),
            total,
            pending.len()
        );

        let mut load = Self {
            engine,
            asset,
            loaded,
            receiver,
            token,
            worker,
            pending,
            total,
            report,
            recompute_bounds,
            finished: false,
        };
        if load.pending.is_empty() {
            load.finish();
        }
        load
    }

    /// Applies every decode that has finished and returns the progress.
    pub fn update(&mut self) -> f32 {
        while !self.finished {
            match self.receiver.try_recv() {
                Ok(output) => self.apply(output),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finish();
                    break;
                }
            }
        }
        if self.pending.is_empty() {
            self.finish();
        }
        self.progress()
    }

    /// Fraction of this load's slots that reached a final state, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.total - self.pending.len()) as f32 / self.total as f32
    }

    /// Whether every slot has been applied or the load was cancelled.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Report of what has been applied so far.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Stops the load. Slots not applied yet become `Failed(Cancelled)`.
    ///
    /// Joins the decode thread: jobs not started yet are skipped, but a job
    /// already decoding runs to completion first, so this can block for up
    /// to one image decode. Its result is discarded.
    pub fn cancel(&mut self) {
        if !self.finished {
            log::debug!("{}: async load cancelled", self.asset.id());
            self.token.cancel();
        }
        self.finish();
    }

    /// Blocks until every decode is applied and returns the report.
    pub fn wait(mut self) -> LoadReport {
        while !self.finished && !self.pending.is_empty() {
            match self.receiver.recv() {
                Ok(output) => self.apply(output),
                Err(_) => break,
            }
        }
        self.finish();
        std::mem::take(&mut self.report)
    }

    fn apply(&mut self, output: DecodeOutput) {
        self.pending.retain(|&slot| slot != output.slot);
        let applied = decode::commit(
            self.engine.as_ref(),
            &self.loaded,
            self.asset.is_alive(),
            output,
            &mut self.report,
            self.recompute_bounds,
        );
        if !applied {
            log::debug!("{} destroyed, discarding decoded resources", self.asset.id());
            self.token.cancel();
            self.pending.clear();
            self.finish();
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if !self.pending.is_empty() {
            self.token.cancel();
            if self.asset.is_alive() {
                decode::cancel_slots(&self.loaded, &self.pending, &mut self.report);
            }
            self.pending.clear();
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("decode thread for {} panicked", self.asset.id());
        }
        log::debug!(
            "{}: async load finished, {} resolved, {} failed",
            self.asset.id(),
            self.report.resolved.len(),
            self.report.failed.len()
        );
    }
}

impl Drop for AsyncLoad {
    /// Cancels an unfinished load; blocks on the decode thread like `cancel`.
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for AsyncLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLoad")
            .field("asset", &self.asset.id())
            .field("pending", &self.pending.len())
            .field("total", &self.total)
            .field("finished", &self.finished)
            .finish()
    }
}
