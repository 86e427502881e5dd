use crate::aggregator::{Aggregator, Snapshot};
use crate::config::RunConfig;
use crate::error::Result;
use crate::pool::{self, Launched, Progress, RunState};
use crate::probe::Transport;
use crate::result::ProbeResult;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Cloneable handle that cancels a run, e.g. from a signal handler
#[derive(Debug, Clone)]
pub struct Canceller {
    token: CancellationToken,
}

impl Canceller {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Results as they are recorded, in completion order
pub struct ResultFeed {
    results: mpsc::UnboundedReceiver<ProbeResult>,
}

impl ResultFeed {
    pub async fn recv(&mut self) -> Option<ProbeResult> {
        self.results.recv().await
    }
}

impl Stream for ResultFeed {
    type Item = ProbeResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().results.poll_recv(cx)
    }
}

/// Starts runs
#[derive(Debug, Clone, Copy, Default)]
pub struct RunController;

impl RunController {
    /// Validate `config` and start probing. Config and URL errors are
    /// returned before any worker is spawned.
    pub fn start(config: RunConfig, transport: Arc<dyn Transport>) -> Result<RunHandle> {
        let Launched {
            state,
            workers,
            mut results,
        } = pool::launch(&config, transport)?;

        let aggregator = Arc::new(Aggregator::new(state.total()));
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();

        let collector = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move {
                let mut forwarded = 0usize;
                while let Some(result) = results.recv().await {
                    // Once the feed is gone nothing can read it, so skip the copy
                    if feed_tx.is_closed() {
                        aggregator.record(result);
                    } else if aggregator.record(result.clone()) && feed_tx.send(result).is_ok() {
                        forwarded += 1;
                    }
                }
                debug!("Result collector drained, {} forwarded to the feed", forwarded);
                forwarded
            })
        };

        Ok(RunHandle {
            state,
            aggregator,
            workers,
            collector,
            feed: Some(ResultFeed { results: feed_rx }),
        })
    }
}

/// A started run
pub struct RunHandle {
    state: Arc<RunState>,
    aggregator: Arc<Aggregator>,
    workers: Vec<JoinHandle<()>>,
    collector: JoinHandle<usize>,
    feed: Option<ResultFeed>,
}

impl RunHandle {
    /// Stop handing out candidates and abandon in-flight probes. Idempotent.
    pub fn cancel(&self) {
        if !self.state.is_cancelled() {
            info!("Cancelling run");
        }
        self.state.cancel();
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            token: self.state.cancel_token().clone(),
        }
    }

    /// Take the live result feed. Only the first call returns it, and an
    /// untaken feed is released as soon as `wait` is called.
    pub fn results(&mut self) -> Option<ResultFeed> {
        self.feed.take()
    }

    pub fn progress(&self) -> Progress {
        self.state.progress()
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = self.aggregator.snapshot();
        snapshot.cancelled = self.state.is_cancelled();
        snapshot
    }

    /// Wait for every worker to exit and return the final snapshot. A
    /// cancelled run returns its partial results.
    pub async fn wait(self) -> Result<Snapshot> {
        let (snapshot, _) = self.join().await?;
        Ok(snapshot)
    }

    /// Join workers and collector, returning how many results reached the feed
    async fn join(self) -> Result<(Snapshot, usize)> {
        let RunHandle {
            state,
            aggregator,
            workers,
            collector,
            feed,
        } = self;
        drop(feed);

        for worker in workers {
            worker.await?;
        }
        let forwarded = collector.await?;

        let mut snapshot = aggregator.snapshot();
        snapshot.cancelled = state.is_cancelled();

        info!(
            "Run {}: {}/{} processed, {} found, {} errors",
            if snapshot.cancelled { "cancelled" } else { "complete" },
            snapshot.processed,
            snapshot.total,
            snapshot.found.len(),
            snapshot.errors
        );

        Ok((snapshot, forwarded))
    }
}
