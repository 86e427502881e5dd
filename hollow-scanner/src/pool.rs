use crate::config::RunConfig;
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::probe::{Classifier, Prober, Transport};
use crate::resolver::Target;
use crate::result::{Candidate, ProbeResult, ProbeStatus};
use futures::Stream;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

/// Live counters of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub sent: usize,
    pub completed: usize,
    pub found: usize,
    pub errored: usize,
    pub remaining: usize,
}

/// Per-run state shared by the controller and its workers
#[derive(Debug)]
pub struct RunState {
    queue: Mutex<VecDeque<Candidate>>,
    total: usize,
    sent: AtomicUsize,
    completed: AtomicUsize,
    found: AtomicUsize,
    errored: AtomicUsize,
    cancel: CancellationToken,
}

impl RunState {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            total: candidates.len(),
            queue: Mutex::new(candidates.into()),
            sent: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            found: AtomicUsize::new(0),
            errored: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Take the next candidate. Yields nothing once the run is cancelled.
    pub async fn dequeue(&self) -> Option<Candidate> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.queue.lock().await.pop_front()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn progress(&self) -> Progress {
        let completed = self.completed.load(Ordering::Acquire);
        Progress {
            total: self.total,
            sent: self.sent.load(Ordering::Acquire),
            completed,
            found: self.found.load(Ordering::Acquire),
            errored: self.errored.load(Ordering::Acquire),
            remaining: self.total.saturating_sub(completed),
        }
    }

    fn mark_sent(&self) {
        self.sent.fetch_add(1, Ordering::AcqRel);
    }

    fn mark_completed(&self, result: &ProbeResult) {
        match result.status {
            ProbeStatus::Found => {
                self.found.fetch_add(1, Ordering::AcqRel);
            }
            ProbeStatus::Error => {
                self.errored.fetch_add(1, Ordering::AcqRel);
            }
            ProbeStatus::NotFound => {}
        }
        self.completed.fetch_add(1, Ordering::AcqRel);
    }
}

/// What every worker of a run shares
pub(crate) struct WorkerContext {
    target: Target,
    limiter: RateLimiter,
    prober: Prober,
}

pub(crate) struct Launched {
    pub state: Arc<RunState>,
    pub workers: Vec<JoinHandle<()>>,
    pub results: mpsc::Receiver<ProbeResult>,
}

/// Turn the wordlist into queue entries. Entries resolving to an already
/// queued URL are skipped; positions keep referring to the wordlist.
pub fn build_queue(target: &Target, wordlist: &[String]) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut queue = Vec::with_capacity(wordlist.len());

    for (position, word) in wordlist.iter().enumerate() {
        if seen.insert(target.resolve(word)) {
            queue.push(Candidate::new(position, word.as_str()));
        } else {
            warn!("Skipping duplicate wordlist entry '{}' at line {}", word, position + 1);
        }
    }

    queue
}

/// Validate the config and start `concurrency` workers
pub(crate) fn launch(config: &RunConfig, transport: Arc<dyn Transport>) -> Result<Launched> {
    config.validate()?;
    let target = Target::parse(&config.base_url)?;

    let candidates = build_queue(&target, &config.wordlist);
    let state = Arc::new(RunState::new(candidates));

    let prober = Prober::new(transport, config.timeout)
        .with_method(config.method)
        .with_classifier(Classifier::with_ignored(config.ignore_status.iter().copied()));

    let context = Arc::new(WorkerContext {
        target,
        limiter: RateLimiter::new(config.rate),
        prober,
    });

    info!(
        "Probing {} candidates against {} with {} workers",
        state.total(),
        config.base_url,
        config.concurrency
    );

    let (tx, results) = mpsc::channel(config.concurrency * 2);
    let workers = (0..config.concurrency)
        .map(|worker_id| {
            tokio::spawn(work(worker_id, state.clone(), context.clone(), tx.clone()))
        })
        .collect();

    Ok(Launched {
        state,
        workers,
        results,
    })
}

async fn work(
    worker_id: usize,
    state: Arc<RunState>,
    context: Arc<WorkerContext>,
    results: mpsc::Sender<ProbeResult>,
) {
    debug!("Worker {} started", worker_id);

    while let Some(candidate) = state.dequeue().await {
        let permitted = context.limiter.acquire(state.cancel_token()).await.is_ok();
        let url = context.target.resolve(&candidate.word);

        // Candidates dequeued before cancellation still get a result
        let result = if !permitted || state.is_cancelled() {
            ProbeResult::with_error(candidate, url, "cancelled", Duration::ZERO)
        } else {
            state.mark_sent();
            context.prober.probe(candidate, url, state.cancel_token()).await
        };

        state.mark_completed(&result);

        if results.send(result).await.is_err() {
            debug!("Worker {} lost its result receiver", worker_id);
            break;
        }
    }

    debug!("Worker {} finished", worker_id);
}

/// Lazy, finite sequence of probe results. Dropping it cancels the run.
pub struct ProbeStream {
    results: mpsc::Receiver<ProbeResult>,
    state: Arc<RunState>,
    _guard: DropGuard,
}

impl ProbeStream {
    pub fn progress(&self) -> Progress {
        self.state.progress()
    }

    pub fn cancel(&self) {
        self.state.cancel();
    }
}

impl Stream for ProbeStream {
    type Item = ProbeResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().results.poll_recv(cx)
    }
}

/// Start probing and hand back the results as they complete
pub fn run(config: &RunConfig, transport: Arc<dyn Transport>) -> Result<ProbeStream> {
    let Launched { state, results, .. } = launch(config, transport)?;
    let guard = state.cancel_token().clone().drop_guard();

    Ok(ProbeStream {
        results,
        state,
        _guard: guard,
    })
}
