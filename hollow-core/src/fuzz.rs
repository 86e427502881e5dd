// Fuzz sessions: forced browsing of one host with a wordlist

use crate::wordlist::with_directory_variants;
use anyhow::{Context, Result};
use futures::StreamExt;
use hollow_scanner::{
    Canceller, ProbeMethod, ProbeResult, RateLimit, ReqwestTransport, RunConfig, RunController,
    RunHandle, Snapshot, Transport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options for configuring a fuzz operation
#[derive(Debug, Clone)]
pub struct FuzzOptions {
    pub base_url: String,
    pub wordlist: Vec<String>,
    pub threads: usize,
    pub rate: RateLimit,
    pub timeout: Duration,
    pub method: ProbeMethod,
    pub ignore_status: Vec<u16>,
    /// Also probe `word/` for every word
    pub directory_variants: bool,
    pub show_progress_bars: bool,
}

impl FuzzOptions {
    pub fn new(base_url: impl Into<String>, wordlist: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            wordlist,
            threads: hollow_scanner::config::DEFAULT_CONCURRENCY,
            rate: RateLimit::Unlimited,
            timeout: hollow_scanner::config::DEFAULT_TIMEOUT,
            method: ProbeMethod::Head,
            ignore_status: Vec::new(),
            directory_variants: false,
            show_progress_bars: false,
        }
    }

    fn run_config(&self) -> RunConfig {
        let wordlist = if self.directory_variants {
            with_directory_variants(&self.wordlist)
        } else {
            self.wordlist.clone()
        };

        RunConfig::new(self.base_url.clone(), wordlist)
            .with_concurrency(self.threads)
            .with_rate(self.rate)
            .with_timeout(self.timeout)
            .with_method(self.method)
            .with_ignore_status(self.ignore_status.clone())
    }
}

/// Called for every found path as soon as it is recorded
pub type FuzzResultCallback = Arc<dyn Fn(&ProbeResult) + Send + Sync>;

/// A started fuzz run
pub struct FuzzSession {
    handle: RunHandle,
    progress_bar: Option<ProgressBar>,
}

impl FuzzSession {
    /// Start fuzzing over HTTP
    pub fn start(options: FuzzOptions) -> Result<Self> {
        let transport = ReqwestTransport::new(options.timeout)
            .context("Failed to create HTTP client")?;
        Self::with_transport(options, Arc::new(transport))
    }

    pub fn with_transport(options: FuzzOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        let handle = RunController::start(options.run_config(), transport)
            .with_context(|| format!("Cannot fuzz {}", options.base_url))?;

        let total = handle.progress().total;
        info!("Fuzzing {} with {} candidates", options.base_url, total);

        let progress_bar = if options.show_progress_bars {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("=>-"),
            );
            pb.set_message("0 found");
            Some(pb)
        } else {
            None
        };

        Ok(Self {
            handle,
            progress_bar,
        })
    }

    pub fn canceller(&self) -> Canceller {
        self.handle.canceller()
    }

    /// Drive the run to completion (or cancellation) and return the final snapshot
    pub async fn finish(mut self, on_found: Option<FuzzResultCallback>) -> Result<Snapshot> {
        if let Some(mut feed) = self.handle.results() {
            let mut found = 0usize;
            while let Some(result) = feed.next().await {
                if result.is_found() {
                    found += 1;
                    if let Some(ref callback) = on_found {
                        match self.progress_bar {
                            Some(ref pb) => pb.suspend(|| callback(&result)),
                            None => callback(&result),
                        }
                    }
                }

                if let Some(ref pb) = self.progress_bar {
                    pb.inc(1);
                    pb.set_message(format!("{} found", found));
                }
            }
        }

        let snapshot = self.handle.wait().await.context("Fuzz workers failed")?;

        if let Some(ref pb) = self.progress_bar {
            if snapshot.cancelled {
                pb.abandon_with_message(format!("interrupted, {} found", snapshot.found.len()));
            } else {
                pb.finish_with_message(format!("done, {} found", snapshot.found.len()));
            }
        }

        Ok(snapshot)
    }
}

/// Execute fuzzing with given options
pub async fn execute_fuzz(options: FuzzOptions, on_found: Option<FuzzResultCallback>) -> Result<Snapshot> {
    FuzzSession::start(options)?.finish(on_found).await
}
