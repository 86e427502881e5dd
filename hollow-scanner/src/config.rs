use crate::error::{Result, ScanError};
use crate::limiter::{MAX_INTERVAL, RateLimit};
use crate::probe::ProbeMethod;
use std::time::Duration;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a run needs, fixed for the run's lifetime
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    pub concurrency: usize,
    pub rate: RateLimit,
    pub timeout: Duration,
    pub wordlist: Vec<String>,
    pub method: ProbeMethod,
    pub ignore_status: Vec<u16>,
}

impl RunConfig {
    pub fn new(base_url: impl Into<String>, wordlist: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            concurrency: DEFAULT_CONCURRENCY,
            rate: RateLimit::Unlimited,
            timeout: DEFAULT_TIMEOUT,
            wordlist,
            method: ProbeMethod::Head,
            ignore_status: Vec::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rate(mut self, rate: RateLimit) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_method(mut self, method: ProbeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_ignore_status(mut self, codes: Vec<u16>) -> Self {
        self.ignore_status = codes;
        self
    }

    /// Reject values no run can start with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "probe timeout must be greater than zero".to_string(),
            ));
        }

        if let Some(interval) = self.rate.interval().filter(|i| *i > MAX_INTERVAL) {
            return Err(ScanError::InvalidConfig(format!(
                "request interval {:?} exceeds {:?}",
                interval, MAX_INTERVAL
            )));
        }

        if let Some(code) = self
            .ignore_status
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(ScanError::InvalidConfig(format!(
                "{} is not an HTTP status code",
                code
            )));
        }

        Ok(())
    }
}
