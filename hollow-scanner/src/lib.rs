pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod limiter;
pub mod pool;
pub mod probe;
pub mod resolver;
pub mod result;

pub use aggregator::{Aggregator, Snapshot};
pub use config::RunConfig;
pub use controller::{Canceller, ResultFeed, RunController, RunHandle};
pub use error::{Cancelled, ScanError};
pub use limiter::{RateLimit, RateLimiter};
pub use pool::{ProbeStream, Progress, RunState, run};
pub use probe::{Classifier, ProbeMethod, Prober, ReqwestTransport, Transport, TransportError};
pub use resolver::{Target, resolve};
pub use result::{Candidate, ProbeResult, ProbeStatus};
