//! Background download job engine.
//!
//! This crate provides:
//! - [`JobStore`]: the in-memory table of download jobs
//! - [`JobEngine`]: job submission and the background fetch/encode lifecycle
//!   with timeout racing and partial-output cleanup
//! - [`Reaper`]: periodic removal of aged output files and settled jobs

pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod reaper;
pub mod store;

pub use engine::{DownloadRequest, EngineConfig, JobEngine, SubmittedJob, DEFAULT_JOB_TIMEOUT};
pub use error::{JobError, JobFailure, JobResult};
pub use logging::JobLogger;
pub use reaper::{Reaper, ReaperConfig, SweepReport};
pub use store::JobStore;
