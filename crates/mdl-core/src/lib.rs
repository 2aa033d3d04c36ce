pub mod config;
pub mod logging;

pub mod control;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod http;
pub mod probe;
pub mod retry;
mod sampler;
pub mod scheduler;
pub mod segmenter;
pub mod storage;
pub mod task;

pub use config::MdlConfig;
pub use error::DownloadError;
pub use scheduler::Scheduler;
pub use task::{ProgressEvent, ProgressFn, TaskHandle, TaskStatus, TransferKind};
