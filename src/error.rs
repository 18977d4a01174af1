use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ProcmillError {
    #[error("invalid job range: start {start}, end {end}, but {queued} jobs queued")]
    InvalidRange {
        start: usize,
        end: usize,
        queued: usize,
    },

    #[error("job {0} has already been started")]
    AlreadyStarted(Uuid),

    #[error("cannot clear jobs: {0} still running")]
    JobsStillRunning(usize),
}

pub type Result<T> = std::result::Result<T, ProcmillError>;
