pub mod dispatcher;
pub mod job;
pub mod window;

pub use dispatcher::{FailureReport, JobScheduler, RunReport, StepOutcome};
pub use job::{Job, JobState, Task};
pub use window::{JobCounts, TrackedWindow};
