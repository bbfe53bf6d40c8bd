mod runner;
pub mod timekey;

pub use runner::{Clock, Scheduler, SchedulerHandle, TickOutcome};
