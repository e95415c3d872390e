//! Pipeline entry points for the bot.
//!
//! - `PollCycle`: fetch news, dedup, announce
//! - `TickCycle`: time-of-day alerts
//! - `Scheduler`: runs both on their own cadence

pub mod gate;
pub mod poll;
pub mod scheduler;
pub mod tick;

pub use gate::BootstrapGate;
pub use poll::{PollCycle, PollReport, SourceOutcome};
pub use scheduler::{Scheduler, SchedulerHandle, run_guarded, run_periodic};
pub use tick::{AlertSchedule, TickCycle, due_alerts};
