//! Event lifecycle
//!
//! Status transitions driven by the clock, round generation and completion,
//! and live sessions for operators following an event.

pub mod coordinator;
pub mod dedup;
pub mod rounds;
pub mod schedule;
pub mod scheduler;
pub mod session;
pub mod transitions;

pub use coordinator::{Confirmation, EventLifecycleCoordinator, MatchesUpdate, RoundGeneration, TickOutcome, TickReport};
pub use dedup::dedup_matches;
pub use rounds::{PromptDismissal, RoundPrompt, RoundPromptTracker};
pub use schedule::{EventWindow, ScheduleParser};
pub use scheduler::{LifecycleScheduler, SchedulerHandle};
pub use session::{LiveEventSession, SessionView};
pub use transitions::{decide, Decision, Transition};
