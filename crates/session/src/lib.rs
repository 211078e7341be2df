//! Session lifecycle for Kuteera Kitchen front ends
//!
//! An [`AuthContext`] holds who is signed in. Route guards populate it from
//! the backend before a page renders, and the [`SessionScheduler`] warns
//! before the access token expires and signs the user out when it does.

pub mod context;
pub mod error;
pub mod guard;
pub mod routes;
pub mod scheduler;
pub mod shell;
pub mod timer;

pub use context::{AuthAction, AuthContext, AuthState};
pub use error::SessionError;
pub use guard::{AdminGuard, CustomerGuard, GuardOutcome};
pub use routes::{RouteDecision, RouteRules};
pub use scheduler::{
    Clock, LogoutReason, SchedulerState, SessionEvent, SessionScheduler, SystemClock,
};
pub use shell::AdminShell;
pub use timer::{TimerHandle, Timers};
