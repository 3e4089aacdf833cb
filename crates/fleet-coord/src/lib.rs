//! `fleet-coord`: the allocation coordinator.
//!
//! # Round lifecycle
//!
//! ```text
//! tick ─► idle ──start──► awaitingProposals ──all responded / deadline──► evaluating ─► idle
//!                              │                                              │
//!                        CFP to every vehicle                  Assignment to the winner,
//!                                                              Rejection to the rest
//! ```
//!
//! [`CoordinatorCore`] is the synchronous state machine; it takes the
//! current `Instant` as an argument so tests drive it directly.
//! [`Coordinator`] wraps it in an actor loop with the round timer and the
//! response deadline.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                |
//! |-----------------|---------------------------------------------------------|
//! | [`task`]        | `Task`, `TaskState`, `ActiveAssignment`                 |
//! | [`round`]       | `Round`, `Award`, proposal evaluation                   |
//! | [`coordinator`] | `CoordinatorCore`, `Coordinator` actor, `TickOutcome`   |
//! | [`builder`]     | `CoordinatorBuilder`, destination defaults              |
//! | [`observer`]    | `CoordinatorObserver` callbacks, `NoopObserver`         |
//! | [`metrics`]     | `AllocationMetrics`, Gini fairness, `MetricsSummary`    |
//! | [`error`]       | `CoordError`, `CoordResult<T>`                          |

pub mod builder;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod round;
pub mod task;


pub use builder::CoordinatorBuilder;
pub use coordinator::{Coordinator, CoordinatorCore, TickOutcome};
pub use error::{CoordError, CoordResult};
pub use metrics::{AllocationMetrics, MetricsSummary};
pub use observer::{CoordinatorObserver, NoopObserver};
pub use round::{evaluate, Award, Round, RoundPhase};
pub use task::{ActiveAssignment, Task, TaskState};
