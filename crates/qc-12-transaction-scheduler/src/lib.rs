//! # QC-12: Transaction Scheduler Subsystem
//!
//! Dependency-aware scheduling of a batch of contract transactions onto a
//! pool of worker threads. Transactions that share an application, an
//! account or a memory region are ordered by batch position; everything else
//! may run concurrently.
//!
//! ## Architecture
//!
//! - **Domain**: Core entities (DependencyGraph, DependencyNode, ExecutionSchedule)
//! - **Algorithms**: Conflict detection, dependency building, Kahn's sort
//! - **Application**: Ready queue and the concurrent [`Scheduler`]
//! - **Ports**: Inbound ([`TransactionScheduler`])
//!
//! ## Lifecycle of a node
//!
//! | State     | Entered when                                   |
//! |-----------|------------------------------------------------|
//! | `Pending` | Node created with unresolved predecessors      |
//! | `Ready`   | Last predecessor completed (or none existed)   |
//! | `Running` | Handed to a worker by `next_transaction`       |
//! | `Retired` | Result submitted; payload dropped              |

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use algorithms::{build_dependency_graph, detect_conflicts, kahns_topological_sort};
pub use application::{ReadyQueue, Scheduler};
pub use config::SchedulerConfig;
pub use domain::entities::*;
pub use domain::errors::SchedulerError;
pub use domain::value_objects::*;
pub use ports::inbound::TransactionScheduler;
