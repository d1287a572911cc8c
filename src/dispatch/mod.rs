//! Request dispatch
//!
//! Registry, FIFO queue, worker pool, execution units and the result
//! store that callers rendezvous on.

pub mod execution;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod store;

pub use execution::{execute, flatten_outcome, ExecutionContext, ExecutionOutcome};
pub use pool::{generate_agent_id, spawn_eviction_task, WorkerPool};
pub use queue::TaskQueue;
pub use registry::AgentRegistry;
pub use store::{ResultStore, WaitOutcome};
