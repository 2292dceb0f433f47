//! Compile-time capacity constants.
//!
//! Collected in one place so a reader auditing a capacity assumption (ring
//! depth, table size, stack footprint) has exactly one module to check,
//! rather than a scatter of magic numbers through the table modules.

pub use abi::{
    IPC_QUEUE_DEPTH, MAX_ENDPOINTS, MAX_PAYLOAD, MAX_TASKS, SERVICE_NAME_CAPACITY,
    SERVICE_REGISTRY_CAPACITY, SUPERVISION_CAPACITY, TASK_STACK_BYTES,
};

/// Number of entries kept in each subsystem's event ring buffer.
///
/// Deliberately small: the ring buffer is for "what just happened"
/// post-mortem inspection, not an audit log, so overwrite-oldest at this
/// depth is plenty for one scheduler round or one test scenario.
pub const EVENT_RING_DEPTH: usize = 32;
