//! Unified error taxonomy.
//!
//! Every fallible core operation returns `Result<T, KernelError>` rather than
//! a raw sentinel. `KERNEL_PANIC`/`TASK_PANIC` are deliberately not variants
//! here: they are the two branches of the panic path (see [`crate::panic`])
//! and are never handed back through a `Result`.

use core::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KernelError {
    /// Endpoint id out of range, or the slot is not active.
    InvalidEndpoint,
    /// Destination ring was already at capacity; nothing was enqueued.
    QueueFull,
    /// Source ring had nothing to dequeue.
    QueueEmpty,
    /// No free task slot remained for `task_create`.
    TaskSlotExhausted,
    /// `task_restart` was asked to restart a slot with no recorded entry
    /// point, or that slot could not be prepared again.
    RestartFailed,
    /// No free slot remained in the service registry.
    RegistryFull,
    /// No free slot remained in the supervision table.
    SupervisionFull,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::InvalidEndpoint => "invalid endpoint",
            KernelError::QueueFull => "queue full",
            KernelError::QueueEmpty => "queue empty",
            KernelError::TaskSlotExhausted => "no free task slot",
            KernelError::RestartFailed => "task restart failed",
            KernelError::RegistryFull => "service registry full",
            KernelError::SupervisionFull => "supervision table full",
        };
        f.write_str(msg)
    }
}
