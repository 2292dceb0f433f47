//! Panic path: the one entry point for "something went wrong", branching on
//! whether a task was executing when it happened.
//!
//! Two outcomes, chosen by `task_get_current`, never duplicated:
//! - no task current: kernel fault, halt permanently.
//! - a task is current: that task alone terminates; the scheduler continues
//!   with whatever else is runnable.

use crate::events::{EventSink, KernelEvent};
use crate::Kernel;

/// What the panic path actually did, so callers (tests, the host build)
/// can tell the two branches apart without re-deriving it from table state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PanicOutcome {
    /// No task was current: this is a kernel fault. On real hardware the
    /// caller halts forever; the host build returns instead so a test can
    /// observe the outcome.
    KernelHalt,
    /// A task was current; it has been marked `FINISHED` and the caller
    /// must still yield to let the scheduler reclaim the CPU.
    TaskTerminated { id: u32 },
}

/// Reports `message` to `sink` and resolves the panic according to whether a
/// task is current in `kernel`.
///
/// On `TaskTerminated`, the caller (normally the panic macro's own unwind
/// shim, or a service's crash handler) is expected to call
/// [`crate::task_yield`] immediately after, in a loop that never returns —
/// this function only performs the state transition, it does not loop.
pub fn kernel_panic(kernel: &mut Kernel, message: &str, sink: &mut dyn EventSink) -> PanicOutcome {
    sink.log(message);
    match kernel.tasks.current() {
        None => {
            sink.accept(KernelEvent::KernelHalted);
            PanicOutcome::KernelHalt
        }
        Some(id) => {
            kernel.tasks.exit_current();
            kernel.supervisor.report_crash(current_task_endpoint(kernel, id));
            sink.accept(KernelEvent::TaskPanicked { id });
            PanicOutcome::TaskTerminated { id }
        }
    }
}

/// The supervisor keys crash reports by endpoint, not task id, so the panic
/// path looks up whichever endpoint the crashing task registered itself
/// under (if any) before reporting the crash. A task with no supervised
/// endpoint simply terminates without a restart ever being attempted.
fn current_task_endpoint(kernel: &Kernel, id: u32) -> abi::EndpointId {
    kernel
        .supervised_endpoint_for_task(id)
        .unwrap_or(abi::EndpointId::INVALID)
}
