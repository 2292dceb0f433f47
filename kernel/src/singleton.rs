//! The one raw, always-reachable handle to the kernel's state.
//!
//! Every other module reaches the tables through an explicit `&mut Kernel`
//! argument, so the borrow checker is the thing enforcing "only touched
//! between yields by at most one logical thread". Two call sites can't play
//! along: the task trampoline ([`crate::task`]) and the panic path, both of
//! which are entered by a raw stack switch with no argument to carry a
//! reference through. They reach the kernel here instead, mirroring how the
//! teacher's own startup code stashes a raw pointer to the task table for
//! architecture code to find.

use crate::Kernel;
use core::cell::UnsafeCell;

struct KernelCell(UnsafeCell<Kernel>);

// Safety: the single-threaded cooperative scheduler is the only caller of
// `current()`, and it only ever calls in from the trampoline or the panic
// path, both of which run strictly between yields — never concurrently with
// another access to this cell.
unsafe impl Sync for KernelCell {}

static KERNEL: KernelCell = KernelCell(UnsafeCell::new(Kernel::new()));

/// Borrows the process-wide kernel singleton.
///
/// # Safety (discipline, not a compiler-checked contract)
///
/// This is safe to call from any single-threaded, cooperatively scheduled
/// context, which on this target means: the task trampoline, the panic
/// path, or a test driving the scheduler directly. It must never be called
/// from two places "at once" in the sense of one holding a `&mut Kernel`
/// across a `ctx_switch` into the other — both of this crate's real call
/// sites take the reference, do their work, and drop it before yielding.
pub fn current() -> &'static mut Kernel {
    // Safety: see above; exactly one logical thread of control ever holds
    // this reference at a time under the cooperative-scheduling invariant.
    unsafe { &mut *KERNEL.0.get() }
}

/// Serializes test access to the one process-wide singleton.
///
/// `cargo test` runs `#[test]` functions from the same binary concurrently
/// by default; every unit test elsewhere in this crate that touches
/// `current()` (rather than a throwaway local `Kernel::new()`) takes this
/// lock first so two tests never interleave stack switches on the same
/// kernel.
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
