//! x86_64 (System V AMD64) context switch.
//!
//! Callee-saved integer registers under this ABI are `rbx`, `rbp`,
//! `r12`-`r15`; the return address lives at `[rsp]` on entry and is handled
//! by ordinary `call`/`ret`, so it doesn't need an explicit save/restore
//! instruction of its own. No FPU/vector state is touched: tasks in this
//! kernel never use floating point, so there is nothing there to preserve.

core::arch::global_asm!(
    ".global kernel_ctx_switch_asm",
    "kernel_ctx_switch_asm:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
);

extern "C" {
    fn kernel_ctx_switch_asm(old_sp: *mut usize, new_sp: usize);
}

/// Saves the current callee-saved registers and stack pointer to `*old_sp`,
/// then loads `new_sp` and resumes there.
///
/// # Safety
///
/// `new_sp` must point into a stack region prepared by [`prepare_stack`] (or
/// be the stack pointer a previous call to this function saved into
/// `*old_sp` for that same stack), and `old_sp` must be valid to write
/// through. Calling this with an unprepared or already-in-use stack
/// corrupts memory.
pub unsafe fn ctx_switch(old_sp: *mut usize, new_sp: usize) {
    kernel_ctx_switch_asm(old_sp, new_sp);
}

/// Number of words [`prepare_stack`] reserves below `stack_top`: six
/// callee-saved registers, one return address, and one padding word so the
/// resulting stack pointer stays 16-byte aligned (6 regs + 1 return address
/// is 56 bytes, not a multiple of 16; the pad rounds that up to 64).
const FRAME_WORDS: usize = 8;

/// Lays out a fresh task stack so that the first [`ctx_switch`] into it
/// "returns" into `trampoline`.
///
/// `stack_top` must already be 16-byte aligned and must be the address one
/// past the end of the stack region (i.e. `base + stack_len`). Returns the
/// stack pointer to record as the task's saved `sp`.
///
/// # Safety
///
/// The `FRAME_WORDS * 8` bytes below `stack_top` must be within the task's
/// stack region and not otherwise in use.
pub unsafe fn prepare_stack(stack_top: usize, trampoline: usize) -> usize {
    debug_assert!(stack_top % 16 == 0, "stack_top must be 16-byte aligned");
    let frame = stack_top as *mut usize;
    // Word layout, highest address first (mirrors push order so the first
    // `ctx_switch` pop sequence reads back zeros for every callee-saved
    // register, then returns into `trampoline`):
    //   [-1] padding (alignment only, value irrelevant)
    //   [-2] return address == trampoline
    //   [-3] rbp = 0
    //   [-4] rbx = 0
    //   [-5] r12 = 0
    //   [-6] r13 = 0
    //   [-7] r14 = 0
    //   [-8] r15 = 0   <- stack pointer after preparation
    frame.offset(-1).write(0);
    frame.offset(-2).write(trampoline);
    for slot in 3..=FRAME_WORDS {
        frame.offset(-(slot as isize)).write(0);
    }
    stack_top - FRAME_WORDS * core::mem::size_of::<usize>()
}
