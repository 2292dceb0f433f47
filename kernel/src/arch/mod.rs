//! The one architecture-coupled primitive: saving and restoring a stack.
//!
//! Everything else in this crate is portable `core`. This module is kept
//! deliberately tiny so an implementation for a second target is a small,
//! reviewable diff rather than a rewrite.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use self::x86_64::{ctx_switch, prepare_stack};
    } else {
        compile_error!("kernel: no ctx_switch primitive for this target architecture");
    }
}
