//! Task table and cooperative round-robin scheduler.
//!
//! Every cross-task reference in this module is a small integer index into
//! [`TaskTable::slots`]; there are no pointers between tasks. The table owns
//! the object, everyone else holds an id.

use crate::arch;
use crate::config::{MAX_TASKS, TASK_STACK_BYTES};
use crate::err::KernelError;
use crate::events::{EventRing, KernelEvent};

/// A task's entry point. Takes the opaque argument handed to `task_create`
/// and returns normally when the task is done; the trampoline turns a normal
/// return into `task_exit_current` plus a terminal yield.
pub type TaskEntry = fn(usize);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    Unused,
    Runnable,
    Finished,
}

#[derive(Copy, Clone)]
#[repr(align(16))]
struct TaskStack([u8; TASK_STACK_BYTES]);

impl TaskStack {
    const fn new() -> TaskStack {
        TaskStack([0u8; TASK_STACK_BYTES])
    }
}

#[derive(Copy, Clone)]
struct TaskSlot {
    name: Option<&'static str>,
    entry: Option<TaskEntry>,
    arg: usize,
    sp: usize,
    state: TaskState,
}

impl TaskSlot {
    const fn empty() -> TaskSlot {
        TaskSlot {
            name: None,
            entry: None,
            arg: 0,
            sp: 0,
            state: TaskState::Unused,
        }
    }
}

/// A read-only snapshot of one task slot, handed out to callers (tests,
/// the supervisor, the CLI adapter) that need to inspect state without
/// reaching into private fields.
#[derive(Copy, Clone, Debug)]
pub struct TaskView {
    pub name: Option<&'static str>,
    pub state: TaskState,
    pub sp: usize,
}

pub struct TaskTable {
    slots: [TaskSlot; MAX_TASKS],
    stacks: [TaskStack; MAX_TASKS],
    scheduler_sp: usize,
    current: i32,
    last: i32,
    pub events: EventRing,
}

impl TaskTable {
    pub const fn new() -> TaskTable {
        TaskTable {
            slots: [TaskSlot::empty(); MAX_TASKS],
            stacks: [TaskStack::new(); MAX_TASKS],
            scheduler_sp: 0,
            current: -1,
            last: -1,
            events: EventRing::new(),
        }
    }

    /// Resets all slots to `UNUSED`, clears the scheduler's saved stack
    /// pointer, and sets "current task" to "no task".
    pub fn init(&mut self) {
        *self = TaskTable::new();
    }

    pub fn view(&self, id: u32) -> Option<TaskView> {
        self.slots.get(id as usize).map(|s| TaskView {
            name: s.name,
            state: s.state,
            sp: s.sp,
        })
    }

    /// Finds the first `UNUSED` slot and prepares it to run `entry(arg)`.
    pub fn create(
        &mut self,
        name: &'static str,
        entry: TaskEntry,
        arg: usize,
    ) -> Result<u32, KernelError> {
        let idx = self
            .slots
            .iter()
            .position(|t| t.state == TaskState::Unused)
            .ok_or(KernelError::TaskSlotExhausted)?;
        self.prepare_slot(idx, name, entry, arg);
        self.events.push(KernelEvent::TaskCreated { id: idx as u32 });
        Ok(idx as u32)
    }

    /// Re-prepares slot `id`'s stack exactly as `create` did and sets its
    /// state back to `RUNNABLE`. Requires the slot to still have a recorded
    /// `entry`; does not clear `name`/`entry`/`arg` on success or failure.
    pub fn restart(&mut self, id: u32) -> Result<(), KernelError> {
        let idx = id as usize;
        if idx >= MAX_TASKS {
            return Err(KernelError::RestartFailed);
        }
        let (name, entry, arg) = {
            let slot = &self.slots[idx];
            let entry = slot.entry.ok_or(KernelError::RestartFailed)?;
            (slot.name.unwrap_or(""), entry, slot.arg)
        };
        self.prepare_slot(idx, name, entry, arg);
        self.events.push(KernelEvent::TaskRestarted { id: id });
        Ok(())
    }

    fn prepare_slot(&mut self, idx: usize, name: &'static str, entry: TaskEntry, arg: usize) {
        let stack_base = self.stacks[idx].0.as_mut_ptr() as usize;
        let stack_top = (stack_base + TASK_STACK_BYTES) & !0xF;
        // Safety: `stack_top` is the address one past this slot's own stack
        // region, masked to 16-byte alignment, and that region is not in use
        // (the slot is either UNUSED or about to be reset by a restart).
        let sp = unsafe { arch::prepare_stack(stack_top, task_trampoline as usize) };
        let slot = &mut self.slots[idx];
        slot.name = Some(name);
        slot.entry = Some(entry);
        slot.arg = arg;
        slot.sp = sp;
        slot.state = TaskState::Runnable;
    }

    /// If a task is current, switches from it into the scheduler. A no-op
    /// otherwise. Does not change the yielding task's state.
    pub fn yield_now(&mut self) {
        if self.current < 0 {
            return;
        }
        let cur = self.current as usize;
        let old_sp = &mut self.slots[cur].sp as *mut usize;
        let new_sp = self.scheduler_sp;
        // Safety: both stack pointers were prepared by this module and
        // belong to the scheduler/task pair currently swapping places.
        unsafe { arch::ctx_switch(old_sp, new_sp) };
    }

    /// Marks the current task `FINISHED`. The caller must still yield; this
    /// slot will never be re-entered by the scheduler until `restart`.
    pub fn exit_current(&mut self) {
        if self.current < 0 {
            return;
        }
        let cur = self.current as usize;
        self.slots[cur].state = TaskState::Finished;
        self.events.push(KernelEvent::TaskFinished { id: cur as u32 });
    }

    pub fn current(&self) -> Option<u32> {
        if self.current < 0 {
            None
        } else {
            Some(self.current as u32)
        }
    }

    fn pick_next(&self) -> Option<usize> {
        let start = (self.last + 1).rem_euclid(MAX_TASKS as i32) as usize;
        (0..MAX_TASKS)
            .map(|i| (start + i) % MAX_TASKS)
            .find(|&idx| self.slots[idx].state == TaskState::Runnable)
    }

    /// Round-robin main loop: repeatedly dispatches the next `RUNNABLE` task
    /// after `last`, wrapping around the table, until none remain.
    ///
    /// On `FINISHED`, the slot's `name`/`entry`/`arg` are retained (not
    /// cleared) so a supervisor's `restart` remains possible; the slot is
    /// simply left out of future dispatch until it is.
    pub fn run(&mut self) {
        loop {
            let next = match self.pick_next() {
                Some(n) => n,
                None => break,
            };
            self.current = next as i32;
            self.last = next as i32;
            let new_sp = self.slots[next].sp;
            let old_sp = &mut self.scheduler_sp as *mut usize;
            // Safety: `new_sp` is either a freshly prepared stack or one this
            // same loop previously handed off and got back via `yield_now`.
            unsafe { arch::ctx_switch(old_sp, new_sp) };
        }
    }

    /// Single dispatch step, for callers (tests, scenario harnesses) that
    /// want to drive the scheduler one task at a time instead of running it
    /// to exhaustion. Returns `false` if no task was runnable.
    pub fn run_one(&mut self) -> bool {
        let next = match self.pick_next() {
            Some(n) => n,
            None => return false,
        };
        self.current = next as i32;
        self.last = next as i32;
        let new_sp = self.slots[next].sp;
        let old_sp = &mut self.scheduler_sp as *mut usize;
        unsafe { arch::ctx_switch(old_sp, new_sp) };
        true
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        TaskTable::new()
    }
}

/// Landing pad for the first `ctx_switch` into a freshly prepared task
/// stack. Reads `current` off the installed kernel singleton, invokes the
/// task's `entry`, and on return funnels into `exit_current` followed by an
/// unreachable yield loop. A null `entry` here is a fatal condition, since it
/// means a task slot was switched into without ever being prepared.
extern "C" fn task_trampoline() -> ! {
    let kernel = crate::singleton::current();
    let id = kernel
        .tasks
        .current()
        .expect("task_trampoline entered with no current task") as usize;
    let (entry, arg) = {
        let slot = &kernel.tasks.slots[id];
        (
            slot.entry.expect("task_trampoline: null entry point"),
            slot.arg,
        )
    };
    entry(arg);
    kernel.tasks.exit_current();
    loop {
        kernel.tasks.yield_now();
    }
}
