//! A didactic microkernel core: cooperative task scheduler, bounded-queue
//! IPC, and a service registry + supervisor, built the way a small
//! privileged kernel keeps its cross-service communication to asynchronous
//! message passing between isolated tasks.
//!
//! [`Kernel`] owns every table (tasks, endpoints, service registry,
//! supervision) by value and hands out `&mut self` methods for each
//! operation; the borrow checker enforces "only touched between yields by
//! at most one logical thread" for free, with no interior mutability and no
//! lock anywhere in the table modules themselves. The one place that still
//! needs a raw, always-reachable handle to the kernel is [`singleton`]: the
//! task trampoline and the panic path run on a freshly switched-to stack
//! with no argument to thread a `&mut Kernel` through.
//!
//! Out of scope, by design: the bootstrap sequence, any console/UART
//! driver, the panic *handler* (as opposed to the panic *path* in
//! [`panic`]), the interactive shell, and the demonstration services
//! (echo/console/timer) — those are external collaborators the core only
//! touches through [`Kernel::ipc_send`]/[`Kernel::ipc_recv`] and the byte
//! sink in [`events::EventSink`].

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod bench;
pub mod cli_map;
pub mod config;
pub mod err;
pub mod events;
pub mod ipc;
pub mod panic;
pub mod registry;
pub mod singleton;
pub mod supervisor;
pub mod task;

use abi::{EndpointId, Message};

use err::KernelError;
use events::EventSink;
use ipc::{IpcTable, RingView};
use registry::ServiceRegistry;
use supervisor::{ProcessReport, Supervisor};
use task::{TaskEntry, TaskTable, TaskView};

/// The whole core's state, in one struct so ownership of "every table is
/// process-wide mutable state" is expressed as a single value rather than a
/// scatter of module-level statics.
pub struct Kernel {
    pub tasks: TaskTable,
    pub ipc: IpcTable,
    pub registry: ServiceRegistry,
    pub supervisor: Supervisor,
}

impl Kernel {
    pub const fn new() -> Kernel {
        Kernel {
            tasks: TaskTable::new(),
            ipc: IpcTable::new(),
            registry: ServiceRegistry::new(),
            supervisor: Supervisor::new(),
        }
    }

    /// Resets every table to its empty state. Intended for test isolation;
    /// a real boot never calls this more than once.
    pub fn init(&mut self) {
        self.tasks.init();
        self.ipc.init();
        self.registry.init();
        self.supervisor.init();
    }

    // -- task scheduler -----------------------------------------------

    pub fn task_create(
        &mut self,
        name: &'static str,
        entry: TaskEntry,
        arg: usize,
    ) -> Result<u32, KernelError> {
        self.tasks.create(name, entry, arg)
    }

    pub fn task_restart(&mut self, id: u32) -> Result<(), KernelError> {
        self.tasks.restart(id)
    }

    /// Switches from the current task into the scheduler. A no-op if no
    /// task is current.
    pub fn task_yield(&mut self) {
        self.tasks.yield_now()
    }

    pub fn task_exit_current(&mut self) {
        self.tasks.exit_current()
    }

    pub fn task_get_current(&self) -> Option<u32> {
        self.tasks.current()
    }

    pub fn task_view(&self, id: u32) -> Option<TaskView> {
        self.tasks.view(id)
    }

    /// Round-robin main loop: runs until no task is `RUNNABLE`.
    pub fn scheduler_run(&mut self) {
        self.tasks.run()
    }

    /// Dispatches at most one task, for callers that want to single-step
    /// the scheduler instead of running it to exhaustion.
    pub fn scheduler_run_one(&mut self) -> bool {
        self.tasks.run_one()
    }

    // -- IPC ------------------------------------------------------------

    pub fn ipc_endpoint_create(&mut self) -> Result<EndpointId, KernelError> {
        self.ipc.create()
    }

    pub fn ipc_send(&mut self, dst: EndpointId, msg: Message) -> Result<(), KernelError> {
        self.ipc.send(dst, msg)
    }

    /// Like [`Kernel::ipc_send`], but drops the message instead of
    /// returning `QueueFull` — the fan-out pattern a producer (e.g. a
    /// timer) uses so one slow subscriber cannot back-pressure the others.
    pub fn ipc_send_or_drop(&mut self, dst: EndpointId, msg: Message) {
        self.ipc.send_or_drop(dst, msg)
    }

    pub fn ipc_recv(&mut self, src: EndpointId) -> Result<Message, KernelError> {
        self.ipc.recv(src)
    }

    pub fn ipc_has_messages(&self, ep: EndpointId) -> Result<bool, KernelError> {
        self.ipc.has_messages(ep)
    }

    pub fn ipc_ring_view(&self, ep: EndpointId) -> Option<RingView> {
        self.ipc.ring_view(ep)
    }

    // -- service registry -------------------------------------------

    pub fn service_register(&mut self, name: &str, endpoint: EndpointId) -> Result<(), KernelError> {
        self.registry.register(name, endpoint)
    }

    pub fn service_lookup(&self, name: &str) -> Option<EndpointId> {
        self.registry.lookup(name)
    }

    pub fn service_list_all(&self, sink: &mut dyn FnMut(&str, EndpointId)) {
        self.registry.list_all(sink)
    }

    // -- supervisor ---------------------------------------------------

    pub fn supervisor_register_service(
        &mut self,
        task_id: u32,
        endpoint: EndpointId,
        name: &str,
    ) -> Result<(), KernelError> {
        self.supervisor.register_service(task_id, endpoint, name)
    }

    pub fn report_crash(&mut self, endpoint: EndpointId) {
        self.supervisor.report_crash(endpoint)
    }

    /// Runs one supervisor pass: drains its own endpoint, then restarts any
    /// task whose crashed flag is set.
    pub fn supervisor_process(&mut self) -> ProcessReport {
        self.supervisor.process(&mut self.ipc, &mut self.tasks)
    }

    /// The endpoint a supervised task registered itself under, if any. Used
    /// by the panic path to key a crash report by endpoint rather than
    /// task id, matching how [`Supervisor::report_crash`] looks triples up.
    pub fn supervised_endpoint_for_task(&self, task_id: u32) -> Option<EndpointId> {
        self.supervisor.endpoint_for_task(task_id)
    }

    /// Drains every subsystem's event ring into `sink`, task table first.
    pub fn dump_events(&self, sink: &mut dyn EventSink) {
        self.tasks.events.dump(sink);
        self.ipc.events.dump(sink);
        self.registry.events.dump(sink);
        self.supervisor.events.dump(sink);
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::new()
    }
}
