//! Supervisor ("monitor"): tracks supervised services and restarts them
//! after a reported crash.
//!
//! Crash detection is cooperative and explicit, not automatic fault
//! detection: a service that decides it has crashed (or the panic path, when
//! invoked from task context) calls `report_crash` itself. This is fault
//! isolation by contract, not by hardware trap.

use abi::{EndpointId, SUPERVISION_CAPACITY};

use crate::err::KernelError;
use crate::events::{EventRing, KernelEvent};
use crate::registry::ServiceName;
use crate::task::TaskTable;

#[derive(Copy, Clone)]
struct Supervised {
    task_id: u32,
    endpoint: EndpointId,
    name: ServiceName,
    active: bool,
    crashed: bool,
}

impl Supervised {
    const fn empty() -> Supervised {
        Supervised {
            task_id: 0,
            endpoint: EndpointId::INVALID,
            name: ServiceName::empty(),
            active: false,
            crashed: false,
        }
    }
}

/// Outcome of one `process()` pass, for callers that want to assert on it
/// instead of re-deriving it from table state.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ProcessReport {
    pub restarted: u32,
    pub restart_failed: u32,
}

pub struct Supervisor {
    table: [Supervised; SUPERVISION_CAPACITY],
    own_endpoint: Option<EndpointId>,
    pub events: EventRing,
}

impl Supervisor {
    pub const fn new() -> Supervisor {
        Supervisor {
            table: [Supervised::empty(); SUPERVISION_CAPACITY],
            own_endpoint: None,
            events: EventRing::new(),
        }
    }

    pub fn init(&mut self) {
        *self = Supervisor::new();
    }

    pub fn set_own_endpoint(&mut self, ep: EndpointId) {
        self.own_endpoint = Some(ep);
    }

    pub fn own_endpoint(&self) -> Option<EndpointId> {
        self.own_endpoint
    }

    /// Records a supervision triple. Not idempotent by name: re-registering
    /// the same service under a new task id consumes a fresh slot exactly
    /// like the service registry does.
    pub fn register_service(
        &mut self,
        task_id: u32,
        endpoint: EndpointId,
        name: &str,
    ) -> Result<(), KernelError> {
        let slot = self
            .table
            .iter_mut()
            .find(|s| !s.active)
            .ok_or(KernelError::SupervisionFull)?;
        slot.task_id = task_id;
        slot.endpoint = endpoint;
        slot.name = ServiceName::new(name);
        slot.active = true;
        slot.crashed = false;
        Ok(())
    }

    /// Raises the crashed flag for whichever active triple matches
    /// `endpoint`. A report against an endpoint nobody supervises is
    /// silently ignored — there is no error return for that case in the
    /// source, and there is nothing useful a caller could do with one.
    pub fn report_crash(&mut self, endpoint: EndpointId) {
        if let Some(entry) = self
            .table
            .iter_mut()
            .find(|s| s.active && s.endpoint == endpoint)
        {
            entry.crashed = true;
            self.events.push(KernelEvent::CrashReported { endpoint: endpoint.0 });
        }
    }

    /// Drains the supervisor's own endpoint (reserved for future heartbeat
    /// messages; their contents are ignored today), then scans for crashed
    /// services and attempts to restart each. Restart bounding is
    /// deliberately absent: a repeatedly crashing service is restarted every
    /// pass, forever.
    pub fn process(
        &mut self,
        ipc: &mut crate::ipc::IpcTable,
        tasks: &mut TaskTable,
    ) -> ProcessReport {
        if let Some(ep) = self.own_endpoint {
            while ipc.recv(ep).is_ok() {}
        }

        let mut report = ProcessReport::default();
        for slot in self.table.iter_mut().filter(|s| s.active && s.crashed) {
            match tasks.restart(slot.task_id) {
                Ok(()) => {
                    slot.crashed = false;
                    report.restarted += 1;
                }
                Err(_) => {
                    self.events.push(KernelEvent::TaskRestartFailed { id: slot.task_id });
                    report.restart_failed += 1;
                }
            }
        }
        report
    }

    pub fn is_crashed(&self, endpoint: EndpointId) -> bool {
        self.table
            .iter()
            .any(|s| s.active && s.endpoint == endpoint && s.crashed)
    }

    /// The endpoint registered for `task_id`, if any active triple names it.
    /// Used by the panic path, which only has a task id in hand, to find
    /// the endpoint `report_crash` keys its scan by.
    pub fn endpoint_for_task(&self, task_id: u32) -> Option<EndpointId> {
        self.table
            .iter()
            .find(|s| s.active && s.task_id == task_id)
            .map(|s| s.endpoint)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Supervisor::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::IpcTable;

    fn noop(_: usize) {}

    #[test]
    fn report_crash_raises_flag_for_matching_endpoint() {
        let mut sup = Supervisor::new();
        sup.register_service(0, EndpointId(4), "echo").unwrap();
        sup.report_crash(EndpointId(4));
        assert!(sup.is_crashed(EndpointId(4)));
    }

    #[test]
    fn report_crash_against_unknown_endpoint_is_ignored() {
        let mut sup = Supervisor::new();
        sup.register_service(0, EndpointId(4), "echo").unwrap();
        sup.report_crash(EndpointId(99));
        assert!(!sup.is_crashed(EndpointId(4)));
    }

    #[test]
    fn process_restarts_crashed_service_and_clears_flag() {
        let mut sup = Supervisor::new();
        let mut ipc = IpcTable::new();
        let mut tasks = TaskTable::new();
        let id = tasks.create("echo", noop, 0).unwrap();
        let ep = ipc.create().unwrap();
        sup.register_service(id, ep, "echo").unwrap();
        sup.report_crash(ep);

        let report = sup.process(&mut ipc, &mut tasks);
        assert_eq!(report.restarted, 1);
        assert!(!sup.is_crashed(ep));
    }

    #[test]
    fn endpoint_for_task_finds_the_registered_triple() {
        let mut sup = Supervisor::new();
        sup.register_service(2, EndpointId(7), "echo").unwrap();
        assert_eq!(sup.endpoint_for_task(2), Some(EndpointId(7)));
        assert_eq!(sup.endpoint_for_task(3), None);
    }

    #[test]
    fn process_leaves_flag_set_on_restart_failure() {
        let mut sup = Supervisor::new();
        let mut ipc = IpcTable::new();
        let mut tasks = TaskTable::new();
        // task id 0 was never created, so entry is None and restart fails.
        sup.register_service(0, EndpointId(0), "ghost").unwrap();
        sup.report_crash(EndpointId(0));

        let report = sup.process(&mut ipc, &mut tasks);
        assert_eq!(report.restart_failed, 1);
        assert!(sup.is_crashed(EndpointId(0)));
    }

    #[test]
    fn process_logs_a_restart_failure_event() {
        let mut sup = Supervisor::new();
        let mut ipc = IpcTable::new();
        let mut tasks = TaskTable::new();
        sup.register_service(3, EndpointId(0), "ghost").unwrap();
        sup.report_crash(EndpointId(0));

        sup.process(&mut ipc, &mut tasks);
        assert_eq!(sup.events.last(), Some(KernelEvent::TaskRestartFailed { id: 3 }));
    }
}
