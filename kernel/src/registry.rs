//! Service registry: a flat name → endpoint lookup table.
//!
//! Linear scan over a small fixed array, exactly as the source does it.
//! Duplicate names are not rejected — `register` always consumes a new slot
//! if one is free, and `lookup` returns the first match in scan order, so
//! callers are responsible for keeping names unique if they care.

use abi::{EndpointId, SERVICE_NAME_CAPACITY, SERVICE_REGISTRY_CAPACITY};

use crate::err::KernelError;
use crate::events::{EventRing, KernelEvent};

/// A service name, stored as a fixed-capacity byte buffer rather than a heap
/// string so the whole registry stays allocation-free.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ServiceName {
    bytes: [u8; SERVICE_NAME_CAPACITY],
    len: u8,
}

impl ServiceName {
    pub const fn empty() -> ServiceName {
        ServiceName {
            bytes: [0u8; SERVICE_NAME_CAPACITY],
            len: 0,
        }
    }

    pub fn new(name: &str) -> ServiceName {
        let src = name.as_bytes();
        let len = src.len().min(SERVICE_NAME_CAPACITY);
        let mut bytes = [0u8; SERVICE_NAME_CAPACITY];
        bytes[..len].copy_from_slice(&src[..len]);
        ServiceName {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl core::fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone)]
struct Entry {
    name: ServiceName,
    endpoint: EndpointId,
    active: bool,
}

impl Entry {
    const fn empty() -> Entry {
        Entry {
            name: ServiceName::empty(),
            endpoint: EndpointId::INVALID,
            active: false,
        }
    }
}

pub struct ServiceRegistry {
    entries: [Entry; SERVICE_REGISTRY_CAPACITY],
    pub events: EventRing,
}

impl ServiceRegistry {
    pub const fn new() -> ServiceRegistry {
        ServiceRegistry {
            entries: [Entry::empty(); SERVICE_REGISTRY_CAPACITY],
            events: EventRing::new(),
        }
    }

    pub fn init(&mut self) {
        *self = ServiceRegistry::new();
    }

    /// Consumes the first inactive slot and records `(name, endpoint)`
    /// there. Does not check whether `name` is already registered.
    pub fn register(&mut self, name: &str, endpoint: EndpointId) -> Result<(), KernelError> {
        let slot = match self.entries.iter_mut().find(|e| !e.active) {
            Some(slot) => slot,
            None => {
                self.events.push(KernelEvent::ServiceRegistryFull);
                return Err(KernelError::RegistryFull);
            }
        };
        slot.name = ServiceName::new(name);
        slot.endpoint = endpoint;
        slot.active = true;
        self.events.push(KernelEvent::ServiceRegistered);
        Ok(())
    }

    /// First active entry whose name matches, in scan order.
    pub fn lookup(&self, name: &str) -> Option<EndpointId> {
        self.entries
            .iter()
            .find(|e| e.active && e.name.as_str() == name)
            .map(|e| e.endpoint)
    }

    /// Emits every registered name to `sink`, in scan order.
    pub fn list_all(&self, sink: &mut dyn FnMut(&str, EndpointId)) {
        for entry in self.entries.iter().filter(|e| e.active) {
            sink(entry.name.as_str(), entry.endpoint);
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        ServiceRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_returns_the_endpoint() {
        let mut reg = ServiceRegistry::new();
        reg.register("echo", EndpointId(3)).unwrap();
        assert_eq!(reg.lookup("echo"), Some(EndpointId(3)));
    }

    #[test]
    fn lookup_of_unregistered_name_is_none() {
        let reg = ServiceRegistry::new();
        assert_eq!(reg.lookup("nope"), None);
    }

    #[test]
    fn duplicate_registration_is_not_rejected_and_first_match_wins() {
        let mut reg = ServiceRegistry::new();
        reg.register("echo", EndpointId(1)).unwrap();
        reg.register("echo", EndpointId(2)).unwrap();
        assert_eq!(reg.lookup("echo"), Some(EndpointId(1)));
    }

    #[test]
    fn capacity_exhaustion_fails() {
        let mut reg = ServiceRegistry::new();
        for i in 0..SERVICE_REGISTRY_CAPACITY {
            reg.register("svc", EndpointId(i as u32)).unwrap();
        }
        assert_eq!(
            reg.register("overflow", EndpointId(99)).unwrap_err(),
            KernelError::RegistryFull
        );
        assert_eq!(reg.events.last(), Some(KernelEvent::ServiceRegistryFull));
    }
}
