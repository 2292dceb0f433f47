//! Endpoint table: a fixed pool of addressable mailboxes, each owning one
//! bounded ring buffer of messages.
//!
//! `send`/`recv` never block. The cooperatively-blocking variant service
//! main loops want is not a separate primitive — it is the caller-side
//! pattern `while recv() == QueueEmpty { task_yield() }` — so this module
//! never reaches into the scheduler.

use abi::{EndpointId, Message, IPC_QUEUE_DEPTH, MAX_ENDPOINTS};

use crate::err::KernelError;
use crate::events::{EventRing, KernelEvent};

#[derive(Copy, Clone)]
struct Ring {
    msgs: [Message; IPC_QUEUE_DEPTH],
    head: usize,
    tail: usize,
    count: usize,
}

impl Ring {
    const fn new() -> Ring {
        Ring {
            msgs: [Message::empty(); IPC_QUEUE_DEPTH],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    fn push(&mut self, msg: Message) -> Result<(), KernelError> {
        if self.count == IPC_QUEUE_DEPTH {
            return Err(KernelError::QueueFull);
        }
        self.msgs[self.tail] = msg;
        self.tail = (self.tail + 1) % IPC_QUEUE_DEPTH;
        self.count += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Message, KernelError> {
        if self.count == 0 {
            return Err(KernelError::QueueEmpty);
        }
        let msg = self.msgs[self.head];
        self.head = (self.head + 1) % IPC_QUEUE_DEPTH;
        self.count -= 1;
        Ok(msg)
    }
}

#[derive(Copy, Clone)]
struct EndpointSlot {
    active: bool,
    ring: Ring,
}

impl EndpointSlot {
    const fn empty() -> EndpointSlot {
        EndpointSlot {
            active: false,
            ring: Ring::new(),
        }
    }
}

pub struct IpcTable {
    slots: [EndpointSlot; MAX_ENDPOINTS],
    next_id: u32,
    pub events: EventRing,
}

/// Read-only view of one endpoint's ring state, for property tests that want
/// to assert on `count`/`head`/`tail` directly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RingView {
    pub head: usize,
    pub tail: usize,
    pub count: usize,
}

impl IpcTable {
    pub const fn new() -> IpcTable {
        IpcTable {
            slots: [EndpointSlot::empty(); MAX_ENDPOINTS],
            next_id: 0,
            events: EventRing::new(),
        }
    }

    /// Clears all endpoint slots to inactive and zeroes the id counter.
    pub fn init(&mut self) {
        *self = IpcTable::new();
    }

    /// Allocates the next id from the monotonic counter. Ids are never
    /// reused within a run; once `MAX_ENDPOINTS` have been handed out this
    /// always fails.
    pub fn create(&mut self) -> Result<EndpointId, KernelError> {
        if self.next_id as usize >= MAX_ENDPOINTS {
            return Err(KernelError::InvalidEndpoint);
        }
        let id = self.next_id;
        self.next_id += 1;
        let slot = &mut self.slots[id as usize];
        slot.active = true;
        slot.ring = Ring::new();
        self.events.push(KernelEvent::EndpointCreated { id });
        Ok(EndpointId(id))
    }

    fn slot(&self, ep: EndpointId) -> Result<&EndpointSlot, KernelError> {
        let slot = self
            .slots
            .get(ep.0 as usize)
            .filter(|s| s.active)
            .ok_or(KernelError::InvalidEndpoint)?;
        Ok(slot)
    }

    fn slot_mut(&mut self, ep: EndpointId) -> Result<&mut EndpointSlot, KernelError> {
        let idx = ep.0 as usize;
        if idx >= MAX_ENDPOINTS || !self.slots[idx].active {
            return Err(KernelError::InvalidEndpoint);
        }
        Ok(&mut self.slots[idx])
    }

    /// Enqueues `msg` at `dst`. Returns `QueueFull` without copying if the
    /// destination ring is already at capacity.
    pub fn send(&mut self, dst: EndpointId, msg: Message) -> Result<(), KernelError> {
        let slot = self.slot_mut(dst)?;
        match slot.ring.push(msg) {
            Ok(()) => {
                self.events.push(KernelEvent::MessageEnqueued { endpoint: dst.0 });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Like `send`, but silently drops on `QueueFull` instead of surfacing
    /// it — used by fan-out producers (the timer service) so one slow
    /// subscriber cannot block delivery to the others.
    pub fn send_or_drop(&mut self, dst: EndpointId, msg: Message) {
        if let Err(KernelError::QueueFull) = self.send(dst, msg) {
            self.events.push(KernelEvent::MessageDropped { endpoint: dst.0 });
        }
    }

    /// Dequeues the oldest message from `src`.
    pub fn recv(&mut self, src: EndpointId) -> Result<Message, KernelError> {
        let slot = self.slot_mut(src)?;
        let msg = slot.ring.pop()?;
        self.events.push(KernelEvent::MessageDequeued { endpoint: src.0 });
        Ok(msg)
    }

    pub fn has_messages(&self, ep: EndpointId) -> Result<bool, KernelError> {
        Ok(self.slot(ep)?.ring.count > 0)
    }

    pub fn ring_view(&self, ep: EndpointId) -> Option<RingView> {
        self.slots.get(ep.0 as usize).filter(|s| s.active).map(|s| RingView {
            head: s.ring.head,
            tail: s.ring.tail,
            count: s.ring.count,
        })
    }
}

impl Default for IpcTable {
    fn default() -> Self {
        IpcTable::new()
    }
}
