//! Wire-level ABI shared between the kernel and every task: the message
//! layout, the id types tasks and endpoints are named by, and the small
//! error codes that cross the kernel/task boundary as plain integers.
//!
//! Everything in this crate is `Copy` and has a fixed, `repr(C)` layout, so it
//! can be value-copied at every hop without aliasing and without depending on
//! `alloc`.

#![no_std]

use zerocopy::{AsBytes, FromBytes, Unaligned};

/// Maximum number of live endpoints. See [`EndpointId`].
pub const MAX_ENDPOINTS: usize = 32;

/// Depth of each endpoint's message ring.
pub const IPC_QUEUE_DEPTH: usize = 16;

/// Maximum number of payload bytes carried inline in a [`Message`].
pub const MAX_PAYLOAD: usize = 64;

/// Maximum number of task slots.
pub const MAX_TASKS: usize = 8;

/// Bytes reserved for each task's stack.
pub const TASK_STACK_BYTES: usize = 4096;

/// Maximum number of named services.
pub const SERVICE_REGISTRY_CAPACITY: usize = 16;

/// Maximum number of services a supervisor can track at once.
pub const SUPERVISION_CAPACITY: usize = 8;

/// Maximum length, in bytes, of a service name (including no terminator;
/// names are fixed-size byte arrays, not C strings).
pub const SERVICE_NAME_CAPACITY: usize = 32;

/// Dense id naming a mailbox in `[0, MAX_ENDPOINTS)`.
///
/// Ids are handed out by the kernel's endpoint table monotonically from
/// zero and are never reused within a run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, AsBytes, FromBytes, Unaligned)]
#[repr(transparent)]
pub struct EndpointId(pub u32);

impl EndpointId {
    /// Sentinel meaning "no endpoint" (`0xFFFF_FFFF`).
    pub const INVALID: EndpointId = EndpointId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Dense id naming a task slot in `[0, MAX_TASKS)`.
///
/// Unlike the endpoint id there is no reserved sentinel value baked into the
/// wire type; "no task" is expressed as `Option<TaskId>` or as the scheduler's
/// own `-1` convention, never as a magic `TaskId`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, AsBytes, FromBytes, Unaligned)]
#[repr(transparent)]
pub struct TaskId(pub u32);

/// The closed set of message variants the core understands.
///
/// New variants are not meant to be added casually: every task main loop in
/// this system matches on this enum exhaustively (modulo a wildcard arm for
/// forward tolerance), so it is treated as part of the wire contract.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[repr(u32)]
pub enum MsgType {
    #[default]
    None = 0,
    Log = 1,
    Echo = 2,
    EchoReply = 3,
    TimerTick = 4,
    Heartbeat = 5,
    Crash = 6,
}

impl MsgType {
    /// Decodes a raw wire tag, falling back to `None` for anything the
    /// receiver doesn't recognize rather than failing the whole message.
    pub fn from_u32(raw: u32) -> MsgType {
        match raw {
            1 => MsgType::Log,
            2 => MsgType::Echo,
            3 => MsgType::EchoReply,
            4 => MsgType::TimerTick,
            5 => MsgType::Heartbeat,
            6 => MsgType::Crash,
            _ => MsgType::None,
        }
    }
}

/// Fixed-layout message record, value-copied at every hop.
///
/// Wire layout (76 bytes total, host byte order, no padding):
///
/// | offset | size | field |
/// |---|---|---|
/// | 0  | 4  | `type` |
/// | 4  | 4  | `sender` |
/// | 8  | 4  | `payload_len` |
/// | 12 | 64 | `payload` |
#[derive(Copy, Clone, Debug, AsBytes, FromBytes, Unaligned)]
#[repr(C)]
pub struct Message {
    ty: u32,
    pub sender: EndpointId,
    payload_len: u32,
    pub payload: [u8; MAX_PAYLOAD],
}

impl Message {
    /// Builds a message, clamping `payload` to [`MAX_PAYLOAD`] bytes.
    ///
    /// Per the wire contract `payload_len` never exceeds `MAX_PAYLOAD`; a
    /// caller handing over a longer slice gets the prefix, silently, rather
    /// than a fallible constructor, mirroring the source's unchecked
    /// byte-copy loop.
    pub fn new(ty: MsgType, sender: EndpointId, payload: &[u8]) -> Message {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..len].copy_from_slice(&payload[..len]);
        Message {
            ty: ty as u32,
            sender,
            payload_len: len as u32,
            payload: buf,
        }
    }

    pub const fn empty() -> Message {
        Message {
            ty: MsgType::None as u32,
            sender: EndpointId::INVALID,
            payload_len: 0,
            payload: [0u8; MAX_PAYLOAD],
        }
    }

    pub fn ty(&self) -> MsgType {
        MsgType::from_u32(self.ty)
    }

    pub fn set_ty(&mut self, ty: MsgType) {
        self.ty = ty as u32;
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload[..self.payload_len()]
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::empty()
    }
}

const _MESSAGE_IS_76_BYTES: () = assert!(core::mem::size_of::<Message>() == 76);
