//! End-to-end scenarios and cross-module invariants for the scheduler, IPC,
//! and supervisor trio, driven against the real `singleton::current()`
//! kernel and the real `ctx_switch` — not a host-only stand-in.
//!
//! Unit tests beside each table module already cover the single-table
//! invariants (ring arithmetic, registry scan order, restart bookkeeping);
//! what belongs here is behavior that only shows up once tasks are actually
//! scheduled against each other.
//!
//! The kernel singleton is one static shared by every test in this binary,
//! and `cargo test` runs them concurrently by default, so every test here
//! takes `SINGLETON` for its duration before touching it.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use abi::{EndpointId, Message, MsgType};
use kernel::bench;
use kernel::cli_map::CliCommand;
use kernel::config::MAX_TASKS;
use kernel::err::KernelError;
use kernel::events::EventSink;
use kernel::task::TaskState;
use kernel::Kernel;

static SINGLETON: Mutex<()> = Mutex::new(());

fn reset() -> &'static mut Kernel {
    let k = kernel::singleton::current();
    k.init();
    k
}

struct NullSink;
impl EventSink for NullSink {
    fn accept(&mut self, _event: kernel::events::KernelEvent) {}
}

fn pack(a: u32, b: u32) -> usize {
    ((a as usize) << 32) | (b as usize)
}

fn unpack(arg: usize) -> (u32, u32) {
    ((arg >> 32) as u32, arg as u32)
}

// ---------------------------------------------------------------------
// S1 - ping/pong
// ---------------------------------------------------------------------

static PING_SAW_PONG: AtomicBool = AtomicBool::new(false);
static PONG_SAW_PING: AtomicBool = AtomicBool::new(false);

fn ping_task(arg: usize) {
    let (own, peer) = unpack(arg);
    let request = Message::new(MsgType::Echo, EndpointId(own), b"PING #0");
    loop {
        match kernel::singleton::current().ipc_send(EndpointId(peer), request) {
            Ok(()) => break,
            Err(KernelError::QueueFull) => kernel::singleton::current().task_yield(),
            Err(_) => return,
        }
    }
    loop {
        match kernel::singleton::current().ipc_recv(EndpointId(own)) {
            Ok(reply) => {
                if reply.ty() == MsgType::EchoReply
                    && reply.payload_bytes() == b"PONG reply to token 100"
                {
                    PING_SAW_PONG.store(true, Ordering::SeqCst);
                }
                return;
            }
            Err(KernelError::QueueEmpty) => kernel::singleton::current().task_yield(),
            Err(_) => return,
        }
    }
}

fn pong_task(arg: usize) {
    let (peer, own) = unpack(arg);
    loop {
        match kernel::singleton::current().ipc_recv(EndpointId(own)) {
            Ok(request) => {
                if request.ty() == MsgType::Echo && request.payload_bytes() == b"PING #0" {
                    PONG_SAW_PING.store(true, Ordering::SeqCst);
                }
                let reply = Message::new(MsgType::EchoReply, EndpointId(own), b"PONG reply to token 100");
                let _ = kernel::singleton::current().ipc_send(EndpointId(peer), reply);
                return;
            }
            Err(KernelError::QueueEmpty) => kernel::singleton::current().task_yield(),
            Err(_) => return,
        }
    }
}

#[test]
fn s1_ping_pong_round_trip() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();
    PING_SAW_PONG.store(false, Ordering::SeqCst);
    PONG_SAW_PING.store(false, Ordering::SeqCst);

    let a = k.ipc_endpoint_create().unwrap();
    let b = k.ipc_endpoint_create().unwrap();
    k.task_create("ping", ping_task, pack(a.0, b.0)).unwrap();
    k.task_create("pong", pong_task, pack(a.0, b.0)).unwrap();

    k.scheduler_run();

    assert!(PONG_SAW_PING.load(Ordering::SeqCst));
    assert!(PING_SAW_PONG.load(Ordering::SeqCst));
    assert_eq!(k.ipc_ring_view(a).unwrap().count, 0);
    assert_eq!(k.ipc_ring_view(b).unwrap().count, 0);
}

// ---------------------------------------------------------------------
// S2 - echo round trip
// ---------------------------------------------------------------------

fn echo_once(arg: usize) {
    let ep = EndpointId(arg as u32);
    loop {
        match kernel::singleton::current().ipc_recv(ep) {
            Ok(request) => {
                let reply = Message::new(MsgType::EchoReply, ep, request.payload_bytes());
                let _ = kernel::singleton::current().ipc_send(request.sender, reply);
                return;
            }
            Err(KernelError::QueueEmpty) => kernel::singleton::current().task_yield(),
            Err(_) => return,
        }
    }
}

#[test]
fn s2_echo_round_trip() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();

    let client = k.ipc_endpoint_create().unwrap();
    let echo = k.ipc_endpoint_create().unwrap();
    k.task_create("echo", echo_once, echo.0 as usize).unwrap();

    k.ipc_send(echo, Message::new(MsgType::Echo, client, b"hello")).unwrap();
    k.scheduler_run();

    let reply = k.ipc_recv(client).unwrap();
    assert_eq!(reply.ty(), MsgType::EchoReply);
    assert_eq!(reply.sender, echo);
    assert_eq!(reply.payload_len(), 5);
    assert_eq!(reply.payload_bytes(), b"hello");
}

// ---------------------------------------------------------------------
// S3 - backpressure
// ---------------------------------------------------------------------

#[test]
fn s3_backpressure_then_drain_then_retry() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();
    let ep = k.ipc_endpoint_create().unwrap();
    let sender = EndpointId(0);

    for _ in 0..16 {
        k.ipc_send(ep, Message::new(MsgType::Log, sender, b"x")).unwrap();
    }
    assert_eq!(
        k.ipc_send(ep, Message::new(MsgType::Log, sender, b"x")).unwrap_err(),
        KernelError::QueueFull
    );
    assert_eq!(k.ipc_ring_view(ep).unwrap().count, 16);

    k.ipc_recv(ep).unwrap();
    k.ipc_send(ep, Message::new(MsgType::Log, sender, b"x")).unwrap();
    assert_eq!(k.ipc_ring_view(ep).unwrap().count, 16);
}

// ---------------------------------------------------------------------
// S4 - crash and restart
// ---------------------------------------------------------------------

/// A persistent echo service: replies to `ECHO`, and on `CRASH` runs the
/// panic path and then yields forever, exactly as a real service's crash
/// handler would. Unlike `echo_once`, this never returns on its own — only
/// a crash (or the test process exiting) ends it.
fn echo_service(arg: usize) {
    let ep = EndpointId(arg as u32);
    loop {
        let request = loop {
            match kernel::singleton::current().ipc_recv(ep) {
                Ok(m) => break m,
                Err(KernelError::QueueEmpty) => kernel::singleton::current().task_yield(),
                Err(_) => return,
            }
        };
        match request.ty() {
            MsgType::Crash => {
                let mut sink = NullSink;
                kernel::panic::kernel_panic(kernel::singleton::current(), "echo crashed", &mut sink);
                loop {
                    kernel::singleton::current().task_yield();
                }
            }
            MsgType::Echo => {
                let reply = Message::new(MsgType::EchoReply, ep, request.payload_bytes());
                let _ = kernel::singleton::current().ipc_send(request.sender, reply);
            }
            _ => {}
        }
    }
}

#[test]
fn s4_crash_and_restart() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();

    let ep = k.ipc_endpoint_create().unwrap();
    let task_id = k.task_create("echo", echo_service, ep.0 as usize).unwrap();
    k.supervisor_register_service(task_id, ep, "echo").unwrap();

    let crash_sender = k.ipc_endpoint_create().unwrap();
    k.ipc_send(ep, Message::new(MsgType::Crash, crash_sender, &[])).unwrap();
    assert!(k.scheduler_run_one());
    assert_eq!(k.task_view(task_id).unwrap().state, TaskState::Finished);
    assert!(k.supervisor.is_crashed(ep));

    let report = k.supervisor_process();
    assert_eq!(report.restarted, 1);
    assert_eq!(report.restart_failed, 0);
    assert!(!k.supervisor.is_crashed(ep));
    assert_eq!(k.task_view(task_id).unwrap().state, TaskState::Runnable);

    let client = k.ipc_endpoint_create().unwrap();
    k.ipc_send(ep, Message::new(MsgType::Echo, client, b"still alive")).unwrap();
    assert!(k.scheduler_run_one());

    let reply = k.ipc_recv(client).unwrap();
    assert_eq!(reply.ty(), MsgType::EchoReply);
    assert_eq!(reply.payload_bytes(), b"still alive");
}

#[test]
fn cli_crash_command_drives_the_same_crash_scenario() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();

    let ep = k.ipc_endpoint_create().unwrap();
    let task_id = k.task_create("echo", echo_service, ep.0 as usize).unwrap();
    k.supervisor_register_service(task_id, ep, "echo").unwrap();
    k.service_register("echo", ep).unwrap();

    let shell_endpoint = k.ipc_endpoint_create().unwrap();
    let command = CliCommand::parse("crash").unwrap();
    let (msg, service_name) = command.as_message(shell_endpoint).unwrap();
    let target = k.service_lookup(service_name).unwrap();
    k.ipc_send(target, msg).unwrap();

    assert!(k.scheduler_run_one());
    assert_eq!(k.task_view(task_id).unwrap().state, TaskState::Finished);
}

// ---------------------------------------------------------------------
// S5 - fan-out drop
// ---------------------------------------------------------------------

#[test]
fn s5_fanout_drops_only_on_the_full_subscriber() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();

    let full_subscriber = k.ipc_endpoint_create().unwrap();
    let drained_subscriber = k.ipc_endpoint_create().unwrap();
    let timer = EndpointId(0);

    let mut drained_received = 0;
    for _ in 0..20 {
        let tick = Message::new(MsgType::TimerTick, timer, &[]);
        k.ipc_send_or_drop(full_subscriber, tick);
        k.ipc_send_or_drop(drained_subscriber, tick);
        if k.ipc_recv(drained_subscriber).is_ok() {
            drained_received += 1;
        }
    }

    assert_eq!(k.ipc_ring_view(full_subscriber).unwrap().count, 16);
    assert_eq!(drained_received, 20);
}

// ---------------------------------------------------------------------
// S6 - benchmark shape
// ---------------------------------------------------------------------

#[test]
fn s6_ipc_round_trip_costs_more_than_a_direct_call() {
    let _guard = SINGLETON.lock().unwrap();

    for iterations in [1_000usize, 10_000] {
        // Fresh kernel per iteration: `bench::run` allocates its own
        // endpoint pair and would otherwise exhaust MAX_ENDPOINTS.
        let k = reset();
        let origin = Instant::now();
        let result = bench::run(k, iterations, || origin.elapsed().as_nanos() as u64).unwrap();
        assert_eq!(result.iterations, iterations);
        assert!(result.ratio() > 1.0);
    }
}

// ---------------------------------------------------------------------
// Cross-module invariants that only show up once tasks are scheduled.
// ---------------------------------------------------------------------

fn finishes_immediately(_: usize) {}

#[test]
fn invariant_finished_task_is_never_redispatched_until_restart() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();

    let id = k.task_create("solo", finishes_immediately, 0).unwrap();
    k.scheduler_run();
    assert_eq!(k.task_view(id).unwrap().state, TaskState::Finished);

    // Nothing runnable: a second pass is a no-op, not a re-entry.
    k.scheduler_run();
    assert_eq!(k.task_view(id).unwrap().state, TaskState::Finished);

    k.task_restart(id).unwrap();
    assert_eq!(k.task_view(id).unwrap().state, TaskState::Runnable);
}

static DISPATCH_MASK: AtomicU32 = AtomicU32::new(0);

fn mark_dispatched_and_finish(arg: usize) {
    DISPATCH_MASK.fetch_or(1 << arg, Ordering::SeqCst);
}

#[test]
fn invariant_round_robin_dispatches_every_runnable_task_at_least_once() {
    let _guard = SINGLETON.lock().unwrap();
    let k = reset();
    DISPATCH_MASK.store(0, Ordering::SeqCst);

    for i in 0..MAX_TASKS as u32 {
        k.task_create("t", mark_dispatched_and_finish, i as usize).unwrap();
    }
    k.scheduler_run();

    let expected = (1u32 << MAX_TASKS as u32) - 1;
    assert_eq!(DISPATCH_MASK.load(Ordering::SeqCst), expected);
}
