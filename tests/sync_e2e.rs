//! End-to-end scenarios driven over real loopback UDP sockets: a live
//! [`MasterResponder`] answering a live [`Requester`]/[`SyncController`] pair.
//! Covers the master/slave sync scenarios this crate models: cold sync, a
//! small and a large step at the master, master-offline detection and
//! recovery, and a malformed packet.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use udpclocksync::codec::{self, PacketFlags};
use udpclocksync::config::SyncConfig;
use udpclocksync::master::responder::MasterResponder;
use udpclocksync::master::time_source::MasterTimeSource;
use udpclocksync::slave::clock::SoftwareClock;
use udpclocksync::slave::controller::SyncController;
use udpclocksync::slave::requester::Requester;
use udpclocksync::status::{SyncState, SyncStatus};

struct RunningMaster {
    addr: std::net::SocketAddr,
    time_source: Arc<MasterTimeSource>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RunningMaster {
    fn start() -> Self {
        let time_source = Arc::new(MasterTimeSource::new());
        let responder = MasterResponder::bind("127.0.0.1:0", time_source.clone()).unwrap();
        let addr = responder.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let handle = thread::spawn(move || responder.run(stop_clone));
        RunningMaster { addr, time_source, stop, handle: Some(handle) }
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

impl Drop for RunningMaster {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

fn fast_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.sync_timeout = 0.2;
    config.sync_interval = 0.01; // cycles driven manually via run_round in these tests
    config.rounds_per_sync = 3;
    // real loopback scheduling jitter can exceed the protocol's 1ms default;
    // widen it so these sockets-and-threads tests aren't flaky on a loaded
    // machine while still well below the large-offset threshold.
    config.sync_threshold = 0.05;
    config
}

fn build_slave(
    master_addr: std::net::SocketAddr,
    config: SyncConfig,
) -> (SyncController<Requester<Arc<SoftwareClock>>, Arc<SoftwareClock>>, Arc<SoftwareClock>) {
    let clock = Arc::new(SoftwareClock::new(config.max_rate_adjustment));
    let timeout = Duration::from_secs_f64(config.sync_timeout);
    let requester = Requester::connect(&master_addr.to_string(), clock.clone(), timeout).unwrap();
    let status = Arc::new(RwLock::new(SyncStatus::default()));
    let controller = SyncController::new(requester, clock.clone(), config, status);
    (controller, clock)
}

#[test]
fn cold_sync_with_zero_true_offset_reaches_synced() {
    let master = RunningMaster::start();
    let (mut controller, _clock) = build_slave(master.addr, fast_config());

    controller.start();
    for _ in 0..3 {
        controller.run_round();
    }

    assert_eq!(controller.state(), SyncState::Synced);
}

#[test]
fn small_step_at_master_resyncs_within_a_few_cycles() {
    let master = RunningMaster::start();
    let (mut controller, _clock) = build_slave(master.addr, fast_config());

    controller.start();
    for _ in 0..3 {
        controller.run_round();
    }
    assert_eq!(controller.state(), SyncState::Synced);

    master.time_source.adjust_reference_time(0.2);

    let mut reached_synced = false;
    for _ in 0..6 {
        controller.run_round();
        if controller.state() == SyncState::Synced {
            reached_synced = true;
            break;
        }
    }
    assert!(reached_synced, "did not re-converge within 6 cycles after a 0.2s step");
}

#[test]
fn large_step_at_master_steps_then_resyncs_next_cycle() {
    let master = RunningMaster::start();
    let (mut controller, _clock) = build_slave(master.addr, fast_config());

    controller.start();
    controller.run_round();
    assert_eq!(controller.state(), SyncState::Synced);

    master.time_source.adjust_reference_time(60.0);
    controller.run_round();
    assert_eq!(controller.state(), SyncState::LargeOffset);

    // the clock was stepped, so the very next round should already observe a
    // near-zero offset.
    controller.run_round();
    assert_eq!(controller.state(), SyncState::Synced);
}

#[test]
fn master_offline_is_detected_and_recovered() {
    let mut master = RunningMaster::start();
    let mut config = fast_config();
    config.master_offline_timeout = 0.05;
    let (mut controller, _clock) = build_slave(master.addr, config);

    controller.start();
    controller.run_round();
    assert_eq!(controller.state(), SyncState::Synced);

    master.stop();

    // with a near-zero master_offline_timeout, the escalation from Error to
    // MasterOffline fires in the same round that first reaches 3 consecutive
    // failures (there is no observable window where it sits in Error).
    controller.run_round();
    controller.run_round();
    controller.run_round();
    assert_eq!(controller.state(), SyncState::MasterOffline);

    // restart a master on the same address so the slave can recover.
    let _new_master = RunningMasterAt::restart(master.addr);
    let mut recovered = false;
    for _ in 0..3 {
        controller.run_round();
        if controller.state() == SyncState::Syncing || controller.state() == SyncState::Synced {
            recovered = true;
            break;
        }
    }
    assert!(recovered, "slave did not recover after the master came back");
}

/// A second master bound to the exact address the first one freed, so a
/// stopped-then-restarted master scenario doesn't require the slave to learn
/// a new address.
struct RunningMasterAt {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RunningMasterAt {
    fn restart(addr: std::net::SocketAddr) -> Self {
        let time_source = Arc::new(MasterTimeSource::new());
        let responder = MasterResponder::bind(&addr.to_string(), time_source).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let handle = thread::spawn(move || responder.run(stop_clone));
        RunningMasterAt { stop, handle: Some(handle) }
    }
}

impl Drop for RunningMasterAt {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

#[test]
fn malformed_flags_are_dropped_without_disrupting_the_responder() {
    let master = RunningMaster::start();

    let rogue = UdpSocket::bind("127.0.0.1:0").unwrap();
    rogue.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let mut garbage = codec::encode(PacketFlags::Request, 1, 1.0, 0.0, 0.0);
    garbage[0] = 0x09;
    rogue.send_to(&garbage, master.addr).unwrap();

    let mut buf = [0u8; 128];
    let result = rogue.recv_from(&mut buf);
    assert!(result.is_err(), "responder must not reply to an unrecognized flags byte");

    // the responder must still be healthy for a well-formed request afterward.
    let (mut controller, _clock) = build_slave(master.addr, fast_config());
    controller.start();
    controller.run_round();
    assert_eq!(controller.state(), SyncState::Synced);
}
