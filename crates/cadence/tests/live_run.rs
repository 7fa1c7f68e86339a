//! Full lifecycle against a loopback consumer.

use std::time::Duration;

use cadence::models::{install_demo, SENDER, SINK};
use cadence::prelude::*;
use cadence::telemetry::{decode_line, ChannelState};
use cadence_test_utils::MockConsumer;

fn demo_config(consumer: &MockConsumer, duration: Duration) -> SimConfig {
    SimConfig {
        duration,
        // 4 virtual seconds in about 40 ms of wall time.
        scheduler: SchedulerConfig::with_rate(100.0),
        telemetry: TelemetryConfig {
            reconnect_interval: Duration::from_millis(20),
            ..TelemetryConfig::with_addr(consumer.addr())
        },
    }
}

#[test]
fn demo_streams_energy_and_packets() {
    let consumer = MockConsumer::bind().unwrap();
    let mut sim = Simulation::new(demo_config(&consumer, Duration::from_secs(4))).unwrap();
    install_demo(sim.scheduler_mut()).unwrap();

    let report = sim.run().unwrap();
    assert_eq!(report.run.final_time, SimTime::new(4.0).unwrap());
    assert!(report.telemetry.sent > 0);
    assert_eq!(sim.channel().state(), ChannelState::Closed);

    let lines = consumer.wait_for_lines(report.telemetry.sent as usize, Duration::from_secs(3));
    assert_eq!(lines.len() as u64, report.telemetry.sent);

    let signals: Vec<TraceSignal> = lines.iter().map(|l| decode_line(l).unwrap()).collect();
    assert!(signals.windows(2).all(|w| w[0].time <= w[1].time));

    let energy: Vec<&TraceSignal> = signals
        .iter()
        .filter(|s| s.kind == SignalKind::Energy)
        .collect();
    assert!(energy.iter().any(|s| s.subject == SINK));
    assert!(energy.iter().any(|s| s.subject == SENDER));
    assert!(energy.iter().all(|s| (0.0..=10.0).contains(&s.value)));

    let packets: Vec<&TraceSignal> = signals
        .iter()
        .filter(|s| s.kind == SignalKind::Packet)
        .collect();
    assert!(!packets.is_empty());
    assert!(packets
        .iter()
        .all(|s| s.subject == SINK && s.value == 1024.0 && s.time.as_secs() >= 1.0));
}

#[test]
fn external_stop_ends_run_early() {
    let consumer = MockConsumer::bind().unwrap();
    let mut config = demo_config(&consumer, Duration::from_secs(3600));
    config.scheduler = SchedulerConfig::with_rate(1.0);
    let mut sim = Simulation::new(config).unwrap();
    install_demo(sim.scheduler_mut()).unwrap();

    let handle = sim.handle();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        handle.stop();
    });
    let report = sim.run().unwrap();
    stopper.join().unwrap();

    assert!(report.run.final_time < SimTime::new(5.0).unwrap());
    assert!(report.run.discarded > 0);
    assert!(report.run.wall_elapsed < Duration::from_secs(5));
}
