//! Scheduling and stopping from threads other than the dispatch thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cadence_core::{ScheduleError, SimTime};
use cadence_engine::{Scheduler, SchedulerConfig, StopReason};
use cadence_test_utils::Recorder;

fn t(secs: f64) -> SimTime {
    SimTime::new(secs).unwrap()
}

#[test]
fn injected_event_wakes_sleeping_scheduler() {
    // 10x real time: the run would idle for 0.5 s of wall time.
    let mut s = Scheduler::new(SchedulerConfig::with_rate(10.0)).unwrap();
    let handle = s.handle();
    let rec = Recorder::new();

    let r = rec.clone();
    let injector = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let at = handle.now().checked_add(Duration::from_secs(1)).unwrap();
        handle
            .schedule(at, move |ctx| {
                r.push(ctx.now());
                Ok(())
            })
            .unwrap();
    });

    let report = s.run(t(5.0)).unwrap();
    injector.join().unwrap();

    let fired = rec.snapshot();
    assert_eq!(fired.len(), 1);
    assert!(fired[0] >= t(1.0));
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.stop_reason, StopReason::StopTime);
}

#[test]
fn earlier_injection_preempts_queued_head() {
    // Head at t=4 is 0.4 s of wall time away; the injection lands first.
    let mut s = Scheduler::new(SchedulerConfig::with_rate(10.0)).unwrap();
    let rec = Recorder::new();
    let r = rec.clone();
    s.schedule(t(4.0), move |ctx| {
        r.push(("queued", ctx.now()));
        Ok(())
    })
    .unwrap();

    let handle = s.handle();
    let r = rec.clone();
    let injector = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        handle
            .schedule(t(1.0), move |ctx| {
                r.push(("injected", ctx.now()));
                Ok(())
            })
            .unwrap();
    });

    let report = s.run(t(5.0)).unwrap();
    injector.join().unwrap();

    assert_eq!(
        rec.snapshot(),
        vec![("injected", t(1.0)), ("queued", t(4.0))]
    );
    assert_eq!(report.dispatched, 2);
}

#[test]
fn every_accepted_injection_fires_or_is_discarded() {
    const EVENTS: u32 = 50_000;
    let stop = t(0.5);
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    for i in 0..EVENTS {
        s.schedule(t(i as f64 * 1e-5), |_| Ok(())).unwrap();
    }

    let handle = s.handle();
    let fired = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&fired);
    let injector = thread::spawn(move || {
        let mut accepted = 0u64;
        while !handle.is_stopped() {
            let c = Arc::clone(&counter);
            let sent = handle.schedule(handle.now(), move |_| {
                c.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
            match sent {
                Ok(()) => accepted += 1,
                Err(ScheduleError::Shutdown) => break,
                // Behind the clock by the time it was checked, or back-pressure.
                Err(_) => {}
            }
            thread::yield_now();
        }
        accepted
    });

    let report = s.run(stop).unwrap();
    let accepted = injector.join().unwrap();
    let fired = fired.load(Ordering::Relaxed);

    assert!(accepted > 0);
    // Queued events all fall before the stop time, so only injections
    // can be discarded.
    assert_eq!(report.dispatched, u64::from(EVENTS) + fired);
    assert_eq!(fired + report.discarded, accepted);
}

#[test]
fn external_stop_interrupts_long_wait() {
    let mut s = Scheduler::new(SchedulerConfig::default()).unwrap();
    s.schedule(t(3600.0), |_| Ok(())).unwrap();
    let handle = s.handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.stop();
        handle.stop();
    });

    let started = Instant::now();
    let report = s.run(t(7200.0)).unwrap();
    stopper.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.stop_reason, StopReason::Requested);
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.discarded, 1);
}

#[test]
fn handle_rejects_requests_after_shutdown() {
    let mut s = Scheduler::new(SchedulerConfig::with_rate(1000.0)).unwrap();
    let handle = s.handle();
    s.schedule(t(2.0), |_| Ok(())).unwrap();
    s.run(t(2.0)).unwrap();

    assert!(handle.is_stopped());
    assert_eq!(
        handle.schedule(t(3.0), |_| Ok(())),
        Err(ScheduleError::Shutdown)
    );
}

#[test]
fn handle_rejects_time_behind_clock() {
    let mut s = Scheduler::new(SchedulerConfig::with_rate(1000.0)).unwrap();
    let handle = s.handle();
    let outcome = Recorder::new();
    let out = outcome.clone();
    let h = handle.clone();
    s.schedule(t(5.0), move |_| {
        out.push(h.schedule(t(1.0), |_| Ok(())));
        Ok(())
    })
    .unwrap();
    s.run(t(5.0)).unwrap();

    assert_eq!(
        outcome.snapshot(),
        vec![Err(ScheduleError::InvalidTime {
            requested: t(1.0),
            now: t(5.0),
        })]
    );
}

#[test]
fn full_injection_channel_reports_backpressure() {
    let config = SchedulerConfig {
        injection_capacity: 2,
        ..SchedulerConfig::with_rate(1000.0)
    };
    let s = Scheduler::new(config).unwrap();
    let handle = s.handle();
    assert!(handle.schedule(t(1.0), |_| Ok(())).is_ok());
    assert!(handle.schedule(t(1.0), |_| Ok(())).is_ok());
    assert_eq!(
        handle.schedule(t(1.0), |_| Ok(())),
        Err(ScheduleError::ChannelFull)
    );
}
