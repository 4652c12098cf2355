//! Lock arbitration between radios and against the host's generic FSM.

use crate::mock_host::{pump, MockHost, RecordingSink};

use wld_mxl::actions::ActionId;
use wld_mxl::app::events::ReconfEvent;
use wld_mxl::app::service::{CommitOutcome, ReconfService, Scope};
use wld_mxl::config::ReconfConfig;
use wld_mxl::fsm::StateId;
use wld_mxl::locker::LockKey;
use wld_mxl::model::Band;

fn test_config() -> ReconfConfig {
    ReconfConfig {
        boot_quiet_ms: 0,
        ..ReconfConfig::default()
    }
}

// ── Contention timeout (retry budget) ─────────────────────────

#[test]
fn contended_fsm_retries_the_full_budget_then_resets() {
    let mut svc = ReconfService::new(test_config());
    let a = svc.add_radio("wlan0", Band::Band5G).unwrap();
    let b = svc.add_radio("wlan1", Band::Band5G).unwrap();
    let mut host = MockHost::new();
    let mut sink = RecordingSink::new();
    let mut now = 0u64;

    // Radio A's FSM holds the lock (forced by the harness).
    assert!(svc.locker_mut().try_lock(LockKey::reconf(a)));

    svc.request_action(Scope::Radio(b), ActionId::WriteConfig).unwrap();
    svc.notify_commit(b, now, &mut sink).unwrap();
    // Budget retries at the try-lock cadence, then the reset: generous cap.
    pump(&mut svc, &mut host, &mut sink, &mut now, 60);

    // B gave up cleanly without executing anything or touching A's lock.
    assert_eq!(svc.fsm_state(b).unwrap(), StateId::Idle);
    let ctx = svc.context(b).unwrap();
    assert!(!ctx.radio.any_requested());
    assert!(!ctx.radio.any_executing());
    assert!(host.calls.is_empty());
    assert!(svc.locker().is_held_by(LockKey::reconf(a)));

    // The whole window spanned the retry budget at the try-lock cadence.
    let cfg = svc.config().clone();
    let floor = u64::from(cfg.wait_retry_max) * u64::from(cfg.trylock_interval_ms);
    assert!(
        now >= floor,
        "B must have kept retrying for the full window: {now} < {floor}"
    );

    // The collapse is visible as a Wait -> Idle transition.
    assert!(sink.events.contains(&ReconfEvent::StateChanged {
        radio: b,
        from: StateId::Wait,
        to: StateId::Idle,
    }));
}

#[test]
fn released_lock_unblocks_the_waiter() {
    let mut svc = ReconfService::new(test_config());
    let a = svc.add_radio("wlan0", Band::Band5G).unwrap();
    let b = svc.add_radio("wlan1", Band::Band5G).unwrap();
    let mut host = MockHost::new();
    let mut sink = RecordingSink::new();
    let mut now = 0u64;

    assert!(svc.locker_mut().try_lock(LockKey::reconf(a)));

    svc.request_action(Scope::Radio(b), ActionId::WriteConfig).unwrap();
    assert_eq!(
        svc.do_commit(b, now, &mut host, &mut sink).unwrap(),
        CommitOutcome::Driven
    );
    assert_eq!(svc.fsm_state(b).unwrap(), StateId::Wait);

    // A few contended ticks, then A finishes and releases.
    for _ in 0..3 {
        now += 1_000;
        svc.poll(now, &mut host, &mut sink);
        assert_eq!(svc.fsm_state(b).unwrap(), StateId::Wait);
    }
    svc.locker_mut().unlock(LockKey::reconf(a));

    pump(&mut svc, &mut host, &mut sink, &mut now, 50);
    assert_eq!(svc.fsm_state(b).unwrap(), StateId::Idle);
    assert_eq!(host.config_writes(), 1, "B's work ran after the release");
}

// ── Arbitration with the host's generic FSM ───────────────────

#[test]
fn generic_fsm_key_blocks_reconf_on_any_radio() {
    let mut svc = ReconfService::new(test_config());
    let r = svc.add_radio("wlan0", Band::Band5G).unwrap();
    let mut host = MockHost::new();
    let mut sink = RecordingSink::new();
    let mut now = 0u64;

    // The host generic FSM is mid-cycle on a different radio index; the
    // lock domain is global, so the reconf FSM must still wait.
    assert!(svc.locker_mut().try_lock(LockKey::generic(2)));

    svc.request_action(Scope::Radio(r), ActionId::WriteConfig).unwrap();
    svc.do_commit(r, now, &mut host, &mut sink).unwrap();
    now += 1_000;
    svc.poll(now, &mut host, &mut sink);
    assert_eq!(svc.fsm_state(r).unwrap(), StateId::Wait);
    assert!(host.calls.is_empty());

    svc.locker_mut().unlock(LockKey::generic(2));
    pump(&mut svc, &mut host, &mut sink, &mut now, 50);
    assert_eq!(host.config_writes(), 1);
}

// ── Settle gate before lock acquisition ───────────────────────

#[test]
fn wait_holds_at_settle_cadence_until_vaps_finish() {
    let mut svc = ReconfService::new(test_config());
    let r = svc.add_radio("wlan0", Band::Band5G).unwrap();
    let mut host = MockHost::new();
    host.vaps_done = false;
    let mut sink = RecordingSink::new();
    let mut now = 0u64;

    svc.request_action(Scope::Radio(r), ActionId::WriteConfig).unwrap();
    svc.do_commit(r, now, &mut host, &mut sink).unwrap();
    assert_eq!(svc.fsm_state(r).unwrap(), StateId::Wait);

    // Radio never settles: nothing executes, the FSM never locks.
    for _ in 0..5 {
        now += u64::from(svc.config().settle_interval_ms);
        svc.poll(now, &mut host, &mut sink);
        assert_eq!(svc.fsm_state(r).unwrap(), StateId::Wait);
        assert!(!svc.locker().is_locked());
    }
    assert!(host.calls.is_empty());

    // APs finish their host cycles; the next ticks lock and run.
    host.vaps_done = true;
    pump(&mut svc, &mut host, &mut sink, &mut now, 50);
    assert_eq!(svc.fsm_state(r).unwrap(), StateId::Idle);
    assert_eq!(host.config_writes(), 1);
}
