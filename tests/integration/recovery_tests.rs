//! Link and session loss: reconnect with backoff, fresh subscriptions,
//! and the interaction between recovery and the restart timer.

use warnbadge::app::events::AppEvent;
use warnbadge::app::service::{LoopPhase, LoopStep};
use warnbadge::app::session::SessionState;
use warnbadge::app::state::AlarmState;
use warnbadge::config::BadgeConfig;
use warnbadge::error::{LinkError, SessionError};

use crate::mock_ports::*;

fn ops_since(rig: &Rig, mark: usize) -> Vec<BrokerOp> {
    rig.badge.session().broker().ops[mark..].to_vec()
}

fn resubscribed() -> Vec<BrokerOp> {
    vec![
        BrokerOp::Close,
        BrokerOp::Open,
        BrokerOp::Subscribe(DEVICE_DOWN.into()),
        BrokerOp::Subscribe(BROADCAST.into()),
        BrokerOp::Subscribe(SHADOW_ACCEPTED.into()),
    ]
}

// ── Link loss ─────────────────────────────────────────────────

#[test]
fn link_drop_reconnects_and_resubscribes() {
    let mut rig = Rig::started();
    rig.ticks(3);
    let mark = rig.badge.session().broker().ops.len();

    rig.drop_link();
    let before = rig.clock.now_ms;
    assert_eq!(rig.tick(), LoopStep::Continue);

    // Close, handshake and all three subscriptions, with no publish in between.
    let ops = ops_since(&rig, mark);
    assert_eq!(&ops[..5], resubscribed().as_slice());
    assert_eq!(rig.badge.session().state(), SessionState::Connected);
    assert_eq!(rig.badge.session().subscriptions().len(), 3);
    assert_eq!(rig.link().attempts, 2);

    // Settle after association, settle after handshake, then the loop sleep.
    assert_eq!(rig.clock.now_ms - before, 1000 + 1000 + 250);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::LinkRestored { attempts: 1 }), 1);
}

#[test]
fn reconnect_backs_off_exponentially() {
    let mut rig = Rig::started();
    rig.tick();
    rig.drop_link();
    rig.link().fail_next = 3;

    let mark = rig.clock.sleeps.len();
    rig.tick();

    assert_eq!(
        rig.clock.sleeps[mark..],
        [2000, 4000, 8000, 1000, 1000, 250]
    );
    assert_eq!(rig.sink.count(|e| *e == AppEvent::LinkRestored { attempts: 4 }), 1);
}

#[test]
fn telemetry_resumes_immediately_after_long_outage() {
    let mut rig = Rig::started();
    rig.ticks(5);
    assert_eq!(rig.status_publishes(), 1);

    rig.drop_link();
    rig.link().fail_next = 2;
    rig.tick();

    // The outage outlasted the publish interval; the same tick publishes.
    assert_eq!(rig.status_publishes(), 2);
}

#[test]
fn messages_buffered_before_a_drop_are_discarded() {
    let mut rig = Rig::started();
    rig.tick();
    rig.broker().deliver(DEVICE_DOWN, br#"{"command":"enter_alarm"}"#);
    rig.drop_link();

    rig.ticks(10);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Safe);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe]);
}

#[test]
fn commands_after_recovery_are_applied() {
    let mut rig = Rig::started();
    rig.tick();
    rig.drop_link();
    rig.tick();

    rig.broker().deliver(BROADCAST, br#"{"command":"enter_alarm"}"#);
    rig.ticks(6);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe, AlarmState::Alarm]);
}

#[test]
fn permanent_link_error_skips_the_tick() {
    let mut rig = Rig::started();
    rig.ticks(5);
    let published = rig.status_publishes();

    rig.drop_link();
    rig.link().fail_with = LinkError::NoCredentials;
    rig.link().fail_next = 1;

    assert_eq!(rig.tick(), LoopStep::Continue);
    assert_eq!(rig.badge.session().state(), SessionState::Disconnected);
    assert_eq!(rig.status_publishes(), published);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LinkRestored { .. })), 0);

    // The next tick tries again.
    rig.tick();
    assert_eq!(rig.badge.session().state(), SessionState::Connected);
}

#[test]
fn start_fails_on_permanent_link_error() {
    let mut rig = Rig::with_config(BadgeConfig::default());
    rig.link().fail_with = LinkError::InvalidSsid;
    rig.link().fail_next = 1;

    let result = rig.badge.start(&mut rig.clock, &mut rig.sink);
    assert_eq!(result, Err(LinkError::InvalidSsid));
    assert_eq!(rig.badge.phase(), LoopPhase::Init);
}

#[test]
fn start_retries_transient_link_errors() {
    let mut rig = Rig::with_config(BadgeConfig::default());
    rig.link().fail_next = 2;
    rig.start();

    assert_eq!(rig.clock.sleeps, vec![2000, 4000, 1000, 1000]);
    assert_eq!(rig.badge.phase(), LoopPhase::Running);
}

// ── Session loss ──────────────────────────────────────────────

#[test]
fn broker_drop_with_link_up_reopens_session() {
    let mut rig = Rig::started();
    rig.ticks(2);
    let mark = rig.badge.session().broker().ops.len();

    rig.broker().open = false;
    rig.tick();

    assert_eq!(&ops_since(&rig, mark)[..5], resubscribed().as_slice());
    assert_eq!(rig.link().attempts, 1);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::LinkRestored { .. })), 0);
}

#[test]
fn failed_handshake_at_start_is_retried_next_tick() {
    let mut rig = Rig::with_config(BadgeConfig::default());
    rig.broker().fail_next_open = Some(SessionError::Rejected);
    rig.start();

    assert_eq!(rig.badge.phase(), LoopPhase::Running);
    assert_eq!(
        rig.sink.events,
        vec![
            AppEvent::SessionFailed(SessionError::Rejected),
            AppEvent::Started { session_up: false },
        ]
    );
    assert_eq!(rig.status_publishes(), 0);

    rig.tick();
    assert_eq!(rig.badge.session().state(), SessionState::Connected);
    assert_eq!(rig.broker().opens(), 2);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::SessionEstablished), 1);
}

#[test]
fn repeated_handshake_failures_keep_the_loop_alive() {
    let mut rig = Rig::started();
    rig.tick();

    for _ in 0..5 {
        rig.broker().open = false;
        rig.broker().fail_next_open = Some(SessionError::Timeout);
        assert_eq!(rig.tick(), LoopStep::Continue);
        assert_eq!(rig.badge.session().state(), SessionState::Disconnected);
    }
    assert_eq!(rig.sink.count(|e| *e == AppEvent::SessionFailed(SessionError::Timeout)), 5);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe]);
}

// ── Restart during recovery ───────────────────────────────────

#[test]
fn restart_fires_after_a_long_reconnect() {
    let mut config = BadgeConfig::default();
    config.reset_after_secs = Some(10);
    let mut rig = Rig::with_config(config);
    rig.start();
    rig.ticks(2);

    rig.drop_link();
    rig.link().fail_next = 3;
    // 14 s of backoff crosses the 10 s threshold inside one tick.
    assert_eq!(rig.tick(), LoopStep::Restart);
    assert_eq!(rig.badge.phase(), LoopPhase::Restart);
    assert_eq!(rig.badge.tick_count(), 3);
}
