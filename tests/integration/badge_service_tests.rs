//! Steady-state loop: bring-up order, rendering, command handling,
//! telemetry cadence and the scheduled restart.

use warnbadge::app::events::AppEvent;
use warnbadge::app::service::{LoopPhase, LoopStep};
use warnbadge::app::state::AlarmState;
use warnbadge::config::BadgeConfig;
use warnbadge::error::DecodeError;
use warnbadge::topics::Channel;

use crate::mock_ports::*;

/// With the default config, bring-up ends at t=2000 and the first
/// telemetry cycle runs on tick 5 (t=3000).
const FIRST_TELEMETRY_TICK: usize = 5;

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn start_connects_syncs_and_subscribes() {
    let rig = Rig::started();

    assert_eq!(rig.badge.phase(), LoopPhase::Running);
    assert_eq!(rig.clock.syncs, 1);
    // Two settle delays: after association and after the handshake.
    assert_eq!(rig.clock.sleeps, vec![1000, 1000]);
    assert_eq!(rig.clock.now_ms, 2000);

    let ops = &rig.badge.session().broker().ops;
    assert_eq!(
        ops.as_slice(),
        &[
            BrokerOp::Open,
            BrokerOp::Subscribe(DEVICE_DOWN.into()),
            BrokerOp::Subscribe(BROADCAST.into()),
            BrokerOp::Subscribe(SHADOW_ACCEPTED.into()),
        ]
    );
    assert_eq!(
        rig.sink.events,
        vec![AppEvent::SessionEstablished, AppEvent::Started { session_up: true }]
    );
}

#[test]
fn tick_before_start_does_nothing() {
    let mut rig = Rig::with_config(BadgeConfig::default());
    assert_eq!(rig.tick(), LoopStep::Continue);
    assert_eq!(rig.badge.tick_count(), 0);
    assert!(rig.display.renders.is_empty());
    assert!(rig.clock.sleeps.is_empty());
}

#[test]
fn second_start_is_ignored() {
    let mut rig = Rig::started();
    let opens = rig.broker().opens();
    rig.start();
    assert_eq!(rig.broker().opens(), opens);
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = BadgeConfig::default();
    config.publish_interval_ms = 0;
    let result = warnbadge::app::service::BadgeService::new(
        &config,
        MockLink::new(),
        MockBroker::new(),
        credentials(),
    );
    assert!(result.is_err());
}

// ── Rendering ─────────────────────────────────────────────────

#[test]
fn first_tick_renders_safe_once() {
    let mut rig = Rig::started();
    rig.ticks(10);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe]);
    assert_eq!(rig.badge.rendered_state(), Some(AlarmState::Safe));
}

#[test]
fn broadcast_enter_alarm_renders_alarm_once() {
    let mut rig = Rig::started();
    rig.tick();
    rig.broker()
        .deliver(BROADCAST, br#"{"command":"enter_alarm"}"#);

    // Routed at the first telemetry poll, drawn on the following tick.
    rig.ticks(FIRST_TELEMETRY_TICK - 1);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe]);

    rig.ticks(20);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe, AlarmState::Alarm]);
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::AlarmChanged {
                from: AlarmState::Safe,
                to: AlarmState::Alarm,
                via: Channel::BroadcastCommand
            }
        )),
        1
    );
}

#[test]
fn device_exit_alarm_returns_to_safe() {
    let mut rig = Rig::started();
    rig.broker().deliver(DEVICE_DOWN, br#"{"command":"enter_alarm"}"#);
    rig.ticks(FIRST_TELEMETRY_TICK + 1);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);

    rig.broker().deliver(DEVICE_DOWN, br#"{"command":"exit_alarm"}"#);
    rig.ticks(5);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Safe);
    assert_eq!(
        rig.display.renders,
        vec![AlarmState::Safe, AlarmState::Alarm, AlarmState::Safe]
    );
}

#[test]
fn shadow_desired_safe_clears_alarm() {
    let mut rig = Rig::started();
    rig.broker().deliver(DEVICE_DOWN, br#"{"command":"enter_alarm"}"#);
    rig.ticks(FIRST_TELEMETRY_TICK + 1);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);

    rig.broker().deliver(
        SHADOW_ACCEPTED,
        br#"{"state":{"desired":{"alarm_state":0}},"version":12}"#,
    );
    rig.ticks(5);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Safe);
    assert_eq!(rig.display.renders.last(), Some(&AlarmState::Safe));
}

#[test]
fn last_message_in_a_batch_wins() {
    let mut rig = Rig::started();
    {
        let broker = rig.broker();
        broker.deliver(DEVICE_DOWN, br#"{"command":"enter_alarm"}"#);
        broker.deliver(BROADCAST, br#"{"command":"exit_alarm"}"#);
        broker.deliver(SHADOW_ACCEPTED, br#"{"state":{"desired":{"alarm_state":1}}}"#);
    }
    rig.ticks(FIRST_TELEMETRY_TICK + 1);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);
    // Intermediate states in one batch never reach the screen.
    assert_eq!(rig.display.renders, vec![AlarmState::Safe, AlarmState::Alarm]);
}

#[test]
fn malformed_messages_are_dropped_without_effect() {
    let mut rig = Rig::started();
    {
        let broker = rig.broker();
        broker.deliver(DEVICE_DOWN, b"not json");
        broker.deliver(BROADCAST, br#"{"cmd":"enter_alarm"}"#);
        broker.deliver(SHADOW_ACCEPTED, br#"{"state":{"desired":{"alarm_state":7}}}"#);
        broker.deliver(DEVICE_DOWN, br#"{"command":"self_destruct"}"#);
        broker.deliver("some/other/topic", br#"{"command":"enter_alarm"}"#);
    }
    rig.ticks(FIRST_TELEMETRY_TICK + 4);

    assert_eq!(rig.badge.alarm_state(), AlarmState::Safe);
    assert_eq!(rig.display.renders, vec![AlarmState::Safe]);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AlarmChanged { .. })), 0);

    let drops: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::MessageDropped { channel, reason } => Some((*channel, *reason)),
            _ => None,
        })
        .collect();
    assert_eq!(
        drops,
        vec![
            (Channel::DeviceCommand, DecodeError::InvalidJson),
            (Channel::BroadcastCommand, DecodeError::SchemaMismatch),
            (Channel::ShadowGetAccepted, DecodeError::InvalidAlarmState),
        ]
    );
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_runs_once_per_interval() {
    let mut rig = Rig::started();
    rig.ticks(FIRST_TELEMETRY_TICK - 1);
    assert_eq!(rig.status_publishes(), 0);

    rig.tick();
    assert_eq!(rig.status_publishes(), 1);

    // 250 ms loop, 1 s interval: one cycle every four ticks.
    rig.ticks(3);
    assert_eq!(rig.status_publishes(), 1);
    rig.tick();
    assert_eq!(rig.status_publishes(), 2);
}

#[test]
fn telemetry_cycle_publishes_in_order() {
    let mut rig = Rig::started();
    rig.ticks(FIRST_TELEMETRY_TICK);

    let publishes: Vec<_> = rig
        .badge
        .session()
        .broker()
        .ops
        .iter()
        .filter(|op| matches!(op, BrokerOp::Publish(_)))
        .cloned()
        .collect();
    assert_eq!(
        publishes,
        vec![
            BrokerOp::Publish(SHADOW_GET.into()),
            BrokerOp::Publish(DEVICE_UP.into()),
            BrokerOp::Publish(SHADOW_UPDATE.into()),
        ]
    );
}

#[test]
fn status_report_contents() {
    let mut rig = Rig::started();
    rig.broker().deliver(DEVICE_DOWN, br#"{"command":"enter_alarm"}"#);
    rig.ticks(FIRST_TELEMETRY_TICK);

    let broker = rig.broker();
    assert_eq!(broker.published_to(SHADOW_GET), vec![&b""[..]]);

    let status: serde_json::Value =
        serde_json::from_slice(broker.published_to(DEVICE_UP)[0]).unwrap();
    assert_eq!(status["device_id"], "WarningBadge_1");
    assert_eq!(status["time_seconds"], WALL_CLOCK_BASE + 3);
    assert_eq!(status["uptime"], 1);
    // The message arrived in the same poll, so the report already shows it.
    assert_eq!(status["alarm_state"], 1);

    let update: serde_json::Value =
        serde_json::from_slice(broker.published_to(SHADOW_UPDATE)[0]).unwrap();
    assert_eq!(update["state"]["reported"]["alarm_state"], 1);
}

#[test]
fn time_offset_is_applied_to_reports() {
    let mut config = BadgeConfig::default();
    config.time_offset_secs = -3600;
    let mut rig = Rig::with_config(config);
    rig.start();
    rig.ticks(FIRST_TELEMETRY_TICK);

    let status: serde_json::Value =
        serde_json::from_slice(rig.broker().published_to(DEVICE_UP)[0]).unwrap();
    assert_eq!(status["time_seconds"], WALL_CLOCK_BASE + 3 - 3600);
}

#[test]
fn rejected_publishes_do_not_stop_the_loop() {
    let mut rig = Rig::started();
    rig.broker().reject_publish = true;
    rig.ticks(FIRST_TELEMETRY_TICK + 8);

    assert_eq!(rig.status_publishes(), 0);
    let reports: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::TelemetrySent(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    // Cadence holds even though every publish failed.
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.failures() == 3));

    rig.broker().reject_publish = false;
    rig.ticks(4);
    assert_eq!(rig.status_publishes(), 1);
}

// ── Scheduled restart ─────────────────────────────────────────

#[test]
fn restart_after_configured_uptime() {
    let mut config = BadgeConfig::default();
    config.reset_after_secs = Some(10);
    let mut rig = Rig::with_config(config);
    rig.start();

    for _ in 0..39 {
        assert_eq!(rig.tick(), LoopStep::Continue);
    }
    assert_eq!(rig.tick(), LoopStep::Restart);
    assert_eq!(rig.badge.phase(), LoopPhase::Restart);
    assert_eq!(rig.badge.tick_count(), 40);
    assert_eq!(rig.status_publishes(), 9);
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::RestartScheduled { uptime_secs: 10 })
    );

    // Terminal: further ticks do no work.
    let sleeps = rig.clock.sleeps.len();
    assert_eq!(rig.tick(), LoopStep::Restart);
    assert_eq!(rig.clock.sleeps.len(), sleeps);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::RestartScheduled { .. })), 1);
}

#[test]
fn restart_fires_once_while_in_alarm() {
    let mut config = BadgeConfig::default();
    config.reset_after_secs = Some(10);
    let mut rig = Rig::with_config(config);
    rig.start();

    rig.broker().deliver(BROADCAST, br#"{"command":"enter_alarm"}"#);
    rig.ticks(FIRST_TELEMETRY_TICK + 1);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);
    assert_eq!(rig.badge.rendered_state(), Some(AlarmState::Alarm));

    let mut restarts = 0;
    for _ in 0..60 {
        if rig.tick() == LoopStep::Restart {
            restarts += 1;
        }
    }
    // Tick 40 crosses the threshold; later ticks report the terminal phase.
    assert!(restarts > 0);
    assert_eq!(rig.badge.tick_count(), 40);
    assert_eq!(rig.badge.alarm_state(), AlarmState::Alarm);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::RestartScheduled { .. })), 1);
    assert_eq!(
        rig.sink.events.iter().rev().find(|e| matches!(e, AppEvent::RestartScheduled { .. })),
        Some(&AppEvent::RestartScheduled { uptime_secs: 10 })
    );
}

#[test]
fn run_until_restart_returns_at_threshold() {
    let mut config = BadgeConfig::default();
    config.reset_after_secs = Some(5);
    let mut rig = Rig::with_config(config);
    rig.start();

    rig.badge
        .run_until_restart(&mut rig.display, &mut rig.clock, &mut rig.sink);
    assert_eq!(rig.badge.tick_count(), 20);
    assert_eq!(rig.clock.now_ms, 2000 + 5000);
}

#[test]
fn restart_disabled_keeps_running() {
    let mut config = BadgeConfig::default();
    config.reset_after_secs = None;
    let mut rig = Rig::with_config(config);
    rig.start();

    // Well past the default one-hour threshold.
    for _ in 0..(4 * 3600 + 100) {
        assert_eq!(rig.tick(), LoopStep::Continue);
    }
    assert_eq!(rig.badge.phase(), LoopPhase::Running);
}
