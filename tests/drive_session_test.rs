mod common;

use common::*;
use rover_pilot::core::drive::{DriveMode, DriveSettings};
use rover_pilot::core::session::{ExitReason, SessionOptions};
use rover_pilot::{DriveController, DriveSession, Rover};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn full_speed() -> DriveSettings {
    DriveSettings {
        initial_gear: 3,
        ..Default::default()
    }
}

fn session(
    input: ScriptedInput,
    transport: &MockTransport,
    settings: DriveSettings,
    options: SessionOptions,
) -> DriveSession<ScriptedInput, MockTransport> {
    let rover = Rover::with_response_delay(transport.clone(), Duration::ZERO);
    DriveSession::new(input, rover, DriveController::new(settings), options)
}

#[tokio::test]
async fn test_drive_then_quit_stops_rover() {
    let transport = MockTransport::default();
    let input = ScriptedInput::new(vec![
        axis(RIGHT_TRIGGER, 100),
        axis(LEFT_STICK_X, -50),
        axis(LEFT_STICK_X, -50),
        press(BUTTON_GUIDE),
        // Never read: the session has already quit.
        axis(RIGHT_TRIGGER, 20),
    ]);

    let summary = session(input, &transport, full_speed(), SessionOptions::default())
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::QuitButton);
    assert_eq!(summary.events, 4);
    assert_eq!(summary.drive_commands, 2);
    assert_eq!(summary.commands_sent, 3);

    assert_eq!(
        transport.commands(),
        vec![
            json!({"T": 1, "L": 255, "R": 255}),
            json!({"T": 1, "L": 255, "R": 128}),
            json!({"T": 1, "L": 0, "R": 0}),
        ]
    );
    assert!(transport.is_closed());
}

#[tokio::test]
async fn test_input_closed_ends_session() {
    let transport = MockTransport::default();
    let input = ScriptedInput::new(vec![axis(RIGHT_TRIGGER, 40)]);

    let summary = session(input, &transport, full_speed(), SessionOptions::default())
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::InputClosed);
    assert_eq!(
        transport.commands().last(),
        Some(&json!({"T": 1, "L": 0, "R": 0}))
    );
    assert!(transport.is_closed());
}

#[tokio::test]
async fn test_shutdown_future_ends_session() {
    let transport = MockTransport::default();
    let input = ScriptedInput::held_open(vec![]);

    let summary = session(input, &transport, full_speed(), SessionOptions::default())
        .run(async {})
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::Shutdown);
    assert_eq!(summary.events, 0);
    assert_eq!(transport.commands(), vec![json!({"T": 1, "L": 0, "R": 0})]);
}

#[tokio::test]
async fn test_emergency_stop_and_rearm() {
    let transport = MockTransport::default();
    let input = ScriptedInput::new(vec![
        axis(RIGHT_TRIGGER, 100),
        press(BUTTON_B),
        axis(RIGHT_TRIGGER, 60),
        press(BUTTON_START),
        axis(RIGHT_TRIGGER, 50),
    ]);

    let summary = session(input, &transport, full_speed(), SessionOptions::default())
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.emergency_stops, 1);
    assert_eq!(summary.drive_commands, 2);
    assert_eq!(
        transport.commands(),
        vec![
            json!({"T": 1, "L": 255, "R": 255}),
            json!({"T": 0}),
            json!({"T": 1, "L": 128, "R": 128}),
            json!({"T": 1, "L": 0, "R": 0}),
        ]
    );
}

#[tokio::test]
async fn test_queued_events_send_only_latest_speed() {
    let transport = MockTransport::default();
    let sweep = (1..=100).map(|pct| axis(RIGHT_TRIGGER, pct)).collect();

    let summary = session(
        ScriptedInput::burst(sweep),
        &transport,
        full_speed(),
        SessionOptions::default(),
    )
    .run(std::future::pending())
    .await
    .unwrap();

    assert_eq!(summary.events, 100);
    assert_eq!(summary.drive_commands, 1);
    assert_eq!(
        transport.commands(),
        vec![
            json!({"T": 1, "L": 255, "R": 255}),
            json!({"T": 1, "L": 0, "R": 0}),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_emergency_stop_skips_queued_drive_commands() {
    let transport = MockTransport::default();
    let mut events: Vec<_> = (1..=100).map(|pct| axis(RIGHT_TRIGGER, pct)).collect();
    events.push(press(BUTTON_B));

    let rover = Rover::with_response_delay(transport.clone(), Duration::from_millis(50));
    let session = DriveSession::new(
        ScriptedInput::burst(events),
        rover,
        DriveController::new(full_speed()),
        SessionOptions::default(),
    );

    let started = tokio::time::Instant::now();
    let summary = session.run(std::future::pending()).await.unwrap();

    assert_eq!(summary.emergency_stops, 1);
    assert_eq!(summary.drive_commands, 0);
    assert_eq!(
        transport.commands(),
        vec![json!({"T": 0}), json!({"T": 1, "L": 0, "R": 0})]
    );
    // One reply wait for the stop and one for the final zero speed.
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[tokio::test]
async fn test_tank_mode_session() {
    let transport = MockTransport::default();
    let input = ScriptedInput::new(vec![axis(1, 100), axis(4, -100)]);
    let settings = DriveSettings {
        mode: DriveMode::Tank,
        ..full_speed()
    };

    session(input, &transport, settings, SessionOptions::default())
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(
        transport.commands_of_type(1),
        vec![
            json!({"T": 1, "L": 255, "R": 0}),
            json!({"T": 1, "L": 255, "R": -255}),
            json!({"T": 1, "L": 0, "R": 0}),
        ]
    );
}

#[tokio::test]
async fn test_power_button_records_telemetry_and_updates_oled() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let csv_path = dir.path().join("power.csv");
    let transport = MockTransport::with_power(power_reply(10.8));
    let input = ScriptedInput::new(vec![press(BUTTON_BACK), press(BUMPER_RIGHT)]);

    let options = SessionOptions {
        telemetry_interval: None,
        telemetry_csv: Some(csv_path.clone()),
        oled_status: true,
    };

    let summary = session(input, &transport, DriveSettings::default(), options)
        .run(std::future::pending())
        .await?;

    assert_eq!(summary.power_reports, 1);
    assert_eq!(transport.commands_of_type(70).len(), 1);

    let oled: Vec<(i64, String)> = transport
        .commands_of_type(3)
        .iter()
        .map(|c| {
            (
                c["lineNum"].as_i64().unwrap(),
                c["Text"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        oled,
        vec![
            (0, "rover-pilot".to_string()),
            (1, "Gear 2 50%".to_string()),
            (3, "Bat 50% 10.80V".to_string()),
            (1, "Gear 3 75%".to_string()),
        ]
    );

    let content = std::fs::read_to_string(&csv_path)?;
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("Charger: OFF, PowerSwitch: ON"));
    Ok(())
}

#[tokio::test]
async fn test_missing_power_reply_does_not_end_session() {
    let transport = MockTransport::default();
    let input = ScriptedInput::new(vec![press(BUTTON_BACK), axis(RIGHT_TRIGGER, 100)]);

    let summary = session(input, &transport, full_speed(), SessionOptions::default())
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.reason, ExitReason::InputClosed);
    assert_eq!(summary.power_reports, 0);
    assert_eq!(summary.drive_commands, 1);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_telemetry() {
    let transport = MockTransport::with_power(power_reply(12.0));
    let input = ScriptedInput::held_open(vec![]);
    let options = SessionOptions {
        telemetry_interval: Some(Duration::from_secs(1)),
        telemetry_csv: None,
        oled_status: false,
    };

    let summary = session(input, &transport, full_speed(), options)
        .run(tokio::time::sleep(Duration::from_millis(2500)))
        .await
        .unwrap();

    // Interval fires immediately, then at 1s and 2s.
    assert_eq!(summary.power_reports, 3);
    assert_eq!(summary.reason, ExitReason::Shutdown);
}
