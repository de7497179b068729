//! Routage des messages MQTT vers les contrôleurs

use serverroom_devkit::{Record, TestRig};
use serverroom_gateway::models::EventType;
use serverroom_gateway::mqtt::Action;
use serverroom_gateway::telemetry::TelemetryWrite;
use std::time::Duration;
use tokio::time::Instant;

const DOOR: &str = "server-room/01/status/door";
const LOCK: &str = "server-room/01/commands/lock";

#[tokio::test(start_paused = true)]
async fn test_dispatch_routes_known_messages() {
    let rig = TestRig::new().unwrap();
    let dispatcher = rig.dispatcher();

    assert_eq!(dispatcher.dispatch(DOOR, b"OPEN").await, Some(Action::DoorOpen));
    assert_eq!(dispatcher.dispatch(LOCK, b"UNLOCK").await, Some(Action::Unlock));

    assert_eq!(rig.telemetry.events_of(EventType::DoorAlert).len(), 1);
    assert_eq!(rig.telemetry.events_of(EventType::LockControl).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_ignores_everything_else() {
    let rig = TestRig::new().unwrap();
    let dispatcher = rig.dispatcher();

    assert_eq!(dispatcher.dispatch(DOOR, b"CLOSED").await, None);
    assert_eq!(dispatcher.dispatch(DOOR, b"open").await, None);
    assert_eq!(dispatcher.dispatch(LOCK, b"LOCK").await, None);
    assert_eq!(dispatcher.dispatch("server-room/02/status/door", b"OPEN").await, None);

    assert!(rig.journal.records().is_empty());
    assert_eq!(rig.camera.grabs(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unlock_waits_for_running_alarm() {
    let rig = TestRig::new().unwrap();
    let dispatcher = rig.dispatcher();
    let start = Instant::now();

    dispatcher.dispatch(DOOR, b"OPEN").await;
    dispatcher.dispatch(LOCK, b"UNLOCK").await;

    let (lock_on_at, _) = rig.journal.relay_writes("lock")[0];
    assert!(lock_on_at - start >= Duration::from_millis(1500));

    let alert = rig
        .journal
        .position(|r| matches!(r, Record::Telemetry(TelemetryWrite::Event(e)) if e.kind == EventType::DoorAlert))
        .unwrap();
    let unlock = rig
        .journal
        .position(|r| matches!(r, Record::Telemetry(TelemetryWrite::Event(e)) if e.kind == EventType::LockControl))
        .unwrap();
    assert!(alert < unlock);
}

#[tokio::test(start_paused = true)]
async fn test_climate_runs_during_alarm() {
    let rig = TestRig::new().unwrap();
    let dispatcher = rig.dispatcher();
    let climate = rig.climate();

    let alarm = tokio::spawn(async move { dispatcher.dispatch(DOOR, b"OPEN").await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // le buzzer est tenu, le verrou des relais ne l'est pas
    assert!(rig.actuators.snapshot().buzzer);
    climate.evaluate(30.0);
    assert!(rig.actuators.fan_on());

    assert_eq!(alarm.await.unwrap(), Some(Action::DoorOpen));
    assert!(!rig.actuators.snapshot().buzzer);
    assert!(rig.actuators.fan_on());
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_fan_during_alarm() {
    let rig = TestRig::new().unwrap();
    let dispatcher = rig.dispatcher();
    let mut scheduler = rig.scheduler();

    let alarm = tokio::spawn(async move { dispatcher.dispatch(DOOR, b"OPEN").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rig.actuators.snapshot().buzzer);

    rig.sensor.push(30.0, 40.0);
    scheduler.tick(Instant::now()).await;

    // le statut publié pendant l'alarme porte l'état réel du ventilateur
    let statuses = rig.telemetry.statuses();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].fan_on);
    assert!(rig.actuators.snapshot().buzzer);

    assert_eq!(alarm.await.unwrap(), Some(Action::DoorOpen));
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_fan_off_during_lock_pulse() {
    let rig = TestRig::new().unwrap();
    let dispatcher = rig.dispatcher();
    let mut scheduler = rig.scheduler();

    let pulse = tokio::spawn(async move { dispatcher.dispatch(LOCK, b"UNLOCK").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rig.actuators.snapshot().lock);

    rig.sensor.push(25.0, 40.0);
    scheduler.tick(Instant::now()).await;

    let statuses = rig.telemetry.statuses();
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].fan_on);
    assert!(rig.actuators.snapshot().lock);

    assert_eq!(pulse.await.unwrap(), Some(Action::Unlock));
}
