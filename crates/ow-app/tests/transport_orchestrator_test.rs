mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use common::{harness, harness_with};
use ow_app::usecases::ApplyBridgeConfiguration;
use ow_core::settings::Settings;
use ow_core::transport::{BridgeConfiguration, ControlEvent, TransportError, TransportStatus};

#[tokio::test]
async fn start_boots_authenticates_and_opens_ports() {
    tokio::time::pause();
    let h = harness();

    h.orchestrator.start().await.expect("start should succeed");

    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.status, TransportStatus::PortsOpen);
    assert_eq!(snapshot.bootstrap_progress, 0);
    assert_eq!(
        h.calls().await,
        vec![
            "process.prepare_directories",
            "process.start",
            "pluggable.start",
            "control.connect",
            "process.read_auth_cookie",
            "control.authenticate 32",
            "control.take_ownership",
            "control.subscribe",
        ]
    );
    assert!(h.orchestrator.is_retry_armed().await);

    let launches = h.process.launches.lock().await;
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].owning_process, Some(4242));
    assert!(!launches[0].uses_bridges());
}

#[tokio::test]
async fn bootstrap_progress_is_monotonic_and_resets_on_next_start() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();

    h.emit(ControlEvent::bootstrap(10)).await;
    h.emit(ControlEvent::bootstrap(50)).await;
    h.emit(ControlEvent::bootstrap(30)).await;
    h.wait_for(|s| s.bootstrap_progress == 50).await;
    h.settle().await;
    assert_eq!(h.orchestrator.snapshot().bootstrap_progress, 50);

    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.bootstrap_progress == 100).await;

    h.orchestrator.stop().await.unwrap();
    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::Disconnected);
    assert_eq!(h.orchestrator.snapshot().bootstrap_progress, 0);

    h.orchestrator.start().await.unwrap();
    assert_eq!(h.orchestrator.snapshot().bootstrap_progress, 0);
    assert_eq!(h.count("process.start").await, 2);
}

#[tokio::test]
async fn second_start_and_stop_during_bootstrap_are_queued_latest_wins() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();

    h.orchestrator.start().await.unwrap();
    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::PortsOpen);
    assert_eq!(h.count("control.disconnect").await, 0);

    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.status == TransportStatus::Disconnected).await;

    assert_eq!(h.count("process.start").await, 1);
    assert_eq!(h.count("control.connect").await, 1);
    assert_eq!(h.count("control.disconnect").await, 1);
}

#[tokio::test]
async fn queued_start_after_stop_leaves_transport_up() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();

    h.orchestrator.stop().await.unwrap();
    h.orchestrator.start().await.unwrap();

    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.bootstrap_progress == 100).await;
    h.settle().await;

    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::PortsOpen);
    assert_eq!(h.count("process.start").await, 1);
    assert_eq!(h.count("control.disconnect").await, 0);
}

#[tokio::test]
async fn concurrent_starts_run_a_single_sequence() {
    tokio::time::pause();
    let h = harness();

    let (first, second) = tokio::join!(h.orchestrator.start(), h.orchestrator.start());
    assert!(first.is_ok());
    assert!(second.is_ok());

    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.bootstrap_progress == 100).await;
    h.settle().await;

    assert_eq!(h.count("process.start").await, 1);
    assert_eq!(h.count("control.connect").await, 1);
}

#[tokio::test]
async fn retry_timer_kicks_a_stalled_bootstrap() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();
    h.emit(ControlEvent::bootstrap(40)).await;
    h.wait_for(|s| s.bootstrap_progress == 40).await;

    tokio::time::sleep(Duration::from_secs(31)).await;
    h.settle().await;

    let kicks: Vec<String> = h
        .calls()
        .await
        .into_iter()
        .filter(|c| c.starts_with("control.set_config"))
        .collect();
    assert_eq!(
        kicks,
        vec![
            "control.set_config DisableNetwork=1",
            "control.set_config DisableNetwork=0",
        ]
    );
}

#[tokio::test]
async fn bootstrap_completion_cancels_the_retry_timer() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();

    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.bootstrap_progress == 100).await;
    assert!(!h.orchestrator.is_retry_armed().await);

    tokio::time::sleep(Duration::from_secs(60)).await;
    h.settle().await;
    assert_eq!(h.count("control.set_config DisableNetwork=1").await, 0);
}

#[tokio::test]
async fn circuit_established_promotes_ports_open_to_connected() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();

    h.emit(ControlEvent::CircuitEstablished).await;

    let snapshot = h.wait_for(|s| s.status == TransportStatus::Connected).await;
    assert!(snapshot.is_ready());
}

#[tokio::test]
async fn refused_connection_with_custom_bridges_falls_back_once() {
    tokio::time::pause();
    let mut settings = Settings::default();
    settings.transport.set_bridges(&BridgeConfiguration::custom(
        "obfs4 192.0.2.1:443 4352E58420E68F5E40BF7C74FADDCCD9D1349413 cert=x iat-mode=0",
    ));
    let h = harness_with(settings);
    h.connector.refusals_left.store(5, Ordering::SeqCst);

    h.orchestrator
        .start()
        .await
        .expect("fallback start should succeed");

    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::PortsOpen);
    assert!(!h.settings.current().await.transport.use_custom_bridges);
    assert_eq!(h.settings.saves.load(Ordering::SeqCst), 1);
    assert_eq!(h.connector.attempts.load(Ordering::SeqCst), 6);
    assert_eq!(h.count("process.start").await, 2);

    let launches = h.process.launches.lock().await;
    assert!(launches[0].uses_bridges());
    assert_eq!(launches[0].pluggable_transports.len(), 1);
    assert!(!launches[1].uses_bridges());
    assert!(launches[1].pluggable_transports.is_empty());
}

#[tokio::test]
async fn refused_connection_without_bridges_is_surfaced() {
    tokio::time::pause();
    let h = harness();
    h.connector.refusals_left.store(5, Ordering::SeqCst);

    let err = h.orchestrator.start().await.unwrap_err();

    assert!(err.is_connection_refused());
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.status, TransportStatus::Disconnected);
    assert_eq!(snapshot.last_error, Some(err));
    assert_eq!(h.settings.saves.load(Ordering::SeqCst), 0);
    assert_eq!(h.count("process.start").await, 1);

    h.orchestrator.start().await.expect("manual retry should run");
    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::PortsOpen);
}

#[tokio::test]
async fn authentication_failure_is_published_and_releases_the_lock() {
    tokio::time::pause();
    let h = harness();
    h.connector.reject_auth.store(true, Ordering::SeqCst);

    let err = h.orchestrator.start().await.unwrap_err();

    assert!(matches!(err, TransportError::AuthenticationFailed(_)));
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.status, TransportStatus::Disconnected);
    assert!(matches!(
        snapshot.last_error,
        Some(TransportError::AuthenticationFailed(_))
    ));
    assert_eq!(h.count("control.disconnect").await, 1);
    assert!(!h.orchestrator.is_retry_armed().await);

    h.connector.reject_auth.store(false, Ordering::SeqCst);
    h.orchestrator.start().await.expect("lock should be released");
}

#[tokio::test]
async fn missing_cookie_is_a_missing_credential() {
    tokio::time::pause();
    let h = harness();
    *h.process.cookie.lock().await = None;

    let err = h.orchestrator.start().await.unwrap_err();

    assert!(matches!(err, TransportError::MissingCredential(_)));
    assert_eq!(h.count("control.authenticate 32").await, 0);
}

#[tokio::test]
async fn stop_abandons_a_process_that_never_exits() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();
    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.bootstrap_progress == 100).await;
    h.process.hangs_on_stop.store(true, Ordering::SeqCst);

    let started = tokio::time::Instant::now();
    h.orchestrator.stop().await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(30));
    let snapshot = h.orchestrator.snapshot();
    assert_eq!(snapshot.status, TransportStatus::Disconnected);
    assert_eq!(
        snapshot.last_error,
        Some(TransportError::ShutdownTimedOut(Duration::from_secs(30)))
    );
    assert_eq!(h.count("process.abandon").await, 1);
}

#[tokio::test]
async fn closed_control_channel_marks_transport_disconnected() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();
    h.emit(ControlEvent::bootstrap(60)).await;
    h.wait_for(|s| s.bootstrap_progress == 60).await;

    h.connector.latest().await.close().await;

    let snapshot = h.wait_for(|s| s.status == TransportStatus::Disconnected).await;
    assert!(matches!(snapshot.last_error, Some(TransportError::Unknown(_))));
    assert_eq!(snapshot.bootstrap_progress, 0);
    assert!(!h.orchestrator.is_retry_armed().await);
}

#[tokio::test]
async fn kick_without_control_channel_is_missing_controller() {
    let h = harness();

    let err = h.orchestrator.kick().await.unwrap_err();

    assert_eq!(err, TransportError::MissingController);
}

#[tokio::test]
async fn stop_when_already_stopped_is_a_no_op() {
    let h = harness();

    h.orchestrator.stop().await.unwrap();

    assert!(h.calls().await.is_empty());
    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::Disconnected);
}

#[tokio::test]
async fn bridge_change_mid_bootstrap_relaunches_with_the_new_bridges() {
    tokio::time::pause();
    let h = harness();
    h.orchestrator.start().await.unwrap();
    h.emit(ControlEvent::bootstrap(40)).await;
    h.wait_for(|s| s.bootstrap_progress == 40).await;

    let apply_bridges =
        ApplyBridgeConfiguration::new(h.settings.clone(), Arc::new(h.orchestrator.clone()));
    apply_bridges
        .execute(BridgeConfiguration::custom(
            "obfs4 192.0.2.7:443 4352E58420E68F5E40BF7C74FADDCCD9D1349413 cert=x iat-mode=0",
        ))
        .await
        .unwrap();
    assert_eq!(h.count("process.start").await, 1);
    assert_eq!(h.count("control.disconnect").await, 0);

    h.emit(ControlEvent::bootstrap(100)).await;
    h.wait_for(|s| s.status == TransportStatus::PortsOpen && s.bootstrap_progress == 0)
        .await;

    assert_eq!(h.count("control.disconnect").await, 1);
    assert_eq!(h.count("process.start").await, 2);
    let launches = h.process.launches.lock().await;
    assert!(!launches[0].uses_bridges());
    assert!(launches[1].uses_bridges());
    assert_eq!(launches[1].pluggable_transports.len(), 1);
}

#[tokio::test]
async fn restart_when_idle_runs_a_plain_start() {
    tokio::time::pause();
    let h = harness();

    h.orchestrator.restart().await.unwrap();

    assert_eq!(h.orchestrator.snapshot().status, TransportStatus::PortsOpen);
    assert_eq!(h.count("process.start").await, 1);
    assert_eq!(h.count("control.disconnect").await, 0);
}

#[tokio::test]
async fn failed_start_terminates_the_process_it_launched() {
    tokio::time::pause();
    let h = harness();
    h.process.hangs_on_stop.store(true, Ordering::SeqCst);
    h.connector.reject_auth.store(true, Ordering::SeqCst);

    let err = h.orchestrator.start().await.unwrap_err();

    assert!(matches!(err, TransportError::AuthenticationFailed(_)));
    assert_eq!(h.count("process.abandon").await, 1);
    assert!(!h.process.active.load(Ordering::SeqCst));

    h.connector.reject_auth.store(false, Ordering::SeqCst);
    let retried = tokio::time::Instant::now();
    h.orchestrator.start().await.unwrap();

    assert!(retried.elapsed() < Duration::from_secs(1));
    assert_eq!(h.count("process.start").await, 2);
    assert_eq!(h.count("process.abandon").await, 1);
}

#[tokio::test]
async fn state_stays_available_while_subscribing() {
    tokio::time::pause();
    let h = harness();
    let gate = Arc::new(Notify::new());
    *h.connector.subscribe_gate.lock().await = Some(gate.clone());

    let orchestrator = h.orchestrator.clone();
    let starting = tokio::spawn(async move { orchestrator.start().await });
    h.wait_for(|s| s.status == TransportStatus::PortsOpen).await;

    tokio::time::timeout(Duration::from_secs(1), h.orchestrator.kick())
        .await
        .expect("kick should not wait for the subscription")
        .unwrap();
    assert_eq!(h.count("control.set_config DisableNetwork=1").await, 1);

    gate.notify_one();
    starting.await.unwrap().unwrap();
    assert!(h.orchestrator.is_retry_armed().await);
}
