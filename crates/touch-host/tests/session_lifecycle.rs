//! Session manager lifecycle tests against the scripted in-memory engine.
//!
//! Time-sensitive cases run with `start_paused`, so a 15 s handshake timeout
//! costs nothing in wall-clock time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use touch_core::{Command, CommandKind, ResponseStatus, ScreenSize};
use touch_host::application::session_manager::{SessionError, SessionManager};
use touch_host::domain::{SessionConfig, SessionTimeouts};
use touch_host::infrastructure::transport::mock::{
    EngineScript, ScriptedLauncher, TransportStats, EXIT_CRASHED,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn manager_with(script: EngineScript) -> (SessionManager, TransportStats) {
    let launcher = ScriptedLauncher::new(script);
    let stats = launcher.stats();
    (SessionManager::new(Arc::new(launcher)), stats)
}

fn tap(x: i32, y: i32) -> Command {
    Command::new(CommandKind::Tap {
        x,
        y,
        duration_ms: None,
    })
}

fn short_timeouts() -> SessionTimeouts {
    SessionTimeouts {
        handshake: Duration::from_secs(2),
        command: Duration::from_secs(1),
        shutdown: Duration::from_secs(1),
        terminate_grace: Duration::from_secs(1),
    }
}

// ── connect ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_sends_init_with_session_derived_id() {
    // Arrange
    let script = EngineScript {
        screen: ScreenSize {
            width: 1024,
            height: 600,
        },
        ..EngineScript::default()
    };
    let (manager, stats) = manager_with(script);
    let mut config = SessionConfig::new("kiosk");
    config.screen_width = Some(1024);
    config.screen_height = Some(600);

    // Act
    let id = manager.connect(config.clone()).await.unwrap();

    // Assert
    let received = stats.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, format!("init-{id}"));
    assert_eq!(
        received[0].kind,
        CommandKind::Init {
            screen_width: Some(1024),
            screen_height: Some(600),
        }
    );
    assert_eq!(stats.configs(), vec![config]);

    let info = manager.get_session(id).await.unwrap();
    assert!(info.active);
    assert_eq!(info.endpoint, "pi@kiosk:22");
    assert_eq!(
        info.screen,
        Some(ScreenSize {
            width: 1024,
            height: 600
        })
    );
    assert_eq!(info.to_string(), format!("{id} - pi@kiosk:22 (active)"));
}

#[tokio::test]
async fn test_connect_init_error_registers_nothing() {
    // Arrange
    let (manager, stats) = manager_with(EngineScript {
        init_error: Some("no touchscreen found".to_string()),
        ..EngineScript::default()
    });

    // Act
    let err = manager.connect(SessionConfig::new("kiosk")).await.unwrap_err();

    // Assert
    match err {
        SessionError::Connection { host, reason } => {
            assert_eq!(host, "kiosk");
            assert!(reason.contains("no touchscreen found"), "{reason}");
        }
        other => panic!("expected Connection, got {other:?}"),
    }
    assert!(manager.list_sessions().await.is_empty());
    assert_eq!(stats.exited(), 1);
}

#[tokio::test]
async fn test_connect_launch_failure_is_connection_error() {
    // Arrange
    let mut launcher = ScriptedLauncher::new(EngineScript::default());
    launcher.fail_launch = Some("ssh: not found".to_string());
    let stats = launcher.stats();
    let manager = SessionManager::new(Arc::new(launcher));

    // Act
    let result = manager.connect(SessionConfig::new("kiosk")).await;

    // Assert
    assert!(matches!(result, Err(SessionError::Connection { .. })));
    assert_eq!(stats.launches(), 0);
    assert!(manager.list_sessions().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_connect_handshake_timeout() {
    // Arrange
    let (manager, stats) = manager_with(EngineScript {
        silent: true,
        ..EngineScript::default()
    });
    let started = tokio::time::Instant::now();

    // Act
    let result = manager.connect(SessionConfig::new("kiosk")).await;

    // Assert
    let timeouts = manager.timeouts();
    let elapsed = started.elapsed();
    assert!(matches!(result, Err(SessionError::Connection { .. })));
    assert!(elapsed >= Duration::from_secs(15), "{elapsed:?}");
    assert!(
        elapsed < timeouts.handshake + timeouts.terminate_grace,
        "{elapsed:?}"
    );
    assert!(manager.list_sessions().await.is_empty());
    assert_eq!(stats.exited(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_stalled_launch_times_out() {
    // Arrange: the transport never gets as far as starting the engine
    let mut launcher = ScriptedLauncher::new(EngineScript::default());
    launcher.stall_launch = Some(Duration::from_secs(3600));
    let stats = launcher.stats();
    let manager = SessionManager::new(Arc::new(launcher)).with_timeouts(short_timeouts());
    let started = tokio::time::Instant::now();

    // Act
    let result = manager.connect(SessionConfig::new("kiosk")).await;

    // Assert
    let elapsed = started.elapsed();
    match result {
        Err(SessionError::Connection { host, reason }) => {
            assert_eq!(host, "kiosk");
            assert!(reason.contains("did not start"), "{reason}");
        }
        other => panic!("expected Connection, got {other:?}"),
    }
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    assert_eq!(stats.launches(), 0);
    assert!(manager.list_sessions().await.is_empty());
}

#[tokio::test]
async fn test_connect_crash_during_init_reports_stderr() {
    // Arrange
    let (manager, _stats) = manager_with(EngineScript {
        crash_on: Some("init".to_string()),
        stderr: "sudo: a password is required".to_string(),
        ..EngineScript::default()
    });

    // Act
    let err = manager.connect(SessionConfig::new("kiosk")).await.unwrap_err();

    // Assert
    let SessionError::Connection { reason, .. } = err else {
        panic!("expected Connection error");
    };
    assert!(reason.contains("a password is required"), "{reason}");
}

// ── send_command ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_command_returns_engine_response() {
    // Arrange
    let (manager, stats) = manager_with(EngineScript::default());
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    let command = tap(10, 20);
    let command_id = command.id.clone();

    // Act
    let response = manager.send_command(id, command).await.unwrap();

    // Assert
    assert_eq!(response.id, command_id);
    assert_eq!(response.status, ResponseStatus::Ok);
    assert_eq!(stats.received_types(), vec!["init", "tap"]);
}

#[tokio::test]
async fn test_concurrent_commands_are_serialized_per_session() {
    // Arrange
    let (manager, stats) = manager_with(EngineScript {
        reply_delay: Duration::from_millis(20),
        ..EngineScript::default()
    });
    let manager = Arc::new(manager);
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();

    // Act
    let tasks: Vec<_> = (0..5)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.send_command(id, tap(i, i)).await })
        })
        .collect();
    let mut ok = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            ok += 1;
        }
    }

    // Assert
    assert_eq!(ok, 5);
    assert_eq!(stats.max_in_flight(), 1);
    assert_eq!(stats.received().len(), 6);
}

#[tokio::test]
async fn test_send_command_unknown_session_is_not_found() {
    let (manager, _stats) = manager_with(EngineScript::default());
    let id = uuid::Uuid::new_v4();

    let result = manager.send_command(id, tap(1, 1)).await;

    assert!(matches!(result, Err(SessionError::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn test_key_press_response_converts_to_ok_result() {
    // Arrange
    let (manager, _stats) = manager_with(EngineScript::default());
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();

    // Act
    let response = manager
        .send_command(
            id,
            Command::new(CommandKind::KeyPress {
                key: "c".to_string(),
                modifiers: vec!["ctrl".to_string()],
            }),
        )
        .await
        .unwrap();

    // Assert
    assert!(response.into_result().is_ok());
}

#[tokio::test]
async fn test_transport_exit_fails_pending_command_and_deactivates() {
    // Arrange
    let (manager, _stats) = manager_with(EngineScript {
        crash_on: Some("swipe".to_string()),
        stderr: "thread 'main' panicked".to_string(),
        ..EngineScript::default()
    });
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    let swipe = Command::new(CommandKind::Swipe {
        x: 0,
        y: 0,
        x2: 100,
        y2: 100,
        duration_ms: None,
        steps: None,
    });

    // Act
    let err = manager.send_command(id, swipe).await.unwrap_err();

    // Assert
    match err {
        SessionError::TransportClosed { code, stderr } => {
            assert_eq!(code, Some(EXIT_CRASHED));
            assert!(stderr.contains("panicked"), "{stderr}");
        }
        other => panic!("expected TransportClosed, got {other:?}"),
    }

    let sessions = manager.list_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].active);
    assert!(sessions[0].to_string().ends_with("(inactive)"));

    let again = manager.send_command(id, tap(1, 1)).await;
    assert!(matches!(again, Err(SessionError::Inactive(_))));
}

#[tokio::test(start_paused = true)]
async fn test_list_sessions_notices_unexpected_exit_without_a_command() {
    // Arrange
    let (manager, _stats) = manager_with(EngineScript {
        exit_after_init: Some(Duration::from_millis(100)),
        stderr: "usb: device disconnected".to_string(),
        ..EngineScript::default()
    });
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    assert!(manager.get_session(id).await.unwrap().active);

    // Act
    tokio::time::sleep(Duration::from_millis(500)).await;

    // Assert
    let sessions = manager.list_sessions().await;
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].active);
}

#[tokio::test]
async fn test_response_for_other_id_is_protocol_violation() {
    // Arrange
    let (manager, _stats) = manager_with(EngineScript {
        wrong_id_for: Some("tap".to_string()),
        ..EngineScript::default()
    });
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    let command = tap(5, 5);
    let command_id = command.id.clone();

    // Act
    let err = manager.send_command(id, command).await.unwrap_err();

    // Assert
    match err {
        SessionError::ProtocolViolation { expected, received } => {
            assert_eq!(expected, command_id);
            assert_eq!(received, format!("not-{command_id}"));
        }
        other => panic!("expected ProtocolViolation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_late_response_after_timeout_is_discarded() {
    // Arrange
    let mut slow = HashMap::new();
    slow.insert("long_press".to_string(), Duration::from_millis(1500));
    let launcher = ScriptedLauncher::new(EngineScript {
        slow,
        ..EngineScript::default()
    });
    let manager = SessionManager::new(Arc::new(launcher)).with_timeouts(short_timeouts());
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    let long_press = Command::new(CommandKind::LongPress {
        x: 1,
        y: 1,
        duration_ms: None,
    });

    // Act
    let first = manager.send_command(id, long_press).await;
    let follow_up = tap(2, 2);
    let follow_up_id = follow_up.id.clone();
    let second = manager.send_command(id, follow_up).await;

    // Assert
    assert!(matches!(
        first,
        Err(SessionError::CommandTimeout {
            kind: "long_press",
            ..
        })
    ));
    let second = second.unwrap();
    assert_eq!(second.id, follow_up_id);
    assert!(manager.get_session(id).await.unwrap().active);
}

// ── disconnect ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disconnect_sends_shutdown_and_forgets_session() {
    // Arrange
    let (manager, stats) = manager_with(EngineScript::default());
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();

    // Act
    manager.disconnect(id).await.unwrap();

    // Assert
    let received = stats.received();
    assert_eq!(stats.received_types(), vec!["init", "shutdown"]);
    assert_eq!(received[1].id, format!("shutdown-{id}"));
    assert_eq!(stats.exited(), 1);
    assert_eq!(stats.killed(), 0);
    assert!(manager.get_session(id).await.is_none());
    assert!(matches!(
        manager.disconnect(id).await,
        Err(SessionError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_kills_transport_when_shutdown_is_ignored() {
    // Arrange
    let launcher = ScriptedLauncher::new(EngineScript {
        silent_after_init: true,
        ignore_terminate: true,
        ..EngineScript::default()
    });
    let stats = launcher.stats();
    let manager = SessionManager::new(Arc::new(launcher)).with_timeouts(short_timeouts());
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();

    // Act
    manager.disconnect(id).await.unwrap();

    // Assert
    assert_eq!(stats.terminated(), 1);
    assert_eq!(stats.killed(), 1);
    assert_eq!(stats.exited(), 1);
    assert!(manager.list_sessions().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_slow_command_skips_shutdown() {
    // Arrange: a tap the engine takes a minute to answer, with the default
    // 30 s command timeout
    let mut slow = HashMap::new();
    slow.insert("tap".to_string(), Duration::from_secs(60));
    let (manager, stats) = manager_with(EngineScript {
        slow,
        ..EngineScript::default()
    });
    let manager = Arc::new(manager);
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    let pending = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.send_command(id, tap(1, 1)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let started = tokio::time::Instant::now();

    // Act
    manager.disconnect(id).await.unwrap();

    // Assert
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
    assert_eq!(stats.received_types(), vec!["init", "tap"]);
    assert_eq!(stats.terminated(), 1);
    assert!(manager.get_session(id).await.is_none());
    assert!(matches!(
        pending.await.unwrap(),
        Err(SessionError::TransportClosed { .. })
    ));
}

#[tokio::test]
async fn test_disconnect_after_crash_still_removes_session() {
    // Arrange
    let (manager, _stats) = manager_with(EngineScript {
        crash_on: Some("tap".to_string()),
        ..EngineScript::default()
    });
    let id = manager.connect(SessionConfig::new("kiosk")).await.unwrap();
    let _ = manager.send_command(id, tap(1, 1)).await;

    // Act
    let result = manager.disconnect(id).await;

    // Assert
    assert!(result.is_ok());
    assert!(manager.list_sessions().await.is_empty());
}

#[tokio::test]
async fn test_disconnect_all_closes_every_session() {
    // Arrange
    let (manager, stats) = manager_with(EngineScript::default());
    manager.connect(SessionConfig::new("kiosk-b")).await.unwrap();
    manager.connect(SessionConfig::new("kiosk-a")).await.unwrap();
    let listed: Vec<String> = manager
        .list_sessions()
        .await
        .into_iter()
        .map(|s| s.endpoint)
        .collect();

    // Act
    manager.disconnect_all().await;

    // Assert
    assert_eq!(listed, vec!["pi@kiosk-a:22", "pi@kiosk-b:22"]);
    assert!(manager.list_sessions().await.is_empty());
    assert_eq!(stats.exited(), 2);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    // Arrange: "tap" crashes every engine, so only the first session gets one.
    let (manager, _stats) = manager_with(EngineScript {
        crash_on: Some("tap".to_string()),
        ..EngineScript::default()
    });
    let crashed = manager.connect(SessionConfig::new("kiosk-a")).await.unwrap();
    let healthy = manager.connect(SessionConfig::new("kiosk-b")).await.unwrap();

    // Act
    let _ = manager.send_command(crashed, tap(1, 1)).await;
    let response = manager
        .send_command(
            healthy,
            Command::new(CommandKind::KeyType {
                text: "hi".to_string(),
            }),
        )
        .await;

    // Assert
    assert!(response.is_ok());
    assert!(!manager.get_session(crashed).await.unwrap().active);
    assert!(manager.get_session(healthy).await.unwrap().active);
}
