//! Integration tests for the tokio runner
//!
//! These run in real time with a short poll period.

mod common;

use common::RecordingDisplay;
use sensorscope::clock::{Clock, SystemClock};
use sensorscope::config::AngularConfig;
use sensorscope::pipeline::{angular_loop, LoopCommand, LoopState, Runner};
use sensorscope::types::LinkStatus;
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> AngularConfig {
    AngularConfig {
        poll_period_ms: 10,
        ..AngularConfig::default()
    }
}

#[tokio::test]
async fn test_demo_until_shutdown() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let display = RecordingDisplay::new();
    let pl = angular_loop(&fast_config(), None, display.boxed(), clock.clone());
    let (runner, commands) = Runner::channel(pl, clock, 4);

    let control = async move {
        commands.send(LoopCommand::StartDemo).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        commands.send(LoopCommand::Shutdown).await.unwrap();
    };
    let (pl, ()) = tokio::join!(runner.run(), control);

    assert_eq!(pl.state(), LoopState::Idle);
    assert!(pl.pending_timer().is_none());
    assert!(pl.stats().polls >= 3, "only {} polls", pl.stats().polls);
    assert_eq!(display.links(), vec![LinkStatus::Demo, LinkStatus::Idle]);

    // Timestamps keep increasing across the run
    let snapshots = display.snapshots();
    assert!(snapshots
        .windows(2)
        .all(|w| w[1].timestamp > w[0].timestamp));
}

#[tokio::test]
async fn test_runner_exits_when_senders_drop() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let display = RecordingDisplay::new();
    let pl = angular_loop(&fast_config(), None, display.boxed(), clock.clone());
    let (runner, commands) = Runner::channel(pl, clock, 4);

    commands.send(LoopCommand::StartDemo).await.unwrap();
    drop(commands);

    let pl = tokio::time::timeout(Duration::from_secs(5), runner.run())
        .await
        .expect("runner should stop once every sender is gone");
    assert_eq!(pl.state(), LoopState::Idle);
}

#[tokio::test]
async fn test_disconnect_command_stops_polling() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let display = RecordingDisplay::new();
    let pl = angular_loop(&fast_config(), None, display.boxed(), clock.clone());
    let (runner, commands) = Runner::channel(pl, clock, 4);
    let observer = display.clone();

    let control = async move {
        commands.send(LoopCommand::StartDemo).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        commands.send(LoopCommand::Disconnect).await.unwrap();
        // Let the runner handle the disconnect before counting
        tokio::time::sleep(Duration::from_millis(20)).await;
        let published = observer.snapshots().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(observer.snapshots().len(), published);
        commands.send(LoopCommand::Shutdown).await.unwrap();
    };
    let (pl, ()) = tokio::join!(runner.run(), control);

    assert_eq!(pl.state(), LoopState::Idle);
    assert_eq!(display.links(), vec![LinkStatus::Demo, LinkStatus::Idle]);
}

#[cfg(feature = "mock-probe")]
mod live {
    use super::*;
    use sensorscope::backend::{Endpoint, MockConnector, MockTarget};
    use sensorscope::error::ConnectError;
    use sensorscope::types::SourceState;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_connect_reply_and_release() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let display = RecordingDisplay::new();
        let target = MockTarget::resolver(clock.clone(), 2.0);
        let pl = angular_loop(
            &fast_config(),
            Some(Box::new(MockConnector::new(target.clone()))),
            display.boxed(),
            clock.clone(),
        );
        let (runner, commands) = Runner::channel(pl, clock, 4);

        let control = async move {
            let (reply, result) = oneshot::channel();
            commands
                .send(LoopCommand::Connect {
                    endpoint: Endpoint::new("STM32F407VGTx", "firmware.elf"),
                    reply: Some(reply),
                })
                .await
                .unwrap();
            result.await.unwrap().unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
            commands.send(LoopCommand::Shutdown).await.unwrap();
        };
        let (pl, ()) = tokio::join!(runner.run(), control);

        assert_eq!(pl.source_state(), SourceState::Disconnected);
        assert_eq!(target.open_count(), 1);
        assert_eq!(target.live_sessions(), 0);
        assert_eq!(display.links(), vec![LinkStatus::Live, LinkStatus::Idle]);
        assert!(!display.snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_is_replied() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let display = RecordingDisplay::new();
        let target = MockTarget::resolver(clock.clone(), 2.0);
        target.fail_open(Some("no probe attached"));
        let pl = angular_loop(
            &fast_config(),
            Some(Box::new(MockConnector::new(target))),
            display.boxed(),
            clock.clone(),
        );
        let (runner, commands) = Runner::channel(pl, clock, 4);

        let control = async move {
            let (reply, result) = oneshot::channel();
            commands
                .send(LoopCommand::Connect {
                    endpoint: Endpoint::new("STM32F407VGTx", "firmware.elf"),
                    reply: Some(reply),
                })
                .await
                .unwrap();
            let outcome = result.await.unwrap();
            commands.send(LoopCommand::Shutdown).await.unwrap();
            outcome
        };
        let (pl, outcome) = tokio::join!(runner.run(), control);

        assert!(matches!(outcome, Err(ConnectError::NoProbe(_))));
        assert_eq!(pl.stats().polls, 0);
        // Shutdown of an idle loop reports nothing
        assert!(display.events().is_empty());
    }
}
