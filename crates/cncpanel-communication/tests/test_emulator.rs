use cncpanel_communication::{CommandChannel, EmulatorChannel, EmulatorConfig, MachineCommand};
use cncpanel_core::{
    event_queue, AckOutcome, Acknowledgment, ChannelEvent, EventReceiver, OperationKind,
    PanelEvent,
};
use std::time::Duration;

fn fast_config() -> EmulatorConfig {
    EmulatorConfig {
        ack_delay: Duration::from_millis(10),
        line_delay: Duration::from_millis(20),
        home_delay: Duration::from_millis(100),
        probe_delay: Duration::from_millis(100),
        fail_probe: false,
    }
}

async fn next_channel_event(rx: &mut EventReceiver) -> ChannelEvent {
    match rx.recv().await {
        Some(PanelEvent::Channel(event)) => event,
        other => panic!("expected a channel event, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_home_is_acknowledged() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator.send(MachineCommand::HomeXyz).unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::success(OperationKind::HomeXyz))
    );
}

#[tokio::test(start_paused = true)]
async fn test_probe_failure() {
    let (tx, mut rx) = event_queue();
    let config = EmulatorConfig {
        fail_probe: true,
        ..fast_config()
    };
    let mut emulator = EmulatorChannel::new(tx, config);

    emulator.send(MachineCommand::ProbeZ).unwrap();
    match next_channel_event(&mut rx).await {
        ChannelEvent::Acknowledgment(ack) => {
            assert_eq!(ack.correlates_to, OperationKind::ProbeZ);
            assert!(matches!(ack.outcome, AckOutcome::Failure(_)));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_load_rejects_malformed_program() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator
        .send(MachineCommand::Load {
            text: "G21\nG1 X?\n".to_string(),
        })
        .unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::failure(
            OperationKind::Load,
            "line 2: word 'X' has no valid number"
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_streams_and_completes() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator
        .send(MachineCommand::Start {
            text: "G21\nG1 X10\n".to_string(),
        })
        .unwrap();

    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::success(OperationKind::Start))
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 0 }
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 1 }
    );
    assert!(matches!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Completed { .. }
    ));
    assert_eq!(emulator.next_line(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_tool_change_pauses_then_continue_resumes() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator
        .send(MachineCommand::Start {
            text: "G0 X0\nM6 T2\nG1 X5".to_string(),
        })
        .unwrap();

    assert!(matches!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(_)
    ));
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 0 }
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 1 }
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Paused {
            reason: Some("Please insert tool #2".to_string())
        }
    );

    emulator.send(MachineCommand::Continue).unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::success(OperationKind::Continue))
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 2 }
    );
    assert!(matches!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Completed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_continue_after_final_line_pause_completes() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator
        .send(MachineCommand::Start {
            text: "G1 X10\nM0\n".to_string(),
        })
        .unwrap();

    assert!(matches!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(_)
    ));
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 0 }
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 1 }
    );
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Paused {
            reason: Some("Pause".to_string())
        }
    );
    assert_eq!(emulator.next_line(), 2);

    emulator.send(MachineCommand::Continue).unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::success(OperationKind::Continue))
    );
    assert!(matches!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Completed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_continue_without_program_fails() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator.send(MachineCommand::Continue).unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::failure(
            OperationKind::Continue,
            "no program to continue"
        ))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_streaming() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    let program: String = (0..50).map(|i| format!("G1 X{}\n", i)).collect();
    emulator.send(MachineCommand::Start { text: program }).unwrap();

    assert!(matches!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(_)
    ));
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Progress { line: 0 }
    );

    emulator.send(MachineCommand::Stop).unwrap();
    assert!(!emulator.is_streaming());
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::success(OperationKind::Stop))
    );

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_console_line() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator
        .send(MachineCommand::SendLine {
            line: "M114".to_string(),
        })
        .unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Acknowledgment(Acknowledgment::success(OperationKind::SendLine))
    );

    emulator
        .send(MachineCommand::SendLine {
            line: "status?".to_string(),
        })
        .unwrap();
    match next_channel_event(&mut rx).await {
        ChannelEvent::Acknowledgment(ack) => {
            assert!(matches!(ack.outcome, AckOutcome::Failure(_)));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_inject_fault() {
    let (tx, mut rx) = event_queue();
    let mut emulator = EmulatorChannel::new(tx, fast_config());

    emulator.inject_fault("limit switch X").unwrap();
    assert_eq!(
        next_channel_event(&mut rx).await,
        ChannelEvent::Fault {
            reason: "limit switch X".to_string()
        }
    );
    // The transport itself is still up
    assert!(emulator.send(MachineCommand::Reset).is_ok());
}
