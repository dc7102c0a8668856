//! Endpoint lifecycle tests over the scripted mock transport.
//!
//! Covers:
//! - Open, send and receive
//! - Local close (graceful and forced) and remote close
//! - Dial, read, write and close failures
//! - Operations in the wrong state
//! - Delegate and endpoint lifetimes

use std::{sync::Arc, time::Duration};

use lanyard_core::{
    CloseFrame, Endpoint, EndpointConfig, EndpointError, EndpointEvent, EndpointState, Phase,
};
use lanyard_harness::{MockPeer, MockTransport, RecordingDelegate, Written};

/// Upper bound on how long any single expectation may take.
const SETTLE: Duration = Duration::from_secs(5);

/// Opened endpoint plus both ends of its mock connection.
struct Fixture {
    endpoint: Endpoint<MockTransport>,
    peer: MockPeer,
    delegate: Arc<RecordingDelegate>,
}

async fn opened() -> Fixture {
    opened_with(EndpointConfig::default()).await
}

async fn opened_with(config: EndpointConfig) -> Fixture {
    let (transport, peer) = MockTransport::connected();
    let delegate = Arc::new(RecordingDelegate::new());
    let endpoint = Endpoint::new("mock://peer", transport, &delegate, config);

    endpoint.open();
    tokio::time::timeout(SETTLE, delegate.wait_for_open()).await.expect("endpoint should open");
    assert_eq!(endpoint.state(), EndpointState::Open);

    Fixture { endpoint, peer, delegate }
}

async fn terminal(delegate: &RecordingDelegate) -> EndpointEvent {
    tokio::time::timeout(SETTLE, delegate.wait_for_terminal())
        .await
        .expect("terminal event should arrive")
}

async fn written(peer: &mut MockPeer) -> Option<Written> {
    tokio::time::timeout(SETTLE, peer.next_written()).await.expect("write should arrive")
}

/// Give spawned tasks a chance to emit anything they still might.
async fn quiesce() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn open_reports_on_open_once() {
    let Fixture { endpoint, delegate, .. } = opened().await;

    assert_eq!(delegate.events(), vec![EndpointEvent::Opened]);
    assert_eq!(endpoint.target(), "mock://peer");
}

#[tokio::test]
async fn inbound_payloads_arrive_in_order() {
    let Fixture { peer, delegate, endpoint: _endpoint } = opened().await;

    peer.deliver("first");
    peer.deliver("second");
    peer.deliver("third");

    let messages = tokio::time::timeout(SETTLE, delegate.wait_for_messages(3))
        .await
        .expect("messages should arrive");
    assert_eq!(messages, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn empty_payloads_are_not_delivered() {
    let Fixture { peer, delegate, endpoint: _endpoint } = opened().await;

    peer.deliver("");
    peer.deliver("after-empty");

    let messages = tokio::time::timeout(SETTLE, delegate.wait_for_messages(1))
        .await
        .expect("message should arrive");
    assert_eq!(messages, vec!["after-empty"]);
    assert_eq!(delegate.events().len(), 2);
}

#[tokio::test]
async fn sends_are_written_in_call_order() {
    let Fixture { endpoint, mut peer, .. } = opened().await;

    endpoint.send("one");
    endpoint.send("two");
    endpoint.send("three");

    assert_eq!(written(&mut peer).await, Some(Written::Payload("one".to_string())));
    assert_eq!(written(&mut peer).await, Some(Written::Payload("two".to_string())));
    assert_eq!(written(&mut peer).await, Some(Written::Payload("three".to_string())));
}

#[tokio::test]
async fn graceful_close_flushes_queue_then_sends_close_frame() {
    let Fixture { endpoint, mut peer, delegate } = opened().await;

    endpoint.send("last words");
    endpoint.close(false);

    assert_eq!(written(&mut peer).await, Some(Written::Payload("last words".to_string())));
    assert_eq!(written(&mut peer).await, Some(Written::Close(CloseFrame::normal())));
    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn forced_close_aborts_without_close_frame() {
    let Fixture { endpoint, mut peer, delegate } = opened().await;

    endpoint.close(true);

    assert_eq!(written(&mut peer).await, Some(Written::Aborted));
    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn forced_close_preempts_stalled_write() {
    let Fixture { endpoint, mut peer, delegate } = opened_with(EndpointConfig::unbounded()).await;

    peer.stall_writes();
    endpoint.send("never drains");
    quiesce().await;
    endpoint.close(true);

    assert_eq!(written(&mut peer).await, Some(Written::Aborted));
    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
    assert_eq!(delegate.terminal_count(), 1);
}

#[tokio::test]
async fn remote_close_reports_close_once() {
    let Fixture { endpoint, peer, delegate } = opened().await;

    peer.close_handshake(1000, "bye");

    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
    assert_eq!(endpoint.state(), EndpointState::Closed);

    // Racing local close after the remote one is a no-op
    endpoint.close(false);
    endpoint.close(true);
    quiesce().await;

    assert_eq!(delegate.terminal_count(), 1);
    assert_eq!(delegate.events(), vec![EndpointEvent::Opened, EndpointEvent::Closed]);
}

#[tokio::test]
async fn payloads_after_remote_close_are_dropped() {
    let Fixture { peer, delegate, endpoint: _endpoint } = opened().await;

    peer.deliver("before");
    peer.close_handshake(1001, "going away");
    peer.deliver("after");

    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
    quiesce().await;

    assert_eq!(delegate.messages(), vec!["before"]);
    assert_eq!(delegate.events().last(), Some(&EndpointEvent::Closed));
}

#[tokio::test]
async fn dial_refusal_reports_dial_error_without_open() {
    let delegate = Arc::new(RecordingDelegate::new());
    let endpoint = Endpoint::new(
        "mock://nowhere",
        MockTransport::refusing("connection refused by mock"),
        &delegate,
        EndpointConfig::default(),
    );

    endpoint.open();

    match terminal(&delegate).await {
        EndpointEvent::Failed(err) => {
            assert_eq!(err.phase(), Phase::Dial);
            assert!(err.description().contains("refused"), "unexpected description: {err}");
        },
        other => panic!("expected dial failure, got {other:?}"),
    }

    quiesce().await;
    assert!(!delegate.opened());
    assert_eq!(delegate.events().len(), 1);
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn read_failure_reports_error() {
    let Fixture { endpoint, peer, delegate } = opened().await;

    peer.fail_read("connection reset by peer");

    assert_eq!(
        terminal(&delegate).await,
        EndpointEvent::Failed(EndpointError::Read("connection reset by peer".into()))
    );
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn peer_hang_up_reports_read_error() {
    let Fixture { endpoint, mut peer, delegate } = opened().await;

    peer.hang_up();

    match terminal(&delegate).await {
        EndpointEvent::Failed(err) => assert_eq!(err.phase(), Phase::Read),
        other => panic!("expected read failure, got {other:?}"),
    }
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn write_failure_is_terminal() {
    let Fixture { endpoint, mut peer, delegate } = opened().await;

    peer.fail_writes();
    endpoint.send("doomed");

    assert_eq!(
        terminal(&delegate).await,
        EndpointEvent::Failed(EndpointError::Write("broken pipe".into()))
    );
    assert_eq!(endpoint.state(), EndpointState::Closed);

    // The connection is torn down and nothing more is written
    endpoint.send("ignored");
    quiesce().await;
    assert_eq!(peer.try_written(), Some(Written::Aborted));
    assert_eq!(peer.try_written(), None);
    assert_eq!(delegate.terminal_count(), 1);
}

#[tokio::test]
async fn close_handshake_failure_reports_error_instead_of_close() {
    let Fixture { endpoint, peer, delegate } = opened().await;

    peer.fail_close();
    endpoint.close(false);

    match terminal(&delegate).await {
        EndpointEvent::Failed(err) => {
            assert_eq!(err.phase(), Phase::Close);
            assert_eq!(err.description(), "close rejected");
        },
        other => panic!("expected close failure, got {other:?}"),
    }

    quiesce().await;
    assert!(!delegate.events().contains(&EndpointEvent::Closed));
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn forced_close_failure_reports_error() {
    let Fixture { endpoint, peer, delegate } = opened().await;

    peer.fail_close();
    endpoint.close(true);

    match terminal(&delegate).await {
        EndpointEvent::Failed(err) => assert_eq!(err.phase(), Phase::Close),
        other => panic!("expected close failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn close_while_connecting_abandons_dial() {
    let (transport, peer) = MockTransport::connected();
    let transport = transport.with_dial_delay(Duration::from_secs(10));
    let delegate = Arc::new(RecordingDelegate::new());
    let endpoint = Endpoint::new("mock://slow", transport, &delegate, EndpointConfig::unbounded());

    endpoint.open();
    assert_eq!(endpoint.state(), EndpointState::Connecting);
    endpoint.close(false);

    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert!(!delegate.opened());
    assert_eq!(delegate.terminal_count(), 1);
    assert_eq!(endpoint.state(), EndpointState::Closed);
    drop(peer);
}

#[tokio::test(start_paused = true)]
async fn slow_dial_hits_deadline() {
    let (transport, _peer) = MockTransport::connected();
    let transport = transport.with_dial_delay(Duration::from_secs(60));
    let delegate = Arc::new(RecordingDelegate::new());
    let config = EndpointConfig::default().with_dial_timeout(Some(Duration::from_secs(1)));
    let endpoint = Endpoint::new("mock://slow", transport, &delegate, config);

    endpoint.open();

    match terminal(&delegate).await {
        EndpointEvent::Failed(err) => {
            assert_eq!(err.phase(), Phase::Dial);
            assert!(err.is_timeout());
        },
        other => panic!("expected dial timeout, got {other:?}"),
    }
    assert!(!delegate.opened());
}

#[tokio::test(start_paused = true)]
async fn silent_peer_hits_read_deadline() {
    let config = EndpointConfig::default().with_read_timeout(Some(Duration::from_secs(2)));
    let Fixture { delegate, peer: _peer, endpoint: _endpoint } = opened_with(config).await;

    match terminal(&delegate).await {
        EndpointEvent::Failed(err) => {
            assert_eq!(err.phase(), Phase::Read);
            assert!(err.is_timeout());
        },
        other => panic!("expected read timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn operations_in_wrong_state_are_ignored() {
    let (transport, mut peer) = MockTransport::connected();
    let delegate = Arc::new(RecordingDelegate::new());
    let endpoint = Endpoint::new("mock://peer", transport, &delegate, EndpointConfig::default());

    // Idle: nothing to send on, nothing to close
    endpoint.send("early");
    endpoint.close(true);
    assert_eq!(endpoint.state(), EndpointState::Idle);

    endpoint.open();
    tokio::time::timeout(SETTLE, delegate.wait_for_open()).await.expect("endpoint should open");

    // Second open while Open
    endpoint.open();
    endpoint.close(false);
    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);

    // Closed: everything is a no-op
    endpoint.open();
    endpoint.send("late");
    endpoint.close(false);
    quiesce().await;

    assert_eq!(endpoint.state(), EndpointState::Closed);
    assert_eq!(delegate.events(), vec![EndpointEvent::Opened, EndpointEvent::Closed]);
    assert_eq!(written(&mut peer).await, Some(Written::Close(CloseFrame::normal())));
}

#[tokio::test]
async fn dropped_delegate_does_not_stall_endpoint() {
    let (transport, mut peer) = MockTransport::connected();
    let delegate = Arc::new(RecordingDelegate::new());
    let endpoint = Endpoint::new("mock://peer", transport, &delegate, EndpointConfig::default());
    drop(delegate);

    endpoint.open();
    tokio::time::timeout(SETTLE, async {
        while endpoint.state() != EndpointState::Open {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("endpoint should open");

    peer.deliver("nobody listening");
    endpoint.send("still written");

    assert_eq!(written(&mut peer).await, Some(Written::Payload("still written".to_string())));

    endpoint.close(false);
    assert_eq!(written(&mut peer).await, Some(Written::Close(CloseFrame::normal())));
    quiesce().await;
    assert_eq!(endpoint.state(), EndpointState::Closed);
}

#[tokio::test]
async fn dropping_open_endpoint_force_closes() {
    let Fixture { endpoint, mut peer, delegate } = opened().await;

    drop(endpoint);

    assert_eq!(written(&mut peer).await, Some(Written::Aborted));
    assert_eq!(terminal(&delegate).await, EndpointEvent::Closed);
}
