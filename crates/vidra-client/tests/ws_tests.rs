/*
[INPUT]:  Scripted WebSocket status servers
[OUTPUT]: Test results for the status channel and reconnect supervisor
[POS]:    Integration tests - WebSocket subscription
[UPDATE]: When the channel protocol or reconnect policy changes
*/

mod common;

use common::{AfterSend, next_event, spawn_status_server};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use vidra_client::{
    ChannelEvent, RetryPolicy, StatusChannel, StatusFrame, TaskId, WsConfig,
};

fn fast_retry(max_attempts: Option<u32>) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    }
}

fn config_for(addr: std::net::SocketAddr, retry: RetryPolicy) -> WsConfig {
    WsConfig {
        base_url: format!("ws://{addr}"),
        retry,
    }
}

#[tokio::test]
async fn test_frames_delivered_in_order() {
    let addr = spawn_status_server(vec![(
        vec![
            r#"{"progress": 10, "videoUrl": null}"#.to_string(),
            r#"{"progress": 50, "videoUrl": null}"#.to_string(),
            r#"{"progress": 100, "videoUrl": "out.mp4"}"#.to_string(),
        ],
        AfterSend::HoldOpen,
    )])
    .await;

    let config = config_for(addr, RetryPolicy::default());
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    let mut events = handle.take_events().unwrap();

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened { attempt: 1 });
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::progress(10))
    );
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::progress(50))
    );
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::completed(100, "out.mp4"))
    );

    handle.close();
    assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn test_malformed_frames_do_not_close_channel() {
    let addr = spawn_status_server(vec![(
        vec![
            "not json".to_string(),
            r#"{"progress": 150}"#.to_string(),
            r#"{"progress": 10, "videoUrl": ""}"#.to_string(),
            r#"{"progress": 30}"#.to_string(),
        ],
        AfterSend::HoldOpen,
    )])
    .await;

    let config = config_for(addr, RetryPolicy::default());
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    let mut events = handle.take_events().unwrap();

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened { attempt: 1 });
    // The three invalid messages are dropped; the valid one still arrives.
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::progress(30))
    );
}

#[tokio::test]
async fn test_oversize_malformed_frame_tolerated() {
    // Longer than the 1024-byte log preview, with a multi-byte char
    // straddling the cut; the drop path must survive it.
    let mut oversize = "x".repeat(1023);
    oversize.push('é');
    let addr = spawn_status_server(vec![(
        vec![oversize, r#"{"progress": 30, "videoUrl": null}"#.to_string()],
        AfterSend::HoldOpen,
    )])
    .await;

    let config = config_for(addr, RetryPolicy::default());
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    let mut events = handle.take_events().unwrap();

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened { attempt: 1 });
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::progress(30))
    );
}

#[tokio::test]
async fn test_dropped_receiver_closes_gracefully() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Send the frame only once the receiver side is gone.
        ready_rx.await.unwrap();
        ws.send(Message::Text(
            r#"{"progress": 10, "videoUrl": null}"#.to_string().into(),
        ))
        .await
        .unwrap();
        // The client should answer with a close frame, not an abrupt drop.
        loop {
            let incoming = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for client close");
            match incoming {
                Some(Ok(Message::Close(_))) => return true,
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return false,
            }
        }
    });

    let config = config_for(addr, RetryPolicy::default());
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    let mut events = handle.take_events().unwrap();
    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened { attempt: 1 });
    drop(events);
    ready_tx.send(()).unwrap();

    assert!(server.await.unwrap(), "expected a close frame before disconnect");
    drop(handle);
}

#[tokio::test]
async fn test_reconnect_resumes_same_task() {
    let addr = spawn_status_server(vec![
        (
            vec![r#"{"progress": 10, "videoUrl": null}"#.to_string()],
            AfterSend::Drop,
        ),
        (
            vec![r#"{"progress": 50, "videoUrl": null}"#.to_string()],
            AfterSend::HoldOpen,
        ),
    ])
    .await;

    let config = config_for(addr, fast_retry(None));
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    let mut events = handle.take_events().unwrap();

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened { attempt: 1 });
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::progress(10))
    );
    assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened { attempt: 2 });
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(StatusFrame::progress(50))
    );
}

#[tokio::test]
async fn test_retry_exhaustion_gives_up() {
    // Reserve a port, then free it so every connect attempt is refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = config_for(addr, fast_retry(Some(2)));
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    let mut events = handle.take_events().unwrap();

    assert!(matches!(next_event(&mut events).await, ChannelEvent::Errored(_)));
    assert!(matches!(next_event(&mut events).await, ChannelEvent::Errored(_)));
    assert_eq!(next_event(&mut events).await, ChannelEvent::GaveUp);
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn test_events_receiver_take_once() {
    let addr = spawn_status_server(vec![(vec![], AfterSend::HoldOpen)]).await;
    let config = config_for(addr, RetryPolicy::default());
    let mut handle = StatusChannel::open(&config, TaskId::from("t1")).unwrap();
    assert!(handle.take_events().is_some());
    assert!(handle.take_events().is_none());
}

#[tokio::test]
async fn test_non_ws_scheme_rejected() {
    let config = WsConfig::with_base_url("http://localhost:8000");
    assert!(StatusChannel::open(&config, TaskId::from("t1")).is_err());
}
