/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for vidra-client tests

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use vidra_client::ChannelEvent;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mount a one-shot intake mock returning the given task id
#[allow(dead_code)]
pub async fn mount_upload(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "taskId": task_id,
        })))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// What a scripted connection does after sending its messages
#[allow(dead_code)]
pub enum AfterSend {
    /// Drop the socket abruptly (simulated network loss)
    Drop,
    /// Stay connected until the client closes (or a 5s safety timeout)
    HoldOpen,
}

/// Spawn a WebSocket status server that serves one scripted connection
/// per script entry, in order. Extra connections are refused implicitly
/// once the scripts run out.
#[allow(dead_code)]
pub async fn spawn_status_server(scripts: Vec<(Vec<String>, AfterSend)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for (messages, after) in scripts {
            // A connection aborted mid-handshake (e.g. a superseded client
            // cancelling its connect) must not consume a script slot or
            // kill the server.
            let mut ws = loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                    break ws;
                }
            };
            for message in messages {
                if ws.send(Message::Text(message.into())).await.is_err() {
                    break;
                }
            }
            match after {
                AfterSend::Drop => drop(ws),
                AfterSend::HoldOpen => {
                    let _ = tokio::time::timeout(Duration::from_secs(5), async {
                        while let Some(Ok(_)) = ws.next().await {}
                    })
                    .await;
                }
            }
        }
    });

    addr
}

/// Receive the next channel event, failing the test after 5s
#[allow(dead_code)]
pub async fn next_event(events: &mut mpsc::Receiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for channel event")
        .expect("event stream ended unexpectedly")
}
