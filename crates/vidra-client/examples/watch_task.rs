/*
[INPUT]:  A file path and the Vidra service base URLs
[OUTPUT]: Live progress rendering and the final video URL
[POS]:    Examples - submit-and-watch flow
[UPDATE]: When the session surface changes
*/

use vidra_client::{ClientConfig, TaskPhase, TaskSession, VidraClient, WsConfig};

/// Example: submit a file and watch it through to completion
///
/// Usage: cargo run --example watch_task -- <file> [base-url]
///
/// The presenter side of the flow is a read-only watcher: it renders
/// whatever snapshot the session publishes and never mutates state.
#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let Some(file) = args.next() else {
        eprintln!("usage: watch_task <file> [base-url]");
        std::process::exit(1);
    };
    let base_url = args.next().unwrap_or_else(|| "http://localhost:8000".to_string());
    let ws_base = base_url.replacen("http", "ws", 1);

    println!("=== Vidra Watch Task Example ===\n");

    let client = VidraClient::with_config(ClientConfig::with_base_url(&base_url))
        .expect("client configuration");
    let mut session = TaskSession::new(client, WsConfig::with_base_url(ws_base));
    let mut watch = session.watch();

    match session.submit_file(&file).await {
        Ok(task_id) => println!("✓ Submitted, task id: {task_id}"),
        Err(err) => {
            eprintln!("✗ Upload failed: {err}");
            std::process::exit(1);
        }
    }

    loop {
        let state = watch.borrow_and_update().clone();
        match state.phase {
            TaskPhase::Processing => println!("  progress: {}%", state.progress),
            TaskPhase::Completed => {
                println!("\n✓ Done: {}", state.result_url.as_deref().unwrap_or("<missing url>"));
                break;
            }
            TaskPhase::Failed => {
                eprintln!("\n✗ Failed: {}", state.failure.as_deref().unwrap_or("unknown"));
                std::process::exit(1);
            }
            _ => {}
        }
        if watch.changed().await.is_err() {
            break;
        }
    }
}
