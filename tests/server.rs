//! Full startup against the axum runtime on a real socket.

use axum::{routing::get, Router};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use svckit::config::ApplicationOptions;
use svckit::http::{AxumRuntime, JsonResp};
use svckit::lifecycle::LifecycleState;

mod common;

use common::{event_logger, fake_application, Events};

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn http_get(port: u16, path: &str) -> String {
    let mut attempts = 0;
    let mut stream = loop {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => break stream,
            Err(_) if attempts < 50 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => panic!("server never came up: {e}"),
        }
    };

    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serves_routes_until_shutdown() {
    let port = free_port().await;
    let events = Events::default();

    let routes = Router::new().route("/", get(|| async { JsonResp::ok(json!({"name": "svckit"})) }));
    let runtime = AxumRuntime::new(event_logger(&events))
        .with_prefix("/api/v1")
        .route(routes);
    let shutdown = runtime.shutdown_handle();

    let options = ApplicationOptions {
        app_id: "orders".into(),
        host: "127.0.0.1".into(),
        port,
        hot_reload: false,
        worker_count: 1,
    };
    let mut app = fake_application(options, vec![], &events);

    let server = tokio::spawn(async move {
        let result = app.run(runtime).await;
        (result, app.state())
    });

    let ok = http_get(port, "/api/v1").await;
    assert!(ok.starts_with("HTTP/1.1 200"), "unexpected response: {ok}");
    assert!(ok.contains(r#""name":"svckit""#));
    assert!(ok.to_ascii_lowercase().contains("x-request-id"));

    let missing = http_get(port, "/nope").await;
    assert!(missing.starts_with("HTTP/1.1 404"));
    assert!(missing.contains(r#""msg":"Not Found""#));

    shutdown.trigger();
    let (result, state) = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();

    result.unwrap();
    assert_eq!(state, LifecycleState::Running);
    assert!(events.all().iter().any(|e| e.contains("404 Not Found: GET /nope")));
}
