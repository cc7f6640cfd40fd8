//! Protocol client tests against an in-process mock hub

use futures_util::{SinkExt, StreamExt};
use hublink::{HubClient, HubConfig, ServiceTarget};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type ServerWs = WebSocketStream<TcpStream>;

async fn bind_hub() -> (TcpListener, HubConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = HubConfig::new(format!("http://{addr}").parse().unwrap(), "test-token");
    config.auto_reconnect = false;
    config.request_timeout = Duration::from_millis(500);
    (listener, config)
}

/// Accept one connection and walk it through the auth handshake
async fn authenticate(listener: TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

    send_json(&mut ws, json!({"type": "auth_required"})).await;
    let auth = next_json(&mut ws).await;
    assert_eq!(auth["type"], json!("auth"));
    assert_eq!(auth["access_token"], json!("test-token"));
    send_json(&mut ws, json!({"type": "auth_ok"})).await;
    ws
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Next text frame as JSON, skipping pings and other transport noise
async fn next_json(ws: &mut ServerWs) -> Value {
    while let Some(msg) = ws.next().await {
        if let Message::Text(text) = msg.unwrap() {
            return serde_json::from_str(&text).unwrap();
        }
    }
    panic!("connection closed while awaiting a frame");
}

/// Keep the connection open until the client closes it
async fn hold_open(mut ws: ServerWs) {
    while let Some(Ok(_)) = ws.next().await {}
}

#[tokio::test]
async fn connect_authenticates_and_disconnect_clears_state() {
    let (listener, config) = bind_hub().await;
    let hub = tokio::spawn(async move {
        let ws = authenticate(listener).await;
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(client.connect().await);

    let status = client.status();
    assert!(status.connected);
    assert!(status.last_error.is_none());
    assert_eq!(status.reconnect_attempts, 0);
    assert!(status.last_connection_time.is_some());

    client.disconnect().await;
    assert!(!client.status().connected);
    hub.await.unwrap();
}

#[tokio::test]
async fn rejected_token_surfaces_in_status() {
    let (listener, config) = bind_hub().await;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        send_json(&mut ws, json!({"type": "auth_required"})).await;
        let _auth = next_json(&mut ws).await;
        send_json(&mut ws, json!({"type": "auth_invalid", "message": "bad token"})).await;
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(!client.connect().await);

    let status = client.status();
    assert!(!status.connected);
    assert!(status.last_error.unwrap().contains("bad token"));
}

#[tokio::test]
async fn call_service_round_trips_over_the_session() {
    let (listener, config) = bind_hub().await;
    let hub = tokio::spawn(async move {
        let mut ws = authenticate(listener).await;

        let call = next_json(&mut ws).await;
        assert_eq!(call["type"], json!("call_service"));
        assert_eq!(call["domain"], json!("light"));
        assert_eq!(call["service"], json!("turn_on"));
        assert_eq!(call["target"], json!({"entity_id": ["light.desk"]}));

        let id = call["id"].as_u64().unwrap();
        send_json(
            &mut ws,
            json!({"id": id, "type": "result", "success": true, "result": {"ok": true}}),
        )
        .await;
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(client.connect().await);

    let result = client
        .call_service(
            "light",
            "turn_on",
            Some(ServiceTarget::entity("light.desk")),
            None,
        )
        .await;

    assert!(result.success);
    assert_eq!(result.result, Some(json!({"ok": true})));

    client.disconnect().await;
    hub.await.unwrap();
}

#[tokio::test]
async fn missing_result_frame_yields_timeout_result() {
    let (listener, config) = bind_hub().await;
    let hub = tokio::spawn(async move {
        let ws = authenticate(listener).await;
        // Swallow everything; never answer.
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(client.connect().await);

    let result = client.call_service("light", "turn_on", None, None).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("timeout"));

    client.disconnect().await;
    hub.await.unwrap();
}

#[tokio::test]
async fn concurrent_calls_correlate_by_id() {
    let (listener, config) = bind_hub().await;
    let hub = tokio::spawn(async move {
        let mut ws = authenticate(listener).await;

        let first = next_json(&mut ws).await;
        let second = next_json(&mut ws).await;

        // Answer in reverse order; correlation must still hold.
        for call in [&second, &first] {
            let id = call["id"].as_u64().unwrap();
            let service = call["service"].clone();
            send_json(
                &mut ws,
                json!({"id": id, "type": "result", "success": true, "result": {"service": service}}),
            )
            .await;
        }
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(client.connect().await);

    let (one, two) = tokio::join!(
        client.call_service("light", "one", None, None),
        client.call_service("light", "two", None, None),
    );

    assert_eq!(one.result, Some(json!({"service": "one"})));
    assert_eq!(two.result, Some(json!({"service": "two"})));

    client.disconnect().await;
    hub.await.unwrap();
}

#[tokio::test]
async fn listener_skips_malformed_frames() {
    let (listener, config) = bind_hub().await;
    let hub = tokio::spawn(async move {
        let mut ws = authenticate(listener).await;

        let call = next_json(&mut ws).await;
        let id = call["id"].as_u64().unwrap();

        ws.send(Message::Text("this is not json".to_string()))
            .await
            .unwrap();
        send_json(&mut ws, json!({"id": id, "type": "result", "success": true})).await;
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(client.connect().await);

    let result = client.call_service("switch", "toggle", None, None).await;
    assert!(result.success);

    client.disconnect().await;
    hub.await.unwrap();
}

#[tokio::test]
async fn events_route_to_subscription_mailbox() {
    let (listener, config) = bind_hub().await;
    let hub = tokio::spawn(async move {
        let mut ws = authenticate(listener).await;

        let subscribe = next_json(&mut ws).await;
        assert_eq!(subscribe["type"], json!("subscribe_events"));
        assert_eq!(subscribe["event_type"], json!("state_changed"));

        let id = subscribe["id"].as_u64().unwrap();
        send_json(&mut ws, json!({"id": id, "type": "result", "success": true})).await;
        send_json(
            &mut ws,
            json!({
                "id": id,
                "type": "event",
                "event": {"event_type": "state_changed", "entity_id": "light.desk"}
            }),
        )
        .await;
        hold_open(ws).await;
    });

    let client = HubClient::new(config).unwrap();
    assert!(client.connect().await);

    let mut subscription = client
        .subscribe_events(Some("state_changed"))
        .await
        .unwrap();
    let event = subscription.recv().await.unwrap();
    assert_eq!(event["event_type"], json!("state_changed"));
    assert_eq!(event["entity_id"], json!("light.desk"));

    client.disconnect().await;
    hub.await.unwrap();
}

#[tokio::test]
async fn disconnected_client_routes_calls_to_rest() {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    // Area targeting cannot ride the REST fallback; the call is submitted
    // anyway, minus the target.
    Mock::given(method("POST"))
        .and(path("/api/services/light/turn_on"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = HubConfig::new(server.uri().parse().unwrap(), "test-token");
    config.auto_reconnect = false;
    let client = HubClient::new(config).unwrap();

    let result = client
        .call_service(
            "light",
            "turn_on",
            Some(ServiceTarget::area("bedroom")),
            None,
        )
        .await;

    assert!(result.success);
    assert!(!client.is_connected());
}
