mod test_helpers;

use std::net::SocketAddr;
use std::sync::Arc;

use pairlink_server::config::ProtocolConfig;
use pairlink_server::protocol::{ClientMessage, ServerMessage, SessionId};
use pairlink_server::server::PairServer;
use serde_json::json;
use test_helpers::{create_test_server, create_test_server_with_config, test_server_config};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

type Inbox = mpsc::Receiver<Arc<ServerMessage>>;

fn connect(server: &PairServer, port: u16) -> (SessionId, Inbox) {
    let (tx, rx) = mpsc::channel(64);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let session_id = server.register_client(tx, addr).unwrap();
    (session_id, rx)
}

async fn recv(inbox: &mut Inbox) -> ServerMessage {
    let message = timeout(Duration::from_secs(2), inbox.recv())
        .await
        .expect("timed out waiting for message")
        .expect("channel closed");
    (*message).clone()
}

async fn join_with_preferences(
    server: &PairServer,
    id: &SessionId,
    inbox: &mut Inbox,
    username: &str,
    preferences: serde_json::Value,
) {
    server
        .handle_client_message(
            id,
            ClientMessage::Join {
                username: username.to_string(),
                preferences: Some(preferences),
            },
        )
        .await;
    assert!(matches!(
        recv(inbox).await,
        ServerMessage::JoinSuccess { .. }
    ));
}

async fn search(server: &PairServer, id: &SessionId, inbox: &mut Inbox) {
    server.handle_client_message(id, ClientMessage::Search).await;
    assert!(matches!(recv(inbox).await, ServerMessage::SearchStarted));
    assert!(matches!(recv(inbox).await, ServerMessage::QueueStatus { .. }));
}

async fn expect_peer(inbox: &mut Inbox) -> SessionId {
    match recv(inbox).await {
        ServerMessage::PeerFound { peer_id, .. } => peer_id,
        other => panic!("expected peer-found, got {other:?}"),
    }
}

#[tokio::test]
async fn background_matching_loop_pairs_clients() {
    let server = create_test_server();
    let task_server = server.clone();
    tokio::spawn(async move { task_server.matching_task().await });

    let (alice, mut alice_inbox) = connect(&server, 51001);
    let (bob, mut bob_inbox) = connect(&server, 51002);
    join_with_preferences(&server, &alice, &mut alice_inbox, "alice", json!({})).await;
    join_with_preferences(&server, &bob, &mut bob_inbox, "bob", json!({})).await;
    search(&server, &alice, &mut alice_inbox).await;
    search(&server, &bob, &mut bob_inbox).await;

    // The spawned loop runs every 50ms in the test config.
    assert_eq!(expect_peer(&mut alice_inbox).await, bob);
    assert_eq!(expect_peer(&mut bob_inbox).await, alice);
}

#[tokio::test]
async fn matching_respects_language_preferences() {
    let server = create_test_server();

    let (en_a, mut en_a_inbox) = connect(&server, 51003);
    let (fr_a, mut fr_a_inbox) = connect(&server, 51004);
    let (en_b, mut en_b_inbox) = connect(&server, 51005);
    let (fr_b, mut fr_b_inbox) = connect(&server, 51006);

    let pairs: [(&SessionId, &mut Inbox, &str, &str); 4] = [
        (&en_a, &mut en_a_inbox, "ann", "en"),
        (&fr_a, &mut fr_a_inbox, "fleur", "fr"),
        (&en_b, &mut en_b_inbox, "ed", "en"),
        (&fr_b, &mut fr_b_inbox, "francois", "fr"),
    ];
    for (id, inbox, name, lang) in pairs {
        join_with_preferences(&server, id, inbox, name, json!({ "language": lang })).await;
        search(&server, id, inbox).await;
    }

    server.run_matching_pass_and_dispatch().await;

    assert_eq!(expect_peer(&mut en_a_inbox).await, en_b);
    assert_eq!(expect_peer(&mut en_b_inbox).await, en_a);
    assert_eq!(expect_peer(&mut fr_a_inbox).await, fr_b);
    assert_eq!(expect_peer(&mut fr_b_inbox).await, fr_a);
}

#[tokio::test]
async fn full_call_lifecycle_over_the_server_api() {
    let server = create_test_server();
    let (alice, mut alice_inbox) = connect(&server, 51007);
    let (bob, mut bob_inbox) = connect(&server, 51008);
    join_with_preferences(&server, &alice, &mut alice_inbox, "alice", json!({})).await;
    join_with_preferences(&server, &bob, &mut bob_inbox, "bob", json!({})).await;
    search(&server, &alice, &mut alice_inbox).await;
    search(&server, &bob, &mut bob_inbox).await;
    server.run_matching_pass_and_dispatch().await;
    expect_peer(&mut alice_inbox).await;
    expect_peer(&mut bob_inbox).await;

    // Offer, answer and ICE flow through the relay.
    server
        .handle_client_message(
            &alice,
            ClientMessage::Offer {
                offer: json!({"sdp": "v=0"}),
                to: bob,
            },
        )
        .await;
    assert!(matches!(recv(&mut bob_inbox).await, ServerMessage::Offer { .. }));
    server
        .handle_client_message(
            &bob,
            ClientMessage::Answer {
                answer: json!({"sdp": "v=0"}),
                to: alice,
            },
        )
        .await;
    assert!(matches!(recv(&mut alice_inbox).await, ServerMessage::Answer { .. }));
    server
        .handle_client_message(
            &bob,
            ClientMessage::IceCandidate {
                candidate: json!({"candidate": "c"}),
                to: alice,
            },
        )
        .await;
    assert!(matches!(
        recv(&mut alice_inbox).await,
        ServerMessage::IceCandidate { .. }
    ));

    // Both sides accept; the call is live.
    server
        .handle_client_message(&alice, ClientMessage::CallAccepted)
        .await;
    assert!(matches!(recv(&mut bob_inbox).await, ServerMessage::CallAccepted));
    server
        .handle_client_message(&bob, ClientMessage::CallAccepted)
        .await;
    assert!(matches!(recv(&mut alice_inbox).await, ServerMessage::CallAccepted));
    assert_eq!(server.health_status().await.users_in_call, 1);

    // Hang up.
    server
        .handle_client_message(&alice, ClientMessage::EndCall)
        .await;
    assert!(matches!(recv(&mut alice_inbox).await, ServerMessage::CallEnded { .. }));
    assert!(matches!(recv(&mut bob_inbox).await, ServerMessage::CallEnded { .. }));
    assert_eq!(server.health_status().await.users_in_call, 0);
}

#[tokio::test]
async fn search_timeout_is_delivered_by_the_cleanup_loop() {
    let mut config = test_server_config();
    config.search_timeout = Duration::from_millis(100);
    config.cleanup_interval = Duration::from_millis(50);
    let server = create_test_server_with_config(config, ProtocolConfig::default());
    let task_server = server.clone();
    tokio::spawn(async move { task_server.cleanup_task().await });

    let (alice, mut alice_inbox) = connect(&server, 51009);
    join_with_preferences(&server, &alice, &mut alice_inbox, "alice", json!({})).await;
    search(&server, &alice, &mut alice_inbox).await;

    match recv(&mut alice_inbox).await {
        ServerMessage::SearchTimeout { message } => {
            assert_eq!(message, "Your search timed out. Please try again.");
        }
        other => panic!("expected search-timeout, got {other:?}"),
    }
    let snap = server.registry().get(&alice).await.unwrap();
    assert_eq!(snap.status, pairlink_server::protocol::SessionStatus::Idle);
}

#[tokio::test]
async fn idle_sessions_are_evicted_by_the_cleanup_loop() {
    let mut config = test_server_config();
    config.idle_timeout = Duration::from_millis(100);
    let server = create_test_server_with_config(config, ProtocolConfig::default());

    let (alice, mut alice_inbox) = connect(&server, 51010);
    join_with_preferences(&server, &alice, &mut alice_inbox, "alice", json!({})).await;

    sleep(Duration::from_millis(150)).await;
    server.run_cleanup_pass().await;
    assert!(server.registry().get(&alice).await.is_none());
}

#[tokio::test]
async fn per_ip_connection_cap_applies_to_registrations() {
    let mut config = test_server_config();
    config.max_connections_per_ip = 2;
    let server = create_test_server_with_config(config, ProtocolConfig::default());

    let addr = SocketAddr::from(([10, 0, 0, 1], 51011));
    let (tx, _rx_a) = mpsc::channel(4);
    server.register_client(tx, addr).unwrap();
    let (tx, _rx_b) = mpsc::channel(4);
    server.register_client(tx, addr).unwrap();
    let (tx, _rx_c) = mpsc::channel(4);
    assert!(server.register_client(tx, addr).is_err());
}

#[tokio::test]
async fn queue_status_reflects_queue_depth() {
    let server = create_test_server();
    let (alice, mut alice_inbox) = connect(&server, 51012);
    let (bob, mut bob_inbox) = connect(&server, 51013);
    join_with_preferences(&server, &alice, &mut alice_inbox, "alice", json!({})).await;
    join_with_preferences(&server, &bob, &mut bob_inbox, "bob", json!({})).await;

    server
        .handle_client_message(&alice, ClientMessage::Search)
        .await;
    assert!(matches!(recv(&mut alice_inbox).await, ServerMessage::SearchStarted));
    match recv(&mut alice_inbox).await {
        ServerMessage::QueueStatus {
            position,
            estimated_wait,
            active_users,
        } => {
            assert_eq!(position, 1);
            assert_eq!(estimated_wait, 2);
            assert_eq!(active_users, 2);
        }
        other => panic!("expected queue-status, got {other:?}"),
    }
}
