mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use common::test_context;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn register(client: &reqwest::Client, addr: SocketAddr, username: &str) -> (String, String) {
    let response = client
        .post(format!("http://{}/users", addr))
        .json(&json!({ "username": username }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

async fn open_socket(addr: SocketAddr, token: &str) -> Socket {
    let (mut socket, _) = connect_async(format!("ws://{}/ws?token={}", addr, token))
        .await
        .unwrap();
    expect_event(&mut socket, "connected").await;
    socket
}

async fn send(socket: &mut Socket, event: Value) {
    socket.send(Message::Text(event.to_string())).await.unwrap();
}

/// Reads frames until one with the given event name arrives.
async fn expect_event(socket: &mut Socket, name: &str) -> Value {
    loop {
        let frame = timeout(WAIT, socket.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {}", name))
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            let value: Value = serde_json::from_str(&text).unwrap();
            if value["event"] == name {
                return value["data"].clone();
            }
        }
    }
}

#[tokio::test]
async fn test_health_check() {
    let ctx = test_context();
    let addr = ctx.serve().await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Healthy!");
}

#[tokio::test]
async fn test_upgrade_requires_valid_token() {
    let ctx = test_context();
    let addr = ctx.serve().await;

    let missing = connect_async(format!("ws://{}/ws", addr)).await;
    let forged = connect_async(format!("ws://{}/ws?token=not-a-jwt", addr)).await;

    for result in [missing, forged] {
        match result {
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), 401);
            }
            other => panic!("expected 401 handshake failure, got {:?}", other.map(|_| ())),
        }
    }
}

#[tokio::test]
async fn test_challenge_to_checkmate_over_sockets() {
    let ctx = test_context();
    let addr = ctx.serve().await;
    let client = reqwest::Client::new();
    let (alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;
    let mut alice = open_socket(addr, &alice_token).await;
    let mut bob = open_socket(addr, &bob_token).await;

    // friendship
    let sent = client
        .post(format!("http://{}/friends/requests", addr))
        .bearer_auth(&alice_token)
        .json(&json!({ "user_id": bob_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(sent.status(), 204);
    let received = expect_event(&mut bob, "friend-request-received").await;
    assert_eq!(received["from"]["username"], "alice");
    let accepted = client
        .post(format!("http://{}/friends/requests/respond", addr))
        .bearer_auth(&bob_token)
        .json(&json!({ "from_id": alice_id, "accept": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 204);
    expect_event(&mut alice, "friend-request-accepted").await;

    // challenge
    let challenge: Value = client
        .post(format!("http://{}/challenges", addr))
        .bearer_auth(&alice_token)
        .json(&json!({ "challenged_id": bob_id, "time_control": { "type": "10min" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let challenge_id = challenge["challenge_id"].as_str().unwrap().to_string();
    expect_event(&mut bob, "challenge-received").await;
    let response: Value = client
        .post(format!("http://{}/challenges/{}/respond", addr, challenge_id))
        .bearer_auth(&bob_token)
        .json(&json!({ "accept": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let game_id = response["game_id"].as_str().unwrap().to_string();
    let notice = expect_event(&mut alice, "challenge-accepted").await;
    assert_eq!(notice["game_id"], game_id.as_str());

    // both join and learn their colors
    send(&mut alice, json!({ "event": "join-game", "data": { "game_id": game_id } })).await;
    send(&mut bob, json!({ "event": "join-game", "data": { "game_id": game_id } })).await;
    let state = expect_event(&mut alice, "game-state").await;
    expect_event(&mut bob, "game-state").await;
    let (white, black) = if state["player_white_id"] == alice_id.as_str() {
        (&mut alice, &mut bob)
    } else {
        (&mut bob, &mut alice)
    };

    for (white_to_move, san) in [(true, "f3"), (false, "e5"), (true, "g4"), (false, "Qh4#")] {
        let mover = if white_to_move { &mut *white } else { &mut *black };
        send(
            mover,
            json!({ "event": "make-move", "data": { "game_id": game_id, "move": san } }),
        )
        .await;
        let made = expect_event(white, "move-made").await;
        assert_eq!(made["san"], san);
        expect_event(black, "move-made").await;
    }

    let over = expect_event(white, "game-over").await;
    assert_eq!(over["reason"], "checkmate");
    assert_eq!(over["winner_color"], "black");
    assert_eq!(over["rating_change"]["white_after"], 1184);
    assert_eq!(over["rating_change"]["black_after"], 1216);
    assert_eq!(over["game"]["is_checkmate"], true);
    expect_event(black, "game-over").await;

    // further moves are refused to the sender only
    send(
        white,
        json!({ "event": "make-move", "data": { "game_id": game_id, "move": "a3" } }),
    )
    .await;
    let error = expect_event(white, "error").await;
    assert_eq!(error["message"], "Game is not active");
}

#[tokio::test]
async fn test_matchmaking_notifies_waiting_player() {
    let ctx = test_context();
    let addr = ctx.serve().await;
    let client = reqwest::Client::new();
    let (_, first_token) = register(&client, addr, "first").await;
    let (second_id, second_token) = register(&client, addr, "second").await;
    let mut first = open_socket(addr, &first_token).await;

    let queued: Value = client
        .post(format!("http://{}/matchmaking", addr))
        .bearer_auth(&first_token)
        .json(&json!({ "time_control": { "type": "30min" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(queued["status"], "queued");
    let status: Value = client
        .get(format!("http://{}/matchmaking", addr))
        .bearer_auth(&first_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["queued"], true);

    let matched: Value = client
        .post(format!("http://{}/matchmaking", addr))
        .bearer_auth(&second_token)
        .json(&json!({ "time_control": { "type": "30min" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(matched["status"], "matched");

    let found = expect_event(&mut first, "match-found").await;
    assert_eq!(found["opponent_id"], second_id.as_str());
    assert_eq!(found["game_id"], matched["game_id"]);

    let cancel = client
        .delete(format!("http://{}/matchmaking", addr))
        .bearer_auth(&first_token)
        .send()
        .await
        .unwrap();
    assert_eq!(cancel.status(), 404);
}

#[tokio::test]
async fn test_search_history_and_game_lookup() {
    let ctx = test_context();
    let addr = ctx.serve().await;
    let client = reqwest::Client::new();
    let (alice_id, alice_token) = register(&client, addr, "alice").await;
    let (bob_id, bob_token) = register(&client, addr, "bob").await;
    let (_, carol_token) = register(&client, addr, "carol").await;

    let duplicate = client
        .post(format!("http://{}/users", addr))
        .json(&json!({ "username": "Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);

    let found: Value = client
        .get(format!("http://{}/users/search?q=ALI", addr))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["id"], alice_id.as_str());
    let own: Value = client
        .get(format!("http://{}/users/search?q=ali", addr))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(own.as_array().unwrap().is_empty());
    let too_short = client
        .get(format!("http://{}/users/search?q=a", addr))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(too_short.status(), 400);

    let alice = ctx.state.user_service.get_user_by_id(&alice_id).await.unwrap();
    let bob = ctx.state.user_service.get_user_by_id(&bob_id).await.unwrap();
    let game = ctx.active_game(&alice, &bob).await;

    let history: Value = client
        .get(format!("http://{}/games/history", addr))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["game_id"], game.game_id.as_str());

    let as_player = client
        .get(format!("http://{}/games/{}", addr, game.game_id))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    assert_eq!(as_player.status(), 200);
    let as_stranger = client
        .get(format!("http://{}/games/{}", addr, game.game_id))
        .bearer_auth(&carol_token)
        .send()
        .await
        .unwrap();
    assert_eq!(as_stranger.status(), 403);
    let missing = client
        .get(format!("http://{}/games/missing", addr))
        .bearer_auth(&carol_token)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}
