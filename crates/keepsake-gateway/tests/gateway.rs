use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use keepsake_core::clock::DayClock;
use keepsake_core::gate::AccessPolicy;
use keepsake_db::Database;
use keepsake_gateway::connection::{GatewayContext, handle_connection};
use keepsake_gateway::dispatcher::Dispatcher;
use keepsake_gateway::store::Store;
use keepsake_types::api::Claims;
use keepsake_types::collection::{Letters, NewLetter};
use keepsake_types::models::Principal;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "gateway-test-secret";

async fn ws_upgrade(State(ctx): State<GatewayContext>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, ctx))
}

/// Serve the gateway on a random local port.
async fn serve() -> (Store, String) {
    let store = Store::new(Arc::new(Database::open_in_memory().unwrap()), Dispatcher::new());
    let ctx = GatewayContext {
        store: store.clone(),
        policy: Arc::new(AccessPolicy::default()),
        clock: DayClock::default(),
        jwt_secret: SECRET.into(),
    };
    let app = Router::new().route("/gateway", get(ws_upgrade)).with_state(ctx);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (store, format!("ws://{}/gateway", addr))
}

fn token(principal: &Principal) -> String {
    let claims = Claims {
        sub: principal.id,
        email: principal.email.clone(),
        name: principal.display_name.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn mi() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        email: "mi423ma@gmail.com".into(),
        display_name: "Mi".into(),
    }
}

async fn connect(url: &str, principal: &Principal) -> Client {
    let (mut ws, _) = connect_async(url).await.unwrap();
    command(&mut ws, json!({ "type": "Identify", "data": { "token": token(principal) } })).await;
    ws
}

async fn command(ws: &mut Client, cmd: Value) {
    ws.send(Message::text(cmd.to_string())).await.unwrap();
}

/// Next JSON event, or `None` once the server has closed.
async fn event(ws: &mut Client) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("gateway went quiet");
        match msg {
            Some(Ok(Message::Text(text))) => return Some(serde_json::from_str(&text).unwrap()),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

/// Skip ahead to the next render of `pane` and return its html.
async fn render(ws: &mut Client, pane: &str) -> String {
    loop {
        let ev = event(ws).await.expect("closed while waiting for a render");
        if ev["type"] == "Render" && ev["data"]["pane"] == pane {
            return ev["data"]["html"].as_str().unwrap().to_string();
        }
    }
}

#[tokio::test]
async fn outsider_gets_gate_and_is_closed() {
    let (_, url) = serve().await;
    let stranger = Principal {
        id: Uuid::new_v4(),
        email: "Stranger@Example.com".into(),
        display_name: "Stranger".into(),
    };
    let mut ws = connect(&url, &stranger).await;

    let gate = event(&mut ws).await.unwrap();
    assert_eq!(gate["type"], "Gate");
    assert_eq!(gate["data"]["who"], "Signed in as stranger@example.com (not allowed)");
    assert_eq!(gate["data"]["visibility"]["app_area"], false);
    assert_eq!(gate["data"]["visibility"]["logout_button"], true);
    assert!(event(&mut ws).await.is_none());
}

#[tokio::test]
async fn bad_token_is_dropped() {
    let (_, url) = serve().await;
    let (mut ws, _) = connect_async(&url).await.unwrap();
    command(&mut ws, json!({ "type": "Identify", "data": { "token": "nope" } })).await;
    assert!(event(&mut ws).await.is_none());
}

#[tokio::test]
async fn subscribed_lists_follow_the_store() {
    let (store, url) = serve().await;
    let me = mi();
    let mut ws = connect(&url, &me).await;

    let ready = event(&mut ws).await.unwrap();
    assert_eq!(ready["type"], "Ready");
    assert_eq!(ready["data"]["who"], "Signed in as Mi");

    command(&mut ws, json!({ "type": "Subscribe", "data": { "collections": ["letters"] } })).await;
    assert!(render(&mut ws, "featured_letter").await.contains("Write your first letter 💌"));

    let letter = store
        .add::<Letters>(
            &me,
            NewLetter { title: "Hej".into(), body: "<3".into(), pinned: true },
        )
        .await
        .unwrap();
    let html = render(&mut ws, "list:letters").await;
    assert!(html.contains("<h3>Hej</h3>"));
    assert!(html.contains("&lt;3"));

    // unconfirmed deletes are ignored
    let id = letter.meta.id;
    command(
        &mut ws,
        json!({ "type": "Delete", "data": { "collection": "letters", "id": id, "confirmed": false } }),
    )
    .await;
    command(
        &mut ws,
        json!({ "type": "Delete", "data": { "collection": "letters", "id": id, "confirmed": true } }),
    )
    .await;
    assert!(!render(&mut ws, "list:letters").await.contains("Hej"));
    assert!(store.list::<Letters>().await.unwrap().is_empty());

    command(
        &mut ws,
        json!({ "type": "Delete", "data": { "collection": "letters", "id": id, "confirmed": true } }),
    )
    .await;
    let notice = loop {
        let ev = event(&mut ws).await.unwrap();
        if ev["type"] == "Notice" {
            break ev;
        }
    };
    assert_eq!(notice["data"]["message"], "Could not delete 😭");
}

#[tokio::test]
async fn pick_another_and_sign_out() {
    let (_, url) = serve().await;
    let mut ws = connect(&url, &mi()).await;
    event(&mut ws).await.unwrap();

    command(&mut ws, json!({ "type": "PickAnother" })).await;
    assert_eq!(render(&mut ws, "today").await, "Add your first reminder 💗");

    command(&mut ws, json!({ "type": "SignOut" })).await;
    let gate = event(&mut ws).await.unwrap();
    assert_eq!(gate["type"], "Gate");
    assert_eq!(gate["data"]["who"], "");
    assert_eq!(gate["data"]["visibility"]["login_button"], true);
    assert!(event(&mut ws).await.is_none());
}

#[tokio::test]
async fn malformed_commands_leave_the_session_working() {
    let (_, url) = serve().await;
    let mut ws = connect(&url, &mi()).await;
    event(&mut ws).await.unwrap();

    ws.send(Message::text("{not json")).await.unwrap();
    command(&mut ws, json!({ "type": "Subscribe", "data": { "collections": ["nope"] } })).await;
    command(&mut ws, json!({ "type": "PickAnother" })).await;

    assert_eq!(render(&mut ws, "today").await, "Add your first reminder 💗");
}

#[tokio::test]
async fn unsubscribed_collections_go_quiet() {
    let (store, url) = serve().await;
    let me = mi();
    let mut ws = connect(&url, &me).await;
    event(&mut ws).await.unwrap();

    command(&mut ws, json!({ "type": "Subscribe", "data": { "collections": ["letters"] } })).await;
    render(&mut ws, "featured_letter").await;

    command(&mut ws, json!({ "type": "Unsubscribe", "data": { "collections": ["letters"] } })).await;
    // a round trip through the session so the unsubscribe has been handled
    command(&mut ws, json!({ "type": "PickAnother" })).await;
    render(&mut ws, "today").await;

    store
        .add::<Letters>(&me, NewLetter { title: "Unseen".into(), ..Default::default() })
        .await
        .unwrap();

    let quiet = tokio::time::timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                _ => return String::new(),
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "unexpected event after unsubscribe: {:?}", quiet);
}

#[tokio::test]
async fn open_connections_are_counted() {
    let (store, url) = serve().await;
    let mut ws = connect(&url, &mi()).await;
    event(&mut ws).await.unwrap();

    wait_for_count(&store, 1).await;
    command(&mut ws, json!({ "type": "SignOut" })).await;
    while event(&mut ws).await.is_some() {}
    wait_for_count(&store, 0).await;
}

async fn wait_for_count(store: &Store, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while store.dispatcher().connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}
