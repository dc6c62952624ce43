use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use keepsake_core::clock::DayClock;
use keepsake_core::gate::{AccessPolicy, GateDecision};
use keepsake_core::session::{Snapshot, ViewSession};
use keepsake_types::api::Claims;
use keepsake_types::events::{GatewayCommand, GatewayEvent, Pane};
use keepsake_types::models::{CollectionKind, Principal};

use crate::store::{Store, Subscription};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Time a client has to send Identify after connecting.
const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

const DELETE_FAILED: &str = "Could not delete 😭";

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

/// Everything a gateway connection needs from the server.
#[derive(Clone)]
pub struct GatewayContext {
    pub store: Store,
    pub policy: Arc<AccessPolicy>,
    pub clock: DayClock,
    pub jwt_secret: String,
}

/// Handle a single WebSocket connection: Identify, gate, then stream rendered
/// panes for whatever the client subscribes to.
pub async fn handle_connection(socket: WebSocket, ctx: GatewayContext) {
    let (mut sender, mut receiver) = socket.split();

    // Step 1: Wait for Identify command with JWT
    let Some(principal) = wait_for_identify(&mut receiver, &ctx.jwt_secret).await else {
        warn!("WebSocket client failed to identify, closing");
        return;
    };

    // Step 2: Gate. Outsiders learn their status and nothing else.
    let decision = ctx.policy.decide(Some(&principal));
    if !decision.is_allowed() {
        debug!("{} is not on the allow-list, closing gateway", principal.email);
        let gate = GatewayEvent::Gate {
            who: decision.who_line(),
            visibility: decision.visibility(),
        };
        send_event(&mut sender, &gate).await;
        let _ = sender.send(Message::Close(None)).await;
        return;
    }

    let ready = GatewayEvent::Ready {
        who: decision.who_line(),
        visibility: decision.visibility(),
    };
    if !send_event(&mut sender, &ready).await {
        return;
    }

    let conn_id = ctx.store.dispatcher().connection_opened(&principal.email).await;
    info!(
        "{} ({}) connected to gateway, {} open",
        principal.email,
        principal.id,
        ctx.store.dispatcher().connection_count().await
    );

    run_session(sender, receiver, &ctx).await;

    ctx.store.dispatcher().connection_closed(conn_id).await;
    info!("{} ({}) disconnected from gateway", principal.email, principal.id);
}

async fn wait_for_identify(receiver: &mut WsReceiver, jwt_secret: &str) -> Option<Principal> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let identify = async {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Ok(GatewayCommand::Identify { token }) =
                    serde_json::from_str::<GatewayCommand>(&text)
                {
                    let token_data = decode::<Claims>(
                        &token,
                        &DecodingKey::from_secret(jwt_secret.as_bytes()),
                        &Validation::default(),
                    )
                    .ok()?;

                    let claims = token_data.claims;
                    return Some(Principal {
                        id: claims.sub,
                        email: claims.email,
                        display_name: claims.name,
                    });
                }
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

/// Per-connection state. Owned by the connection loop alone.
struct Session<'a> {
    ctx: &'a GatewayContext,
    view: ViewSession,
    subscriptions: HashMap<CollectionKind, Subscription>,
    snapshot_tx: mpsc::Sender<Snapshot>,
}

/// What the loop should do after a command.
enum Flow {
    Continue,
    Close,
}

async fn run_session(mut sender: WsSender, mut receiver: WsReceiver, ctx: &GatewayContext) {
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel(64);
    let mut session = Session {
        ctx,
        view: ViewSession::new(ctx.clock),
        subscriptions: HashMap::new(),
        snapshot_tx,
    };

    session.view.roll_day(Utc::now());

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            snapshot = snapshot_rx.recv() => {
                // the session keeps a sender, so this never yields None
                let Some(snapshot) = snapshot else { break };
                let panes = session.view.apply(snapshot, Utc::now());
                if !send_panes(&mut sender, panes).await {
                    break;
                }
            }
            msg = receiver.next() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                        Ok(cmd) => {
                            if let Flow::Close = session.handle(cmd, &mut sender).await {
                                break;
                            }
                        }
                        Err(e) => {
                            let raw: String = text.chars().take(200).collect();
                            warn!("bad command: {} -- raw: {}", e, raw);
                        }
                    },
                    Message::Pong(_) => pong_received = true,
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                if let Some(pane) = session.view.roll_day(Utc::now()) {
                    if !send_panes(&mut sender, vec![pane]).await {
                        break;
                    }
                }
            }
        }
    }

    // explicit teardown of every live query
    for (_, subscription) in session.subscriptions.drain() {
        subscription.cancel();
    }
}

impl Session<'_> {
    async fn handle(&mut self, cmd: GatewayCommand, sender: &mut WsSender) -> Flow {
        let ok = match cmd {
            GatewayCommand::Identify { .. } => true, // Already handled

            GatewayCommand::Subscribe { collections } => {
                for kind in collections {
                    if !self.subscriptions.contains_key(&kind) {
                        debug!("subscribing to {}", kind);
                        let sub = self.ctx.store.subscribe_into(kind, self.snapshot_tx.clone());
                        self.subscriptions.insert(kind, sub);
                    }
                }
                true
            }

            GatewayCommand::Unsubscribe { collections } => {
                for kind in collections {
                    if let Some(sub) = self.subscriptions.remove(&kind) {
                        debug!("unsubscribing from {}", kind);
                        sub.cancel();
                    }
                }
                true
            }

            GatewayCommand::PickAnother => {
                let pane = self.view.pick_another(Utc::now());
                send_panes(sender, vec![pane]).await
            }

            GatewayCommand::ToggleReveal { id } => match self.view.toggle_reveal(id, Utc::now()) {
                Some(pane) => send_panes(sender, vec![pane]).await,
                None => true,
            },

            GatewayCommand::Delete { collection, id, confirmed } => {
                if !confirmed {
                    debug!("ignoring unconfirmed delete of {} in {}", id, collection);
                    return Flow::Continue;
                }
                match self.ctx.store.delete_kind(collection, id).await {
                    // the live query redraws the list
                    Ok(true) => true,
                    Ok(false) => notice(sender, DELETE_FAILED).await,
                    Err(e) => {
                        warn!("delete of {} in {} failed: {}", id, collection, e);
                        notice(sender, DELETE_FAILED).await
                    }
                }
            }

            GatewayCommand::SignOut => {
                for (_, sub) in self.subscriptions.drain() {
                    sub.cancel();
                }
                self.view.clear();
                let signed_out = GateDecision::SignedOut;
                let gate = GatewayEvent::Gate {
                    who: signed_out.who_line(),
                    visibility: signed_out.visibility(),
                };
                send_event(sender, &gate).await;
                return Flow::Close;
            }
        };

        if ok { Flow::Continue } else { Flow::Close }
    }
}

async fn send_panes(sender: &mut WsSender, panes: Vec<(Pane, String)>) -> bool {
    for (pane, html) in panes {
        if !send_event(sender, &GatewayEvent::Render { pane, html }).await {
            return false;
        }
    }
    true
}

async fn notice(sender: &mut WsSender, message: &str) -> bool {
    send_event(sender, &GatewayEvent::Notice { message: message.to_string() }).await
}

/// Returns false once the socket is gone.
async fn send_event(sender: &mut WsSender, event: &GatewayEvent) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to encode gateway event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}
