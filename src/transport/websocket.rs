//! WebSocket transport
//!
//! Accepts connections and bridges them to the broker:
//! - each connection gets a `Client` with a fresh `SessionId` and its peer
//!   address as origin, registered in the shared `SessionTable`
//! - a writer task drains the client's channel into the socket
//! - every inbound text frame goes to `Dispatcher::handle_text`
//! - on disconnect the session leaves the table and every topic

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Dispatcher;
use crate::client::{Client, SessionTable};
use crate::utils::error::ServerError;

pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

pub async fn start_websocket_server(
    addr: String,
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<SessionTable>,
) -> Result<(), ServerError> {
    let listener = bind(&addr).await?;
    serve(listener, dispatcher, sessions).await;
    Ok(())
}

/// Accept loop. Runs until the listener fails.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>, sessions: Arc<SessionTable>) {
    match listener.local_addr() {
        Ok(addr) => info!("WebSocket server listening on ws://{addr}"),
        Err(e) => warn!("WebSocket server listening on unknown address: {e}"),
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("accept failed: {e}");
                break;
            }
        };
        let dispatcher = dispatcher.clone();
        let sessions = sessions.clone();

        tokio::spawn(async move {
            handle_connection(stream, peer.to_string(), dispatcher, sessions).await;
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    origin: String,
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<SessionTable>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {origin}: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx).with_origin(origin.as_str());
    let client_id = client.id.clone();
    sessions.register(client);
    info!("{client_id} connected ({origin})");

    {
        let client_id = client_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("Failed to send message to {client_id}: {e}");
                    break;
                }
            }
            debug!("Send loop closed for {client_id}");
        });
    }

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => dispatcher.handle_text(&client_id, text.as_str()),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("read error from {client_id}: {e}");
                break;
            }
        }
    }

    // dropping the Client closes its channel, which ends the send loop
    sessions.remove(&client_id);
    let emptied = dispatcher.registry().remove_session(&client_id);
    if !emptied.is_empty() {
        debug!("removed topics left empty by {client_id}: {emptied:?}");
    }
    info!("{client_id} disconnected");
}
