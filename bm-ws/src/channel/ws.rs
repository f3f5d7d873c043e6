// Copyright @ 2023 - 2024, R3E Network
// All Rights Reserved

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, client::IntoClientRequest, http::HeaderValue, protocol::Message},
    MaybeTlsStream, WebSocketStream,
};

use super::{Channel, ChannelEvent, Connector};
use crate::ChannelError;

const SUBPROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// Opens WebSocket client connections (`ws://` or `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, address: &str, protocols: &[String]) -> Result<Box<dyn Channel>, ChannelError> {
        let open_err = |reason: String| ChannelError::Open { address: address.to_string(), reason };

        let mut request = address.into_client_request().map_err(|err| open_err(err.to_string()))?;
        if !protocols.is_empty() {
            let value = HeaderValue::from_str(&protocols.join(", ")).map_err(|err| open_err(err.to_string()))?;
            request.headers_mut().insert(SUBPROTOCOL_HEADER, value);
        }

        let (stream, response) = connect_async(request).await.map_err(|err| open_err(err.to_string()))?;
        tracing::debug!(
            target: "bm::ws",
            %address,
            protocol = ?response.headers().get(SUBPROTOCOL_HEADER),
            "websocket opened"
        );
        Ok(Box::new(WsChannel { stream }))
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, frame: Bytes) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Binary(frame.to_vec()))
            .await
            .map_err(|err| ChannelError::Send(err.to_string()))
    }

    async fn recv(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = match self.stream.next().await? {
                Ok(Message::Binary(data)) => ChannelEvent::Message(Bytes::from(data)),
                // the codec rejects it, but the peer should hear about it as a warning
                Ok(Message::Text(text)) => ChannelEvent::Message(Bytes::from(text.into_bytes())),
                Ok(Message::Close(_)) => ChannelEvent::Closed,
                // control frames are answered by tungstenite itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    ChannelEvent::Closed
                }
                Err(err) => ChannelEvent::Error(ChannelError::Receive(err.to_string())),
            };
            return Some(event);
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(ChannelError::Close(err.to_string())),
        }
    }
}
