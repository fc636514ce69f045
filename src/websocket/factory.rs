use super::transport::{CloseFrame, Connector, FrameSink, FrameSource, TransportEvent, TransportSocket};
use crate::types::constants::WS_CLOSE_NO_STATUS;
use crate::types::{NotificationError, Result};
use async_trait::async_trait;
use futures::SinkExt;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket factory for creating tokio-tungstenite connections
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketFactory;

#[async_trait]
impl Connector for WebSocketFactory {
    async fn connect(&self, url: &Url) -> Result<TransportSocket> {
        tracing::debug!(
            "Creating WebSocket connection to: {}://{}{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            url.path()
        );

        let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| match e {
            WsError::Http(response)
                if matches!(
                    response.status(),
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                NotificationError::Auth(format!("handshake rejected with {}", response.status()))
            }
            other => NotificationError::WebSocket(other),
        })?;

        let (write_half, read_half) = ws_stream.split();
        Ok(TransportSocket {
            sink: Box::new(TungsteniteSink(write_half)),
            source: Box::new(TungsteniteSource(read_half)),
        })
    }
}

struct TungsteniteSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for TungsteniteSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.0.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self, frame: CloseFrame) -> Result<()> {
        let close = WsCloseFrame {
            code: CloseCode::from(frame.code),
            reason: frame.reason.into(),
        };
        self.0.send(Message::Close(Some(close))).await?;
        Ok(())
    }
}

struct TungsteniteSource(SplitStream<WsStream>);

#[async_trait]
impl FrameSource for TungsteniteSource {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            match self.0.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(TransportEvent::Text(text.as_str().to_owned()));
                }
                Ok(Message::Close(frame)) => {
                    let frame = match frame {
                        Some(close_frame) => {
                            CloseFrame::new(u16::from(close_frame.code), close_frame.reason.as_str())
                        }
                        None => {
                            tracing::warn!("Server closed connection without close frame");
                            CloseFrame::new(WS_CLOSE_NO_STATUS, "")
                        }
                    };
                    return Some(TransportEvent::Closed(frame));
                }
                Ok(Message::Ping(data)) => {
                    tracing::debug!("Received ping ({} bytes)", data.len());
                }
                Ok(Message::Pong(data)) => {
                    tracing::debug!("Received pong ({} bytes)", data.len());
                }
                Ok(Message::Binary(data)) => {
                    tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                }
                Ok(Message::Frame(_)) => {
                    tracing::debug!("Received raw frame (internal)");
                }
                Err(e) => {
                    tracing::error!("WebSocket read error: {}", e);
                    return Some(TransportEvent::Closed(CloseFrame::abnormal(e.to_string())));
                }
            }
        }
    }
}
