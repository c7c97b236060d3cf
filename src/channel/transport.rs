//! Push-channel transports.

use super::ChannelError;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

/// Text frames from one live connection. The stream ends when the
/// connection closes.
pub type MessageStream = BoxStream<'static, Result<String, ChannelError>>;

/// Opens connections to the result-push endpoint.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self) -> BoxFuture<'_, Result<MessageStream, ChannelError>>;

    /// Human-readable endpoint, for logs.
    fn describe(&self) -> String;
}

/// WebSocket transport.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'_, Result<MessageStream, ChannelError>> {
        async move {
            let (ws, _response) = tokio_tungstenite::connect_async(self.url.as_str())
                .await
                .map_err(|e| ChannelError::Connect(e.to_string()))?;

            let (_sink, stream) = ws.split();
            let frames = stream.filter_map(|msg| async move {
                match msg {
                    Ok(msg) => message_text(msg).map(Ok),
                    Err(e) => Some(Err(ChannelError::Transport(e.to_string()))),
                }
            });

            Ok(frames.boxed())
        }
        .boxed()
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Payload text of a data frame. Control frames carry no result.
fn message_text(msg: Message) -> Option<String> {
    match msg {
        Message::Text(text) => Some(text.as_str().to_owned()),
        Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Channel: dropping non-UTF-8 binary frame: {}", e);
                None
            }
        },
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text() {
        assert_eq!(
            message_text(Message::text("{\"a\":1}")),
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(
            message_text(Message::binary(b"{}".to_vec())),
            Some("{}".to_string())
        );
        assert_eq!(message_text(Message::binary(vec![0xff, 0xfe, 0x7b])), None);
        assert_eq!(message_text(Message::Ping(Default::default())), None);
        assert_eq!(message_text(Message::Close(None)), None);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let connector = WebSocketConnector::new("ws://127.0.0.1:1/ws");
        let result = connector.connect().await;
        assert!(matches!(result, Err(ChannelError::Connect(_))));
    }
}
