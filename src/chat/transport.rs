/// Transport-agnostic chat ingest.
///
/// Whatever delivers viewer messages (an IRC bridge, a websocket relay, the
/// stdin reader below) pushes `IncomingChat` values into one mpsc channel;
/// the ingest task is the only writer into the suggestion buffer. The chat
/// protocol itself is not this crate's concern.
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat::buffer::{ChatBuffer, ChatMessage};
use crate::chat::parser::ClickParser;

/// A raw viewer message as handed over by the transport.
#[derive(Debug, Clone)]
pub struct IncomingChat {
    pub user: String,
    pub text: String,
}

/// Drain the transport channel into the buffer, parsing click commands on
/// the way in. Messages are stamped with an id and receipt time here and are
/// immutable afterwards.
pub fn spawn_ingest(
    buffer: Arc<ChatBuffer>,
    parser: ClickParser,
    mut rx: mpsc::Receiver<IncomingChat>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(incoming) = rx.recv().await {
            let intents = parser.parse(&incoming.text);
            if !intents.is_empty() {
                tracing::info!(
                    user = %incoming.user,
                    clicks = intents.len(),
                    text = %incoming.text,
                    "chat message with click commands"
                );
            }
            buffer.record(ChatMessage {
                id: uuid::Uuid::new_v4().to_string(),
                user: incoming.user,
                text: incoming.text,
                received_at: Utc::now(),
                intents,
            });
        }
        tracing::info!("chat transport closed, ingest task exiting");
    })
}

/// Local transport reading `user: message` lines from stdin. Lines without a
/// `user:` prefix are attributed to "console". Useful for driving the player
/// without a live chat connection.
pub fn spawn_stdin_transport(tx: mpsc::Sender<IncomingChat>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (user, text) = match line.split_once(':') {
                Some((user, text)) => (user.trim().to_string(), text.trim().to_string()),
                None => ("console".to_string(), line.to_string()),
            };
            if tx.send(IncomingChat { user, text }).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::parser::ParserBounds;

    #[tokio::test]
    async fn ingest_parses_and_records() {
        let buffer = Arc::new(ChatBuffer::new());
        let parser = ClickParser::new(ParserBounds {
            width: 640,
            height: 480,
            grid_size: 192,
        });
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_ingest(buffer.clone(), parser, rx);

        tx.send(IncomingChat {
            user: "alice".into(),
            text: "click 42".into(),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(buffer.len(), 1);
        let batch = buffer.consume_next(5).expect("recorded intent is eligible");
        assert_eq!(batch.user, "alice");
        assert_eq!(batch.intents.len(), 1);
    }
}
