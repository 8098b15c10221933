use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tavern_chat::events::{ChatEnvelope, ChatEvent, MessageEvent};
use tavern_chat::socket::{ChatTransport, OutboundMessenger, TransportError};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;
use uuid::Uuid;

const CONSOLE_CHANNEL: &str = "console";
const CONSOLE_AUTHOR: &str = "operator";

/// Local chat transport: every input line is a message on the `console`
/// channel, every outbound message is printed as `[#channel] text`.
pub struct ConsoleTransport<R, W> {
    lines: Mutex<Lines<R>>,
    output: Mutex<W>,
    ready_sent: AtomicBool,
}

impl ConsoleTransport<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: Mutex::new(input.lines()),
            output: Mutex::new(output),
            ready_sent: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output.into_inner()
    }
}

#[async_trait]
impl<R, W> OutboundMessenger for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        let mut output = self.output.lock().await;
        let line = format!("[#{channel_id}] {text}\n");
        output
            .write_all(line.as_bytes())
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;
        output.flush().await.map_err(|error| TransportError::Send(error.to_string()))
    }
}

#[async_trait]
impl<R, W> ChatTransport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        if !self.ready_sent.swap(true, Ordering::SeqCst) {
            return Ok(Some(envelope(ChatEvent::Ready)));
        }

        let mut lines = self.lines.lock().await;
        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|error| TransportError::Receive(error.to_string()))?;
            let Some(line) = line else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            return Ok(Some(envelope(ChatEvent::Message(MessageEvent {
                channel_id: CONSOLE_CHANNEL.to_owned(),
                author_id: CONSOLE_AUTHOR.to_owned(),
                author_is_bot: false,
                text: line,
            }))));
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.output
            .lock()
            .await
            .flush()
            .await
            .map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}

fn envelope(event: ChatEvent) -> ChatEnvelope {
    ChatEnvelope { envelope_id: Uuid::new_v4().to_string(), event }
}
