//! Newline-delimited JSON over TCP. Every connection edits one document, named by the `join`
//! message it starts with.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::documents::{Command, Registry};
use crate::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Message is longer than {max_bytes} bytes")]
    MessageTooLong { max_bytes: usize },
    #[error("Document {0} is closed")]
    DocumentClosed(String),
}

pub async fn serve(
    listener: TcpListener,
    registry: Registry,
    max_message_bytes: usize,
) -> Result<(), TransportError> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, registry, max_message_bytes).await {
                log::error!("Connection from {} failed: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    registry: Registry,
    max_message_bytes: usize,
) -> Result<(), TransportError> {
    let client_id = Uuid::new_v4().to_string();
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let doc_id = loop {
        let line = match read_line(&mut reader, max_message_bytes).await? {
            Some(line) => line,
            None => return Ok(()),
        };
        match serde_json::from_slice::<ClientMessage>(&line) {
            Ok(ClientMessage::Join { doc_id }) => break doc_id,
            Ok(message) => log::warn!("Expected join from {}, got {:?}", client_id, message),
            Err(e) => log::warn!("Invalid message from {}: {}", client_id, e),
        }
    };

    let document = registry.document(&doc_id).await;
    let (outbox, inbox) = mpsc::unbounded_channel();
    if !document.send(Command::Join {
        client_id: client_id.clone(),
        outbox,
    }) {
        return Err(TransportError::DocumentClosed(doc_id));
    }
    let writer_task = tokio::spawn(write_messages(writer, inbox));

    let result = read_messages(&mut reader, &client_id, max_message_bytes, |message| {
        document.send(Command::Message {
            client_id: client_id.clone(),
            message,
        })
    })
    .await;

    document.send(Command::Leave {
        client_id: client_id.clone(),
    });
    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Could not write to {}: {}", client_id, e),
        Err(e) => log::error!("Writer of {} panicked: {}", client_id, e),
    }
    result
}

/// Forwards every valid message to `forward` until the client hangs up. Messages that cannot be
/// decoded, including lines that are not UTF-8, are logged and skipped.
async fn read_messages<R, F>(
    reader: &mut R,
    client_id: &str,
    max_message_bytes: usize,
    mut forward: F,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(ClientMessage) -> bool,
{
    while let Some(line) = read_line(reader, max_message_bytes).await? {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<ClientMessage>(&line) {
            Ok(message) => {
                if !forward(message) {
                    return Ok(());
                }
            }
            Err(e) => log::warn!("Invalid message from {}: {}", client_id, e),
        }
    }
    Ok(())
}

async fn write_messages<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<(), TransportError> {
    while let Some(message) = inbox.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
    }
    Ok(())
}

/// Reads the bytes of one line without its line ending. `None` at the end of the stream. The
/// bytes are not checked for UTF-8 here, so a bad line only costs that message.
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Option<Vec<u8>>, TransportError> {
    let mut line = Vec::new();
    let read = reader
        .take(max_bytes as u64 + 1)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with(b"\n") && read > max_bytes {
        return Err(TransportError::MessageTooLong { max_bytes });
    }
    while let Some(b'\r' | b'\n') = line.last() {
        line.pop();
    }
    Ok(Some(line))
}
