//! Length-prefixed frame encoding/decoding
//!
//! Wire format: [4-byte big-endian length][JSON payload]
//! Maximum frame size: 1MB (sanity limit)

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::Message;

/// Maximum allowed frame size (1MB)
const MAX_FRAME_SIZE: u32 = 1024 * 1024;

fn closed_on_eof(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        Error::Io(e)
    }
}

/// Read a length-prefixed frame from a stream
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Message> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(closed_on_eof)?;

    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Err(Error::Protocol("Empty frame".into()));
    }
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "Frame too large: {} bytes (max {})",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(closed_on_eof)?;

    Message::from_bytes(&payload).map_err(|e| Error::Protocol(format!("Invalid JSON: {}", e)))
}

/// Write a length-prefixed frame to a stream
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, msg: &Message) -> Result<()> {
    let payload = msg.to_bytes()?;

    let len = payload.len() as u32;
    if len > MAX_FRAME_SIZE {
        return Err(Error::Protocol(format!(
            "Message too large: {} bytes (max {})",
            len, MAX_FRAME_SIZE
        )));
    }

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Read frames until the stream ends or fails, forwarding each result.
///
/// The first error is forwarded too, then the task stops.
pub async fn forward_frames<R: AsyncRead + Unpin>(
    mut reader: R,
    tx: tokio::sync::mpsc::Sender<Result<Message>>,
) {
    loop {
        let result = read_frame(&mut reader).await;
        let done = result.is_err();
        if tx.send(result).await.is_err() || done {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_frames_read_in_order() {
        let snapshot = Message::Snapshot {
            key: "admin/state".into(),
            body: json!({"isGoLiveEnabled": false, "activeSlotId": null}),
        };

        let mut buf = Vec::new();
        write_frame(&mut buf, &snapshot).await.unwrap();
        write_frame(&mut buf, &Message::Ping).await.unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), snapshot);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Message::Ping);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_empty_frame_rejected() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 0]);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(len.to_vec());
        assert!(read_frame(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn test_truncated_payload_is_closed() {
        let mut bytes = 10u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"{\"ty");
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(Error::ConnectionClosed)
        ));
    }
}
