pub mod coordinator;
pub mod error;
pub mod result;
pub mod worker;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::models::message::{Message, Receipt};

use self::{error::NetworkingError, result::NetworkingResult};

/// Upper bound for a single frame; anything larger is treated as a corrupt length prefix.
pub const MAX_FRAME_LENGTH: u32 = 16 * 1024 * 1024;

// Frame layout: a big-endian u32 byte count followed by that many bytes of UTF-8 JSON.

pub async fn write_json_message<W>(stream: &mut W, json_message: &str) -> NetworkingResult<()>
where
    W: AsyncWrite + Unpin,
{
    let message_bytes = json_message.as_bytes();
    let message_length = u32::try_from(message_bytes.len()).unwrap_or(u32::MAX);
    if message_length > MAX_FRAME_LENGTH {
        return Err(NetworkingError::FrameTooLarge {
            length: message_length,
            max: MAX_FRAME_LENGTH,
        });
    }

    let mut buffer = Vec::with_capacity(4 + message_bytes.len());
    buffer.extend_from_slice(&message_length.to_be_bytes());
    buffer.extend_from_slice(message_bytes);

    stream.write_all(&buffer).await?;
    Ok(stream.flush().await?)
}

fn check_length(length: u32) -> NetworkingResult<u32> {
    if length > MAX_FRAME_LENGTH {
        return Err(NetworkingError::FrameTooLarge {
            length,
            max: MAX_FRAME_LENGTH,
        });
    }
    Ok(length)
}

pub async fn read_message_length<R>(stream: &mut R) -> NetworkingResult<u32>
where
    R: AsyncRead + Unpin,
{
    check_length(stream.read_u32().await?)
}

async fn read_json_body<R>(stream: &mut R, length: u32) -> NetworkingResult<String>
where
    R: AsyncRead + Unpin,
{
    let mut json_message = vec![0u8; length as usize];
    stream.read_exact(&mut json_message).await?;
    String::from_utf8(json_message)
        .map_err(|_| NetworkingError::protocol("frame is not valid UTF-8"))
}

/// Reads one whole frame, however many socket reads it takes to arrive.
pub async fn read_json_message<R>(stream: &mut R) -> NetworkingResult<String>
where
    R: AsyncRead + Unpin,
{
    let length = read_message_length(stream).await?;
    read_json_body(stream, length).await
}

pub async fn send_message<W, T>(stream: &mut W, message: &T) -> NetworkingResult<()>
where
    W: AsyncWrite + Unpin,
    T: Message,
{
    let serialized = message.to_json()?.to_string();
    trace!("Sending frame of {} bytes", serialized.len());
    write_json_message(stream, &serialized).await
}

pub async fn read_message<R, T>(stream: &mut R) -> NetworkingResult<T>
where
    R: AsyncRead + Unpin,
    T: Message,
{
    let json_message = read_json_message(stream).await?;
    trace!("Received frame of {} bytes", json_message.len());
    Ok(T::from_json(&json_message)?)
}

/// Like [`read_message`], but a peer that closes the connection between two frames yields
/// `None` instead of an error.
pub async fn try_read_message<R, T>(stream: &mut R) -> NetworkingResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: Message,
{
    let mut length_bytes = [0u8; 4];
    if stream.read(&mut length_bytes[..1]).await? == 0 {
        return Ok(None);
    }
    stream.read_exact(&mut length_bytes[1..]).await?;
    let length = check_length(u32::from_be_bytes(length_bytes))?;

    let json_message = read_json_body(stream, length).await?;
    trace!("Received frame of {} bytes", json_message.len());
    Ok(Some(T::from_json(&json_message)?))
}

/// Reads the next receipt and fails unless it is the `expected` one.
pub async fn expect_receipt<R>(stream: &mut R, expected: Receipt) -> NetworkingResult<()>
where
    R: AsyncRead + Unpin,
{
    let json_message = read_json_message(stream).await?;
    match Receipt::from_json(&json_message) {
        Ok(receipt) if receipt == expected => Ok(()),
        Ok(receipt) => Err(NetworkingError::protocol(format!(
            "expected {expected:?}, got {receipt:?}"
        ))),
        Err(_) => Err(NetworkingError::protocol(format!(
            "expected {expected:?}, got {:?}",
            truncate(&json_message, 64)
        ))),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{color::Color, packet::WorkPacket, point::Point};
    use tokio::io::duplex;

    #[tokio::test]
    async fn frames_survive_fragmented_reads() {
        // A tiny buffer forces the payload across many partial reads.
        let (mut tx, mut rx) = duplex(7);
        let packet = WorkPacket::new(
            0,
            0,
            (0..50)
                .map(|i| Point::new(i, i * 2, Color::new(i as u8, 0, 255)))
                .collect(),
        );
        let expected = packet.clone();

        let writer = tokio::spawn(async move { send_message(&mut tx, &packet).await });
        let received: WorkPacket = read_message(&mut rx).await.unwrap();
        writer.await.unwrap().unwrap();

        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn eof_mid_frame_is_a_closed_connection() {
        let (mut tx, mut rx) = duplex(64);
        tx.write_all(&10u32.to_be_bytes()).await.unwrap();
        tx.write_all(b"\"ack").await.unwrap();
        drop(tx);

        let err = read_json_message(&mut rx).await.unwrap_err();
        assert!(matches!(err, NetworkingError::ConnectionClosed), "{err:?}");
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn close_between_frames_is_not_an_error() {
        let (mut tx, mut rx) = duplex(64);
        send_message(&mut tx, &Receipt::Ack).await.unwrap();
        drop(tx);

        let first: Option<Receipt> = try_read_message(&mut rx).await.unwrap();
        assert_eq!(first, Some(Receipt::Ack));
        let second: Option<Receipt> = try_read_message(&mut rx).await.unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn close_inside_a_length_prefix_is_an_error() {
        let (mut tx, mut rx) = duplex(64);
        tx.write_all(&[0, 0]).await.unwrap();
        drop(tx);

        let err = try_read_message::<_, Receipt>(&mut rx).await.unwrap_err();
        assert!(matches!(err, NetworkingError::ConnectionClosed));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let (mut tx, mut rx) = duplex(64);
        tx.write_all(&(MAX_FRAME_LENGTH + 1).to_be_bytes())
            .await
            .unwrap();

        let err = read_json_message(&mut rx).await.unwrap_err();
        assert!(matches!(err, NetworkingError::FrameTooLarge { .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn unexpected_receipt_is_a_protocol_error() {
        let (mut tx, mut rx) = duplex(64);
        send_message(&mut tx, &Receipt::Done).await.unwrap();
        write_json_message(&mut tx, "\"acknowledge\"").await.unwrap();

        let err = expect_receipt(&mut rx, Receipt::Ack).await.unwrap_err();
        assert!(matches!(err, NetworkingError::Protocol { .. }));
        let err = expect_receipt(&mut rx, Receipt::Ack).await.unwrap_err();
        assert!(matches!(err, NetworkingError::Protocol { .. }));
    }
}
