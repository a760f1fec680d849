use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::message::{Kind, Message, NodeState};

/*
    Frames have a fixed length per kind and no other framing:

        byte 0      kind tag
        bytes 1-2   edge weight (report: best weight), big-endian
        byte 3..    level, state, fragment id depending on the kind

    A reader takes one byte, looks the length up from the tag and reads the
    remainder of the frame.
*/

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown message tag {0}")]
    UnknownKind(u8),
    #[error("{kind:?} frame needs {expected} bytes, got {actual}")]
    Malformed {
        kind: Kind,
        expected: usize,
        actual: usize,
    },
    #[error("unknown node state byte {0}")]
    UnknownState(u8),
}

pub fn encode(message: &Message) -> Vec<u8> {
    let kind = message.kind();
    let mut buf = Vec::with_capacity(kind.frame_len());
    buf.push(kind.tag());
    buf.extend_from_slice(&message.weight_field().to_be_bytes());
    match *message {
        Message::Connect { level, .. } => buf.push(level),
        Message::Initiate {
            level,
            state,
            fragment,
            ..
        } => {
            buf.push(level);
            buf.push(state.as_byte());
            buf.extend_from_slice(&fragment.to_be_bytes());
        }
        Message::Test {
            level, fragment, ..
        } => {
            buf.push(level);
            buf.extend_from_slice(&fragment.to_be_bytes());
        }
        Message::Accept { .. }
        | Message::Reject { .. }
        | Message::ChangeRoot { .. }
        | Message::Report { .. } => {}
    }
    buf
}

/// Length of the frame announced by `tag`.
pub fn frame_len(tag: u8) -> Result<usize, CodecError> {
    Kind::from_tag(tag)
        .map(|kind| kind.frame_len())
        .ok_or(CodecError::UnknownKind(tag))
}

pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    let tag = *bytes.first().ok_or(CodecError::Empty)?;
    let kind = Kind::from_tag(tag).ok_or(CodecError::UnknownKind(tag))?;
    if bytes.len() < kind.frame_len() {
        return Err(CodecError::Malformed {
            kind,
            expected: kind.frame_len(),
            actual: bytes.len(),
        });
    }

    let weight = u16::from_be_bytes([bytes[1], bytes[2]]);
    let message = match kind {
        Kind::Connect => Message::Connect {
            weight,
            level: bytes[3],
        },
        Kind::Initiate => Message::Initiate {
            weight,
            level: bytes[3],
            state: NodeState::from_byte(bytes[4]).ok_or(CodecError::UnknownState(bytes[4]))?,
            fragment: u16::from_be_bytes([bytes[5], bytes[6]]),
        },
        Kind::Test => Message::Test {
            weight,
            level: bytes[3],
            fragment: u16::from_be_bytes([bytes[4], bytes[5]]),
        },
        Kind::Accept => Message::Accept { weight },
        Kind::Reject => Message::Reject { weight },
        Kind::ChangeRoot => Message::ChangeRoot { weight },
        Kind::Report => Message::Report { best: weight },
    };
    Ok(message)
}

/// Reads one complete frame. Returns `Ok(None)` when the stream ends cleanly
/// between frames.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let tag = match reader.read_u8().await {
        Ok(tag) => tag,
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    };
    let len = frame_len(tag).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    let mut frame = vec![0u8; len];
    frame[0] = tag;
    reader.read_exact(&mut frame[1..]).await?;
    Ok(Some(frame))
}

pub async fn write_message<W>(writer: &mut W, message: &Message) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(message)).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ghs::message::INFINITY;
    use tokio::io::duplex;

    #[test]
    fn test_frame_lengths() {
        let cases = [
            (Message::Connect { weight: 1, level: 0 }, 4),
            (
                Message::Initiate {
                    weight: 1,
                    level: 2,
                    state: NodeState::Find,
                    fragment: 7,
                },
                7,
            ),
            (
                Message::Test {
                    weight: 1,
                    level: 2,
                    fragment: 7,
                },
                6,
            ),
            (Message::Accept { weight: 1 }, 3),
            (Message::Reject { weight: 1 }, 3),
            (Message::ChangeRoot { weight: 1 }, 3),
            (Message::Report { best: INFINITY }, 3),
        ];
        for (message, len) in cases {
            let bytes = encode(&message);
            assert_eq!(bytes.len(), len, "{message:?}");
            assert_eq!(frame_len(bytes[0]).unwrap(), len);
            assert_eq!(decode(&bytes).unwrap(), message);
        }
    }

    #[test]
    fn test_initiate_layout_is_big_endian() {
        let bytes = encode(&Message::Initiate {
            weight: 0x0102,
            level: 3,
            state: NodeState::Found,
            fragment: 0x0a0b,
        });
        assert_eq!(bytes, vec![1, 0x01, 0x02, 3, 1, 0x0a, 0x0b]);
    }

    #[test]
    fn test_report_carries_best_weight() {
        let bytes = encode(&Message::Report { best: 300 });
        assert_eq!(bytes, vec![6, 0x01, 0x2c]);
    }

    #[test]
    fn test_short_initiate_is_malformed() {
        let err = decode(&[1, 0]).unwrap_err();
        assert_eq!(
            err,
            CodecError::Malformed {
                kind: Kind::Initiate,
                expected: 7,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_unknown_tag_and_state() {
        assert_eq!(decode(&[]).unwrap_err(), CodecError::Empty);
        assert_eq!(decode(&[9, 0, 1]).unwrap_err(), CodecError::UnknownKind(9));
        assert_eq!(
            decode(&[1, 0, 1, 0, 5, 0, 1]).unwrap_err(),
            CodecError::UnknownState(5)
        );
    }

    #[tokio::test]
    async fn test_reads_back_to_back_frames() {
        let (mut client, mut server) = duplex(64);
        write_message(&mut client, &Message::Connect { weight: 4, level: 0 })
            .await
            .expect("write connect");
        write_message(&mut client, &Message::Report { best: 11 })
            .await
            .expect("write report");
        drop(client);

        let first = read_frame(&mut server).await.expect("read").expect("frame");
        assert_eq!(decode(&first).unwrap(), Message::Connect { weight: 4, level: 0 });
        let second = read_frame(&mut server).await.expect("read").expect("frame");
        assert_eq!(decode(&second).unwrap(), Message::Report { best: 11 });
        assert!(read_frame(&mut server).await.expect("eof").is_none());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_error() {
        let (mut client, mut server) = duplex(64);
        client.write_all(&[2, 0, 5]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_unknown_tag_on_stream_is_invalid_data() {
        let (mut client, mut server) = duplex(64);
        client.write_all(&[42, 0, 5]).await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
