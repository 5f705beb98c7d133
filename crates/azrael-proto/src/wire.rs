// SPDX-License-Identifier: Apache-2.0
//! CBOR framing for requests and replies: a 4-byte big-endian length
//! prefix followed by a CBOR-encoded [`Command`] or [`Reply`].

use crate::{Command, Reply};

/// Framing or (de)serialization failure.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer does not yet hold a complete length prefix or frame body.
    #[error("incomplete frame")]
    Incomplete,
    /// CBOR encoding failed.
    #[error("cbor encode error: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    /// CBOR decoding failed.
    #[error("cbor decode error: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
}

fn to_cbor<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)?;
    Ok(buf)
}

fn from_cbor<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    ciborium::from_reader(bytes).map_err(WireError::from)
}

/// A length-prefixed CBOR frame: `len: u32 (BE)` followed by `len` bytes of
/// CBOR payload.
pub struct Packet;

impl Packet {
    /// Encode a [`Command`] into a length-prefixed frame.
    pub fn encode_command(cmd: &Command) -> Result<Vec<u8>, WireError> {
        Self::frame(cmd)
    }

    /// Encode a [`Reply`] into a length-prefixed frame.
    pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>, WireError> {
        Self::frame(reply)
    }

    fn frame<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
        let body = to_cbor(value)?;
        let len = u32::try_from(body.len()).map_err(|_| WireError::Incomplete)?;
        let mut out = Vec::with_capacity(4 + body.len());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a [`Command`] frame from the head of `stream`, returning the
    /// command and the number of bytes consumed.
    pub fn decode_command(stream: &[u8]) -> Result<(Command, usize), WireError> {
        let (body, consumed) = Self::split_frame(stream)?;
        Ok((from_cbor(body)?, consumed))
    }

    /// Decode a [`Reply`] frame from the head of `stream`, returning the
    /// reply and the number of bytes consumed.
    pub fn decode_reply(stream: &[u8]) -> Result<(Reply, usize), WireError> {
        let (body, consumed) = Self::split_frame(stream)?;
        Ok((from_cbor(body)?, consumed))
    }

    fn split_frame(stream: &[u8]) -> Result<(&[u8], usize), WireError> {
        if stream.len() < 4 {
            return Err(WireError::Incomplete);
        }
        let len = u32::from_be_bytes([stream[0], stream[1], stream[2], stream[3]]) as usize;
        if stream.len() < 4 + len {
            return Err(WireError::Incomplete);
        }
        Ok((&stream[4..4 + len], 4 + len))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::Packet;
    use crate::{Command, Reply};

    #[test]
    fn command_round_trips_through_a_frame() {
        let cmd = Command::GetAllObjids;
        let framed = Packet::encode_command(&cmd).unwrap();
        let (decoded, consumed) = Packet::decode_command(&framed).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(consumed, framed.len());
    }

    #[test]
    fn reply_round_trips_through_a_frame() {
        let reply = Reply::err("nope");
        let framed = Packet::encode_reply(&reply).unwrap();
        let (decoded, consumed) = Packet::decode_reply(&framed).unwrap();
        assert_eq!(decoded, reply);
        assert_eq!(consumed, framed.len());
    }

    #[test]
    fn decode_reports_incomplete_for_a_short_buffer() {
        let cmd = Command::Ping;
        let framed = Packet::encode_command(&cmd).unwrap();
        let short = &framed[..framed.len() - 1];
        assert!(matches!(Packet::decode_command(short), Err(super::WireError::Incomplete)));
    }

    #[test]
    fn two_frames_back_to_back_decode_independently() {
        let mut stream = Packet::encode_command(&Command::Ping).unwrap();
        stream.extend(Packet::encode_command(&Command::GetAllObjids).unwrap());
        let (first, consumed) = Packet::decode_command(&stream).unwrap();
        assert_eq!(first, Command::Ping);
        let (second, consumed2) = Packet::decode_command(&stream[consumed..]).unwrap();
        assert_eq!(second, Command::GetAllObjids);
        assert_eq!(consumed + consumed2, stream.len());
    }
}
