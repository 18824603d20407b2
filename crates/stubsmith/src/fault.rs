//! Simulated transport faults.
//!
//! A fault is part of the response contract: the renderer attaches it to the
//! response and the transport layer acts it out when writing to the socket.

use bytes::Bytes;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Corrupt chunk written mid-body for a malformed response
pub const GARBAGE_BYTES: &[u8] = b"\x00\xff\xfe\xfd\x7f\x80lorem";

/// Length of the payload sent for [`Fault::RandomDataThenClose`]
pub const RANDOM_DATA_LEN: usize = 64;

/// Fresh random bytes for a random-data fault
pub fn random_data() -> Bytes {
    let mut data = vec![0u8; RANDOM_DATA_LEN];
    rand::thread_rng().fill_bytes(&mut data);
    Bytes::from(data)
}

/// Header marking an emulated fault response
pub const FAULT_HEADER: &str = "x-stubsmith-fault";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fault {
    /// Drop the connection without writing anything
    ConnectionResetByPeer,
    /// Close the connection without sending a response
    EmptyResponse,
    /// Send a valid status line and headers, then a corrupt body chunk
    MalformedResponseChunk,
    /// Send garbage bytes, then close
    RandomDataThenClose,
}

/// What the transport does to simulate a [`Fault`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Abort the exchange before any response bytes are written
    CloseWithoutResponse,
    /// Write the response head and a garbage chunk, then abort
    AbortAfterGarbageChunk,
    /// Answer with garbage in place of the stubbed body
    GarbageThenClose,
}

impl Fault {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fault::ConnectionResetByPeer => "CONNECTION_RESET_BY_PEER",
            Fault::EmptyResponse => "EMPTY_RESPONSE",
            Fault::MalformedResponseChunk => "MALFORMED_RESPONSE_CHUNK",
            Fault::RandomDataThenClose => "RANDOM_DATA_THEN_CLOSE",
        }
    }

    pub fn action(&self) -> FaultAction {
        match self {
            Fault::ConnectionResetByPeer | Fault::EmptyResponse => {
                FaultAction::CloseWithoutResponse
            }
            Fault::MalformedResponseChunk => FaultAction::AbortAfterGarbageChunk,
            Fault::RandomDataThenClose => FaultAction::GarbageThenClose,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_wire_names() {
        let fault: Fault = serde_json::from_str(r#""CONNECTION_RESET_BY_PEER""#).unwrap();
        assert_eq!(fault, Fault::ConnectionResetByPeer);
        assert_eq!(
            serde_json::to_string(&Fault::MalformedResponseChunk).unwrap(),
            r#""MALFORMED_RESPONSE_CHUNK""#
        );
        assert_eq!(Fault::EmptyResponse.to_string(), "EMPTY_RESPONSE");
    }

    #[test]
    fn test_random_data_differs_between_calls() {
        let first = random_data();
        assert_eq!(first.len(), RANDOM_DATA_LEN);
        assert!((0..4).any(|_| random_data() != first));
    }

    #[test]
    fn test_fault_actions() {
        assert_eq!(
            Fault::EmptyResponse.action(),
            FaultAction::CloseWithoutResponse
        );
        assert_eq!(
            Fault::ConnectionResetByPeer.action(),
            FaultAction::CloseWithoutResponse
        );
        assert_eq!(
            Fault::MalformedResponseChunk.action(),
            FaultAction::AbortAfterGarbageChunk
        );
        assert_eq!(
            Fault::RandomDataThenClose.action(),
            FaultAction::GarbageThenClose
        );
    }
}
