//! Shared wire protocol types and framing.
//!
//! Defines the wire format for the reading RPC: 4-byte big-endian length
//! prefix followed by a UTF-8 JSON payload.
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```
//!
//! Framing has no knowledge of message semantics; both RPC roles reuse it
//! unchanged. There is no version tag on the wire - the two processes ship
//! from one workspace and deploy in lockstep.

use crate::config::RpcConfig;
use crate::{ArcanaError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// One reading request as it crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingRequest {
    pub mode: String,
    pub question: String,
    #[serde(default)]
    pub information: String,
}

impl ReadingRequest {
    pub fn new(
        mode: impl Into<String>,
        question: impl Into<String>,
        information: impl Into<String>,
    ) -> Self {
        Self {
            mode: mode.into(),
            question: question.into(),
            information: information.into(),
        }
    }

    /// Copy with all fields whitespace-trimmed. Both edges trim before
    /// validating, so length checks agree across processes.
    pub fn trimmed(&self) -> Self {
        Self {
            mode: self.mode.trim().to_string(),
            question: self.question.trim().to_string(),
            information: self.information.trim().to_string(),
        }
    }
}

/// One reading response as it crosses the wire.
///
/// `ok`/`error` are the fixed part of the shape; everything else the
/// collaborator returns rides along in `body` untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response carrying collaborator-defined fields.
    pub fn success(body: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            ok: true,
            error: None,
            body,
        }
    }

    /// Create a failure response with a descriptive error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            body: serde_json::Map::new(),
        }
    }
}

/// Read a length-prefixed frame from an async reader.
///
/// Returns `None` on clean EOF (peer closed before sending a header).
/// Errors if the connection closes mid-body or the declared length exceeds
/// [`RpcConfig::MAX_FRAME_SIZE`].
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > RpcConfig::MAX_FRAME_SIZE {
        return Err(ArcanaError::transport(format!(
            "frame size {} exceeds maximum {}",
            len,
            RpcConfig::MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| {
        ArcanaError::transport(format!(
            "connection closed before full frame arrived ({} bytes expected): {}",
            len, e
        ))
    })?;

    Ok(Some(payload))
}

/// Write a length-prefixed frame to an async writer.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Serialize a message and write it as one frame.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}

/// Read one frame and parse it as a message.
///
/// `None` means clean EOF, as for [`read_frame`]. A frame that is not
/// valid JSON for `T` is a transport error.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        None => Ok(None),
        Some(payload) => serde_json::from_slice(&payload)
            .map(Some)
            .map_err(|e| ArcanaError::transport(format!("undecodable frame body: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_read_write_roundtrip() {
        let payload = b"hello world";
        let mut buf = Vec::new();

        write_frame(&mut buf, payload).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let read_back = read_frame(&mut cursor).await.unwrap();

        assert_eq!(read_back, Some(payload.to_vec()));
    }

    #[tokio::test]
    async fn test_message_roundtrip_multibyte_text() {
        let request = ReadingRequest::new("love", "感情會順利嗎？", "碩二，電機系");
        let mut buf = Vec::new();
        write_message(&mut buf, &request).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let read_back: ReadingRequest = read_message(&mut cursor).await.unwrap().unwrap();

        assert_eq!(read_back.mode, "love");
        assert_eq!(read_back.question, "感情會順利嗎？");
        assert_eq!(read_back.information, "碩二，電機系");
    }

    #[tokio::test]
    async fn test_frame_read_empty_stream_returns_none() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let result = read_frame(&mut cursor).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_frame_read_truncated_body_is_transport_error() {
        // Header promises 10 bytes, only 3 arrive before EOF.
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"abc");

        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, ArcanaError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_frame_read_length_only_is_transport_error() {
        // A connection that closes right after the length prefix must fail,
        // not hang or hand back garbage.
        let mut buf = Vec::new();
        buf.extend_from_slice(&42u32.to_be_bytes());

        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, ArcanaError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_frame_read_oversized_returns_error() {
        let huge_len: u32 = (RpcConfig::MAX_FRAME_SIZE + 1) as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&huge_len.to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]);

        let mut cursor = std::io::Cursor::new(buf);
        let result = read_frame(&mut cursor).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_message_rejects_non_json_body() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"not valid json").await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let result = read_message::<_, ReadingRequest>(&mut cursor).await;
        assert!(matches!(result, Err(ArcanaError::Transport { .. })));
    }

    #[test]
    fn test_response_failure_shape() {
        let response = RpcResponse::failure("bad mode");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"ok\":false"));
        assert!(json.contains("\"error\":\"bad mode\""));
    }

    #[test]
    fn test_response_success_flattens_body() {
        let mut body = serde_json::Map::new();
        body.insert("answer".into(), serde_json::json!("all is well"));
        let response = RpcResponse::success(body);

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"ok\":true"));
        assert!(json.contains("\"answer\":\"all is well\""));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"body\""));
    }

    #[test]
    fn test_request_missing_information_defaults_empty() {
        let parsed: ReadingRequest =
            serde_json::from_str(r#"{"mode":"money","question":"when?"}"#).unwrap();
        assert_eq!(parsed.information, "");
    }
}
