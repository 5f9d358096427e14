//! Messages between the host and a worker process.
//!
//! One JSON object per line over the worker's stdin/stdout. JSON string
//! escaping guarantees a message never contains a raw newline.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::RenderOptions;

/// Command sent from the host to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Liveness check right after spawning.
    Ping,
    /// Load runtime resources from a directory.
    Load { root: PathBuf },
    /// Compile a source document into SVG.
    Texify {
        source: String,
        options: RenderOptions,
    },
    /// Exit cleanly.
    Shutdown,
}

/// Response sent from the worker to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Loaded,
    Image { svg: String },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("worker closed the channel")]
    Closed,
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    Ok(line)
}

/// Write one message (host side).
pub async fn send<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    writer.write_all(&encode(message)?).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message (host side), suspending until a full line arrives.
pub async fn recv<R, T>(reader: &mut R) -> Result<T, ProtocolError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(ProtocolError::Closed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Write one message (worker side).
pub fn send_blocking<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<(), ProtocolError> {
    writer.write_all(&encode(message)?)?;
    writer.flush()?;
    Ok(())
}

/// Read one message (worker side). `None` once the host closes the channel.
pub fn recv_blocking<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, ProtocolError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let line = encode(&Request::Texify {
            source: "a\nb".into(),
            options: RenderOptions { embed_fonts: false },
        })
        .unwrap();
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "{\"op\":\"texify\",\"source\":\"a\\nb\",\"options\":{\"embed_fonts\":false}}\n"
        );
        assert_eq!(
            serde_json::to_string(&Response::Pong).unwrap(),
            r#"{"status":"pong"}"#
        );
    }

    #[test]
    fn test_blocking_exchange() {
        let mut wire = Vec::new();
        send_blocking(&mut wire, &Request::Load { root: "/tex".into() }).unwrap();
        send_blocking(&mut wire, &Request::Shutdown).unwrap();

        let mut reader = wire.as_slice();
        let first: Option<Request> = recv_blocking(&mut reader).unwrap();
        assert_eq!(first, Some(Request::Load { root: "/tex".into() }));
        let second: Option<Request> = recv_blocking(&mut reader).unwrap();
        assert_eq!(second, Some(Request::Shutdown));
        let end: Option<Request> = recv_blocking(&mut reader).unwrap();
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn test_async_exchange() {
        let mut wire = Vec::new();
        send(&mut wire, &Response::Image { svg: "<svg/>".into() }).await.unwrap();

        let mut reader = tokio::io::BufReader::new(wire.as_slice());
        let response: Response = recv(&mut reader).await.unwrap();
        assert_eq!(response, Response::Image { svg: "<svg/>".into() });
        assert!(matches!(
            recv::<_, Response>(&mut reader).await,
            Err(ProtocolError::Closed)
        ));
    }

    #[test]
    fn test_malformed_line() {
        let mut reader: &[u8] = b"{\"op\":\"dance\"}\n";
        assert!(matches!(
            recv_blocking::<_, Request>(&mut reader),
            Err(ProtocolError::Json(_))
        ));
    }
}
