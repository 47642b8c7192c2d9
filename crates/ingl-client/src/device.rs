//! Hardware signing devices.
//!
//! A device is reached through a [`DeviceTransport`]. The shipped
//! [`CommandTransport`] runs an external helper program once per request and
//! exchanges a single JSON line with it:
//!
//! ```text
//! -> {"op":"address","path":"m/44'/501'/0'"}
//! <- {"address":"<base58>"}
//! -> {"op":"sign","path":"m/44'/501'/0'","message":"<hex>"}
//! <- {"signature":"<hex>"}        or  {"error":"rejected"}
//! ```

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use ingl_sol::{Address, SIGNATURE_LEN};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

const HARDENED: u32 = 0x8000_0000;
const PURPOSE: u32 = 44;
const COIN_TYPE: u32 = 501;

/// BIP-44 path `m/44'/501'/n'` for device slot `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationPath {
    account: u32,
}

impl DerivationPath {
    pub fn for_slot(slot: u32) -> Self {
        Self { account: slot }
    }

    pub fn slot(&self) -> u32 {
        self.account
    }

    /// Hardened path components, as devices expect them.
    pub fn components(&self) -> [u32; 3] {
        [
            PURPOSE | HARDENED,
            COIN_TYPE | HARDENED,
            self.account | HARDENED,
        ]
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m/{PURPOSE}'/{COIN_TYPE}'/{}'", self.account)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected on the device")]
    Rejected,

    #[error("device protocol error: {0}")]
    Protocol(String),
}

#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// The public address the device holds at `path`.
    async fn address(&self, path: &DerivationPath) -> Result<Address, DeviceError>;

    /// Ask the device to sign `message`. Suspends until the user approves or
    /// rejects it on the device.
    async fn sign(
        &self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<[u8; SIGNATURE_LEN], DeviceError>;
}

// ---------------------------------------------------------------------------
// Helper-process transport
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DeviceRequest {
    Address { path: String },
    Sign { path: String, message: String },
}

#[derive(Debug, Default, Deserialize)]
struct DeviceResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Talks to a device through an external helper program.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTransport {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    async fn exchange(&self, request: &DeviceRequest) -> Result<DeviceResponse, DeviceError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| DeviceError::Protocol(format!("encode request: {e}")))?;
        line.push('\n');

        // kill_on_drop: a cancelled request must not leave the helper running.
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DeviceError::Unavailable(format!("spawn {}: {e}", self.program.display()))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DeviceError::Unavailable("helper stdin unavailable".into()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| DeviceError::Unavailable(format!("write request: {e}")))?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DeviceError::Unavailable("helper stdout unavailable".into()))?;
        let mut reply = String::new();
        BufReader::new(stdout)
            .read_line(&mut reply)
            .await
            .map_err(|e| DeviceError::Unavailable(format!("read reply: {e}")))?;
        // The reply is all we need; the exit status carries nothing more.
        let _ = child.wait().await;

        if reply.trim().is_empty() {
            return Err(DeviceError::Unavailable("helper exited without a reply".into()));
        }
        let response: DeviceResponse = serde_json::from_str(reply.trim())
            .map_err(|e| DeviceError::Protocol(format!("decode reply: {e}")))?;

        match response.error.as_deref() {
            None => Ok(response),
            Some("rejected") => Err(DeviceError::Rejected),
            Some(other) => Err(DeviceError::Unavailable(other.to_string())),
        }
    }
}

#[async_trait]
impl DeviceTransport for CommandTransport {
    async fn address(&self, path: &DerivationPath) -> Result<Address, DeviceError> {
        let response = self
            .exchange(&DeviceRequest::Address {
                path: path.to_string(),
            })
            .await?;
        let text = response
            .address
            .ok_or_else(|| DeviceError::Protocol("reply has no address".into()))?;
        text.parse()
            .map_err(|e| DeviceError::Protocol(format!("bad address in reply: {e}")))
    }

    async fn sign(
        &self,
        path: &DerivationPath,
        message: &[u8],
    ) -> Result<[u8; SIGNATURE_LEN], DeviceError> {
        let response = self
            .exchange(&DeviceRequest::Sign {
                path: path.to_string(),
                message: hex::encode(message),
            })
            .await?;
        let text = response
            .signature
            .ok_or_else(|| DeviceError::Protocol("reply has no signature".into()))?;
        let bytes = hex::decode(text)
            .map_err(|e| DeviceError::Protocol(format!("bad signature hex: {e}")))?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            DeviceError::Protocol(format!("signature is {} bytes", bytes.len()))
        })
    }
}
