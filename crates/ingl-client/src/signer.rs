//! Signers: an in-memory Ed25519 key pair or a hardware device.
//!
//! Both implement [`TransactionSigner`]. Which one a human-supplied string
//! selects is decided by [`SignerSource`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use ingl_sol::{Address, SIGNATURE_LEN};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::device::{DerivationPath, DeviceError, DeviceTransport};
use crate::error::ClientError;

/// Prefix selecting a hardware device slot, matched ASCII case-insensitively.
pub const DEVICE_PREFIX: &str = "ledger://";

/// How long a device request may wait for the user before failing.
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(120);

const KEYPAIR_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    Local,
    Hardware,
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn public_address(&self) -> Address;

    fn kind(&self) -> SignerKind;

    /// Sign the serialized message bytes.
    async fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], ClientError>;
}

// ---------------------------------------------------------------------------
// In-memory key pair
// ---------------------------------------------------------------------------

pub struct KeypairSigner {
    signing_key: SigningKey,
}

impl KeypairSigner {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Load from the 64-byte `secret ++ public` layout. The public half must
    /// belong to the secret half.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        if bytes.len() != KEYPAIR_LEN {
            return Err(ClientError::InvalidSignerInput(format!(
                "keypair must be {KEYPAIR_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&bytes[..32]);
        let signer = Self::from_secret(&secret);
        if signer.public_address().as_bytes()[..] != bytes[32..] {
            return Err(ClientError::InvalidSignerInput(
                "keypair public key does not match its secret key".into(),
            ));
        }
        Ok(signer)
    }

    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn to_keypair_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LEN]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    /// Read a key pair stored as a JSON array of 64 numbers.
    pub fn read_from_file(path: &Path) -> Result<Self, ClientError> {
        let text = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            ClientError::InvalidSignerInput(format!("read {}: {e}", path.display()))
        })?);
        let bytes: Zeroizing<Vec<u8>> =
            Zeroizing::new(serde_json::from_str(&text).map_err(|e| {
                ClientError::InvalidSignerInput(format!(
                    "{} is not a keypair file: {e}",
                    path.display()
                ))
            })?);
        Self::from_keypair_bytes(&bytes)
    }

    /// Write the key pair as a JSON array, creating parent directories.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ClientError> {
        let bytes = self.to_keypair_bytes();
        let text = Zeroizing::new(
            serde_json::to_string(&bytes[..])
                .map_err(|e| ClientError::InvalidArgument(format!("encode keypair: {e}")))?,
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::InvalidArgument(format!("create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(path, text.as_bytes()).map_err(|e| {
            ClientError::InvalidArgument(format!("write {}: {e}", path.display()))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| ClientError::InvalidArgument(format!("chmod {}: {e}", path.display())),
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("address", &self.public_address())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn public_address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    fn kind(&self) -> SignerKind {
        SignerKind::Local
    }

    async fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], ClientError> {
        Ok(self.signing_key.sign(message).to_bytes())
    }
}

// ---------------------------------------------------------------------------
// Hardware device
// ---------------------------------------------------------------------------

pub struct HardwareSigner {
    transport: Arc<dyn DeviceTransport>,
    path: DerivationPath,
    address: Address,
    timeout: Duration,
}

impl HardwareSigner {
    /// Ask the device for the address at `slot` and wrap it.
    pub async fn connect(
        transport: Arc<dyn DeviceTransport>,
        slot: u32,
    ) -> Result<Self, ClientError> {
        let path = DerivationPath::for_slot(slot);
        let address = match tokio::time::timeout(DEFAULT_DEVICE_TIMEOUT, transport.address(&path))
            .await
        {
            Ok(result) => result.map_err(device_error)?,
            Err(_) => {
                tracing::warn!(%path, "device did not report an address in time");
                return Err(ClientError::SignerUnavailable(format!(
                    "no address from device at {path}"
                )));
            }
        };
        tracing::debug!(%address, %path, "connected hardware signer");
        Ok(Self {
            transport,
            path,
            address,
            timeout: DEFAULT_DEVICE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> DerivationPath {
        self.path
    }
}

impl fmt::Debug for HardwareSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareSigner")
            .field("address", &self.address)
            .field("path", &self.path.to_string())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn device_error(err: DeviceError) -> ClientError {
    match err {
        DeviceError::Rejected => ClientError::SignerRejected(err.to_string()),
        DeviceError::Unavailable(_) | DeviceError::Protocol(_) => {
            ClientError::SignerUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl TransactionSigner for HardwareSigner {
    fn public_address(&self) -> Address {
        self.address
    }

    fn kind(&self) -> SignerKind {
        SignerKind::Hardware
    }

    async fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN], ClientError> {
        tracing::info!(
            address = %self.address,
            path = %self.path,
            message_len = message.len(),
            "awaiting approval on the device"
        );
        match tokio::time::timeout(self.timeout, self.transport.sign(&self.path, message)).await {
            Ok(result) => result.map_err(device_error),
            Err(_) => {
                tracing::warn!(
                    address = %self.address,
                    timeout_secs = self.timeout.as_secs(),
                    "device sign request timed out"
                );
                Err(ClientError::SignerUnavailable(format!(
                    "device did not answer within {:?}",
                    self.timeout
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Human-supplied signer references
// ---------------------------------------------------------------------------

/// Where a signer comes from: a key pair file or a device slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerSource {
    Keypair(PathBuf),
    Device { slot: u32 },
}

fn strip_device_prefix(input: &str) -> Option<&str> {
    let head = input.get(..DEVICE_PREFIX.len())?;
    head.eq_ignore_ascii_case(DEVICE_PREFIX)
        .then(|| &input[DEVICE_PREFIX.len()..])
}

impl FromStr for SignerSource {
    type Err = ClientError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ClientError::InvalidSignerInput("empty signer reference".into()));
        }
        match strip_device_prefix(input) {
            Some(slot) => {
                let slot = slot.parse::<u32>().map_err(|e| {
                    ClientError::InvalidSignerInput(format!("bad device slot {slot:?}: {e}"))
                })?;
                Ok(Self::Device { slot })
            }
            None => Ok(Self::Keypair(PathBuf::from(input))),
        }
    }
}

impl SignerSource {
    /// Load the signer. A device source needs a transport.
    pub async fn resolve(
        &self,
        transport: Option<&Arc<dyn DeviceTransport>>,
    ) -> Result<Arc<dyn TransactionSigner>, ClientError> {
        match self {
            Self::Keypair(path) => Ok(Arc::new(KeypairSigner::read_from_file(path)?)),
            Self::Device { slot } => {
                let transport = transport.ok_or_else(|| {
                    ClientError::SignerUnavailable("no hardware device transport configured".into())
                })?;
                Ok(Arc::new(HardwareSigner::connect(transport.clone(), *slot).await?))
            }
        }
    }
}

/// Parse a public key given as a device reference, a Base58 address, or a
/// key pair file, tried in that order.
pub async fn parse_pubkey_input(
    input: &str,
    transport: Option<&Arc<dyn DeviceTransport>>,
) -> Result<Address, ClientError> {
    let input = input.trim();
    if strip_device_prefix(input).is_some() {
        let source: SignerSource = input.parse()?;
        return Ok(source.resolve(transport).await?.public_address());
    }
    if let Ok(address) = input.parse::<Address>() {
        return Ok(address);
    }
    KeypairSigner::read_from_file(Path::new(input))
        .map(|signer| signer.public_address())
        .map_err(|e| {
            ClientError::InvalidSignerInput(format!(
                "{input:?} is neither an address nor a keypair file ({e})"
            ))
        })
}
