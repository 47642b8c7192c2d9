//! Shared cache for the recent block reference.
//!
//! One cache is shared by every transaction the process assembles. A cached
//! reference is served until it is older than the TTL, is invalidated, or a
//! block height past its expiry is observed; after that it is treated as
//! absent and fetched again.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::rpc::{BlockReference, LedgerRpc, RpcError};

pub const DEFAULT_BLOCKHASH_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Cached {
    reference: BlockReference,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct BlockhashCache {
    ttl: Duration,
    slot: Mutex<Option<Cached>>,
}

impl Default for BlockhashCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockhashCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_BLOCKHASH_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return a live reference, fetching one if none is cached.
    ///
    /// The lock is held across the fetch, so concurrent callers that find the
    /// cache empty wait for a single network round trip. A failed fetch
    /// leaves the cache empty and is returned to the caller as is.
    pub async fn get(&self, rpc: &dyn LedgerRpc) -> Result<BlockReference, RpcError> {
        let mut slot = self.slot.lock().await;

        match slot.as_ref() {
            Some(cached) if cached.fetched_at.elapsed() < self.ttl => {
                tracing::debug!(
                    last_valid_block_height = cached.reference.last_valid_block_height,
                    "block reference cache hit"
                );
                return Ok(cached.reference);
            }
            Some(_) => tracing::debug!("cached block reference expired"),
            None => tracing::debug!("block reference cache miss"),
        }

        *slot = None;
        let reference = rpc.fetch_block_reference().await?;
        tracing::debug!(
            last_valid_block_height = reference.last_valid_block_height,
            "fetched block reference"
        );
        *slot = Some(Cached {
            reference,
            fetched_at: Instant::now(),
        });
        Ok(reference)
    }

    /// Drop the cached reference, e.g. after the node reported it unknown.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    /// Drop the cached reference if `block_height` is past its expiry.
    pub async fn observe_block_height(&self, block_height: u64) {
        let mut slot = self.slot.lock().await;
        if slot
            .as_ref()
            .is_some_and(|c| block_height > c.reference.last_valid_block_height)
        {
            tracing::debug!(block_height, "cached block reference passed its expiry height");
            *slot = None;
        }
    }

    /// The cached reference, if any, without fetching.
    pub async fn peek(&self) -> Option<BlockReference> {
        self.slot.lock().await.map(|c| c.reference)
    }
}
