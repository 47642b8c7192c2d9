use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ingl_sol::Address;

use crate::rpc::{BlockReference, LedgerRpc, RpcError, Submission};

/// In-memory node: hands out numbered blockhashes and records submissions.
#[derive(Default)]
pub(crate) struct MockRpc {
    pub fetches: AtomicUsize,
    pub fail_fetch: Mutex<Option<RpcError>>,
    pub submit_error: Mutex<Option<RpcError>>,
    pub submitted: Mutex<Vec<(Vec<u8>, u64)>>,
    pub accounts: Mutex<HashMap<Address, Vec<u8>>>,
}

impl MockRpc {
    pub fn with_account(self, address: Address, data: Vec<u8>) -> Self {
        self.accounts.lock().unwrap().insert(address, data);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<(Vec<u8>, u64)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerRpc for MockRpc {
    async fn fetch_block_reference(&self) -> Result<BlockReference, RpcError> {
        if let Some(err) = self.fail_fetch.lock().unwrap().clone() {
            return Err(err);
        }
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(BlockReference {
            blockhash: [n as u8; 32],
            last_valid_block_height: 1000 + n as u64,
        })
    }

    async fn submit(
        &self,
        wire: Vec<u8>,
        last_valid_block_height: u64,
    ) -> Result<Submission, RpcError> {
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            return Err(err);
        }
        let signature = bs58::encode(&wire[1..65]).into_string();
        self.submitted
            .lock()
            .unwrap()
            .push((wire, last_valid_block_height));
        Ok(Submission { signature })
    }

    async fn fetch_account_bytes(&self, address: &Address) -> Result<Option<Vec<u8>>, RpcError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }
}
