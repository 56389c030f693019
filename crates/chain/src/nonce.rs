use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{ChainClient, ChainError};

/// Serialized per-account nonce allocation.
///
/// The nonce sequence of a sending account is a shared resource across
/// concurrently executing futures; reserving under a single lock guarantees
/// no two interactions ever race for the same nonce.
pub struct NonceManager {
    client: Arc<dyn ChainClient>,
    next: Mutex<HashMap<String, u64>>,
}

impl NonceManager {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            next: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next nonce for the account. The first reservation syncs
    /// with the network's pending count; later ones increment locally.
    pub async fn reserve(&self, account: &str) -> Result<u64, ChainError> {
        let mut next = self.next.lock().await;

        if !next.contains_key(account) {
            let pending = self.client.pending_nonce(account).await?;
            next.insert(account.to_string(), pending);
        }
        let slot = next.entry(account.to_string()).or_insert(0);

        let nonce = *slot;
        *slot += 1;
        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PollResult, TransactionRequest};
    use async_trait::async_trait;
    use caravan_types::{FeeSnapshot, Value};

    struct FixedNonceClient;

    #[async_trait]
    impl ChainClient for FixedNonceClient {
        async fn submit(
            &self,
            _request: &TransactionRequest,
            _nonce: u64,
            _fees: FeeSnapshot,
        ) -> Result<String, ChainError> {
            unimplemented!()
        }

        async fn poll(&self, _tx_hash: &str) -> Result<PollResult, ChainError> {
            unimplemented!()
        }

        async fn estimate_fees(&self) -> Result<FeeSnapshot, ChainError> {
            unimplemented!()
        }

        async fn call(
            &self,
            _to: &str,
            _function: &str,
            _args: &[Value],
        ) -> Result<Value, ChainError> {
            unimplemented!()
        }

        async fn pending_nonce(&self, _account: &str) -> Result<u64, ChainError> {
            Ok(41)
        }
    }

    #[tokio::test]
    async fn test_reserve_syncs_then_increments() {
        let manager = NonceManager::new(Arc::new(FixedNonceClient));

        assert_eq!(manager.reserve("0xacc").await.unwrap(), 41);
        assert_eq!(manager.reserve("0xacc").await.unwrap(), 42);
        assert_eq!(manager.reserve("0xacc").await.unwrap(), 43);
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let manager = NonceManager::new(Arc::new(FixedNonceClient));

        assert_eq!(manager.reserve("0xa").await.unwrap(), 41);
        assert_eq!(manager.reserve("0xb").await.unwrap(), 41);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_collide() {
        let manager = Arc::new(NonceManager::new(Arc::new(FixedNonceClient)));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            handles.push(tokio::spawn(
                async move { manager.reserve("0xacc").await },
            ));
        }

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap().unwrap());
        }
        nonces.sort_unstable();
        nonces.dedup();
        assert_eq!(nonces.len(), 16);
    }
}
