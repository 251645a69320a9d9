//! Chain adapter capability interface
//!
//! An adapter is a stateless strategy bound to a fixed set of SLIP-44 coin
//! types. All inputs are per call; adapters hold only static configuration
//! and can be shared freely across threads.

use zeroize::Zeroizing;

use crate::error::VaultResult;

pub trait ChainAdapter: Send + Sync {
    /// Human-readable adapter name for logs
    fn name(&self) -> &'static str;

    /// SLIP-44 coin types served by this adapter
    fn coin_types(&self) -> &[u32];

    fn can_handle(&self, coin_type: u32) -> bool {
        self.coin_types().contains(&coin_type)
    }

    /// Private key in the chain's export format (hex or WIF).
    fn derive_private_key(&self, seed: &[u8], path: &str, is_dev: bool) -> VaultResult<Zeroizing<String>>;

    fn derive_public_key(&self, seed: &[u8], path: &str, is_dev: bool) -> VaultResult<String>;

    fn derive_address(&self, seed: &[u8], path: &str, is_dev: bool) -> VaultResult<String>;

    /// Build and sign a transaction from the chain-specific `payload`.
    fn create_signed_transaction(
        &self,
        seed: &[u8],
        path: &str,
        payload: &str,
        is_dev: bool,
    ) -> VaultResult<String>;
}
