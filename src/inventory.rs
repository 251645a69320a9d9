//! Adapter registry
//!
//! An `Inventory` is built once by the composition root and shared
//! read-only afterwards. Each coin type resolves to at most one adapter.

use std::collections::HashSet;

use crate::adapter::ChainAdapter;
use crate::bitcoin_wallet::BitcoinAdapter;
use crate::bitshares_wallet::BitsharesAdapter;
use crate::error::{VaultError, VaultResult};
use crate::ethereum_wallet::EvmAdapter;
use crate::tron_wallet::TronAdapter;
use crate::utils::config::VaultSettings;
use crate::wallet::slip44;
use crate::{log_error, log_info};

/// Placeholder replaced by the index in batch path templates
pub const INDEX_PLACEHOLDER: &str = "%d";

pub struct Inventory {
    adapters: Vec<Box<dyn ChainAdapter>>,
    settings: VaultSettings,
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("adapters", &self.adapters.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Inventory {
    /// The standard adapter set with standard settings.
    pub fn new() -> VaultResult<Self> {
        Self::with_settings(VaultSettings::standard())
    }

    pub fn with_settings(settings: VaultSettings) -> VaultResult<Self> {
        let adapters: Vec<Box<dyn ChainAdapter>> = vec![
            Box::new(EvmAdapter),
            Box::new(BitcoinAdapter),
            Box::new(TronAdapter),
            Box::new(BitsharesAdapter::new(settings.max_signature_attempts)),
        ];
        Self::from_adapters(adapters, settings)
    }

    /// Build from an explicit adapter list.
    ///
    /// Fails if the settings are invalid or two adapters claim the same coin type.
    pub fn from_adapters(adapters: Vec<Box<dyn ChainAdapter>>, settings: VaultSettings) -> VaultResult<Self> {
        settings.validate()?;

        let mut claimed = HashSet::new();
        for adapter in &adapters {
            for &coin_type in adapter.coin_types() {
                if !claimed.insert(coin_type) {
                    return Err(VaultError::invalid_config(format!(
                        "coin type {} is claimed by more than one adapter (second: {})",
                        coin_type,
                        adapter.name()
                    )));
                }
            }
        }

        Ok(Self { adapters, settings })
    }

    pub fn settings(&self) -> &VaultSettings {
        &self.settings
    }

    /// Adapter serving `coin_type`, or a `NoAdapterForCoinType` error.
    pub fn select(&self, coin_type: u32) -> VaultResult<&dyn ChainAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.can_handle(coin_type))
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| VaultError::no_adapter(coin_type))
    }

    /// Every coin type served, in ascending order
    pub fn supported_coin_types(&self) -> Vec<u32> {
        let mut types: Vec<u32> = self
            .adapters
            .iter()
            .flat_map(|adapter| adapter.coin_types().iter().copied())
            .collect();
        types.sort_unstable();
        types
    }

    fn dispatch<T>(
        &self,
        op: &'static str,
        coin_type: u32,
        call: impl FnOnce(&dyn ChainAdapter) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let coin = slip44::coin_name(coin_type).unwrap_or("unknown");
        log_info!("inventory", "request", op = op, coin_type = coin_type, coin = coin);

        let result = self.select(coin_type).and_then(call);
        if let Err(err) = &result {
            log_error!("inventory", "request failed", op = op, coin_type = coin_type, error = err);
        }
        result
    }

    pub fn derive_address(&self, seed: &[u8], coin_type: u32, path: &str, is_dev: bool) -> VaultResult<String> {
        self.dispatch("derive_address", coin_type, |adapter| {
            adapter.derive_address(seed, path, is_dev)
        })
    }

    pub fn derive_public_key(&self, seed: &[u8], coin_type: u32, path: &str, is_dev: bool) -> VaultResult<String> {
        self.dispatch("derive_public_key", coin_type, |adapter| {
            adapter.derive_public_key(seed, path, is_dev)
        })
    }

    pub fn create_signed_transaction(
        &self,
        seed: &[u8],
        coin_type: u32,
        path: &str,
        payload: &str,
        is_dev: bool,
    ) -> VaultResult<String> {
        self.dispatch("create_signed_transaction", coin_type, |adapter| {
            adapter.create_signed_transaction(seed, path, payload, is_dev)
        })
    }

    /// Derive `count` consecutive addresses from a `%d` path template.
    ///
    /// Returns `(path, address)` pairs in index order; any failure aborts
    /// the whole batch.
    pub fn derive_addresses(
        &self,
        seed: &[u8],
        coin_type: u32,
        path_template: &str,
        start_index: u32,
        count: u32,
        is_dev: bool,
    ) -> VaultResult<Vec<(String, String)>> {
        if path_template.matches(INDEX_PLACEHOLDER).count() != 1 {
            return Err(VaultError::invalid_path(format!(
                "path template must contain exactly one {}: {}",
                INDEX_PLACEHOLDER, path_template
            )));
        }
        if count == 0 || count > self.settings.max_batch_count {
            return Err(VaultError::invalid_config(format!(
                "batch count must be between 1 and {}, got {}",
                self.settings.max_batch_count, count
            )));
        }
        let last_index = start_index.checked_add(count - 1).ok_or_else(|| {
            VaultError::invalid_path(format!("batch index overflow: {} + {}", start_index, count))
        })?;

        self.dispatch("derive_addresses", coin_type, |adapter| {
            (start_index..=last_index)
                .map(|index| {
                    let path = path_template.replace(INDEX_PLACEHOLDER, &index.to_string());
                    let address = adapter.derive_address(seed, &path, is_dev)?;
                    Ok((path, address))
                })
                .collect()
        })
    }
}
