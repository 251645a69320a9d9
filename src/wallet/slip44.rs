//! SLIP-0044 coin types known to the vault

pub const BITCOIN: u32 = 0;
pub const TESTNET: u32 = 1;
pub const LITECOIN: u32 = 2;
pub const DOGECOIN: u32 = 3;
pub const ETHEREUM: u32 = 60;
pub const BITSHARES: u32 = 69;
pub const TRON: u32 = 195;
pub const BINANCE: u32 = 714;
pub const POLYGON: u32 = 966;
pub const FANTOM: u32 = 1007;
pub const HARMONY: u32 = 1023;
pub const AVALANCHE: u32 = 9000;

const REGISTRY: [(u32, &str); 12] = [
    (BITCOIN, "Bitcoin"),
    (TESTNET, "TestNet"),
    (LITECOIN, "Litecoin"),
    (DOGECOIN, "Dogecoin"),
    (ETHEREUM, "Ethereum"),
    (BITSHARES, "Bitshares"),
    (TRON, "Tron"),
    (BINANCE, "Binance"),
    (POLYGON, "Polygon"),
    (FANTOM, "Fantom"),
    (HARMONY, "Harmony"),
    (AVALANCHE, "Avalanche"),
];

pub fn coin_name(coin_type: u32) -> Option<&'static str> {
    REGISTRY
        .iter()
        .find(|(ct, _)| *ct == coin_type)
        .map(|(_, name)| *name)
}

pub fn is_known(coin_type: u32) -> bool {
    coin_name(coin_type).is_some()
}

/// All known coin types in ascending order
pub fn all() -> impl Iterator<Item = (u32, &'static str)> {
    REGISTRY.iter().copied()
}
