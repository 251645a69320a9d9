//! Contract ABI handling

pub mod trc20;

pub use trc20::{decode_call, DecodedCall};
