//! TRC20 call-data decoding
//!
//! Resolves the token recipient from `TriggerSmartContract.data`.

use ethers_core::abi::{Abi, Function, Token};

use crate::error::{VaultError, VaultResult};

/// Standard TRC20 interface (identical to ERC20)
pub const TRC20_ABI: &str = r#"[
  {"type":"function","name":"name","inputs":[],"outputs":[{"name":"","type":"string"}],"stateMutability":"view"},
  {"type":"function","name":"symbol","inputs":[],"outputs":[{"name":"","type":"string"}],"stateMutability":"view"},
  {"type":"function","name":"decimals","inputs":[],"outputs":[{"name":"","type":"uint8"}],"stateMutability":"view"},
  {"type":"function","name":"totalSupply","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"balanceOf","inputs":[{"name":"who","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"allowance","inputs":[{"name":"owner","type":"address"},{"name":"spender","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
  {"type":"function","name":"transferFrom","inputs":[{"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
  {"type":"function","name":"approve","inputs":[{"name":"spender","type":"address"},{"name":"value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
  {"type":"event","name":"Transfer","anonymous":false,"inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]},
  {"type":"event","name":"Approval","anonymous":false,"inputs":[{"name":"owner","type":"address","indexed":true},{"name":"spender","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]}
]"#;

pub fn trc20_abi() -> VaultResult<Abi> {
    serde_json::from_str(TRC20_ABI)
        .map_err(|e| VaultError::internal(format!("TRC20 ABI does not parse: {}", e)))
}

/// A TRC20 call decoded against the standard interface
#[derive(Debug, Clone)]
pub struct DecodedCall {
    pub function: String,
    pub args: Vec<Token>,
}

impl DecodedCall {
    /// Recipient of the call as a 20-byte EVM address.
    ///
    /// `transfer` and any two-argument call carry it first; `transferFrom`
    /// and any three-argument call carry it second. Anything else is `None`.
    pub fn recipient(&self) -> Option<[u8; 20]> {
        let index = match (self.function.as_str(), self.args.len()) {
            ("transfer", _) | (_, 2) => 0,
            ("transferFrom", _) | (_, 3) => 1,
            _ => return None,
        };
        match self.args.get(index)? {
            Token::Address(address) => Some(address.0),
            _ => None,
        }
    }
}

fn find_function<'a>(abi: &'a Abi, selector: &[u8]) -> Option<&'a Function> {
    abi.functions().find(|f| &f.short_signature()[..] == selector)
}

/// Decode call data (`selector || args`) against the TRC20 interface.
pub fn decode_call(data: &[u8]) -> VaultResult<DecodedCall> {
    if data.len() < 4 {
        return Err(VaultError::malformed_payload(format!(
            "contract call data too short: {} bytes",
            data.len()
        )));
    }

    let abi = trc20_abi()?;
    let (selector, args) = data.split_at(4);
    let function = find_function(&abi, selector).ok_or_else(|| {
        VaultError::malformed_payload(format!(
            "unknown TRC20 selector 0x{}",
            hex::encode(selector)
        ))
    })?;

    if args.is_empty() {
        return Err(VaultError::malformed_payload(format!(
            "contract call {} has no arguments",
            function.name
        )));
    }

    let tokens = function.decode_input(args).map_err(|e| {
        VaultError::malformed_payload(format!("cannot decode {} arguments: {}", function.name, e))
    })?;

    Ok(DecodedCall {
        function: function.name.clone(),
        args: tokens,
    })
}
