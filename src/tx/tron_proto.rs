//! Tron transaction protobuf messages
//!
//! Field numbers mirror `core/Tron.proto` and `core/contract/*.proto` from
//! the java-tron protocol. Fields are declared in tag order so that prost
//! re-encodes a decoded `TransactionRaw` byte-for-byte the way the node does.

use prost::Message;

use crate::error::{VaultError, VaultResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ContractType {
    AccountCreateContract = 0,
    TransferContract = 1,
    TransferAssetContract = 2,
    VoteWitnessContract = 4,
    FreezeBalanceContract = 11,
    UnfreezeBalanceContract = 12,
    WithdrawBalanceContract = 13,
    CreateSmartContract = 30,
    TriggerSmartContract = 31,
    FreezeBalanceV2Contract = 54,
    UnfreezeBalanceV2Contract = 55,
    DelegateResourceContract = 57,
    UnDelegateResourceContract = 58,
}

#[derive(Clone, PartialEq, Message)]
pub struct AccountId {
    #[prost(bytes = "vec", tag = "1")]
    pub name: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub address: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Authority {
    #[prost(message, optional, tag = "1")]
    pub account: Option<AccountId>,
    #[prost(bytes = "vec", tag = "2")]
    pub permission_name: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Contract {
    #[prost(enumeration = "ContractType", tag = "1")]
    pub r#type: i32,
    #[prost(message, optional, tag = "2")]
    pub parameter: Option<prost_types::Any>,
    #[prost(bytes = "vec", tag = "3")]
    pub provider: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub contract_name: Vec<u8>,
    #[prost(int32, tag = "5")]
    pub permission_id: i32,
}

/// The signed portion of a Tron transaction (`Transaction.raw`)
#[derive(Clone, PartialEq, Message)]
pub struct TransactionRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub ref_block_bytes: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub ref_block_num: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub ref_block_hash: Vec<u8>,
    #[prost(int64, tag = "8")]
    pub expiration: i64,
    #[prost(message, repeated, tag = "9")]
    pub auths: Vec<Authority>,
    #[prost(bytes = "vec", tag = "10")]
    pub data: Vec<u8>,
    #[prost(message, repeated, tag = "11")]
    pub contract: Vec<Contract>,
    #[prost(bytes = "vec", tag = "12")]
    pub scripts: Vec<u8>,
    #[prost(int64, tag = "14")]
    pub timestamp: i64,
    #[prost(int64, tag = "18")]
    pub fee_limit: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransferContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub to_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub amount: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TriggerSmartContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub contract_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub call_value: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
    #[prost(int64, tag = "5")]
    pub call_token_value: i64,
    #[prost(int64, tag = "6")]
    pub token_id: i64,
}

/// Fully qualified protobuf names, as carried in `Any.type_url`
pub const TRANSFER_CONTRACT_NAME: &str = "protocol.TransferContract";
pub const TRIGGER_SMART_CONTRACT_NAME: &str = "protocol.TriggerSmartContract";

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Wrap a message into an `Any` under `full_name`.
pub fn pack_any<M: Message>(message: &M, full_name: &str) -> prost_types::Any {
    prost_types::Any {
        type_url: format!("{}{}", TYPE_URL_PREFIX, full_name),
        value: message.encode_to_vec(),
    }
}

/// Decode the message inside `any`, which must be tagged as `full_name`.
pub fn unpack_any<M: Message + Default>(any: &prost_types::Any, full_name: &str) -> VaultResult<M> {
    let tagged = any.type_url.rsplit('/').next().unwrap_or_default();
    if tagged != full_name {
        return Err(VaultError::malformed_payload(format!(
            "contract parameter is {}, expected {}",
            any.type_url, full_name
        )));
    }
    Ok(M::decode(any.value.as_slice())?)
}
