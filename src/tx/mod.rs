//! Transaction Module
//!
//! Script verification for Bitcoin and the Tron wire format.

pub mod script;
pub mod tron_proto;

pub use script::{verify_input, ScriptError};
