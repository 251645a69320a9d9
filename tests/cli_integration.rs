use serde_json::Value;
use std::process::{Command, Output};

const SEED_HEX: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

fn run(args: &[&str]) -> Output {
    let binary_path = assert_cmd::cargo::cargo_bin!("hdvault");
    Command::new(binary_path)
        .env_remove("HDVAULT_MAX_SIGNATURE_ATTEMPTS")
        .env_remove("HDVAULT_MAX_BATCH_COUNT")
        .env_remove("HDVAULT_DEBUG")
        .args(args)
        .output()
        .expect("cli runs")
}

fn run_json(args: &[&str]) -> Value {
    let output = run(args);
    assert!(
        output.status.success(),
        "cli exited unsuccessfully: {:?}",
        output
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    serde_json::from_str(&stdout).expect("stdout is valid json")
}

#[test]
fn cli_prints_ethereum_address() {
    let value = run_json(&["address", "--seed-hex", SEED_HEX, "--json"]);
    assert_eq!(value["coin_type"], 60);
    assert_eq!(value["path"], "m/44'/60'/0'/0/0");
    assert_eq!(value["address"], "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
}

#[test]
fn cli_prints_public_key_plain() {
    let output = run(&["public-key", "--seed-hex", SEED_HEX]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf8");
    assert_eq!(
        stdout.trim(),
        "0237b0bb7a8288d38ed49a524b5dc98cff3eb5ca824c9f9dc0dfdb3d9cd600f299"
    );
}

#[test]
fn cli_uses_coin_type_in_default_path() {
    let value = run_json(&["address", "--seed-hex", SEED_HEX, "--coin-type", "0", "--json"]);
    assert_eq!(value["path"], "m/44'/0'/0'/0/0");
    assert_eq!(value["address"], "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
}

#[test]
fn cli_signs_ethereum_payload() {
    let payload = r#"{"nonce":1,"value":"1000","gasLimit":21000,"gasPrice":"1000000000","to":"0x742d35Cc6634C0532925a3b8D359A5C5119e32C8","data":"0x","chainId":1}"#;
    let value = run_json(&["sign", "--seed-hex", SEED_HEX, "--payload", payload, "--json"]);
    let signed = value["signed"].as_str().expect("signed is a string");
    assert!(signed.starts_with("0x"));
}

#[test]
fn cli_batch_lists_addresses() {
    let value = run_json(&[
        "batch",
        "--seed-hex",
        SEED_HEX,
        "--template",
        "m/44'/60'/0'/0/%d",
        "--count",
        "2",
        "--json",
    ]);
    let addresses = value["addresses"].as_array().expect("addresses array");
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0]["address"], "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(addresses[1]["path"], "m/44'/60'/0'/0/1");
}

#[test]
fn cli_lists_coins_without_seed() {
    let value = run_json(&["coins", "--json"]);
    let coins = value.as_array().expect("coin list");
    let tron = coins
        .iter()
        .find(|coin| coin["coin_type"] == 195)
        .expect("tron listed");
    assert_eq!(tron["supported"], true);
}

#[test]
fn cli_requires_seed() {
    let output = run(&["address"]);
    assert!(!output.status.success());
}

#[test]
fn cli_reports_unsupported_coin_type() {
    let output = run(&["address", "--seed-hex", SEED_HEX, "--coin-type", "501"]);
    assert!(!output.status.success());
}
