use std::fs;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hdvault_core::utils::logging;
use hdvault_core::wallet::{seed_from_mnemonic, slip44};
use hdvault_core::{log_warn, Inventory, VaultSettings};
use serde_json::json;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "hdvault", version, about = "Derive HD keys and sign transactions offline")]
struct Cli {
    /// Seed as hex
    #[arg(long, global = true, conflicts_with = "mnemonic")]
    seed_hex: Option<String>,
    /// BIP-39 mnemonic phrase
    #[arg(long, global = true)]
    mnemonic: Option<String>,
    /// BIP-39 passphrase used with --mnemonic
    #[arg(long, global = true, default_value = "")]
    passphrase: String,
    /// SLIP-44 coin type
    #[arg(long, global = true, default_value_t = slip44::ETHEREUM)]
    coin_type: u32,
    /// Derivation path (defaults to m/44'/<coin type>'/0'/0/0)
    #[arg(long, global = true)]
    path: Option<String>,
    /// Use testnet encodings where the chain has them
    #[arg(long, global = true)]
    dev: bool,
    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,
    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,
    /// Settings file (JSON); otherwise HDVAULT_* environment variables apply
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the address at the selected path
    Address,
    /// Print the public key at the selected path
    PublicKey,
    /// Sign a chain-specific transaction payload ("-" reads stdin)
    Sign {
        #[arg(long)]
        payload: String,
    },
    /// Derive consecutive addresses from a path template containing %d
    Batch {
        #[arg(long)]
        template: String,
        #[arg(long, default_value_t = 0)]
        start: u32,
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    /// List known coin types and whether they are supported
    Coins,
}

fn load_settings(cli: &Cli) -> Result<VaultSettings> {
    let mut settings = match &cli.config {
        Some(file) => {
            let text = fs::read_to_string(file).with_context(|| format!("reading {}", file))?;
            VaultSettings::from_json_str(&text)?
        }
        None => VaultSettings::from_env()?,
    };
    if cli.debug {
        settings.debug_logging = true;
    }
    Ok(settings)
}

fn load_seed(cli: &Cli) -> Result<Zeroizing<Vec<u8>>> {
    if let Some(seed_hex) = &cli.seed_hex {
        let seed = hex::decode(seed_hex.trim()).context("--seed-hex is not valid hex")?;
        return Ok(Zeroizing::new(seed));
    }
    if let Some(mnemonic) = &cli.mnemonic {
        let seed = seed_from_mnemonic(mnemonic, &cli.passphrase)?;
        return Ok(Zeroizing::new(seed.to_vec()));
    }
    bail!("provide --seed-hex or --mnemonic")
}

fn read_payload(payload: &str) -> Result<String> {
    if payload != "-" {
        return Ok(payload.to_string());
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).context("reading payload from stdin")?;
    Ok(buffer)
}

fn print_value(cli: &Cli, path: &str, key: &str, value: &str) {
    if cli.json {
        println!("{}", json!({ "coin_type": cli.coin_type, "path": path, key: value }));
    } else {
        println!("{}", value);
    }
}

fn list_coins(cli: &Cli, inventory: &Inventory) {
    let supported = inventory.supported_coin_types();
    if cli.json {
        let coins: Vec<_> = slip44::all()
            .map(|(coin_type, name)| {
                json!({ "coin_type": coin_type, "name": name, "supported": supported.contains(&coin_type) })
            })
            .collect();
        println!("{}", serde_json::Value::from(coins));
        return;
    }
    for (coin_type, name) in slip44::all() {
        let marker = if supported.contains(&coin_type) { "*" } else { " " };
        println!("{} {:>5}  {}", marker, coin_type, name);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    if settings.debug_logging {
        logging::enable_debug();
    }
    for warning in settings.warnings() {
        log_warn!("main", "settings", warning = warning);
    }
    let inventory = Inventory::with_settings(settings)?;

    if let Command::Coins = cli.cmd {
        list_coins(&cli, &inventory);
        return Ok(());
    }

    let seed = load_seed(&cli)?;
    let path = cli
        .path
        .clone()
        .unwrap_or_else(|| format!("m/44'/{}'/0'/0/0", cli.coin_type));

    match &cli.cmd {
        Command::Address => {
            let address = inventory.derive_address(&seed, cli.coin_type, &path, cli.dev)?;
            print_value(&cli, &path, "address", &address);
        }
        Command::PublicKey => {
            let public_key = inventory.derive_public_key(&seed, cli.coin_type, &path, cli.dev)?;
            print_value(&cli, &path, "public_key", &public_key);
        }
        Command::Sign { payload } => {
            let payload = read_payload(payload)?;
            let signed = inventory.create_signed_transaction(&seed, cli.coin_type, &path, &payload, cli.dev)?;
            print_value(&cli, &path, "signed", &signed);
        }
        Command::Batch { template, start, count } => {
            let batch = inventory.derive_addresses(&seed, cli.coin_type, template, *start, *count, cli.dev)?;
            if cli.json {
                let entries: Vec<_> = batch
                    .iter()
                    .map(|(path, address)| json!({ "path": path, "address": address }))
                    .collect();
                println!("{}", json!({ "coin_type": cli.coin_type, "addresses": entries }));
            } else {
                for (path, address) in batch {
                    println!("{} {}", path, address);
                }
            }
        }
        Command::Coins => {}
    }

    Ok(())
}
