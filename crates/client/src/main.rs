//! CLI for driving UTXO-backed auctions against the mock chain.
//!
//! This binary provides commands for:
//! - Generating development wallets
//! - Creating, starting and ending auctions
//! - Bidding, raising and withdrawing displaced bids
//! - Inspecting auction state and moving mock chain time

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::HttpClientBuilder;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use auction_client::{AuctionClient, ClientConfig, DevWallet, RpcLedger};
use auction_machine::{to_display, to_smallest_unit};
use auction_types::{Address, AuctionState, Timestamp, ValidatorArtifact};

#[derive(Parser)]
#[command(name = "auction-cli")]
#[command(about = "CLI for UTXO-backed English auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// Wallet seed (hex, 32 bytes)
    #[arg(long)]
    seed: Option<String>,

    /// Validator artifact JSON file: {"type": "PlutusV2", "script": "<hex>"}
    #[arg(long)]
    validator: Option<PathBuf>,

    /// Client config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new development wallet
    Keygen,

    /// Show the wallet address and credentials
    Address,

    /// Create a new auction with this wallet as seller
    Create {
        /// Object being auctioned
        #[arg(long)]
        object: String,

        /// Deadline (unix milliseconds)
        #[arg(long)]
        deadline: Option<Timestamp>,

        /// Deadline relative to chain time, used when --deadline is absent
        #[arg(long, default_value = "3600")]
        duration_secs: u64,
    },

    /// Open bidding at a starting amount
    Start {
        /// Auction address (defaults to the validator address)
        #[arg(long)]
        address: Option<String>,

        /// Starting amount in ADA
        #[arg(long)]
        amount: String,
    },

    /// Bid, or raise if this wallet already leads
    Bid {
        /// Auction address (defaults to the validator address)
        #[arg(long)]
        address: Option<String>,

        /// Amount in ADA
        #[arg(long)]
        amount: String,
    },

    /// Reclaim a displaced bid
    Withdraw {
        /// Auction address (defaults to the validator address)
        #[arg(long)]
        address: Option<String>,
    },

    /// Close the auction
    End {
        /// Auction address (defaults to the validator address)
        #[arg(long)]
        address: Option<String>,
    },

    /// Show the current auction record
    Show {
        /// Auction address (defaults to the validator address)
        #[arg(long)]
        address: Option<String>,
    },

    /// List withdrawal records owed to this wallet
    Pending {
        /// Auction address (defaults to the validator address)
        #[arg(long)]
        address: Option<String>,
    },

    /// Show chain time
    Time,

    /// Advance chain time (for testing)
    AdvanceTime {
        /// Milliseconds to advance
        #[arg(long)]
        millis: u64,
    },

    /// Set chain time (for testing)
    SetTime {
        /// Unix milliseconds
        #[arg(long)]
        timestamp: Timestamp,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct ChainTime {
    timestamp: Timestamp,
}

type RpcClient = AuctionClient<RpcLedger, DevWallet, RpcLedger>;

fn load_validator(path: Option<&PathBuf>) -> Result<ValidatorArtifact> {
    let path = path.ok_or_else(|| anyhow!("--validator is required for this command"))?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading validator {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}

fn load_wallet(seed: Option<&str>) -> Result<DevWallet> {
    let seed = seed.ok_or_else(|| anyhow!("--seed is required for this command"))?;
    Ok(DevWallet::from_hex(seed)?)
}

async fn connect(cli: &Cli) -> Result<RpcClient> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    let ledger = RpcLedger::connect(&cli.rpc)?;
    let clock = Arc::new(ledger.synced_clock().await?);

    Ok(AuctionClient::new(
        ledger.clone(),
        load_wallet(cli.seed.as_deref())?,
        ledger,
        clock,
        load_validator(cli.validator.as_ref())?,
        config,
    ))
}

fn resolve(client: &RpcClient, address: Option<String>) -> Address {
    address.map(Address).unwrap_or_else(|| client.auction_address())
}

fn print_state(address: &Address, state: &AuctionState) {
    println!("Auction at {}:", address);
    println!("  Object: {}", state.object_label());
    println!("  Status: {}", state.status);
    println!("  Seller: {}", state.seller);
    println!("  Bidder: {}", state.bidder);
    println!("  Amount: {} ADA", to_display(state.amount));
    println!("  Deadline: {}", state.deadline);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auction_cli=info".parse()?)
                .add_directive("auction_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Keygen => {
            let wallet = DevWallet::generate(&mut OsRng);
            println!("Seed: {}", wallet.seed_hex());
            println!("Address: {}", wallet.key_address());
            return Ok(());
        }

        Commands::Address => {
            let wallet = load_wallet(cli.seed.as_deref())?;
            let creds = wallet.credentials();
            println!("Address: {}", wallet.key_address());
            println!("  Payment: {}", creds.payment);
            println!("  Stake: {}", creds.stake);
            return Ok(());
        }

        Commands::Time => {
            let ledger = RpcLedger::connect(&cli.rpc)?;
            println!("Chain time: {}", ledger.chain_time().await?);
            return Ok(());
        }

        Commands::AdvanceTime { millis } => {
            let rpc = HttpClientBuilder::default().build(&cli.rpc)?;
            let time: ChainTime = rpc.request("admin_advanceTime", vec![*millis]).await?;
            println!("Chain time advanced to {}", time.timestamp);
            return Ok(());
        }

        Commands::SetTime { timestamp } => {
            let rpc = HttpClientBuilder::default().build(&cli.rpc)?;
            let time: ChainTime = rpc.request("admin_setTime", vec![*timestamp]).await?;
            println!("Chain time set to {}", time.timestamp);
            return Ok(());
        }

        _ => {}
    }

    let client = connect(&cli).await?;

    match cli.command {
        Commands::Create {
            object,
            deadline,
            duration_secs,
        } => {
            let deadline = match deadline {
                Some(d) => d,
                None => {
                    let ledger = RpcLedger::connect(&cli.rpc)?;
                    ledger.chain_time().await? + duration_secs * 1_000
                }
            };
            let (address, state) = client.create(&object, deadline).await?;
            info!("Auction created at {}", address);
            print_state(&address, &state);
        }

        Commands::Start { address, amount } => {
            let address = resolve(&client, address);
            let amount = to_smallest_unit(&amount)?;
            let state = client.start(&address, amount).await?;
            print_state(&address, &state);
        }

        Commands::Bid { address, amount } => {
            let address = resolve(&client, address);
            let amount = to_smallest_unit(&amount)?;
            let state = client.bid_or_raise(&address, amount).await?;
            print_state(&address, &state);
        }

        Commands::Withdraw { address } => {
            let address = resolve(&client, address);
            let tx_hash = client.withdraw(&address).await?;
            println!("Withdrawal confirmed in {}", tx_hash);
        }

        Commands::End { address } => {
            let address = resolve(&client, address);
            let state = client.end(&address).await?;
            print_state(&address, &state);
        }

        Commands::Show { address } => {
            let address = resolve(&client, address);
            let state = client.fetch_state(&address).await?;
            print_state(&address, &state);
        }

        Commands::Pending { address } => {
            let address = resolve(&client, address);
            let pending = client.pending_withdrawals(&address).await?;
            if pending.is_empty() {
                println!("No pending withdrawals");
            } else {
                println!("Pending withdrawals at {}:", address);
                for (utxo, record) in pending {
                    println!("  [{}] {} ADA", utxo.out_ref, to_display(record.amount));
                }
            }
        }

        Commands::Keygen
        | Commands::Address
        | Commands::Time
        | Commands::AdvanceTime { .. }
        | Commands::SetTime { .. } => {}
    }

    Ok(())
}
