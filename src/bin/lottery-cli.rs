use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand, ValueEnum};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use solong_lottery::{
    app_state::{AppBillboard, AppPool},
    config::normalize_rpc_url,
    decode_billboard, decode_pool,
    instruction::{self, parse_amount},
    layout::{billboard_space, pool_space, LayoutVariant},
    rpc,
    state::decode_account_base64,
};

#[derive(Parser, Debug)]
#[command(name = "lottery-cli", version, about = "Command line client for the solong lottery program")]
struct Cli {
    /// JSON RPC URL for the cluster
    #[arg(long = "url", env = "RPC_URL", global = true, default_value = "https://api.devnet.solana.com")]
    rpc_url: String,

    #[arg(long, env = "PROGRAM_ID", global = true)]
    program_id: Option<Pubkey>,

    #[arg(long, env = "POOL_ADDRESS", global = true)]
    pool: Option<Pubkey>,

    #[arg(long, env = "BILLBOARD_ADDRESS", global = true)]
    billboard: Option<Pubkey>,

    #[arg(long, env = "FEE_ADDRESS", global = true)]
    fee: Option<Pubkey>,

    #[arg(long, env = "LAYOUT_VARIANT", global = true, default_value = "current")]
    layout: LayoutVariant,

    /// Keypair file that pays for and signs transactions
    #[arg(short, long, env = "KEYPAIR", global = true)]
    keypair: Option<PathBuf>,

    /// Show additional information
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize pool and billboard accounts
    Initialize {
        /// Pool owner, defaults to the keypair
        #[arg(long)]
        owner: Option<Pubkey>,
        #[arg(long, value_parser = lamports)]
        fund: u64,
        #[arg(long, value_parser = lamports)]
        price: u64,
    },
    /// Sign up the keypair as a player
    Sign,
    /// Buy a ticket for the keypair
    Buy,
    /// Draw a winner (admin)
    Roll,
    /// Pay out a winner's award (admin)
    Reward {
        #[arg(long)]
        player: Pubkey,
    },
    /// Reset fund and price (admin, deprecated program revision)
    Gm {
        #[arg(long, value_parser = lamports)]
        fund: u64,
        #[arg(long, value_parser = lamports)]
        price: u64,
    },
    /// Print the decoded pool account
    ShowPool,
    /// Print the decoded billboard account
    ShowBillboard,
    /// Decode base64 account data without touching the cluster
    Decode {
        #[arg(value_enum)]
        account: AccountKind,
        /// Account data, base64 encoded
        data: String,
    },
    /// Print blank account sizes and their rent-exempt minimum
    Space,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AccountKind {
    Pool,
    Billboard,
}

fn lamports(s: &str) -> Result<u64, String> {
    parse_amount(s).map_err(|e| e.to_string())
}

fn address(value: Option<Pubkey>, flag: &str) -> anyhow::Result<Pubkey> {
    value.ok_or_else(|| anyhow!("--{flag} is required for this command"))
}

fn load_keypair(path: Option<&PathBuf>) -> anyhow::Result<Keypair> {
    let path = path.ok_or_else(|| anyhow!("--keypair is required for this command"))?;
    read_keypair_file(path).map_err(|e| anyhow!("failed to read keypair {}: {e}", path.display()))
}

fn decode_to_json(account: AccountKind, data: &str, variant: LayoutVariant) -> anyhow::Result<String> {
    let bytes = decode_account_base64(data)?;
    let json = match account {
        AccountKind::Pool => serde_json::to_string_pretty(&decode_pool(Some(&bytes), variant)?.map(AppPool::from))?,
        AccountKind::Billboard => {
            serde_json::to_string_pretty(&decode_billboard(Some(&bytes), variant)?.map(AppBillboard::from))?
        }
    };
    Ok(json)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();

    if let Command::Decode { account, data } = &cli.command {
        println!("{}", decode_to_json(*account, data, cli.layout)?);
        return Ok(());
    }

    let connection = rpc::connect(&normalize_rpc_url(&cli.rpc_url));

    let (payer, ix) = match cli.command {
        Command::ShowPool => {
            let pool = rpc::fetch_pool(&connection, &address(cli.pool, "pool")?, cli.layout).await?;
            let pool = pool.map(AppPool::from);
            println!("{}", serde_json::to_string_pretty(&pool)?);
            return Ok(());
        }
        Command::ShowBillboard => {
            let billboard = rpc::fetch_billboard(&connection, &address(cli.billboard, "billboard")?, cli.layout).await?;
            let billboard = billboard.map(AppBillboard::from);
            println!("{}", serde_json::to_string_pretty(&billboard)?);
            return Ok(());
        }
        Command::Decode { .. } => return Ok(()),
        Command::Space => {
            for (name, space) in [("pool", pool_space(cli.layout)), ("billboard", billboard_space(cli.layout))] {
                let rent = connection.get_minimum_balance_for_rent_exemption(space).await?;
                println!("{name}: {space} bytes, {rent} lamports rent-exempt");
            }
            return Ok(());
        }
        Command::Initialize { owner, fund, price } => {
            let payer = load_keypair(cli.keypair.as_ref())?;
            let owner = owner.unwrap_or_else(|| payer.pubkey());
            let ix = instruction::initialize(
                owner,
                address(cli.fee, "fee")?,
                address(cli.billboard, "billboard")?,
                address(cli.pool, "pool")?,
                address(cli.program_id, "program-id")?,
                fund,
                price,
            );
            (payer, ix)
        }
        Command::Sign => {
            let payer = load_keypair(cli.keypair.as_ref())?;
            let ix = instruction::sign(payer.pubkey(), address(cli.pool, "pool")?, address(cli.program_id, "program-id")?);
            (payer, ix)
        }
        Command::Buy => {
            let payer = load_keypair(cli.keypair.as_ref())?;
            let ix = instruction::buy(
                payer.pubkey(),
                address(cli.fee, "fee")?,
                address(cli.pool, "pool")?,
                address(cli.program_id, "program-id")?,
            );
            (payer, ix)
        }
        Command::Roll => {
            let payer = load_keypair(cli.keypair.as_ref())?;
            let ix = instruction::roll(
                payer.pubkey(),
                address(cli.pool, "pool")?,
                address(cli.billboard, "billboard")?,
                address(cli.program_id, "program-id")?,
            );
            (payer, ix)
        }
        Command::Reward { player } => {
            let payer = load_keypair(cli.keypair.as_ref())?;
            let ix = instruction::reward(
                payer.pubkey(),
                player,
                address(cli.billboard, "billboard")?,
                address(cli.program_id, "program-id")?,
            );
            (payer, ix)
        }
        Command::Gm { fund, price } => {
            let payer = load_keypair(cli.keypair.as_ref())?;
            let ix = instruction::gm(
                payer.pubkey(),
                address(cli.pool, "pool")?,
                address(cli.program_id, "program-id")?,
                fund,
                price,
            );
            (payer, ix)
        }
    };

    let signature = rpc::submit_instruction(&connection, ix, &payer, &[]).await?;
    println!("{signature}");
    Ok(())
}
