// Paw Swap CLI — balances, pool inspection, quotes and swaps.

use clap::{Args, Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use log::info;
use paw_swap::engine::dex::constants::{chain_name, explorer_tx_url};
use paw_swap::engine::dex::primitives::{display_amount, format_units, parse_units};
use paw_swap::engine::dex::{AmmQuote, PoolState, SwapEngine};
use paw_swap::{Address, SwapConfig, SwapContext, SwapDirection, SwapOutcome, SwapQuote, SwapResult, TokenDescriptor};
use std::path::PathBuf;
use std::sync::Arc;

const DISPLAY_DIGITS: u8 = 6;

#[derive(Parser)]
#[command(name = "paw-swap", version, about = "Fixed-rate and Uniswap V2 token swaps for EVM wallets")]
struct Cli {
    /// Config file (default: <config dir>/paw-swap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides the config file
    #[arg(long, global = true, env = "DEX_RPC_URL")]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Native and token balances of the wallet account
    Balances {
        /// Account to inspect instead of the wallet's primary account
        #[arg(long)]
        account: Option<Address>,
    },
    /// Reserves of the configured Uniswap V2 pair
    Pool,
    /// Price a swap without submitting it
    Quote(TradeArgs),
    /// Approve if needed, swap and wait for confirmation
    Swap(TradeArgs),
    /// Stream wallet account changes
    Watch,
}

#[derive(Clone, Copy, ValueEnum)]
enum Venue {
    /// Fixed-rate swap contract
    Fixed,
    /// Uniswap V2 router
    Amm,
}

#[derive(Args)]
struct TradeArgs {
    venue: Venue,

    /// Human-readable input amount, e.g. 100 or 0.5
    amount: String,

    /// Swap token B for token A (AMM only)
    #[arg(long)]
    reverse: bool,

    /// Slippage tolerance in basis points (default from config)
    #[arg(long)]
    slippage_bps: Option<u32>,
}

impl TradeArgs {
    fn direction(&self) -> SwapDirection {
        if self.reverse {
            SwapDirection::BToA
        } else {
            SwapDirection::AToB
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error [{}]: {}", e.kind(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> SwapResult<()> {
    let mut config = SwapConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.rpc_url {
        config.rpc_url = url;
    }
    let ctx = SwapContext::from_config(config);
    let chain_id = ctx.check_chain().await?;
    info!("[swap] Connected to {} ({})", chain_name(chain_id), chain_id);

    match cli.command {
        Command::Balances { account } => {
            let account = match account {
                Some(a) => a,
                None => ctx.account().await?,
            };
            print!("{}", ctx.overview(&account).await?.render());
        }
        Command::Pool => pool(&ctx).await?,
        Command::Quote(args) => quote(&ctx, &args).await?,
        Command::Swap(args) => swap(&ctx, &args, chain_id).await?,
        Command::Watch => {
            let mut events = ctx.watch_accounts();
            while let Some(event) = events.next().await {
                println!("{:?}", event);
            }
        }
    }
    Ok(())
}

async fn pool(ctx: &SwapContext) -> SwapResult<()> {
    let amm = ctx.amm_engine().await?;
    println!("Factory: {}", amm.pairs().factory());
    match amm.pool().await? {
        PoolState::Missing => println!("No pool exists for this pair."),
        PoolState::Empty(r) => println!("Pool {} exists but has no liquidity.", r.pair),
        PoolState::Funded(r) => {
            let a = ctx.tokens().descriptor(&r.token_a).await?;
            let b = ctx.tokens().descriptor(&r.token_b).await?;
            println!("Pool: {}", r.pair);
            println!("{}: {}", a.symbol, display_amount(&r.reserve_a, a.decimals, DISPLAY_DIGITS));
            println!("{}: {}", b.symbol, display_amount(&r.reserve_b, b.decimals, DISPLAY_DIGITS));
            println!("Last update: {}", r.as_of);
        }
    }
    Ok(())
}

async fn engine_for(ctx: &SwapContext, venue: Venue) -> SwapResult<Arc<dyn SwapEngine>> {
    Ok(match venue {
        Venue::Fixed => Arc::new(ctx.fixed_rate_engine()),
        Venue::Amm => Arc::new(ctx.amm_engine().await?),
    })
}

fn print_quote(quote: &SwapQuote, input: &TokenDescriptor, output: &TokenDescriptor) {
    println!("In:          {} {}", format_units(&quote.input_amount, input.decimals), input.symbol);
    println!(
        "Expected:    {} {}",
        display_amount(&quote.expected_output, output.decimals, DISPLAY_DIGITS),
        output.symbol
    );
    println!(
        "Minimum out: {} {}",
        display_amount(&quote.minimum_output, output.decimals, DISPLAY_DIGITS),
        output.symbol
    );
}

async fn quote(ctx: &SwapContext, args: &TradeArgs) -> SwapResult<()> {
    let slippage_bps = args.slippage_bps.unwrap_or(ctx.config().trade.slippage_bps);
    match args.venue {
        Venue::Fixed => {
            let engine = ctx.fixed_rate_engine();
            let path = engine.resolve_path(args.direction()).await?;
            let amount = parse_units(&args.amount, path[0].decimals)?;
            let quote = engine.quote_amount(&amount, &path[0], &path[1]).await?;
            print_quote(&quote, &path[0], &path[1]);
        }
        Venue::Amm => {
            let engine = ctx.amm_engine().await?;
            let path = engine.resolve_path(args.direction()).await?;
            let amount = parse_units(&args.amount, path[0].decimals)?;
            let addresses: Vec<Address> = path.iter().map(|t| t.address).collect();
            match engine.quote_path(&amount, &addresses, slippage_bps).await? {
                AmmQuote::Available { quote, .. } => print_quote(&quote, &path[0], &path[1]),
                AmmQuote::PairNotFound { .. } => println!("No pool exists for {} / {}.", path[0].symbol, path[1].symbol),
                AmmQuote::NoLiquidity { reserves } => println!("Pool {} has no liquidity.", reserves.pair),
            }
        }
    }
    Ok(())
}

async fn swap(ctx: &SwapContext, args: &TradeArgs, chain_id: u64) -> SwapResult<()> {
    let engine = engine_for(ctx, args.venue).await?;
    let mut session = ctx.session(engine.clone()).await?;

    let path = engine.resolve_path(args.direction()).await?;
    let amount = parse_units(&args.amount, path[0].decimals)?;
    let mut request = session.request(args.direction(), amount).await?;
    if let Some(bps) = args.slippage_bps {
        request = request.with_slippage_bps(bps);
    }

    match session.submit(request).await {
        SwapOutcome::Success { amount_out, tx_hash } => {
            println!(
                "Swap confirmed: received {} {}",
                display_amount(&amount_out, path[1].decimals, DISPLAY_DIGITS),
                path[1].symbol
            );
            println!("Transaction: {}{}", explorer_tx_url(chain_id), tx_hash);
            for b in session.balances() {
                println!("{}: {}", b.token.symbol, display_amount(&b.balance, b.token.decimals, DISPLAY_DIGITS));
            }
            Ok(())
        }
        SwapOutcome::Failure { reason } => Err(reason),
    }
}
