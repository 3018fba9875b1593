use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::error;
use std::process::ExitCode;

use trading_client::models::{OrderRequest, OrderSide};
use trading_client::{ApiContext, AppError, AppResult, ClientConfig, SerializableError};

#[derive(Debug, Parser)]
#[command(name = "trading-client", version, about = "Trading API command line client")]
struct Cli {
    /// Base URL of the trading API
    #[arg(long, env = "TRADING_SERVER_URL")]
    server_url: Option<String>,

    /// Print errors as JSON
    #[arg(long)]
    json_errors: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session
    Login {
        username: String,
        #[arg(long, env = "TRADING_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        remember_me: bool,
    },
    /// End the session on the server and locally
    Logout,
    /// Show whether a session is stored and when it expires
    Whoami,
    /// List your orders
    Orders,
    /// Place a market order, or a limit order when --price is given
    Order {
        symbol: String,
        #[arg(value_parser = parse_side)]
        side: OrderSide,
        quantity: f64,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Cancel an order by id
    Cancel { order_id: String },
    /// Show the order book for a symbol
    Book {
        symbol: String,
        #[arg(long)]
        depth: Option<u32>,
    },
}

fn parse_side(value: &str) -> Result<OrderSide, String> {
    match value.to_lowercase().as_str() {
        "buy" => Ok(OrderSide::Buy),
        "sell" => Ok(OrderSide::Sell),
        other => Err(format!("expected buy or sell, got '{other}'")),
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.server_url {
        config.server_url = url;
    }
    let ctx = ApiContext::from_config(&config).await?;

    match cli.command {
        Command::Login {
            username,
            password,
            remember_me,
        } => {
            let response = ctx.auth.login(&username, &password, remember_me).await?;
            if response.requires_verification.unwrap_or(false) {
                println!(
                    "Email verification required{}",
                    response
                        .email
                        .map(|e| format!(" for {e}"))
                        .unwrap_or_default()
                );
            } else {
                println!("Logged in as {username}");
            }
        }
        Command::Logout => {
            ctx.auth.logout().await?;
            println!("Logged out");
        }
        Command::Whoami => match ctx.token_manager.snapshot() {
            Some(pair) => println!("Session active, access token expires at {}", pair.expires_at),
            None => println!("Not logged in"),
        },
        Command::Orders => {
            for order in ctx.orders.list_orders().await? {
                println!(
                    "{}\t{}\t{:?}\t{}\t{:?}",
                    order.order_id, order.symbol, order.side, order.quantity, order.status
                );
            }
        }
        Command::Order {
            symbol,
            side,
            quantity,
            price,
        } => {
            let request = match price {
                Some(price) => OrderRequest::limit(symbol, side, quantity, price),
                None => OrderRequest::market(symbol, side, quantity),
            };
            let response = ctx.orders.submit_order(&request).await?;
            println!(
                "{}",
                response
                    .order_id
                    .or(response.message)
                    .unwrap_or_else(|| "Order submitted".to_string())
            );
        }
        Command::Cancel { order_id } => {
            let response = ctx.orders.cancel_order(&order_id).await?;
            println!(
                "{}",
                response
                    .message
                    .unwrap_or_else(|| format!("Order {order_id} cancelled"))
            );
        }
        Command::Book { symbol, depth } => {
            let book = ctx.book.get_order_book(&symbol, depth).await?;
            println!("{} bids / {} asks for {}", book.bids.len(), book.asks.len(), book.symbol);
            for level in &book.asks {
                println!("ask\t{}\t{}", level.price, level.quantity);
            }
            for level in &book.bids {
                println!("bid\t{}\t{}", level.price, level.quantity);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if json_errors {
                let payload = SerializableError::from(e.clone());
                match serde_json::to_string(&payload) {
                    Ok(json) => eprintln!("{json}"),
                    Err(_) => eprintln!("{e}"),
                }
            } else if matches!(e, AppError::AuthError(_)) {
                eprintln!("{e}\nRun `trading-client login <username>` to sign in again.");
            } else {
                eprintln!("{e}");
            }
            ExitCode::FAILURE
        }
    }
}
