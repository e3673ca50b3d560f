use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use coinbank::catalog::AssetCatalog;
use coinbank::feed::{self, PriceFeed};
use coinbank::identity::IdentityStore;
use coinbank::ledger::Ledger;
use coinbank::registry::AccountRegistry;
use colored::Colorize;
use rust_decimal::Decimal;
use strum_macros::EnumString;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
struct Args {
    /// JSON file holding user credentials
    #[arg(long, default_value = "users.json")]
    store_path: PathBuf,
    /// Base URL of the price API
    #[arg(long, default_value = feed::DEFAULT_ENDPOINT)]
    price_endpoint: String,
    /// Skip the network and use the built-in fallback prices
    #[arg(long)]
    offline: bool,
}

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Command {
    Buy,
    Sell,
    Portfolio,
    Transactions,
    Exit,
}

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read(&mut self, label: &str) -> Result<String> {
        print!("{label}");
        std::io::stdout().flush()?;
        let line = self.lines.next_line().await?.unwrap_or_default();
        Ok(line.trim().to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "{}=info,{}=info",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_CRATE_NAME")
            )
            .into()
        }))
        .with(fmt::layer())
        .init();

    let args = Args::parse();
    let mut prompt = Prompt::new();

    let store = IdentityStore::new(&args.store_path);
    let username = prompt.read("Enter your username: ").await?;
    let password = prompt.read("Enter your password: ").await?;
    sign_in(&store, &username, &password).await?;

    let account_number = prompt.read("Enter your account number: ").await?;
    let balance_input = prompt.read("Enter your account balance: ").await?;
    let opening_balance = match Decimal::from_str(&balance_input) {
        Ok(balance) if balance >= Decimal::ZERO => balance,
        _ => {
            println!("{}", "Invalid input! Setting account balance to 0.".red());
            Decimal::ZERO
        }
    };

    let prices = load_prices(&args).await;
    let catalog = AssetCatalog::new(prices);

    let mut registry = AccountRegistry::new();
    registry.add(Ledger::new(account_number.clone(), opening_balance, catalog));
    let ledger = registry
        .get_mut(&account_number)
        .expect("ledger was just added");

    print_affordable(ledger);
    command_loop(&mut prompt, ledger).await?;

    Ok(())
}

async fn sign_in(store: &IdentityStore, username: &str, password: &str) -> Result<()> {
    if store.authenticate(username, password).await? {
        info!("user {} authenticated", username);
        println!("User authenticated.");
    } else if store.insert(username, password).await? {
        println!("User '{username}' registered successfully.");
    } else {
        println!("User '{username}' already exists.");
    }
    Ok(())
}

async fn load_prices(args: &Args) -> HashMap<String, Decimal> {
    if args.offline {
        info!("offline mode, using fallback prices");
        return feed::fallback_prices();
    }
    let feed = PriceFeed::new(&args.price_endpoint);
    match feed.fetch(&feed::DEFAULT_ASSETS).await {
        Ok(prices) => prices,
        Err(err) => {
            warn!("price fetch failed: {:#}", err);
            println!(
                "{}",
                "Error fetching cryptocurrency prices. Default prices will be used.".yellow()
            );
            feed::fallback_prices()
        }
    }
}

fn print_affordable(ledger: &Ledger) {
    println!("\nWith your current account balance, you can buy:");
    for (symbol, quantity) in ledger.affordable_quantities() {
        println!("{}: {}", symbol, quantity.to_string().purple());
    }
}

async fn command_loop(prompt: &mut Prompt, ledger: &mut Ledger) -> Result<()> {
    loop {
        let verb = prompt
            .read("\nWhat would you like to do? (buy/sell/portfolio/transactions/exit): ")
            .await?;
        let Ok(command) = Command::from_str(&verb) else {
            println!("{}", "Invalid action. Try again.".red());
            continue;
        };
        match command {
            Command::Buy => {
                let symbol = prompt.read("Enter cryptocurrency name: ").await?;
                let Some(amount) = read_decimal(prompt, "Enter amount in USD: ").await? else {
                    continue;
                };
                match ledger.buy(&symbol, amount) {
                    Ok(quantity) => {
                        println!("{} {} {}", "Successfully bought".green(), quantity, symbol);
                    }
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::Sell => {
                let symbol = prompt.read("Enter cryptocurrency name: ").await?;
                let Some(quantity) =
                    read_decimal(prompt, "Enter amount in cryptocurrency: ").await?
                else {
                    continue;
                };
                match ledger.sell(&symbol, quantity) {
                    Ok(proceeds) => {
                        println!(
                            "{} {} {} for ${}",
                            "Successfully sold".green(),
                            quantity,
                            symbol,
                            proceeds
                        );
                    }
                    Err(err) => println!("{}", err.to_string().red()),
                }
            }
            Command::Portfolio => {
                println!("\nCryptocurrency Portfolio:");
                println!("{}", ledger.snapshot());
            }
            Command::Transactions => {
                println!("\nTransaction History:");
                if ledger.history().is_empty() {
                    println!("No transactions found.");
                }
                for record in ledger.history() {
                    println!("{record}");
                }
            }
            Command::Exit => {
                println!("Exiting program.");
                break;
            }
        }
    }
    Ok(())
}

async fn read_decimal(prompt: &mut Prompt, label: &str) -> Result<Option<Decimal>> {
    let input = prompt.read(label).await?;
    match Decimal::from_str(&input) {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            println!("{}", "Invalid number. Try again.".red());
            Ok(None)
        }
    }
}
