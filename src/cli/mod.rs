use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::application::{AppError, LedgerService, Session};
use crate::domain::{parse_amount, passes_luhn};

/// Cardbank - Luhn-checked card issuance and balance ledger
#[derive(Parser)]
#[command(name = "cardbank")]
#[command(about = "Issue Luhn-checked cards and move money between them")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(
        short,
        long,
        global = true,
        env = "CARDBANK_DATABASE",
        default_value = "card.s3db"
    )]
    pub database: String,

    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Card number and PIN identifying the acting card
#[derive(Args)]
pub struct Credentials {
    /// Card number
    #[arg(long)]
    pub card: String,

    /// Card PIN
    #[arg(long)]
    pub pin: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Issue a new card and print its number and PIN
    Create {
        /// Print the new card as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the balance of a card
    Balance {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Add income to a card
    Deposit {
        #[command(flatten)]
        credentials: Credentials,

        /// Whole amount to add
        amount: String,
    },

    /// Transfer money to another card
    Transfer {
        #[command(flatten)]
        credentials: Credentials,

        /// Destination card number
        #[arg(long)]
        to: String,

        /// Whole amount to transfer
        amount: String,
    },

    /// Close a card, deleting it and its balance
    Close {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Check whether a number passes the Luhn check
    Check {
        /// Card number to check
        number: String,
    },

    /// Show card count and total balance
    Stats,
}

/// Human-readable message for failures a card holder can cause.
/// Returns `None` for failures that should abort the command.
fn user_message(err: &AppError) -> Option<&'static str> {
    match err {
        AppError::InvalidDestination(_) => {
            Some("Probably you made a mistake in the card number. Please try again!")
        }
        AppError::SelfTransfer(_) => Some("You can't transfer money to the same account!"),
        AppError::DestinationNotFound(_) => Some("Such a card does not exist."),
        AppError::InsufficientFunds { .. } => Some("Not enough money!"),
        AppError::InvalidAmount(_) => Some("The amount must be a positive whole number."),
        AppError::BalanceOverflow { .. } => Some("That amount is too large for this card."),
        AppError::CardNotFound(_) => Some("Such a card does not exist."),
        AppError::Storage(_) => None,
    }
}

/// Print the user-facing message for an expected failure, or bubble it up.
fn report(result: Result<(), AppError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => match user_message(&err) {
            Some(message) => {
                println!("{}", message);
                Ok(())
            }
            None => Err(err.into()),
        },
    }
}

async fn login(service: &LedgerService, credentials: &Credentials) -> Result<Option<Session>> {
    let session = service
        .authenticate(credentials.card.trim(), credentials.pin.trim())
        .await?;
    if session.is_none() {
        println!("Wrong card number or PIN!");
    }
    Ok(session)
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Create { json } => {
                let service = LedgerService::connect(&self.database).await?;
                let card = service.create().await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&card)?);
                } else {
                    println!("Your card has been created");
                    println!("Your card number:");
                    println!("{}", card.card_number);
                    println!("Your card PIN:");
                    println!("{}", card.pin);
                }
            }

            Commands::Balance { credentials } => {
                let service = LedgerService::connect(&self.database).await?;
                if let Some(session) = login(&service, &credentials).await? {
                    let balance = service.get_balance(session.card_number()).await?;
                    println!("Balance: {}", balance);
                }
            }

            Commands::Deposit {
                credentials,
                amount,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount = parse_amount(&amount).context("Invalid amount. Use a whole number")?;
                if let Some(session) = login(&service, &credentials).await? {
                    let result = service.deposit(session.card_number(), amount).await;
                    let succeeded = result.is_ok();
                    report(result)?;
                    if succeeded {
                        println!("Income was added!");
                    }
                }
            }

            Commands::Transfer {
                credentials,
                to,
                amount,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount = parse_amount(&amount).context("Invalid amount. Use a whole number")?;
                if let Some(session) = login(&service, &credentials).await? {
                    let result = service
                        .transfer(session.card_number(), to.trim(), amount)
                        .await;
                    let succeeded = result.is_ok();
                    report(result)?;
                    if succeeded {
                        println!("Success!");
                    }
                }
            }

            Commands::Close { credentials } => {
                let service = LedgerService::connect(&self.database).await?;
                if let Some(session) = login(&service, &credentials).await? {
                    let result = service.close_account(session.card_number()).await;
                    let succeeded = result.is_ok();
                    report(result)?;
                    if succeeded {
                        println!("The account has been closed!");
                    }
                }
            }

            Commands::Check { number } => {
                let number = number.trim();
                if passes_luhn(number) {
                    println!("{} passes the Luhn check", number);
                } else {
                    println!("{} fails the Luhn check", number);
                }
            }

            Commands::Stats => {
                let service = LedgerService::connect(&self.database).await?;
                let stats = service.stats().await?;
                println!("Cards:          {}", stats.card_count);
                println!("Total balance:  {}", stats.total_balance);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::try_parse_from([
            "cardbank",
            "--database",
            "test.db",
            "transfer",
            "--card",
            "4000000034240624",
            "--pin",
            "0042",
            "--to",
            "4000000000000002",
            "150",
        ])
        .unwrap();

        assert_eq!(cli.database, "test.db");
        match cli.command {
            Commands::Transfer {
                credentials,
                to,
                amount,
            } => {
                assert_eq!(credentials.card, "4000000034240624");
                assert_eq!(credentials.pin, "0042");
                assert_eq!(to, "4000000000000002");
                assert_eq!(amount, "150");
            }
            _ => panic!("expected transfer command"),
        }
    }

    #[test]
    fn test_cli_requires_credentials() {
        assert!(Cli::try_parse_from(["cardbank", "balance", "--card", "4000000000000002"]).is_err());
    }

    #[test]
    fn test_database_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["cardbank", "stats", "--database", "other.db", "-v"]).unwrap();
        assert_eq!(cli.database, "other.db");
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_expected_failures_have_messages() {
        assert_eq!(
            user_message(&AppError::SelfTransfer("4000000000000002".into())),
            Some("You can't transfer money to the same account!")
        );
        assert_eq!(
            user_message(&AppError::InsufficientFunds {
                card_number: "4000000000000002".into(),
                balance: 10,
                required: 20,
            }),
            Some("Not enough money!")
        );
        let storage = AppError::Storage(crate::storage::StoreError::Backend(anyhow::anyhow!(
            "disk full"
        )));
        assert_eq!(user_message(&storage), None);
    }
}
