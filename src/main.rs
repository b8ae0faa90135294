use clap::{Parser, Subcommand};
use lendbook::application::service::{LendRequest, LendingService, PaymentRequest};
use lendbook::domain::ports::{CustomerStoreBox, LoanStoreBox};
use lendbook::infrastructure::in_memory::InMemoryStore;
use lendbook::infrastructure::snapshot::SnapshotStore;
use lendbook::interfaces::csv::payment_reader::PaymentReader;
use lendbook::interfaces::json::responses::{
    CustomerResponse, LedgerResponse, LoanCreatedResponse, OverviewResponse,
    PaymentRecordedResponse,
};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON snapshot file holding every record. Created on first write.
    #[arg(long, env = "LENDBOOK_STATE_FILE", global = true)]
    state_file: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(
        long,
        env = "LENDBOOK_DB_PATH",
        global = true,
        conflicts_with = "state_file"
    )]
    db_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, env = "LENDBOOK_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a loan for a customer.
    Lend {
        #[arg(long)]
        customer_id: String,
        /// Principal amount.
        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,
        /// Loan period in whole years.
        #[arg(long)]
        years: u32,
        /// Yearly simple-interest rate, in percent.
        #[arg(long, allow_negative_numbers = true)]
        rate: Decimal,
    },
    /// Record a payment against a loan.
    Pay {
        loan_id: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: Decimal,
        /// EMI or LUMP_SUM.
        #[arg(long = "type", default_value = "EMI")]
        payment_type: String,
    },
    /// Show a loan with its transaction history.
    Ledger { loan_id: String },
    /// Show every loan of a customer.
    Overview { customer_id: String },
    /// Manage customer records.
    Customer {
        #[command(subcommand)]
        action: CustomerCommand,
    },
    /// Apply payments from a CSV file with columns loan_id, amount, payment_type.
    ImportPayments { input: PathBuf },
}

#[derive(Subcommand)]
enum CustomerCommand {
    /// Register a customer or rename an existing one.
    Add {
        customer_id: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();

    let (loans, customers) = open_stores(cli.db_path.as_deref(), cli.state_file.as_deref())?;
    let service = LendingService::new(loans, customers);

    match cli.command {
        Command::Lend {
            customer_id,
            amount,
            years,
            rate,
        } => {
            let receipt = service
                .lend(LendRequest {
                    customer_id,
                    loan_amount: amount,
                    loan_period_years: years,
                    interest_rate_yearly: rate,
                })
                .await?;
            print_json(&LoanCreatedResponse::from(receipt))?;
        }
        Command::Pay {
            loan_id,
            amount,
            payment_type,
        } => {
            let receipt = service
                .record_payment(
                    &loan_id,
                    PaymentRequest {
                        amount,
                        payment_type,
                    },
                )
                .await?;
            print_json(&PaymentRecordedResponse::from(receipt))?;
        }
        Command::Ledger { loan_id } => {
            let ledger = service.ledger(&loan_id).await?;
            print_json(&LedgerResponse::from(ledger))?;
        }
        Command::Overview { customer_id } => {
            let overview = service.overview(&customer_id).await?;
            print_json(&OverviewResponse::from(overview))?;
        }
        Command::Customer {
            action: CustomerCommand::Add { customer_id, name },
        } => {
            let customer = service.register_customer(&customer_id, &name).await?;
            print_json(&CustomerResponse::from(customer))?;
        }
        Command::ImportPayments { input } => import_payments(&service, &input).await?,
    }

    Ok(())
}

fn open_stores(
    db_path: Option<&Path>,
    state_file: Option<&Path>,
) -> Result<(LoanStoreBox, CustomerStoreBox)> {
    if let Some(db_path) = db_path {
        return open_rocksdb(db_path);
    }
    if let Some(state_file) = state_file {
        let store = SnapshotStore::open(state_file)?;
        return Ok((Box::new(store.clone()), Box::new(store)));
    }
    let store = InMemoryStore::new();
    Ok((Box::new(store.clone()), Box::new(store)))
}

#[cfg(feature = "storage-rocksdb")]
fn open_rocksdb(db_path: &Path) -> Result<(LoanStoreBox, CustomerStoreBox)> {
    let store = lendbook::infrastructure::rocksdb::RocksDBStore::open(db_path)?;
    Ok((Box::new(store.clone()), Box::new(store)))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_rocksdb(db_path: &Path) -> Result<(LoanStoreBox, CustomerStoreBox)> {
    warn!(
        db_path = %db_path.display(),
        "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    let store = InMemoryStore::new();
    Ok((Box::new(store.clone()), Box::new(store)))
}

/// Streams payment rows into the service, printing one receipt per line.
/// Bad rows and rejected payments are logged and skipped.
async fn import_payments(service: &LendingService, input: &Path) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = PaymentReader::new(file);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let (mut applied, mut skipped) = (0usize, 0usize);

    for row in reader.payments() {
        match row {
            Ok(row) => {
                let (loan_id, request) = row.into_request();
                match service.record_payment(&loan_id, request).await {
                    Ok(receipt) => {
                        serde_json::to_writer(&mut out, &PaymentRecordedResponse::from(receipt))
                            .into_diagnostic()?;
                        writeln!(out).into_diagnostic()?;
                        applied += 1;
                    }
                    Err(e) => {
                        warn!(loan_id = %loan_id, "Error processing payment: {e}");
                        skipped += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Error reading payment row: {e}");
                skipped += 1;
            }
        }
    }

    info!(applied, skipped, "import finished");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    Ok(())
}
