#![allow(dead_code)]

use assert_cmd::cargo_bin;
use serde_json::Value;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::process::Command;

/// A `lendbook` command backed by the snapshot file at `state_file`.
pub fn lendbook(state_file: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("lendbook"));
    cmd.env_remove("RUST_LOG")
        .env_remove("LENDBOOK_DB_PATH")
        .env_remove("LENDBOOK_STATE_FILE")
        .arg("--state-file")
        .arg(state_file);
    cmd
}

/// Runs `cmd`, asserts success and parses stdout as one JSON document.
pub fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("Failed to execute command");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Creates a loan and returns the parsed response.
pub fn lend(state_file: &Path, customer_id: &str, amount: &str, years: &str, rate: &str) -> Value {
    run_json(lendbook(state_file).args([
        "lend",
        "--customer-id",
        customer_id,
        "--amount",
        amount,
        "--years",
        years,
        "--rate",
        rate,
    ]))
}

/// Records a payment and returns the parsed response.
pub fn pay(state_file: &Path, loan_id: &str, amount: &str, payment_type: &str) -> Value {
    run_json(lendbook(state_file).args(["pay", loan_id, "--amount", amount, "--type", payment_type]))
}

pub fn write_payments_csv(path: &Path, rows: &[[&str; 3]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["loan_id", "amount", "payment_type"])?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
