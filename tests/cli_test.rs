use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_cli_lend_in_memory() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.env_remove("LENDBOOK_STATE_FILE")
        .env_remove("LENDBOOK_DB_PATH")
        .args([
            "lend",
            "--customer-id",
            "cust_123",
            "--amount",
            "100000",
            "--years",
            "2",
            "--rate",
            "10",
        ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"customer_id\": \"cust_123\""))
        .stdout(predicate::str::contains("\"total_amount_payable\": 120000.0"))
        .stdout(predicate::str::contains("\"monthly_emi\": 5000.0"));

    Ok(())
}

#[test]
fn test_reference_scenario_end_to_end() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("ledger.json");

    let loan = common::lend(&state, "cust_123", "100000", "2", "10");
    let loan_id = loan["loan_id"].as_str().unwrap().to_string();
    assert_eq!(loan["total_amount_payable"], json!(120000.0));
    assert_eq!(loan["monthly_emi"], json!(5000.0));

    let first = common::pay(&state, &loan_id, "60000", "LUMP_SUM");
    assert_eq!(first["message"], json!("Payment recorded successfully."));
    assert_eq!(first["remaining_balance"], json!(60000.0));
    assert_eq!(first["emis_left"], json!(12));

    let second = common::pay(&state, &loan_id, "60000", "LUMP_SUM");
    assert_eq!(second["remaining_balance"], json!(0.0));
    assert_eq!(second["emis_left"], json!(0));

    let ledger = common::run_json(common::lendbook(&state).args(["ledger", &loan_id]));
    assert_eq!(ledger["principal"], json!(100000.0));
    assert_eq!(ledger["total_amount"], json!(120000.0));
    assert_eq!(ledger["amount_paid"], json!(120000.0));
    assert_eq!(ledger["balance_amount"], json!(0.0));
    assert_eq!(ledger["emis_left"], json!(0));
    assert_eq!(ledger["status"], json!("PAID_OFF"));

    let transactions = ledger["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["transaction_id"], first["payment_id"]);
    assert_eq!(transactions[1]["transaction_id"], second["payment_id"]);
    assert_eq!(transactions[0]["type"], json!("LUMP_SUM"));
}

#[test]
fn test_reads_are_idempotent() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("ledger.json");

    let loan = common::lend(&state, "cust_123", "50000", "5", "7.5");
    let loan_id = loan["loan_id"].as_str().unwrap().to_string();
    common::pay(&state, &loan_id, "1145.83", "EMI");

    let ledger_a = common::run_json(common::lendbook(&state).args(["ledger", &loan_id]));
    let ledger_b = common::run_json(common::lendbook(&state).args(["ledger", &loan_id]));
    assert_eq!(ledger_a, ledger_b);

    let overview_a = common::run_json(common::lendbook(&state).args(["overview", "cust_123"]));
    let overview_b = common::run_json(common::lendbook(&state).args(["overview", "cust_123"]));
    assert_eq!(overview_a, overview_b);
}

#[test]
fn test_overview_lists_every_loan() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("ledger.json");

    common::run_json(common::lendbook(&state).args([
        "customer",
        "add",
        "cust_123",
        "--name",
        "Alice Smith",
    ]));
    let first = common::lend(&state, "cust_123", "100000", "2", "10");
    common::lend(&state, "cust_123", "1200", "1", "0");
    common::lend(&state, "cust_456", "999", "1", "1");
    common::pay(
        &state,
        first["loan_id"].as_str().unwrap(),
        "5000",
        "emi",
    );

    let overview = common::run_json(common::lendbook(&state).args(["overview", "cust_123"]));
    assert_eq!(overview["customer_id"], json!("cust_123"));
    assert_eq!(overview["customer_name"], json!("Alice Smith"));
    assert_eq!(overview["total_loans"], json!(2));

    let loans = overview["loans"].as_array().unwrap();
    let big = loans
        .iter()
        .find(|l| l["loan_id"] == first["loan_id"])
        .unwrap();
    assert_eq!(big["total_interest"], json!(20000.0));
    assert_eq!(big["emi_amount"], json!(5000.0));
    assert_eq!(big["amount_paid"], json!(5000.0));
    assert_eq!(big["emis_left"], json!(23));
}

#[test]
fn test_overview_without_loans_is_not_found() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("ledger.json");

    common::lendbook(&state)
        .args(["overview", "cust_999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No loans found for customer cust_999"));
}

#[test]
fn test_ledger_for_unknown_loan_is_not_found() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("ledger.json");

    common::lendbook(&state)
        .args(["ledger", "no-such-loan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}
