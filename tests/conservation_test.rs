use lendbook::application::service::{LendRequest, LendingService, PaymentRequest};
use lendbook::domain::loan::LoanStatus;
use lendbook::infrastructure::in_memory::InMemoryStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

fn service() -> LendingService {
    let store = InMemoryStore::new();
    LendingService::new(Box::new(store.clone()), Box::new(store))
}

/// Random payment sequences never create or lose money: everything paid plus
/// the outstanding balance always equals the total payable.
#[tokio::test]
async fn test_payments_conserve_total_payable() {
    let mut rng = StdRng::seed_from_u64(0x1e4d);
    let service = service();

    for round in 0..25 {
        let principal = Decimal::from(rng.gen_range(1_000..500_000u32));
        let years = rng.gen_range(1..=10u32);
        let rate = Decimal::new(rng.gen_range(0..2_000i64), 2);
        let receipt = service
            .lend(LendRequest {
                customer_id: format!("cust_{round}"),
                loan_amount: principal,
                loan_period_years: years,
                interest_rate_yearly: rate,
            })
            .await
            .unwrap();
        let loan_id = receipt.loan.loan_id.clone();
        let total = receipt.total_payable;

        let emi_cents = (receipt.loan.monthly_emi * dec!(100)).trunc().to_i64().unwrap();
        let total_cents = (total * dec!(100)).trunc().to_i64().unwrap();

        let mut paid = Decimal::ZERO;
        let mut previous = total;
        loop {
            // Amounts between a tenth of an installment and a quarter of the total.
            let low = (emi_cents / 10).max(1);
            let high = (total_cents / 4).max(low);
            let amount = Decimal::new(rng.gen_range(low..=high), 2);
            let payment_type = if rng.gen_bool(0.5) { "EMI" } else { "LUMP_SUM" };

            let outcome = service
                .record_payment(
                    &loan_id,
                    PaymentRequest {
                        amount,
                        payment_type: payment_type.to_string(),
                    },
                )
                .await
                .unwrap()
                .outcome;
            paid += amount;

            let balance = outcome.new_balance.value();
            assert_eq!(paid + balance, total);
            assert!(balance < previous);
            previous = balance;

            if outcome.is_paid_off {
                assert_eq!(outcome.installments_remaining, 0);
                break;
            }
            assert!(outcome.installments_remaining >= 1);
        }

        let ledger = service.ledger(&loan_id).await.unwrap();
        assert_eq!(ledger.status, LoanStatus::PaidOff);
        assert_eq!(ledger.emis_left, 0);
        assert_eq!(ledger.amount_paid, paid);
        assert_eq!(ledger.amount_paid + ledger.balance_amount.value(), total);
    }
}
