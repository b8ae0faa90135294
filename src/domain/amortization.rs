//! Simple-interest amortization.
//!
//! Every loan follows the same flat schedule: interest is charged on the
//! original principal for the whole term, and the total payable is spread
//! evenly across `years * 12` monthly installments. These functions are pure;
//! callers own persistence.

use super::money::{Amount, Balance};
use crate::error::{LendingError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const MONTHS_PER_YEAR: u32 = 12;
const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Significant digits carried by a `Decimal` before results are rounded.
const DECIMAL_PRECISION: i64 = 28;

/// The schedule fixed at loan creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    pub total_interest: Decimal,
    pub total_payable: Decimal,
    pub monthly_installment: Decimal,
    pub installment_count: u32,
}

impl LoanTerms {
    /// Largest remainder that is still division residue of the installment.
    ///
    /// An installment such as `110500 / 36` does not terminate and is rounded
    /// at 28 significant digits. Paying it `n` times leaves a balance off by up
    /// to `n` units in the last place of the total, never more.
    fn residue_tolerance(&self) -> Decimal {
        Decimal::from(self.installment_count) * last_place_unit(self.total_payable)
    }
}

/// The effect of one payment on a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub new_balance: Balance,
    pub installments_remaining: u32,
    pub is_paid_off: bool,
}

/// Computes total interest, total payable and the fixed monthly installment.
///
/// Fails with `ValidationError` when the principal is not positive, the term
/// is zero years, or the rate is negative.
pub fn compute_loan_terms(
    principal: Decimal,
    duration_years: u32,
    annual_rate_percent: Decimal,
) -> Result<LoanTerms> {
    let principal = Amount::new(principal)?.value();
    if duration_years == 0 {
        return Err(LendingError::ValidationError(
            "Loan period must be at least one year".to_string(),
        ));
    }
    if annual_rate_percent < Decimal::ZERO {
        return Err(LendingError::ValidationError(format!(
            "Interest rate must not be negative, got {annual_rate_percent}"
        )));
    }

    let installment_count = duration_years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| overflow("installment count"))?;
    let years = Decimal::from(duration_years);
    let total_interest = principal
        .checked_mul(years)
        .and_then(|v| v.checked_mul(annual_rate_percent))
        .and_then(|v| v.checked_div(ONE_HUNDRED))
        .ok_or_else(|| overflow("total interest"))?;
    let total_payable = principal
        .checked_add(total_interest)
        .ok_or_else(|| overflow("total payable"))?;
    let monthly_installment = total_payable / Decimal::from(installment_count);

    Ok(LoanTerms {
        total_interest,
        total_payable,
        monthly_installment,
        installment_count,
    })
}

/// Number of whole installments needed to clear `balance`: the exact ceiling
/// of `balance / monthly_installment`.
///
/// Zero once the balance is settled. Any positive remainder, however small,
/// counts as one more installment, unless it is no larger than the rounding
/// residue of the installment itself (see `LoanTerms::residue_tolerance`).
pub fn installments_remaining(balance: Balance, terms: &LoanTerms) -> u32 {
    let installment = terms.monthly_installment;
    if balance.is_settled() || installment <= Decimal::ZERO {
        return 0;
    }
    let Some(quotient) = balance.value().checked_div(installment) else {
        return u32::MAX;
    };
    let ceiling = quotient.ceil();
    let whole = ceiling - Decimal::ONE;
    if whole >= Decimal::ONE {
        let residue = whole
            .checked_mul(installment)
            .map(|covered| balance.value() - covered);
        if residue.is_some_and(|r| r <= terms.residue_tolerance()) {
            return whole.to_u32().unwrap_or(u32::MAX);
        }
    }
    ceiling.to_u32().unwrap_or(u32::MAX).max(1)
}

/// Applies a payment to the current balance.
///
/// EMI and lump-sum payments share the same arithmetic; the payment type is
/// only recorded for history. Overpayment is absorbed and left as a negative
/// balance.
pub fn apply_payment(current_balance: Balance, terms: &LoanTerms, payment: Amount) -> PaymentOutcome {
    let new_balance = current_balance - Balance::from(payment);
    PaymentOutcome {
        new_balance,
        installments_remaining: installments_remaining(new_balance, terms),
        is_paid_off: new_balance.is_settled(),
    }
}

/// One unit in the 28th significant digit of `value`.
fn last_place_unit(value: Decimal) -> Decimal {
    let mut integer_digits = 0i64;
    let mut whole = value.abs().trunc();
    while whole >= Decimal::ONE {
        whole = (whole / Decimal::TEN).trunc();
        integer_digits += 1;
    }
    let scale = (DECIMAL_PRECISION - integer_digits).clamp(0, DECIMAL_PRECISION);
    Decimal::new(1, scale as u32)
}

fn overflow(what: &str) -> LendingError {
    LendingError::ValidationError(format!("Loan terms too large: {what} overflows"))
}
