pub mod cash_ledger;
pub mod delivery_notes;
pub mod imports;
pub mod master_data;
pub mod reports;
pub mod users;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("not_blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Decimal places kept for money and quantities.
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// Exclusive upper bound on stored magnitudes. SQLite keeps decimals as REAL,
/// which is exact only up to about 15 significant digits.
pub fn max_storable() -> Decimal {
    Decimal::new(10_000_000_000_000, 0)
}

/// True when `value` survives a round trip through every supported backend.
pub fn is_storable(value: &Decimal) -> bool {
    value.normalize().scale() <= MAX_DECIMAL_PLACES && value.abs() < max_storable()
}

fn check_storable(value: &Decimal) -> Result<(), ValidationError> {
    if !is_storable(value) {
        let mut err = ValidationError::new("storable");
        err.message = Some(
            format!(
                "must be below {} with at most {} decimal places",
                max_storable(),
                MAX_DECIMAL_PLACES
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Rejects zero, negative and unstorable amounts.
pub(crate) fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("positive");
        err.message = Some("must be greater than 0".into());
        return Err(err);
    }
    check_storable(value)
}

/// Rejects negative and unstorable amounts.
pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("must not be negative".into());
        return Err(err);
    }
    check_storable(value)
}
