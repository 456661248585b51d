//! Annuity calculations used to turn overnight investment costs into yearly capital costs.
use crate::units::{Dimensionless, MoneyPerCapacity};

/// The share of an overnight investment repaid each year over `lifetime` years at `discount_rate`.
///
/// Zero for a zero lifetime. With no discounting this is simply `1 / lifetime`.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    let years = f64::from(lifetime);
    if lifetime == 0 {
        Dimensionless(0.0)
    } else if discount_rate == Dimensionless(0.0) {
        Dimensionless(1.0 / years)
    } else {
        let rate = discount_rate.value();
        Dimensionless(rate / (1.0 - (1.0 + rate).powf(-years)))
    }
}

/// Yearly cost of one MW of new capacity: the annuity plus fixed O&M as a share of `investment`
pub fn annualised_cost_with_fom(
    investment: MoneyPerCapacity,
    lifetime: u32,
    discount_rate: Dimensionless,
    fixed_om_share: Dimensionless,
) -> MoneyPerCapacity {
    investment * (capital_recovery_factor(lifetime, discount_rate) + fixed_om_share)
}
