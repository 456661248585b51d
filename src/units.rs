//! Physical quantities as `f64` newtypes.
//!
//! Capacities are in MW (or MWh for stores), energy in MWh, money in EUR and emissions in tonnes
//! of CO2. Only the products and quotients listed at the bottom of this file are defined, so
//! mixing up units is a compile error.
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::iter::Sum;

/// Declare a quantity type along with the helpers every quantity shares
macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Wrap a raw value
            pub fn new(value: f64) -> Self {
                Self(value)
            }

            /// The raw value
            pub fn value(&self) -> f64 {
                self.0
            }

            /// False for NaN and infinities
            pub fn is_finite(&self) -> bool {
                self.0.is_finite()
            }

            /// The larger of `self` and `other`
            pub fn max(&self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// The smaller of `self` and `other`
            pub fn min(&self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// `self`, or zero if `self` is negative
            pub fn clamp_non_negative(&self) -> Self {
                Self(self.0.max(0.0))
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|item| item.0).sum())
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<T: Into<Self::Margin>>(self, other: Self, margin: T) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

/// Allow a quantity to be scaled by a [`Dimensionless`] factor and divided by itself
macro_rules! scalable {
    ($($name:ident),+) => {
        $(
            impl std::ops::Mul<Dimensionless> for $name {
                type Output = $name;
                fn mul(self, rhs: Dimensionless) -> $name {
                    $name(self.0 * rhs.0)
                }
            }

            impl std::ops::Div<Dimensionless> for $name {
                type Output = $name;
                fn div(self, rhs: Dimensionless) -> $name {
                    $name(self.0 / rhs.0)
                }
            }

            impl std::ops::Div for $name {
                type Output = Dimensionless;
                fn div(self, rhs: $name) -> Dimensionless {
                    Dimensionless(self.0 / rhs.0)
                }
            }
        )+
    };
}

quantity!(
    /// A ratio, share or factor
    Dimensionless
);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Dimensionless {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Dimensionless {
        Dimensionless(self.0 / rhs.0)
    }
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

quantity!(
    /// EUR
    Money
);
quantity!(
    /// MWh
    Energy
);
quantity!(
    /// MW, or MWh for stores
    Capacity
);
quantity!(
    /// A duration in hours
    Hours
);
quantity!(
    /// Tonnes of CO2
    Emissions
);
quantity!(
    /// EUR per MW (per MWh for stores), usually annualised
    MoneyPerCapacity
);
quantity!(
    /// EUR per MWh
    MoneyPerEnergy
);
quantity!(
    /// EUR per tonne of CO2
    MoneyPerEmissions
);
quantity!(
    /// Tonnes of CO2 per MWh of fuel
    EmissionsPerEnergy
);
scalable!(
    Money,
    Energy,
    Capacity,
    Hours,
    Emissions,
    MoneyPerCapacity,
    MoneyPerEnergy,
    MoneyPerEmissions,
    EmissionsPerEnergy
);

// Division rules
impl_div!(Money, Capacity, MoneyPerCapacity);
impl_div!(Money, Energy, MoneyPerEnergy);
impl_div!(Energy, Hours, Capacity);
impl_div!(Emissions, Energy, EmissionsPerEnergy);

// Multiplication rules
impl_mul!(Capacity, Hours, Energy);
impl_mul!(MoneyPerCapacity, Capacity, Money);
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(MoneyPerEmissions, Emissions, Money);
impl_mul!(MoneyPerEmissions, EmissionsPerEnergy, MoneyPerEnergy);
impl_mul!(EmissionsPerEnergy, Energy, Emissions);
