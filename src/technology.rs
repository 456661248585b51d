//! Technologies and the static data attached to them.
//!
//! Every asset carries exactly one [`Technology`] tag, resolved when the asset is read in. All
//! technology-specific behaviour (lifetimes, bus carriers, fuels, special cases in the
//! bookkeeping) hangs off this tag rather than off asset names.
use crate::units::EmissionsPerEnergy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The technology of an asset
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Technology {
    /// Hard coal plants
    #[strum(serialize = "coal")]
    Coal,
    /// Lignite plants
    #[strum(serialize = "lignite")]
    Lignite,
    /// Combined-cycle gas turbines
    #[strum(serialize = "CCGT")]
    Ccgt,
    /// Open-cycle gas turbines
    #[strum(serialize = "OCGT")]
    Ocgt,
    /// Onshore wind
    #[strum(serialize = "onwind")]
    Onwind,
    /// Offshore wind with AC connection
    #[strum(serialize = "offwind-ac")]
    OffwindAc,
    /// Offshore wind with DC connection
    #[strum(serialize = "offwind-dc")]
    OffwindDc,
    /// Solar PV
    #[strum(serialize = "solar")]
    Solar,
    /// Run-of-river hydro
    #[strum(serialize = "ror")]
    Ror,
    /// Biomass plants
    #[strum(serialize = "biomass")]
    Biomass,
    /// Nuclear plants
    #[strum(serialize = "nuclear")]
    Nuclear,
    /// Oil-fired plants
    #[strum(serialize = "oil")]
    Oil,
    /// Electrolysers
    #[strum(serialize = "electrolysis")]
    Electrolysis,
    /// Hydrogen fuel cells
    #[strum(serialize = "fuel cell")]
    FuelCell,
    /// Hydrogen storage
    #[strum(serialize = "H2")]
    H2Store,
    /// Battery energy storage
    #[strum(serialize = "battery store")]
    BatteryStore,
    /// Battery inverter (charging side)
    #[strum(serialize = "battery charger")]
    BatteryCharger,
    /// Battery inverter (discharging side)
    #[strum(serialize = "battery discharger")]
    BatteryDischarger,
    /// Battery storage units
    #[strum(serialize = "battery")]
    Battery,
    /// Pumped hydro storage
    #[strum(serialize = "PHS")]
    Phs,
    /// Natural gas supply
    #[strum(serialize = "gas import")]
    GasImport,
    /// Hydrogen supply
    #[strum(serialize = "H2 import")]
    H2Import,
    /// Gas feed into the fuel-mix bus
    #[strum(serialize = "Gas_input")]
    GasInput,
    /// Hydrogen feed into the fuel-mix bus
    #[strum(serialize = "H2_input")]
    H2Input,
    /// AC transmission lines
    #[strum(serialize = "AC")]
    Ac,
    /// HVDC links
    #[strum(serialize = "DC")]
    Dc,
}

impl Serialize for Technology {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let name: &'static str = self.into();
        serializer.serialize_str(name)
    }
}

impl<'de> Deserialize<'de> for Technology {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value
            .parse()
            .map_err(|_| D::Error::custom(format!("Unknown technology: {value}")))
    }
}

/// The component type used to represent an asset in the system model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum AssetKind {
    /// Injects power at a single bus
    #[strum(serialize = "generator")]
    #[serde(rename = "generator")]
    Generator,
    /// Power-rated storage with a fixed energy-to-power ratio
    #[strum(serialize = "storage_unit")]
    #[serde(rename = "storage_unit")]
    StorageUnit,
    /// Energy-rated storage at a single bus
    #[strum(serialize = "store")]
    #[serde(rename = "store")]
    Store,
    /// Directed conversion between two buses
    #[strum(serialize = "link")]
    #[serde(rename = "link")]
    Link,
    /// Bidirectional AC transmission between two regions
    #[strum(serialize = "line")]
    #[serde(rename = "line")]
    Line,
}

/// The energy carrier of a bus. Each region has at most one bus per carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Carrier {
    /// The AC electricity bus
    #[strum(serialize = "electricity")]
    Electricity,
    /// Natural gas supplied by imports
    #[strum(serialize = "gas")]
    Gas,
    /// Hydrogen
    #[strum(serialize = "hydrogen")]
    Hydrogen,
    /// Blend of gas and hydrogen feeding the CCGT fleet
    #[strum(serialize = "fuel mix")]
    FuelMix,
    /// Internal bus between battery chargers, dischargers and stores
    #[strum(serialize = "battery")]
    Battery,
}

/// A fuel with an exogenous price path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, DeserializeLabeledStringEnum)]
#[strum(serialize_all = "lowercase")]
pub enum Fuel {
    /// Natural gas
    #[string = "gas"]
    Gas,
    /// Hard coal
    #[string = "coal"]
    Coal,
    /// Lignite
    #[string = "lignite"]
    Lignite,
    /// Oil
    #[string = "oil"]
    Oil,
    /// Uranium
    #[string = "nuclear"]
    Nuclear,
    /// Solid biomass
    #[string = "biomass"]
    Biomass,
    /// Hydrogen
    #[string = "H2"]
    #[strum(serialize = "H2")]
    H2,
}

impl Fuel {
    /// Emissions per MWh of fuel burnt (thermal)
    pub fn co2_intensity(self) -> EmissionsPerEnergy {
        EmissionsPerEnergy(match self {
            Fuel::Gas => 0.187,
            Fuel::Coal => 0.336,
            Fuel::Lignite => 0.407,
            Fuel::Oil => 0.266,
            Fuel::Nuclear | Fuel::Biomass | Fuel::H2 => 0.0,
        })
    }

    /// Whether prices for this fuel are already per unit of delivered energy.
    ///
    /// Gas is delivered through the import generator, whose output is measured in fuel units, so
    /// no efficiency correction applies.
    pub fn is_delivered(self) -> bool {
        self == Fuel::Gas
    }
}

/// Efficiency of combined-cycle gas plants when represented as links
pub const CCGT_EFFICIENCY: f64 = 0.61;
/// Efficiency of open-cycle gas plants when represented as links
pub const OCGT_EFFICIENCY: f64 = 0.40;
/// Variable O&M of combined-cycle gas plants (per MWh electric)
pub const CCGT_VOM: f64 = 4.4;
/// Variable O&M of open-cycle gas plants (per MWh electric)
pub const OCGT_VOM: f64 = 4.5;
/// Efficiency of electrolysers
pub const ELECTROLYSIS_EFFICIENCY: f64 = 0.8;
/// Efficiency of hydrogen fuel cells
pub const FUEL_CELL_EFFICIENCY: f64 = 0.58;

impl Technology {
    /// The component type used to represent this technology
    pub fn kind(self) -> AssetKind {
        use Technology::*;
        match self {
            Coal | Lignite | Onwind | OffwindAc | OffwindDc | Solar | Ror | Biomass | Nuclear
            | Oil | GasImport | H2Import => AssetKind::Generator,
            Battery | Phs => AssetKind::StorageUnit,
            H2Store | BatteryStore => AssetKind::Store,
            Ccgt | Ocgt | Electrolysis | FuelCell | BatteryCharger | BatteryDischarger
            | GasInput | H2Input | Dc => AssetKind::Link,
            Ac => AssetKind::Line,
        }
    }

    /// Technical lifetime in years. Imports are never retired.
    pub fn lifetime(self) -> Option<u32> {
        use Technology::*;
        match self {
            Ccgt | Ocgt | Biomass | Oil | GasInput => Some(30),
            Onwind | OffwindAc | OffwindDc | Solar => Some(25),
            Ror => Some(80),
            Battery | Phs => Some(15),
            Electrolysis | FuelCell | H2Store | BatteryStore | BatteryCharger
            | BatteryDischarger => Some(20),
            H2Input | Ac | Dc | Coal | Lignite | Nuclear => Some(40),
            GasImport | H2Import => None,
        }
    }

    /// Whether this is an import, which is exempt from potentials and never optimisable
    pub fn is_import(self) -> bool {
        matches!(self, Technology::GasImport | Technology::H2Import)
    }

    /// Whether this is a gas-fired plant represented as a link from the gas bus
    pub fn is_gas_plant(self) -> bool {
        matches!(self, Technology::Ccgt | Technology::Ocgt)
    }

    /// Whether the asset's capacity is derived from another asset rather than optimised
    pub fn is_derived(self) -> bool {
        self == Technology::GasInput
    }

    /// The fuel burnt by this technology, if its marginal cost follows a fuel price
    pub fn fuel(self) -> Option<Fuel> {
        use Technology::*;
        match self {
            Coal => Some(Fuel::Coal),
            Lignite => Some(Fuel::Lignite),
            Oil => Some(Fuel::Oil),
            Nuclear => Some(Fuel::Nuclear),
            Biomass => Some(Fuel::Biomass),
            GasImport => Some(Fuel::Gas),
            H2Import => Some(Fuel::H2),
            _ => None,
        }
    }

    /// The carrier of the bus a single-bus asset (generator, storage unit, store) connects to
    pub fn bus_carrier(self) -> Carrier {
        match self {
            Technology::GasImport => Carrier::Gas,
            Technology::H2Import | Technology::H2Store => Carrier::Hydrogen,
            Technology::BatteryStore => Carrier::Battery,
            _ => Carrier::Electricity,
        }
    }

    /// The input and output carriers of a link.
    ///
    /// CCGT draws from the fuel-mix bus when hydrogen blending is modelled, otherwise directly
    /// from the gas bus.
    pub fn link_carriers(self, fuel_mix: bool) -> Option<(Carrier, Carrier)> {
        use Carrier::*;
        match self {
            Technology::Ccgt if fuel_mix => Some((FuelMix, Electricity)),
            Technology::Ccgt | Technology::Ocgt => Some((Gas, Electricity)),
            Technology::Electrolysis => Some((Electricity, Hydrogen)),
            Technology::FuelCell => Some((Hydrogen, Electricity)),
            Technology::BatteryCharger => Some((Electricity, Battery)),
            Technology::BatteryDischarger => Some((Battery, Electricity)),
            Technology::GasInput => Some((Gas, FuelMix)),
            Technology::H2Input => Some((Hydrogen, FuelMix)),
            Technology::Dc => Some((Electricity, Electricity)),
            _ => None,
        }
    }
}
