// ── Channel domain types ──
//
// A channel is one measurement the device streams under the node: a named
// input with a physical unit and the processing steps its samples go
// through on the server.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Physical unit of a channel, serialized as its symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    Energy,
    ReactiveEnergy,
    Power,
    KiloPower,
    ReactivePower,
    Voltage,
    Current,
    Frequency,
    PulseCount,
    Charge,
    #[default]
    Unitless,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Energy => "kWh",
            Self::ReactiveEnergy => "kWhr",
            Self::Power => "W",
            Self::KiloPower => "kW",
            Self::ReactivePower => "VAR",
            Self::Voltage => "V",
            Self::Current => "A",
            Self::Frequency => "Hz",
            Self::PulseCount => "PC",
            Self::Charge => "Ah",
            Self::Unitless => "",
        }
    }

    /// Unknown symbols are treated as unitless.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "kWh" => Self::Energy,
            "kWhr" => Self::ReactiveEnergy,
            "W" => Self::Power,
            "kW" => Self::KiloPower,
            "VAR" => Self::ReactivePower,
            "V" => Self::Voltage,
            "A" => Self::Current,
            "Hz" => Self::Frequency,
            "PC" => Self::PulseCount,
            "Ah" | "charge" => Self::Charge,
            _ => Self::Unitless,
        }
    }

    /// Human-readable description used for the remote input.
    pub fn description(self) -> &'static str {
        match self {
            Self::Energy => "Electricity meter",
            Self::ReactiveEnergy => "Reactive energy meter",
            Self::Power | Self::KiloPower => "Power consumption",
            Self::ReactivePower => "Reactive power",
            Self::Current => "Current consumption",
            Self::Frequency => "Mains frequency",
            Self::Voltage => "Mains voltage",
            _ => "Input",
        }
    }

    /// Steps a channel of this unit may carry.
    pub fn allowed_steps(self) -> &'static [ProcessStep] {
        match self {
            Self::Energy => &[
                ProcessStep::LogJoin,
                ProcessStep::DailyUsage,
                ProcessStep::MultiRate,
            ],
            Self::ReactiveEnergy | Self::Charge => &[ProcessStep::LogJoin],
            _ => &[ProcessStep::Log],
        }
    }

    /// Steps given to a freshly derived channel of this unit.
    pub fn default_steps(self) -> &'static [ProcessStep] {
        match self {
            Self::Energy => &[ProcessStep::LogJoin, ProcessStep::DailyUsage],
            Self::ReactiveEnergy | Self::Charge => &[ProcessStep::LogJoin],
            _ => &[ProcessStep::Log],
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl From<String> for Unit {
    fn from(s: String) -> Self {
        Self::from_symbol(&s)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol().to_owned()
    }
}

/// A named processing step applied to a channel's samples.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessStep {
    /// Log samples to a realtime feed.
    Log,
    /// Log to a realtime feed, joining gaps.
    LogJoin,
    /// Accumulate energy into a daily-usage feed.
    DailyUsage,
    /// Multi-rate tariff accumulation.
    MultiRate,
    /// Daily cost accounting.
    DailyCost,
}

impl ProcessStep {
    /// Suffix appended to the channel name to form this step's feed name.
    pub fn feed_suffix(self) -> &'static str {
        match self {
            Self::DailyUsage => "d",
            Self::MultiRate => "r",
            _ => "",
        }
    }
}

/// A class of measurement, keyed by the input name with its phase letter
/// stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputClass {
    pub key: &'static str,
    pub unit: Unit,
    pub description: &'static str,
}

pub const INPUT_CLASSES: &[InputClass] = &[
    InputClass { key: "meter", unit: Unit::Energy, description: "Electricity meter" },
    InputClass { key: "meter_r", unit: Unit::ReactiveEnergy, description: "Reactive power meter" },
    InputClass { key: "power", unit: Unit::Power, description: "Active power" },
    InputClass { key: "reactive", unit: Unit::ReactivePower, description: "Reactive power" },
    InputClass { key: "voltage", unit: Unit::Voltage, description: "Voltage" },
    InputClass { key: "current", unit: Unit::Current, description: "Current" },
    InputClass { key: "frequency", unit: Unit::Frequency, description: "Frequency" },
    InputClass { key: "factor", unit: Unit::Unitless, description: "Power factor" },
    InputClass { key: "pulse", unit: Unit::PulseCount, description: "Count of meter pulses" },
    InputClass { key: "charge", unit: Unit::Charge, description: "Estimated battery charge" },
];

impl InputClass {
    pub fn lookup(key: &str) -> Option<&'static InputClass> {
        INPUT_CLASSES.iter().find(|c| c.key == key)
    }

    /// Class of a device input name, phase suffix ignored.
    pub fn of_input(input: &str) -> Option<&'static InputClass> {
        Self::lookup(split_phase(input).0)
    }
}

impl Unit {
    /// Unit of a device input name; unknown classes are unitless.
    pub fn for_input(input: &str) -> Self {
        InputClass::of_input(input).map_or(Self::Unitless, |c| c.unit)
    }
}

/// Split a device input name into its class key and phase suffix.
///
/// A trailing character that is not lower-case (`A`, `B`, `C`, `1`...)
/// is a phase; `powerA` is `("power", Some('A'))`.
pub fn split_phase(input: &str) -> (&str, Option<char>) {
    match input.chars().last() {
        Some(c) if !c.is_lowercase() => (&input[..input.len() - c.len_utf8()], Some(c)),
        _ => (input, None),
    }
}

fn default_interval() -> u32 {
    10
}

/// One configured channel of the local device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Remote input name.
    #[serde(alias = "identifier")]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    /// Device (meter) this channel is read from.
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub unit: Unit,
    /// Processing step names, in order. Unknown names are ignored by the
    /// template engine.
    #[serde(default)]
    pub processes: Vec<String>,
    /// Sampling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Device-side input this channel reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Fields owned by the device daemon, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Channel {
    /// Derive a channel from a device name, one of its input names and the
    /// input's unit.
    ///
    /// `("m1", "powerA", W)` yields name `m1A_W`, tag `m1_A` and the unit's
    /// default steps.
    pub fn from_device_input(device: &str, input: &str, unit: Unit) -> Self {
        let (_, phase) = split_phase(input);
        let phase = phase.map(String::from).unwrap_or_default();

        let mut name = format!("{device}{phase}");
        if unit != Unit::Unitless {
            name.push('_');
            name.push_str(unit.symbol());
        }
        let tag = if phase.is_empty() {
            device.to_owned()
        } else {
            format!("{device}_{phase}")
        };

        Self {
            name,
            tag,
            device: device.to_owned(),
            unit,
            processes: unit
                .default_steps()
                .iter()
                .map(ToString::to_string)
                .collect(),
            interval: default_interval(),
            input: Some(input.to_owned()),
            extra: BTreeMap::new(),
        }
    }

    /// Recognized steps, in configured order.
    pub fn steps(&self) -> impl Iterator<Item = ProcessStep> + '_ {
        self.processes.iter().filter_map(|p| p.parse().ok())
    }

    /// Configured steps the unit does not allow.
    pub fn disallowed_steps(&self) -> Vec<ProcessStep> {
        let allowed = self.unit.allowed_steps();
        self.steps().filter(|s| !allowed.contains(s)).collect()
    }
}
