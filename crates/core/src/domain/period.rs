use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// History window offered by the chart. Each maps to a `(range, interval)` pair on the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[default]
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "5D")]
    FiveDays,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::OneYear,
        Period::FiveYears,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::FiveDays => "5D",
            Period::OneMonth => "1M",
            Period::ThreeMonths => "3M",
            Period::OneYear => "1Y",
            Period::FiveYears => "5Y",
        }
    }

    pub fn range(self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::OneYear => "1y",
            Period::FiveYears => "5y",
        }
    }

    pub fn sample_interval(self) -> &'static str {
        match self {
            Period::OneDay => "5m",
            Period::FiveDays => "15m",
            Period::OneMonth | Period::ThreeMonths => "1d",
            Period::OneYear => "1wk",
            Period::FiveYears => "1mo",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown period: {s} (expected one of 1D, 5D, 1M, 3M, 1Y, 5Y)"))
    }
}
