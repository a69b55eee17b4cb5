use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical form of a ticker: trimmed and uppercased. All identity comparisons go through it.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

pub fn same_symbol(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// A quote as served by the backend. Everything except the symbol may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub volume: Option<u64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub year_high: Option<f64>,
    #[serde(default)]
    pub year_low: Option<f64>,
    #[serde(default)]
    pub day_low: Option<f64>,
    #[serde(default)]
    pub day_high: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub previous_close: Option<f64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub avg_volume: Option<u64>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Instrument {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            ..Default::default()
        }
    }

    /// Overwrites the fields present in `partial`, keeping everything else.
    pub fn merge_from(&mut self, partial: &Instrument) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(v) = src {
                *dst = Some(v.clone());
            }
        }

        take(&mut self.company_name, &partial.company_name);
        take(&mut self.price, &partial.price);
        take(&mut self.change_percent, &partial.change_percent);
        take(&mut self.volume, &partial.volume);
        take(&mut self.market_cap, &partial.market_cap);
        take(&mut self.pe_ratio, &partial.pe_ratio);
        take(&mut self.dividend_yield, &partial.dividend_yield);
        take(&mut self.year_high, &partial.year_high);
        take(&mut self.year_low, &partial.year_low);
        take(&mut self.day_low, &partial.day_low);
        take(&mut self.day_high, &partial.day_high);
        take(&mut self.beta, &partial.beta);
        take(&mut self.sector, &partial.sector);
        take(&mut self.description, &partial.description);
        take(&mut self.previous_close, &partial.previous_close);
        take(&mut self.open, &partial.open);
        take(&mut self.eps, &partial.eps);
        take(&mut self.avg_volume, &partial.avg_volume);
        take(&mut self.industry, &partial.industry);
        take(&mut self.timestamp, &partial.timestamp);
    }

    /// Like [`Instrument::merge_from`] but limited to market data. Names, sector, description
    /// and the other descriptive fields only change through a full detail fetch.
    pub fn merge_quote(&mut self, partial: &Instrument) {
        fn take<T: Copy>(dst: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dst = src;
            }
        }

        take(&mut self.price, partial.price);
        take(&mut self.change_percent, partial.change_percent);
        take(&mut self.volume, partial.volume);
        take(&mut self.day_low, partial.day_low);
        take(&mut self.day_high, partial.day_high);
        take(&mut self.open, partial.open);
        take(&mut self.previous_close, partial.previous_close);
        take(&mut self.market_cap, partial.market_cap);
        take(&mut self.timestamp, partial.timestamp);
    }
}

/// The slice of an instrument the watchlist view needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub change_percent: Option<f64>,
}

impl WatchlistEntry {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            company_name: None,
            price: None,
            change_percent: None,
        }
    }

    /// Applies the list-relevant fields present in a full detail record.
    pub fn merge_from(&mut self, update: &Instrument) {
        if let Some(name) = &update.company_name {
            self.company_name = Some(name.clone());
        }
        self.merge_quote(update);
    }

    /// Applies only the price fields of a quote update; the name is left alone.
    pub fn merge_quote(&mut self, update: &Instrument) {
        if let Some(price) = update.price {
            self.price = Some(price);
        }
        if let Some(change) = update.change_percent {
            self.change_percent = Some(change);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_count")]
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: String,
    #[serde(alias = "company_name", default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(flatten)]
    pub quote: Instrument,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl IndexEntry {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.quote.symbol)
    }
}

/// Accepts RFC 3339 as well as the naive ISO-8601 the backend emits for UTC times.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Share counts arrive as integers or as floats like `1200000.0`.
fn de_opt_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64))
}

fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}
