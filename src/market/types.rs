//! Market types and upstream-shape normalization.
//!
//! The two catalogs return overlapping but inconsistent record shapes
//! (string-or-number prices, several spellings per field, parallel arrays vs
//! embedded token objects). Everything downstream of the fetch boundary works
//! on one canonical [`MarketSnapshot`], built here by one adapter per source.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;
use strum::Display;

/// Which upstream catalog a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Gamma public-search (paginated primary source).
    #[strum(serialize = "gamma")]
    Gamma,
    /// CLOB markets listing (unpaginated fallback source).
    #[strum(serialize = "clob")]
    Clob,
}

/// Quotes for one outcome of a binary market, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeQuote {
    /// Outcome name as received ("Yes"/"No" in any casing).
    pub name: String,
    /// Best bid, if the source reported one.
    pub best_bid: Option<Decimal>,
    /// Best ask, if the source reported one.
    pub best_ask: Option<Decimal>,
    /// Last traded price, if the source reported one.
    pub last_price: Option<Decimal>,
    /// Venue token id, if embedded in the record.
    pub token_id: Option<String>,
}

impl OutcomeQuote {
    /// Whether this is the NO (target) outcome.
    pub fn is_no(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case("no")
    }

    /// Whether this is the YES (complementary) outcome.
    pub fn is_yes(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case("yes")
    }
}

/// Upstream-agnostic view of one market, built fresh per fetch cycle.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// Venue market id.
    pub id: Option<String>,
    /// Condition id (0x-prefixed hash on CLOB).
    pub condition_id: Option<String>,
    /// Market slug.
    pub slug: Option<String>,
    /// Slug of the event this market belongs to.
    pub event_slug: Option<String>,
    /// Market question text.
    pub question: Option<String>,
    /// Active flag; `None` when the source omitted it.
    pub active: Option<bool>,
    /// Closed flag.
    pub closed: Option<bool>,
    /// Archived flag.
    pub archived: Option<bool>,
    /// Accepting-orders flag.
    pub accepting_orders: Option<bool>,
    /// Raw expiry timestamp; parsed lazily by the tradability filter.
    pub end_date: Option<String>,
    /// Outcome quotes in the order the source listed them.
    pub outcomes: SmallVec<[OutcomeQuote; 2]>,
    /// Parallel price array aligned with `outcomes` (Gamma only).
    pub outcome_prices: Vec<Decimal>,
    /// 24h volume; zero when unreported.
    pub volume_24h: Decimal,
    /// Which catalog produced this snapshot.
    pub source: CatalogSource,
}

impl MarketSnapshot {
    /// Best identifier for display and order-path resolution.
    pub fn market_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.condition_id.as_deref())
            .or(self.slug.as_deref())
    }

    /// Public market page URL, when a slug is known.
    pub fn url(&self) -> Option<String> {
        self.slug
            .as_deref()
            .map(|s| format!("https://polymarket.com/event/{}", s))
    }

    /// The NO outcome quote, if listed.
    pub fn no_outcome(&self) -> Option<&OutcomeQuote> {
        self.outcomes.iter().find(|o| o.is_no())
    }

    /// Position of the NO outcome in listing order.
    pub fn no_index(&self) -> Option<usize> {
        self.outcomes.iter().position(|o| o.is_no())
    }
}

// === Raw upstream shapes ===

pub(crate) fn de_flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

pub(crate) fn de_flexible_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| decimal_from_value(&v)))
}

fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(string_list_from_value).unwrap_or_default())
}

fn de_decimal_list<'de, D>(deserializer: D) -> Result<Vec<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let strings = value.map(string_list_from_value).unwrap_or_default();
    Ok(strings
        .iter()
        .map(|s| s.parse().unwrap_or(Decimal::ZERO))
        .collect())
}

fn decimal_from_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// Gamma encodes list fields either as JSON arrays or as JSON-encoded strings
/// (`"[\"Yes\", \"No\"]"`); accept both.
fn string_list_from_value(value: serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(&s)
            .map(string_list_from_value)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Market record from the Gamma public-search response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGammaMarket {
    /// Market id (string or number upstream).
    #[serde(deserialize_with = "de_flexible_string")]
    pub id: Option<String>,
    /// Condition id.
    #[serde(alias = "conditionId", deserialize_with = "de_flexible_string")]
    pub condition_id: Option<String>,
    /// Market slug.
    pub slug: Option<String>,
    /// Question text.
    pub question: Option<String>,
    /// Active flag.
    pub active: Option<bool>,
    /// Closed flag.
    pub closed: Option<bool>,
    /// Archived flag.
    pub archived: Option<bool>,
    /// Accepting-orders flag.
    #[serde(alias = "acceptingOrders")]
    pub accepting_orders: Option<bool>,
    /// Expiry timestamp (ISO).
    #[serde(alias = "endDate", alias = "endDateIso")]
    pub end_date: Option<String>,
    /// Market-level best bid (applies to the first listed outcome).
    #[serde(alias = "bestBid", deserialize_with = "de_flexible_decimal")]
    pub best_bid: Option<Decimal>,
    /// Market-level best ask (applies to the first listed outcome).
    #[serde(alias = "bestAsk", deserialize_with = "de_flexible_decimal")]
    pub best_ask: Option<Decimal>,
    /// Outcome names in listing order.
    #[serde(deserialize_with = "de_string_list")]
    pub outcomes: Vec<String>,
    /// Prices parallel to `outcomes`.
    #[serde(alias = "outcomePrices", deserialize_with = "de_decimal_list")]
    pub outcome_prices: Vec<Decimal>,
    /// Volume.
    #[serde(deserialize_with = "de_flexible_decimal")]
    pub volume: Option<Decimal>,
    /// Volume under its numeric spelling.
    #[serde(alias = "volumeNum", deserialize_with = "de_flexible_decimal")]
    pub volume_num: Option<Decimal>,
    /// 24h volume.
    #[serde(alias = "volume24hr", deserialize_with = "de_flexible_decimal")]
    pub volume_24h: Option<Decimal>,
}

/// Token record embedded in CLOB market listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawToken {
    /// Token id under any of its spellings.
    #[serde(
        alias = "tokenId",
        alias = "asset_id",
        alias = "assetId",
        deserialize_with = "de_flexible_string"
    )]
    pub token_id: Option<String>,
    /// Outcome name.
    pub outcome: Option<String>,
    /// Price field.
    #[serde(deserialize_with = "de_flexible_decimal")]
    pub price: Option<Decimal>,
    /// Last trade price.
    #[serde(alias = "lastPrice", deserialize_with = "de_flexible_decimal")]
    pub last_price: Option<Decimal>,
    /// Best offer.
    #[serde(alias = "bestOffer", deserialize_with = "de_flexible_decimal")]
    pub best_offer: Option<Decimal>,
    /// Best bid.
    #[serde(alias = "bestBid", deserialize_with = "de_flexible_decimal")]
    pub best_bid: Option<Decimal>,
    /// Bare `id`, used by some resolution endpoints.
    #[serde(deserialize_with = "de_flexible_string")]
    pub id: Option<String>,
}

impl RawToken {
    /// First usable positive price across the known field spellings.
    pub fn effective_price(&self) -> Option<Decimal> {
        [self.price, self.last_price, self.best_offer, self.best_bid]
            .into_iter()
            .flatten()
            .find(|p| *p > Decimal::ZERO)
    }

    /// Token id under any of its spellings.
    pub fn any_id(&self) -> Option<&str> {
        self.token_id.as_deref().or(self.id.as_deref())
    }

    /// Whether this token represents the NO outcome.
    pub fn is_no(&self) -> bool {
        self.outcome
            .as_deref()
            .map(|o| o.trim().eq_ignore_ascii_case("no"))
            .unwrap_or(false)
    }
}

/// Outcome object in the flatter CLOB shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOutcome {
    /// Outcome name.
    pub name: Option<String>,
    /// Best bid.
    #[serde(alias = "bestBid", deserialize_with = "de_flexible_decimal")]
    pub best_bid: Option<Decimal>,
    /// Best ask.
    #[serde(alias = "bestAsk", deserialize_with = "de_flexible_decimal")]
    pub best_ask: Option<Decimal>,
    /// Last trade price.
    #[serde(alias = "lastPrice", deserialize_with = "de_flexible_decimal")]
    pub last_price: Option<Decimal>,
}

/// Market record from the CLOB markets listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawClobMarket {
    /// Condition id.
    #[serde(alias = "conditionId", deserialize_with = "de_flexible_string")]
    pub condition_id: Option<String>,
    /// Market id, when present separately.
    #[serde(deserialize_with = "de_flexible_string")]
    pub id: Option<String>,
    /// Market slug.
    #[serde(alias = "marketSlug")]
    pub slug: Option<String>,
    /// Question text.
    pub question: Option<String>,
    /// Title, used when `question` is absent.
    pub title: Option<String>,
    /// Active flag.
    pub active: Option<bool>,
    /// Closed flag.
    pub closed: Option<bool>,
    /// Archived flag.
    pub archived: Option<bool>,
    /// Accepting-orders flag.
    #[serde(alias = "acceptingOrders", alias = "accepting_orders")]
    pub accepting_orders: Option<bool>,
    /// Expiry timestamp (ISO).
    #[serde(alias = "endDateIso", alias = "end_date_iso", alias = "endDate")]
    pub end_date: Option<String>,
    /// Embedded token records.
    pub tokens: Vec<RawToken>,
    /// Outcome objects in the flatter shape.
    pub outcomes: Vec<RawOutcome>,
    /// Volume.
    #[serde(deserialize_with = "de_flexible_decimal")]
    pub volume: Option<Decimal>,
}

impl MarketSnapshot {
    /// Normalize a Gamma public-search market record.
    ///
    /// Gamma quotes bid/ask at market level; they describe the first listed
    /// outcome, so they are attached there with listing order preserved.
    pub fn from_gamma(raw: RawGammaMarket, event_slug: Option<String>) -> Self {
        let mut outcomes: SmallVec<[OutcomeQuote; 2]> = raw
            .outcomes
            .iter()
            .map(|name| OutcomeQuote {
                name: name.clone(),
                ..OutcomeQuote::default()
            })
            .collect();
        if let Some(first) = outcomes.first_mut() {
            first.best_bid = raw.best_bid;
            first.best_ask = raw.best_ask;
        }

        let volume = raw
            .volume_24h
            .or(raw.volume)
            .or(raw.volume_num)
            .unwrap_or(Decimal::ZERO);

        Self {
            id: raw.id,
            condition_id: raw.condition_id,
            slug: raw.slug,
            event_slug,
            question: raw.question,
            active: raw.active,
            closed: raw.closed,
            archived: raw.archived,
            accepting_orders: raw.accepting_orders,
            end_date: raw.end_date,
            outcomes,
            outcome_prices: raw.outcome_prices,
            volume_24h: volume,
            source: CatalogSource::Gamma,
        }
    }

    /// Normalize a CLOB markets-listing record.
    ///
    /// Prefers the embedded token array (carries token ids); falls back to
    /// the flatter outcome-object shape.
    pub fn from_clob(raw: RawClobMarket) -> Self {
        let outcomes: SmallVec<[OutcomeQuote; 2]> = if !raw.tokens.is_empty() {
            raw.tokens
                .iter()
                .map(|t| OutcomeQuote {
                    name: t.outcome.clone().unwrap_or_default(),
                    best_bid: t.effective_price(),
                    best_ask: None,
                    last_price: t.last_price,
                    token_id: t.any_id().map(str::to_string),
                })
                .collect()
        } else {
            raw.outcomes
                .iter()
                .map(|o| OutcomeQuote {
                    name: o.name.clone().unwrap_or_default(),
                    best_bid: o.best_bid,
                    best_ask: o.best_ask,
                    last_price: o.last_price,
                    token_id: None,
                })
                .collect()
        };

        Self {
            id: raw.id,
            condition_id: raw.condition_id,
            slug: raw.slug,
            event_slug: None,
            question: raw.question.or(raw.title),
            active: raw.active,
            closed: raw.closed,
            archived: raw.archived,
            accepting_orders: raw.accepting_orders,
            end_date: raw.end_date,
            outcomes,
            outcome_prices: Vec::new(),
            volume_24h: raw.volume.unwrap_or(Decimal::ZERO),
            source: CatalogSource::Clob,
        }
    }
}
