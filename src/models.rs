// src/models.rs
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the authenticated caller. Only the access boundary builds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        OwnerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One lot of shares held at a given cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: String,
    pub owner_id: String,
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub last_known_price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Body of an add-holding request. Fields are optional so that a missing
/// field is reported as a validation failure rather than a decode error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldingRequest {
    pub symbol: Option<String>,
    pub quantity: Option<f64>,
    pub buy_price: Option<f64>,
}

/// A validated holding ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHolding {
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
}

impl TryFrom<CreateHoldingRequest> for NewHolding {
    type Error = Error;

    fn try_from(req: CreateHoldingRequest) -> Result<Self> {
        let symbol = normalize_symbol(req.symbol.as_deref())?;
        let quantity = require_amount("quantity", req.quantity)?;
        let buy_price = require_amount("buyPrice", req.buy_price)?;
        Ok(NewHolding {
            symbol,
            quantity,
            buy_price,
        })
    }
}

/// Partial update; only the fields present are changed.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingUpdate {
    pub quantity: Option<f64>,
    pub buy_price: Option<f64>,
}

impl HoldingUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.quantity.is_none() && self.buy_price.is_none() {
            return Err(Error::Validation(
                "update requires quantity or buyPrice".to_string(),
            ));
        }
        if let Some(q) = self.quantity {
            check_amount("quantity", q)?;
        }
        if let Some(p) = self.buy_price {
            check_amount("buyPrice", p)?;
        }
        Ok(())
    }

    pub fn apply(&self, holding: &mut Holding) {
        if let Some(q) = self.quantity {
            holding.quantity = q;
        }
        if let Some(p) = self.buy_price {
            holding.buy_price = p;
        }
    }
}

/// Trims and uppercases a ticker, rejecting empty input.
pub fn normalize_symbol(raw: Option<&str>) -> Result<String> {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_uppercase()),
        _ => Err(Error::Validation("symbol is required".to_string())),
    }
}

fn require_amount(field: &str, value: Option<f64>) -> Result<f64> {
    let value = value.ok_or_else(|| Error::Validation(format!("{} is required", field)))?;
    check_amount(field, value)?;
    Ok(value)
}

fn check_amount(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a non-negative number",
            field
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    pub region: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub security_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_stocks: usize,
    pub total_quantity: f64,
    pub total_invested: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioOverview {
    pub total_invested: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
}

/// Where a row's current price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    Live,
    LastKnown,
    BuyPrice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownEntry {
    pub id: String,
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
    pub current_price: f64,
    pub invested_value: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    pub price_source: PriceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_error: Option<String>,
}

/// `profit_loss` and `percent_change` are two-decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingInfo {
    pub symbol: String,
    pub current_price: f64,
    pub buy_price: f64,
    pub quantity: f64,
    pub profit_loss: String,
    pub percent_change: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uppercases_and_trims_symbol() {
        let req = CreateHoldingRequest {
            symbol: Some("  aapl ".into()),
            quantity: Some(10.0),
            buy_price: Some(150.0),
        };
        let new = NewHolding::try_from(req).unwrap();
        assert_eq!(new.symbol, "AAPL");
        assert_eq!(new.quantity, 10.0);
        assert_eq!(new.buy_price, 150.0);
    }

    #[test]
    fn create_request_rejects_missing_fields() {
        let missing_symbol = CreateHoldingRequest {
            symbol: Some("   ".into()),
            quantity: Some(1.0),
            buy_price: Some(1.0),
        };
        assert!(matches!(
            NewHolding::try_from(missing_symbol),
            Err(Error::Validation(_))
        ));

        let missing_price = CreateHoldingRequest {
            symbol: Some("MSFT".into()),
            quantity: Some(1.0),
            buy_price: None,
        };
        assert!(matches!(
            NewHolding::try_from(missing_price),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn create_request_rejects_negative_or_non_finite() {
        let negative = CreateHoldingRequest {
            symbol: Some("MSFT".into()),
            quantity: Some(-1.0),
            buy_price: Some(1.0),
        };
        assert!(NewHolding::try_from(negative).is_err());

        let nan = CreateHoldingRequest {
            symbol: Some("MSFT".into()),
            quantity: Some(1.0),
            buy_price: Some(f64::NAN),
        };
        assert!(NewHolding::try_from(nan).is_err());
    }

    #[test]
    fn zero_amounts_are_allowed() {
        let req = CreateHoldingRequest {
            symbol: Some("MSFT".into()),
            quantity: Some(0.0),
            buy_price: Some(0.0),
        };
        assert!(NewHolding::try_from(req).is_ok());
    }

    #[test]
    fn update_touches_only_present_fields() {
        let mut holding = Holding {
            id: "h1".into(),
            owner_id: "alice".into(),
            symbol: "AAPL".into(),
            quantity: 10.0,
            buy_price: 150.0,
            last_known_price: None,
            created_at: Utc::now(),
        };
        HoldingUpdate {
            quantity: Some(12.0),
            buy_price: None,
        }
        .apply(&mut holding);
        assert_eq!(holding.quantity, 12.0);
        assert_eq!(holding.buy_price, 150.0);

        HoldingUpdate {
            quantity: None,
            buy_price: Some(140.0),
        }
        .apply(&mut holding);
        assert_eq!(holding.quantity, 12.0);
        assert_eq!(holding.buy_price, 140.0);
    }

    #[test]
    fn empty_or_negative_update_is_rejected() {
        assert!(HoldingUpdate::default().validate().is_err());
        let negative = HoldingUpdate {
            quantity: None,
            buy_price: Some(-5.0),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn holding_serializes_with_contract_field_names() {
        let holding = Holding {
            id: "h1".into(),
            owner_id: "alice".into(),
            symbol: "AAPL".into(),
            quantity: 10.0,
            buy_price: 150.0,
            last_known_price: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&holding).unwrap();
        assert_eq!(json["buyPrice"], 150.0);
        assert_eq!(json["ownerId"], "alice");
        assert!(json["lastKnownPrice"].is_null());
        assert!(json.get("createdAt").is_some());
    }
}
