// src/valuation.rs
//! Portfolio arithmetic. Everything here is a pure function of the holdings
//! and prices passed in; values keep full precision and are rounded only
//! when a response struct is built.

use crate::models::{
    BreakdownEntry, Holding, HoldingInfo, PortfolioOverview, PortfolioSummary, PriceSource,
};

/// Full-precision figures for one holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingValuation {
    pub current_price: f64,
    pub price_source: PriceSource,
    pub invested_value: f64,
    pub current_value: f64,
    pub profit_loss: f64,
}

/// Live quote, then the last observed price, then cost basis.
pub fn effective_price(holding: &Holding, live: Option<f64>) -> (f64, PriceSource) {
    match (live, holding.last_known_price) {
        (Some(price), _) => (price, PriceSource::Live),
        (None, Some(price)) => (price, PriceSource::LastKnown),
        (None, None) => (holding.buy_price, PriceSource::BuyPrice),
    }
}

pub fn invested_value(holding: &Holding) -> f64 {
    holding.quantity * holding.buy_price
}

pub fn value_holding(holding: &Holding, live: Option<f64>) -> HoldingValuation {
    let (current_price, price_source) = effective_price(holding, live);
    let invested_value = invested_value(holding);
    let current_value = holding.quantity * current_price;
    HoldingValuation {
        current_price,
        price_source,
        invested_value,
        current_value,
        profit_loss: current_value - invested_value,
    }
}

/// `change / base * 100`, or 0 when there is no base to compare against.
pub fn percent_of(change: f64, base: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    let pct = change / base * 100.0;
    if pct.is_finite() {
        pct
    } else {
        0.0
    }
}

pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid emitting -0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn format2(value: f64) -> String {
    format!("{:.2}", round2(value))
}

pub fn summarize(holdings: &[Holding]) -> PortfolioSummary {
    PortfolioSummary {
        total_stocks: holdings.len(),
        total_quantity: holdings.iter().map(|h| h.quantity).sum(),
        total_invested: round2(holdings.iter().map(invested_value).sum()),
    }
}

pub fn overview<'a, I>(valuations: I) -> PortfolioOverview
where
    I: IntoIterator<Item = &'a HoldingValuation>,
{
    let (invested, current) = valuations
        .into_iter()
        .fold((0.0, 0.0), |(inv, cur), v| {
            (inv + v.invested_value, cur + v.current_value)
        });
    let profit_loss = current - invested;

    PortfolioOverview {
        total_invested: round2(invested),
        current_value: round2(current),
        profit_loss: round2(profit_loss),
        profit_loss_percent: round2(percent_of(profit_loss, invested)),
    }
}

pub fn breakdown_entry(
    holding: &Holding,
    valuation: &HoldingValuation,
    quote_error: Option<String>,
) -> BreakdownEntry {
    BreakdownEntry {
        id: holding.id.clone(),
        symbol: holding.symbol.clone(),
        quantity: holding.quantity,
        buy_price: holding.buy_price,
        current_price: valuation.current_price,
        invested_value: round2(valuation.invested_value),
        current_value: round2(valuation.current_value),
        profit_loss: round2(valuation.profit_loss),
        price_source: valuation.price_source,
        quote_error,
    }
}

/// Per-share comparison of a live price against the holding's cost basis.
pub fn holding_info(holding: &Holding, live_price: f64) -> HoldingInfo {
    let change = live_price - holding.buy_price;
    HoldingInfo {
        symbol: holding.symbol.clone(),
        current_price: live_price,
        buy_price: holding.buy_price,
        quantity: holding.quantity,
        profit_loss: format2(change * holding.quantity),
        percent_change: format2(percent_of(change, holding.buy_price)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn holding(symbol: &str, quantity: f64, buy_price: f64, last: Option<f64>) -> Holding {
        Holding {
            id: format!("{}-{}", symbol, quantity),
            owner_id: "alice".to_string(),
            symbol: symbol.to_string(),
            quantity,
            buy_price,
            last_known_price: last,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fallback_chain_prefers_live_then_last_known_then_buy_price() {
        let h = holding("AAPL", 10.0, 150.0, Some(160.0));
        assert_eq!(effective_price(&h, Some(165.0)), (165.0, PriceSource::Live));
        assert_eq!(effective_price(&h, None), (160.0, PriceSource::LastKnown));

        let bare = holding("AAPL", 10.0, 150.0, None);
        assert_eq!(effective_price(&bare, None), (150.0, PriceSource::BuyPrice));
    }

    #[test]
    fn zero_live_price_is_not_treated_as_missing() {
        let h = holding("DEAD", 10.0, 5.0, Some(3.0));
        let v = value_holding(&h, Some(0.0));
        assert_eq!(v.price_source, PriceSource::Live);
        assert_eq!(v.current_value, 0.0);
        assert_eq!(v.profit_loss, -50.0);
    }

    #[test]
    fn percent_is_zero_without_investment() {
        assert_eq!(percent_of(25.0, 0.0), 0.0);
        let free = holding("GIFT", 0.0, 100.0, Some(120.0));
        let o = overview(&[value_holding(&free, None)]);
        assert_eq!(o.profit_loss_percent, 0.0);

        let zero_cost = holding("GIFT", 10.0, 0.0, None);
        let o = overview(&[value_holding(&zero_cost, Some(5.0))]);
        assert_eq!(o.total_invested, 0.0);
        assert_eq!(o.profit_loss, 50.0);
        assert_eq!(o.profit_loss_percent, 0.0);
    }

    #[test]
    fn invested_sum_matches_quantity_times_price() {
        let holdings = vec![
            holding("AAPL", 3.0, 101.37, None),
            holding("GOOG", 7.5, 12.11, None),
            holding("MSFT", 0.25, 999.99, Some(1.0)),
        ];
        let valuations: Vec<_> = holdings.iter().map(|h| value_holding(h, None)).collect();
        let direct: f64 = holdings.iter().map(|h| h.quantity * h.buy_price).sum();
        let summed: f64 = valuations.iter().map(|v| v.invested_value).sum();
        assert_eq!(direct, summed);
    }

    #[test]
    fn overview_without_quotes_falls_back_to_cost() {
        let holdings = vec![
            holding("AAPL", 10.0, 150.0, None),
            holding("GOOG", 5.0, 100.0, None),
        ];
        let valuations: Vec<_> = holdings.iter().map(|h| value_holding(h, None)).collect();
        let o = overview(&valuations);
        assert_eq!(o.total_invested, 2000.0);
        assert_eq!(o.current_value, 2000.0);
        assert_eq!(o.profit_loss, 0.0);
        assert_eq!(o.profit_loss_percent, 0.0);
    }

    #[test]
    fn overview_of_nothing_is_all_zero() {
        let o = overview(&[] as &[HoldingValuation]);
        assert_eq!(
            o,
            PortfolioOverview {
                total_invested: 0.0,
                current_value: 0.0,
                profit_loss: 0.0,
                profit_loss_percent: 0.0,
            }
        );
    }

    #[test]
    fn overview_rounds_only_at_the_end() {
        // each row rounds to 0.00 profit, the total does not
        let holdings = vec![
            holding("A", 1.0, 1.0, Some(1.004)),
            holding("B", 1.0, 1.0, Some(1.004)),
        ];
        let valuations: Vec<_> = holdings.iter().map(|h| value_holding(h, None)).collect();
        assert_eq!(round2(valuations[0].profit_loss), 0.0);
        assert_eq!(overview(&valuations).profit_loss, 0.01);
    }

    #[test]
    fn holding_info_matches_scenario() {
        let h = holding("AAPL", 10.0, 150.0, None);
        let info = holding_info(&h, 165.0);
        assert_eq!(info.profit_loss, "150.00");
        assert_eq!(info.percent_change, "10.00");
        assert_eq!(info.current_price, 165.0);
    }

    #[test]
    fn holding_info_formats_losses() {
        let h = holding("AAPL", 3.0, 200.0, None);
        let info = holding_info(&h, 150.0);
        assert_eq!(info.profit_loss, "-150.00");
        assert_eq!(info.percent_change, "-25.00");
    }

    #[test]
    fn summary_is_cost_basis_only() {
        let holdings = vec![
            holding("AAPL", 10.0, 150.0, Some(999.0)),
            holding("AAPL", 2.0, 140.0, None),
        ];
        let s = summarize(&holdings);
        assert_eq!(s.total_stocks, 2);
        assert_eq!(s.total_quantity, 12.0);
        assert_eq!(s.total_invested, 1780.0);

        assert_eq!(
            summarize(&[]),
            PortfolioSummary {
                total_stocks: 0,
                total_quantity: 0.0,
                total_invested: 0.0,
            }
        );
    }

    #[test]
    fn negative_zero_is_normalised() {
        assert_eq!(format2(-0.001), "0.00");
        assert!(round2(-0.0001).is_sign_positive());
    }
}
