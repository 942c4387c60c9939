// src/service.rs
use crate::db::HoldingStore;
use crate::error::{Error, Result};
use crate::models::{
    normalize_symbol, BreakdownEntry, CreateHoldingRequest, Holding, HoldingInfo, HoldingUpdate,
    NewHolding, OwnerId, PortfolioOverview, PortfolioSummary, Quote, SymbolMatch,
};
use crate::quotes::QuoteGateway;
use crate::valuation::{self, HoldingValuation};
use futures::future::join_all;
use log::{info, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Live prices keyed by symbol; a failed lookup keeps its error.
type LivePrices = HashMap<String, Result<f64>>;

/// Entry point for every portfolio operation. Inputs are validated and the
/// caller's identity applied here, before the store or gateway is touched.
pub struct PortfolioService {
    store: Arc<dyn HoldingStore>,
    quotes: Arc<dyn QuoteGateway>,
    live_valuation: bool,
}

impl PortfolioService {
    pub fn new(
        store: Arc<dyn HoldingStore>,
        quotes: Arc<dyn QuoteGateway>,
        live_valuation: bool,
    ) -> Self {
        Self {
            store,
            quotes,
            live_valuation,
        }
    }

    pub async fn add_holding(&self, owner: &OwnerId, req: CreateHoldingRequest) -> Result<Holding> {
        let new = NewHolding::try_from(req)?;
        self.store.create(owner, new).await
    }

    pub async fn list_holdings(&self, owner: &OwnerId) -> Result<Vec<Holding>> {
        self.store.list_by_owner(owner).await
    }

    pub async fn update_holding(
        &self,
        owner: &OwnerId,
        id: &str,
        changes: HoldingUpdate,
    ) -> Result<Holding> {
        changes.validate()?;
        self.store.update(owner, id, changes).await
    }

    pub async fn delete_holding(&self, owner: &OwnerId, id: &str) -> Result<()> {
        self.store.delete(owner, id).await
    }

    pub async fn summary(&self, owner: &OwnerId) -> Result<PortfolioSummary> {
        let holdings = self.store.list_by_owner(owner).await?;
        Ok(valuation::summarize(&holdings))
    }

    pub async fn overview(&self, owner: &OwnerId) -> Result<PortfolioOverview> {
        let holdings = self.store.list_by_owner(owner).await?;
        let live = self.live_prices(owner, &holdings).await;
        let valuations: Vec<HoldingValuation> = holdings
            .iter()
            .map(|h| valuation::value_holding(h, live_price(&live, &h.symbol)))
            .collect();
        Ok(valuation::overview(&valuations))
    }

    /// One row per holding; lots of the same symbol are never merged.
    pub async fn breakdown(&self, owner: &OwnerId) -> Result<Vec<BreakdownEntry>> {
        let holdings = self.store.list_by_owner(owner).await?;
        let live = self.live_prices(owner, &holdings).await;
        Ok(holdings
            .iter()
            .map(|h| {
                let quote_error = match live.get(&h.symbol) {
                    Some(Err(e)) => Some(e.kind().to_string()),
                    _ => None,
                };
                let v = valuation::value_holding(h, live_price(&live, &h.symbol));
                valuation::breakdown_entry(h, &v, quote_error)
            })
            .collect())
    }

    /// Live comparison for one held symbol. Quote failures propagate.
    pub async fn holding_info(&self, owner: &OwnerId, symbol: &str) -> Result<HoldingInfo> {
        let symbol = normalize_symbol(Some(symbol))?;
        let holding = self
            .store
            .find_by_symbol(owner, &symbol)
            .await?
            .ok_or_else(|| Error::NotInPortfolio(symbol.clone()))?;

        let quote = self.quotes.get_quote(&symbol).await?;
        self.remember_price(owner, &symbol, quote.price).await;
        Ok(valuation::holding_info(&holding, quote.price))
    }

    pub async fn live_price(&self, symbol: Option<&str>) -> Result<Quote> {
        let symbol = normalize_symbol(symbol)?;
        self.quotes.get_quote(&symbol).await
    }

    pub async fn search_symbols(&self, query: Option<&str>) -> Result<Vec<SymbolMatch>> {
        let query = query.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return Err(Error::Validation("search query is required".to_string()));
        }
        self.quotes.search_symbols(query).await
    }

    /// Fetches one quote per distinct symbol when live valuation is enabled.
    async fn live_prices(&self, owner: &OwnerId, holdings: &[Holding]) -> LivePrices {
        if !self.live_valuation || holdings.is_empty() {
            return HashMap::new();
        }

        let symbols: BTreeSet<&str> = holdings.iter().map(|h| h.symbol.as_str()).collect();
        let fetches = symbols.into_iter().map(|symbol| async move {
            let price = self.quotes.get_quote(symbol).await.map(|q| q.price);
            (symbol.to_string(), price)
        });
        let results: LivePrices = join_all(fetches).await.into_iter().collect();

        for (symbol, result) in &results {
            match result {
                Ok(price) => self.remember_price(owner, symbol, *price).await,
                Err(e) => warn!("Live quote for {} failed, using fallback: {}", symbol, e),
            }
        }
        results
    }

    /// Stores an observed price as the holding's fallback. Failure only logs.
    async fn remember_price(&self, owner: &OwnerId, symbol: &str, price: f64) {
        match self.store.record_last_known_price(owner, symbol, price).await {
            Ok(n) => info!("Recorded last known price {} for {} on {} holdings", price, symbol, n),
            Err(e) => warn!("Failed to record last known price for {}: {}", symbol, e),
        }
    }
}

fn live_price(live: &LivePrices, symbol: &str) -> Option<f64> {
    live.get(symbol).and_then(|r| r.as_ref().ok().copied())
}
