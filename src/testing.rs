// src/testing.rs
use crate::error::{Error, Result};
use crate::models::{Quote, SymbolMatch};
use crate::quotes::QuoteGateway;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Quote gateway answering from a fixed script. Unscripted symbols are
/// reported as unavailable.
#[derive(Default)]
pub struct ScriptedQuotes {
    answers: HashMap<String, Result<f64>>,
    matches: Vec<SymbolMatch>,
    calls: AtomicUsize,
}

impl ScriptedQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(mut self, symbol: &str, price: f64) -> Self {
        self.answers.insert(symbol.to_string(), Ok(price));
        self
    }

    pub fn unavailable(mut self, symbol: &str) -> Self {
        self.answers.insert(
            symbol.to_string(),
            Err(Error::QuoteUnavailable(symbol.to_string())),
        );
        self
    }

    pub fn provider_down(mut self, symbol: &str) -> Self {
        self.answers.insert(
            symbol.to_string(),
            Err(Error::Provider("connection refused".to_string())),
        );
        self
    }

    pub fn matches(mut self, matches: Vec<SymbolMatch>) -> Self {
        self.matches = matches;
        self
    }

    /// Number of `get_quote` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteGateway for ScriptedQuotes {
    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(symbol) {
            Some(Ok(price)) => Ok(Quote {
                symbol: symbol.to_string(),
                price: *price,
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(Error::QuoteUnavailable(symbol.to_string())),
        }
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let needle = query.to_uppercase();
        Ok(self
            .matches
            .iter()
            .filter(|m| m.symbol.contains(&needle) || m.name.to_uppercase().contains(&needle))
            .cloned()
            .collect())
    }
}
