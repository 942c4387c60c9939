// src/quotes.rs
//! Market data access. Provider payloads are normalised here into
//! [`Quote`] and [`SymbolMatch`]; nothing above this module sees raw
//! Alpha Vantage field names.

use crate::error::{Error, Result};
use crate::models::{Quote, SymbolMatch};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

#[async_trait]
pub trait QuoteGateway: Send + Sync {
    /// Latest price for `symbol`.
    ///
    /// `QuoteUnavailable` when the provider answered without a usable price,
    /// `Provider` when it could not be reached or refused the call.
    async fn get_quote(&self, symbol: &str) -> Result<Quote>;

    /// Ranked matches for a free-text query. No matches is an empty list.
    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>>;
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "bestMatches")]
    best_matches: Option<Vec<SearchMatch>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: Option<String>,
    #[serde(rename = "2. name")]
    name: Option<String>,
    #[serde(rename = "3. type")]
    security_type: Option<String>,
    #[serde(rename = "4. region")]
    region: Option<String>,
    #[serde(rename = "8. currency")]
    currency: Option<String>,
    #[serde(rename = "9. matchScore")]
    match_score: Option<String>,
}

pub struct AlphaVantageGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageGateway {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!("Quote client build failed, falling back to defaults without timeout: {}", e);
            Client::new()
        });

        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = Url::parse_with_params(&self.base_url, &all_params)
            .map_err(|e| Error::Provider(format!("failed to build URL: {}", e)))?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Provider("rate limited".to_string()));
        }
        if !status.is_success() {
            return Err(Error::Provider(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| self.transport_error(e))
    }

    /// reqwest errors embed the request URL, which carries the API key.
    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            return Error::Provider("request timed out".to_string());
        }
        let message = e.without_url().to_string().replace(&self.api_key, "***");
        Error::Provider(message)
    }
}

#[async_trait]
impl QuoteGateway for AlphaVantageGateway {
    async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let body = self
            .fetch(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        parse_global_quote(symbol, &body)
    }

    async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let body = self
            .fetch(&[("function", "SYMBOL_SEARCH"), ("keywords", query)])
            .await?;
        parse_symbol_search(&body)
    }
}

/// Rate-limit notices arrive as 200 responses with a `Note` or
/// `Information` field and no data.
fn check_notice(note: &Option<String>, information: &Option<String>) -> Result<()> {
    for msg in [note, information].into_iter().flatten() {
        if msg.contains("call frequency") || msg.contains("rate limit") {
            return Err(Error::Provider("rate limited".to_string()));
        }
        warn!("Alpha Vantage notice: {}", msg);
    }
    Ok(())
}

pub fn parse_global_quote(symbol: &str, body: &str) -> Result<Quote> {
    let unavailable = || Error::QuoteUnavailable(symbol.to_string());

    let response: GlobalQuoteResponse = serde_json::from_str(body).map_err(|e| {
        warn!("Undecodable quote payload for {}: {}", symbol, e);
        unavailable()
    })?;

    if let Some(msg) = &response.error_message {
        warn!("Alpha Vantage error for {}: {}", symbol, msg);
        return Err(unavailable());
    }
    check_notice(&response.note, &response.information)?;

    let quote = response.global_quote.ok_or_else(unavailable)?;
    let price = quote
        .price
        .as_deref()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(unavailable)?;

    Ok(Quote {
        symbol: quote
            .symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| symbol.to_string()),
        price,
    })
}

pub fn parse_symbol_search(body: &str) -> Result<Vec<SymbolMatch>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("undecodable search payload: {}", e)))?;

    if let Some(msg) = response.error_message {
        return Err(Error::Provider(msg));
    }
    check_notice(&response.note, &response.information)?;

    // a notice without any match list means the call was refused
    let best_matches = match response.best_matches {
        Some(matches) => matches,
        None => match response.information.or(response.note) {
            Some(msg) => return Err(Error::Provider(msg)),
            None => Vec::new(),
        },
    };

    Ok(best_matches
        .into_iter()
        .filter_map(|m| {
            let symbol = m.symbol.filter(|s| !s.is_empty())?;
            Some(SymbolMatch {
                symbol,
                name: m.name.unwrap_or_default(),
                region: m.region.unwrap_or_default(),
                security_type: m.security_type,
                currency: m.currency,
                match_score: m.match_score,
            })
        })
        .collect())
}
