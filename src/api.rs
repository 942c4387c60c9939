// src/api.rs
use crate::auth::with_owner;
use crate::error::{handle_rejection, Error};
use crate::models::{CreateHoldingRequest, HoldingUpdate, OwnerId};
use crate::service::PortfolioService;
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceParams {
    symbol: Option<String>,
}

pub fn routes(
    service: Arc<PortfolioService>,
    jwt_secret: Arc<String>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let owner = with_owner(jwt_secret);

    let health = warp::path::end()
        .and(warp::get())
        .map(|| "API is running");

    let search = warp::path!("api" / "stocks" / "search")
        .and(warp::get())
        .and(warp::query::<SearchParams>())
        .and(with_service(service.clone()))
        .and_then(search_handler);

    let price = warp::path!("api" / "stocks" / "price")
        .and(warp::get())
        .and(warp::query::<PriceParams>())
        .and(with_service(service.clone()))
        .and_then(price_handler);

    let create = warp::path!("api" / "stocks")
        .and(warp::post())
        .and(owner.clone())
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(create_handler);

    let list = warp::path!("api" / "stocks")
        .and(warp::get())
        .and(owner.clone())
        .and(with_service(service.clone()))
        .and_then(list_handler);

    let update = warp::path!("api" / "stocks" / String)
        .and(warp::put())
        .and(owner.clone())
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(update_handler);

    let delete = warp::path!("api" / "stocks" / String)
        .and(warp::delete())
        .and(owner.clone())
        .and(with_service(service.clone()))
        .and_then(delete_handler);

    let summary = warp::path!("api" / "stocks" / "summary")
        .and(warp::get())
        .and(owner.clone())
        .and(with_service(service.clone()))
        .and_then(summary_handler);

    let overview = warp::path!("api" / "stocks" / "portfolio" / "overview")
        .and(warp::get())
        .and(owner.clone())
        .and(with_service(service.clone()))
        .and_then(overview_handler);

    let breakdown = warp::path!("api" / "stocks" / "portfolio" / "breakdown")
        .and(warp::get())
        .and(owner.clone())
        .and(with_service(service.clone()))
        .and_then(breakdown_handler);

    // after overview and breakdown, which it would otherwise shadow
    let info = warp::path!("api" / "stocks" / "portfolio" / String)
        .and(warp::get())
        .and(owner)
        .and(with_service(service))
        .and_then(holding_info_handler);

    health
        .or(search)
        .or(price)
        .or(create)
        .or(list)
        .or(update)
        .or(delete)
        .or(summary)
        .or(overview)
        .or(breakdown)
        .or(info)
        .recover(handle_rejection)
}

fn with_service(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = (Arc<PortfolioService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// Logs the failure at a level matching its class and rejects with it.
fn reject(action: &str, e: Error) -> Rejection {
    if e.is_quote_failure() || matches!(e, Error::Internal(_)) {
        error!("Failed to {}: {}", action, e);
    } else {
        warn!("Failed to {}: {}", action, e);
    }
    warp::reject::custom(e)
}

async fn search_handler(
    params: SearchParams,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.search_symbols(params.q.as_deref()).await {
        Ok(matches) => {
            info!("Symbol search returned {} matches.", matches.len());
            Ok(warp::reply::json(&matches))
        }
        Err(e) => Err(reject("search symbols", e)),
    }
}

async fn price_handler(
    params: PriceParams,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.live_price(params.symbol.as_deref()).await {
        Ok(quote) => {
            info!("Live price for {} retrieved.", quote.symbol);
            Ok(warp::reply::json(&quote))
        }
        Err(e) => Err(reject("fetch live price", e)),
    }
}

async fn create_handler(
    owner: OwnerId,
    req: CreateHoldingRequest,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.add_holding(&owner, req).await {
        Ok(holding) => {
            info!("Stock {} added for {}.", holding.symbol, owner);
            Ok(warp::reply::with_status(
                warp::reply::json(&holding),
                StatusCode::CREATED,
            ))
        }
        Err(e) => Err(reject("add stock", e)),
    }
}

async fn list_handler(
    owner: OwnerId,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.list_holdings(&owner).await {
        Ok(holdings) => {
            info!("Stocks retrieved successfully.");
            Ok(warp::reply::json(&holdings))
        }
        Err(e) => Err(reject("retrieve stocks", e)),
    }
}

async fn update_handler(
    id: String,
    owner: OwnerId,
    changes: HoldingUpdate,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.update_holding(&owner, &id, changes).await {
        Ok(holding) => {
            info!("Stock {} updated successfully.", id);
            Ok(warp::reply::json(&holding))
        }
        Err(e) => Err(reject("update stock", e)),
    }
}

async fn delete_handler(
    id: String,
    owner: OwnerId,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.delete_holding(&owner, &id).await {
        Ok(()) => {
            info!("Stock {} deleted successfully.", id);
            Ok(warp::reply::json(
                &json!({"message": "Stock deleted successfully"}),
            ))
        }
        Err(e) => Err(reject("delete stock", e)),
    }
}

async fn summary_handler(
    owner: OwnerId,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.summary(&owner).await {
        Ok(summary) => Ok(warp::reply::json(&summary)),
        Err(e) => Err(reject("compute summary", e)),
    }
}

async fn overview_handler(
    owner: OwnerId,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.overview(&owner).await {
        Ok(overview) => Ok(warp::reply::json(&overview)),
        Err(e) => Err(reject("compute portfolio overview", e)),
    }
}

async fn breakdown_handler(
    owner: OwnerId,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.breakdown(&owner).await {
        Ok(rows) => Ok(warp::reply::json(&rows)),
        Err(e) => Err(reject("compute portfolio breakdown", e)),
    }
}

async fn holding_info_handler(
    symbol: String,
    owner: OwnerId,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.holding_info(&owner, &symbol).await {
        Ok(info) => Ok(warp::reply::json(&info)),
        Err(e) => Err(reject("fetch stock info", e)),
    }
}
