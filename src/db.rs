// src/db.rs
use crate::error::{db_error, Error, Result};
use crate::models::{Holding, HoldingUpdate, NewHolding, OwnerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use scylla::frame::response::result::{CqlValue, Row};
use scylla::{query::Query, Session, SessionBuilder};
use uuid::Uuid;

/// Durable holdings, always addressed through the owner's identity.
#[async_trait]
pub trait HoldingStore: Send + Sync {
    async fn create(&self, owner: &OwnerId, new: NewHolding) -> Result<Holding>;

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Holding>>;

    async fn find_by_id(&self, owner: &OwnerId, id: &str) -> Result<Option<Holding>>;

    /// Fails with `NotFound` unless `id` belongs to `owner`.
    async fn update(&self, owner: &OwnerId, id: &str, changes: HoldingUpdate) -> Result<Holding>;

    /// Fails with `NotFound` unless `id` belongs to `owner`.
    async fn delete(&self, owner: &OwnerId, id: &str) -> Result<()>;

    /// Stores `price` as the last observed price on every holding of
    /// `symbol` owned by `owner`. Returns the number of holdings touched.
    async fn record_last_known_price(
        &self,
        owner: &OwnerId,
        symbol: &str,
        price: f64,
    ) -> Result<usize>;

    /// The earliest-created holding of `symbol`, if any.
    async fn find_by_symbol(&self, owner: &OwnerId, symbol: &str) -> Result<Option<Holding>> {
        let holdings = self.list_by_owner(owner).await?;
        Ok(holdings
            .into_iter()
            .filter(|h| h.symbol == symbol)
            .min_by_key(|h| h.created_at))
    }
}

pub fn not_found(id: &str) -> Error {
    Error::NotFound(format!("Stock {} not found", id))
}

const SELECT_COLUMNS: &str = "id, symbol, quantity, buy_price, last_known_price, created_at";

pub struct ScyllaHoldingStore {
    session: Session,
}

impl ScyllaHoldingStore {
    /// Connects to `node` and creates the keyspace and table if missing.
    pub async fn init(node: &str) -> Result<Self> {
        let session = SessionBuilder::new()
            .known_node(node)
            .build()
            .await
            .map_err(db_error)?;

        session.query("CREATE KEYSPACE IF NOT EXISTS stock_tracker WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await.map_err(db_error)?;
        session.query("CREATE TABLE IF NOT EXISTS stock_tracker.holdings (owner_id TEXT, id TEXT, symbol TEXT, quantity DOUBLE, buy_price DOUBLE, last_known_price DOUBLE, created_at BIGINT, PRIMARY KEY (owner_id, id))", &[]).await.map_err(db_error)?;

        info!("Successfully connected to ScyllaDB.");
        Ok(ScyllaHoldingStore { session })
    }

    async fn select(&self, owner: &OwnerId, id: Option<&str>) -> Result<Vec<Holding>> {
        let rows = match id {
            Some(id) => {
                let query = Query::new(format!(
                    "SELECT {} FROM stock_tracker.holdings WHERE owner_id = ? AND id = ?",
                    SELECT_COLUMNS
                ));
                self.session.query(query, (owner.as_str(), id)).await
            }
            None => {
                let query = Query::new(format!(
                    "SELECT {} FROM stock_tracker.holdings WHERE owner_id = ?",
                    SELECT_COLUMNS
                ));
                self.session.query(query, (owner.as_str(),)).await
            }
        }
        .map_err(db_error)?
        .rows
        .unwrap_or_default();

        Ok(holdings_from_rows(owner, rows))
    }

    async fn write_amounts(&self, holding: &Holding) -> Result<()> {
        // IF EXISTS keeps a concurrent delete from being resurrected as a partial row
        let query = Query::new(
            "UPDATE stock_tracker.holdings SET quantity = ?, buy_price = ? WHERE owner_id = ? AND id = ? IF EXISTS",
        );
        let result = self
            .session
            .query(
                query,
                (
                    holding.quantity,
                    holding.buy_price,
                    holding.owner_id.as_str(),
                    holding.id.as_str(),
                ),
            )
            .await
            .map_err(db_error)?;
        if !was_applied(result.rows) {
            return Err(not_found(&holding.id));
        }
        Ok(())
    }
}

#[async_trait]
impl HoldingStore for ScyllaHoldingStore {
    async fn create(&self, owner: &OwnerId, new: NewHolding) -> Result<Holding> {
        // stored as BIGINT millis, so truncate now to read back identical values
        let created_at =
            DateTime::<Utc>::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap_or_default();
        let holding = Holding {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.as_str().to_string(),
            symbol: new.symbol.to_uppercase(),
            quantity: new.quantity,
            buy_price: new.buy_price,
            last_known_price: None,
            created_at,
        };

        let query = Query::new(
            "INSERT INTO stock_tracker.holdings (owner_id, id, symbol, quantity, buy_price, last_known_price, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        );
        self.session
            .query(
                query,
                (
                    holding.owner_id.as_str(),
                    holding.id.as_str(),
                    holding.symbol.as_str(),
                    holding.quantity,
                    holding.buy_price,
                    holding.last_known_price,
                    holding.created_at.timestamp_millis(),
                ),
            )
            .await
            .map_err(db_error)?;
        Ok(holding)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Holding>> {
        let holdings = self.select(owner, None).await?;
        info!("Fetched {} holdings for owner: {}", holdings.len(), owner);
        Ok(holdings)
    }

    async fn find_by_id(&self, owner: &OwnerId, id: &str) -> Result<Option<Holding>> {
        Ok(self.select(owner, Some(id)).await?.into_iter().next())
    }

    async fn update(&self, owner: &OwnerId, id: &str, changes: HoldingUpdate) -> Result<Holding> {
        // CQL UPDATE upserts, so the ownership check must read first
        let mut holding = self
            .find_by_id(owner, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        changes.apply(&mut holding);
        self.write_amounts(&holding).await?;
        Ok(holding)
    }

    async fn delete(&self, owner: &OwnerId, id: &str) -> Result<()> {
        if self.find_by_id(owner, id).await?.is_none() {
            return Err(not_found(id));
        }
        let query = Query::new("DELETE FROM stock_tracker.holdings WHERE owner_id = ? AND id = ?");
        self.session
            .query(query, (owner.as_str(), id))
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn record_last_known_price(
        &self,
        owner: &OwnerId,
        symbol: &str,
        price: f64,
    ) -> Result<usize> {
        let query = Query::new(
            "UPDATE stock_tracker.holdings SET last_known_price = ? WHERE owner_id = ? AND id = ? IF EXISTS",
        );
        let mut touched = 0;
        for holding in self.select(owner, None).await? {
            if holding.symbol != symbol {
                continue;
            }
            let result = self
                .session
                .query(query.clone(), (price, owner.as_str(), holding.id.as_str()))
                .await
                .map_err(db_error)?;
            if was_applied(result.rows) {
                touched += 1;
            }
        }
        Ok(touched)
    }
}

/// Rows that cannot be read back as a holding are logged and left out.
fn holdings_from_rows(owner: &OwnerId, rows: Vec<Row>) -> Vec<Holding> {
    rows.into_iter()
        .filter_map(|row| match row_to_holding(owner, row) {
            Ok(holding) => Some(holding),
            Err(e) => {
                error!("Skipping holdings row for owner {}: {}", owner, e);
                None
            }
        })
        .collect()
}

/// Conditional writes answer with an `[applied]` column first.
fn was_applied(rows: Option<Vec<Row>>) -> bool {
    let first = rows
        .and_then(|rows| rows.into_iter().next())
        .and_then(|row| row.columns.into_iter().next().flatten());
    !matches!(first, Some(CqlValue::Boolean(false)))
}

fn row_to_holding(owner: &OwnerId, row: Row) -> Result<Holding> {
    let columns = &row.columns;
    if columns.len() < 6 {
        error!("Short holdings row: {} columns", columns.len());
        return Err(Error::Internal("malformed holdings row".to_string()));
    }

    let created_millis = columns[5]
        .as_ref()
        .and_then(CqlValue::as_bigint)
        .ok_or_else(|| missing_column("created_at"))?;

    Ok(Holding {
        id: text_column(&columns[0], "id")?,
        owner_id: owner.as_str().to_string(),
        symbol: text_column(&columns[1], "symbol")?,
        quantity: double_column(&columns[2], "quantity")?,
        buy_price: double_column(&columns[3], "buy_price")?,
        last_known_price: columns[4].as_ref().and_then(CqlValue::as_double),
        created_at: DateTime::<Utc>::from_timestamp_millis(created_millis).unwrap_or_default(),
    })
}

fn text_column(column: &Option<CqlValue>, name: &str) -> Result<String> {
    column
        .as_ref()
        .and_then(CqlValue::as_text)
        .map(|s| s.to_string())
        .ok_or_else(|| missing_column(name))
}

fn double_column(column: &Option<CqlValue>, name: &str) -> Result<f64> {
    column
        .as_ref()
        .and_then(CqlValue::as_double)
        .ok_or_else(|| missing_column(name))
}

fn missing_column(name: &str) -> Error {
    error!("Missing data in holdings row: {}", name);
    Error::Internal(format!("holdings row missing {}", name))
}
