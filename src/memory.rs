// src/memory.rs
use crate::db::{not_found, HoldingStore};
use crate::error::{Error, Result};
use crate::models::{Holding, HoldingUpdate, NewHolding, OwnerId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Holding store kept in process memory, keyed by owner.
#[derive(Default)]
pub struct MemoryHoldingStore {
    holdings: RwLock<HashMap<OwnerId, Vec<Holding>>>,
}

impl MemoryHoldingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<OwnerId, Vec<Holding>>>> {
        self.holdings
            .read()
            .map_err(|_| Error::Internal("holdings lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<OwnerId, Vec<Holding>>>> {
        self.holdings
            .write()
            .map_err(|_| Error::Internal("holdings lock poisoned".to_string()))
    }
}

#[async_trait]
impl HoldingStore for MemoryHoldingStore {
    async fn create(&self, owner: &OwnerId, new: NewHolding) -> Result<Holding> {
        let holding = Holding {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.as_str().to_string(),
            symbol: new.symbol.to_uppercase(),
            quantity: new.quantity,
            buy_price: new.buy_price,
            last_known_price: None,
            created_at: Utc::now(),
        };
        self.write()?
            .entry(owner.clone())
            .or_default()
            .push(holding.clone());
        Ok(holding)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Holding>> {
        Ok(self.read()?.get(owner).cloned().unwrap_or_default())
    }

    async fn find_by_id(&self, owner: &OwnerId, id: &str) -> Result<Option<Holding>> {
        Ok(self
            .read()?
            .get(owner)
            .and_then(|hs| hs.iter().find(|h| h.id == id))
            .cloned())
    }

    async fn update(&self, owner: &OwnerId, id: &str, changes: HoldingUpdate) -> Result<Holding> {
        let mut guard = self.write()?;
        let holding = guard
            .get_mut(owner)
            .and_then(|hs| hs.iter_mut().find(|h| h.id == id))
            .ok_or_else(|| not_found(id))?;
        changes.apply(holding);
        Ok(holding.clone())
    }

    async fn delete(&self, owner: &OwnerId, id: &str) -> Result<()> {
        let mut guard = self.write()?;
        let holdings = guard.get_mut(owner).ok_or_else(|| not_found(id))?;
        let before = holdings.len();
        holdings.retain(|h| h.id != id);
        if holdings.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn record_last_known_price(
        &self,
        owner: &OwnerId,
        symbol: &str,
        price: f64,
    ) -> Result<usize> {
        let mut guard = self.write()?;
        let mut touched = 0;
        if let Some(holdings) = guard.get_mut(owner) {
            for holding in holdings.iter_mut().filter(|h| h.symbol == symbol) {
                holding.last_known_price = Some(price);
                touched += 1;
            }
        }
        Ok(touched)
    }
}
