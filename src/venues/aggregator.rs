//! Cross-venue aggregation: market data, order books, routing, portfolio
//!
//! All fan-outs are settle-all: each venue's failure is reported as a
//! `DataError` event and never aborts the sibling requests.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use crate::config::ArbitrageConfig;
use crate::errors::{ArbError, ArbResult};
use crate::network::{RetryConfig, retry_with_backoff};
use crate::types::{
    ArbEvent, AssetAllocation, CrossVenuePortfolio, OrderBookSnapshot, OrderRequest, OrderResult,
    UnifiedMarketData, VenueExposure,
};
use super::connector::{VenueConfig, VenueConnector};
use super::registry::VenueRegistry;
use super::routing::{RoutingStrategy, select_venue};

const DATA_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
struct CachedSnapshot<T> {
    per_venue: HashMap<String, T>,
    fetched_at: DateTime<Utc>,
    stale: bool,
}

pub struct VenueAggregator {
    config: ArbitrageConfig,
    registry: Arc<VenueRegistry>,
    market_cache: RwLock<HashMap<String, CachedSnapshot<UnifiedMarketData>>>,
    book_cache: RwLock<HashMap<String, CachedSnapshot<OrderBookSnapshot>>>,
    portfolio_cache: RwLock<Option<CrossVenuePortfolio>>,
    events: broadcast::Sender<ArbEvent>,
}

impl VenueAggregator {
    pub fn new(config: ArbitrageConfig, events: broadcast::Sender<ArbEvent>) -> Self {
        let registry = Arc::new(VenueRegistry::new(config.max_venues, events.clone()));
        Self {
            config,
            registry,
            market_cache: RwLock::new(HashMap::new()),
            book_cache: RwLock::new(HashMap::new()),
            portfolio_cache: RwLock::new(None),
            events,
        }
    }

    pub fn registry(&self) -> &Arc<VenueRegistry> {
        &self.registry
    }

    pub async fn register(
        &self,
        venue_id: &str,
        connector: Arc<dyn VenueConnector>,
        config: VenueConfig,
    ) -> ArbResult<()> {
        self.registry.register(venue_id, connector, config).await
    }

    /// Unregister a venue and purge every cached entry that mentions it.
    pub async fn unregister(&self, venue_id: &str) -> ArbResult<()> {
        self.registry.unregister(venue_id).await?;
        self.purge_venue(venue_id).await;
        Ok(())
    }

    /// Concurrent market-data snapshot across all active venues. Only venues
    /// that answered appear in the result; the map is cached and reused
    /// within one poll interval.
    pub async fn aggregated_market_data(
        &self,
        symbol: &str,
    ) -> ArbResult<HashMap<String, UnifiedMarketData>> {
        if let Some(cached) = self.cached_market_data(symbol).await {
            return Ok(cached);
        }

        let connectors = self.registry.active_connectors().await;
        let fetches = connectors.into_iter().map(|(venue_id, connector)| {
            let symbol = symbol.to_string();
            async move {
                let result = retry_with_backoff(
                    || {
                        let connector = Arc::clone(&connector);
                        let symbol = symbol.clone();
                        let venue_id = venue_id.clone();
                        async move {
                            match tokio::time::timeout(
                                DATA_REQUEST_TIMEOUT,
                                connector.market_data(&symbol),
                            )
                            .await
                            {
                                Ok(result) => result,
                                Err(_) => Err(ArbError::Timeout {
                                    context: format!("market data {} from {}", symbol, venue_id),
                                    timeout_ms: DATA_REQUEST_TIMEOUT.as_millis() as u64,
                                }),
                            }
                        }
                    },
                    &RetryConfig::quick(),
                    "market data fetch",
                )
                .await;
                (venue_id, result)
            }
        });

        let mut per_venue = HashMap::new();
        for (venue_id, result) in join_all(fetches).await {
            match result {
                Ok(data) => {
                    per_venue.insert(venue_id, data);
                }
                Err(e) => self.report_data_error(&venue_id, Some(symbol), &e),
            }
        }

        self.market_cache.write().await.insert(
            symbol.to_string(),
            CachedSnapshot {
                per_venue: per_venue.clone(),
                fetched_at: Utc::now(),
                stale: false,
            },
        );

        debug!("Aggregated {} venue snapshots for {}", per_venue.len(), symbol);
        Ok(per_venue)
    }

    async fn cached_market_data(
        &self,
        symbol: &str,
    ) -> Option<HashMap<String, UnifiedMarketData>> {
        let cache = self.market_cache.read().await;
        let entry = cache.get(symbol)?;
        let age = Utc::now() - entry.fetched_at;
        if entry.stale
            || age >= chrono::Duration::milliseconds(self.config.price_update_interval_ms as i64)
        {
            return None;
        }
        Some(entry.per_venue.clone())
    }

    /// Same settle-all fan-out for order books.
    pub async fn aggregated_order_book(
        &self,
        symbol: &str,
        depth: usize,
    ) -> ArbResult<HashMap<String, OrderBookSnapshot>> {
        let connectors = self.registry.active_connectors().await;
        let fetches = connectors.into_iter().map(|(venue_id, connector)| {
            let symbol = symbol.to_string();
            async move {
                let result = tokio::time::timeout(
                    DATA_REQUEST_TIMEOUT,
                    connector.order_book(&symbol, depth),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(ArbError::Timeout {
                        context: format!("order book {} from {}", symbol, venue_id),
                        timeout_ms: DATA_REQUEST_TIMEOUT.as_millis() as u64,
                    })
                });
                (venue_id, result)
            }
        });

        let mut per_venue = HashMap::new();
        for (venue_id, result) in join_all(fetches).await {
            match result {
                Ok(book) => {
                    per_venue.insert(venue_id, book);
                }
                Err(e) => self.report_data_error(&venue_id, Some(symbol), &e),
            }
        }

        self.book_cache.write().await.insert(
            symbol.to_string(),
            CachedSnapshot {
                per_venue: per_venue.clone(),
                fetched_at: Utc::now(),
                stale: false,
            },
        );

        Ok(per_venue)
    }

    /// Route an order to a venue picked by `strategy` and forward it.
    /// Failures (transport, timeout, exchange rejection) come back as
    /// `Execution` errors tagged with the venue.
    pub async fn execute_order(
        &self,
        order: &OrderRequest,
        strategy: &RoutingStrategy,
    ) -> ArbResult<OrderResult> {
        let snapshots = self.aggregated_market_data(&order.symbol).await?;
        let active = self.registry.active_ids().await;
        let venue_id = select_venue(order, &snapshots, &active, strategy)?;
        let connector = self.registry.connector(&venue_id).await?;

        self.registry.adjust_open_connections(&venue_id, 1).await;
        let outcome = tokio::time::timeout(
            self.config.execution_timeout(),
            connector.place_order(order),
        )
        .await;
        self.registry.adjust_open_connections(&venue_id, -1).await;

        let result = match outcome {
            Ok(result) => result?,
            Err(_) => {
                return Err(ArbError::Timeout {
                    context: format!("order on {}", venue_id),
                    timeout_ms: self.config.execution_timeout_ms,
                });
            }
        };

        if result.success {
            Ok(result)
        } else {
            Err(ArbError::Execution {
                venue_id,
                message: result
                    .error
                    .unwrap_or_else(|| "order rejected by venue".to_string()),
                source: None,
            })
        }
    }

    /// Aggregate balances across all active venues, with a TTL cache.
    pub async fn cross_venue_portfolio(
        &self,
        force_refresh: bool,
    ) -> ArbResult<CrossVenuePortfolio> {
        if !force_refresh {
            let cache = self.portfolio_cache.read().await;
            if let Some(portfolio) = cache.as_ref() {
                let age = Utc::now() - portfolio.updated_at;
                if age < chrono::Duration::milliseconds(self.config.portfolio_cache_ttl_ms as i64)
                {
                    return Ok(portfolio.clone());
                }
            }
        }

        let connectors = self.registry.active_connectors().await;
        let fetches = connectors.into_iter().map(|(venue_id, connector)| async move {
            let result = tokio::time::timeout(DATA_REQUEST_TIMEOUT, connector.balances())
                .await
                .unwrap_or_else(|_| {
                    Err(ArbError::Timeout {
                        context: format!("balances from {}", venue_id),
                        timeout_ms: DATA_REQUEST_TIMEOUT.as_millis() as u64,
                    })
                });
            (venue_id, result)
        });

        let mut by_asset: HashMap<String, (Decimal, Decimal)> = HashMap::new();
        let mut by_venue: HashMap<String, Decimal> = HashMap::new();
        for (venue_id, result) in join_all(fetches).await {
            match result {
                Ok(balances) => {
                    for balance in balances {
                        let entry = by_asset
                            .entry(balance.asset.clone())
                            .or_insert((Decimal::ZERO, Decimal::ZERO));
                        entry.0 += balance.total;
                        entry.1 += balance.usd_value;
                        *by_venue.entry(venue_id.clone()).or_insert(Decimal::ZERO) +=
                            balance.usd_value;
                    }
                }
                Err(e) => self.report_data_error(&venue_id, None, &e),
            }
        }

        let total_value: Decimal = by_asset.values().map(|(_, usd)| *usd).sum();
        let pct = |usd: Decimal| {
            if total_value.is_zero() {
                Decimal::ZERO
            } else {
                usd / total_value * Decimal::ONE_HUNDRED
            }
        };

        let mut assets: Vec<AssetAllocation> = by_asset
            .into_iter()
            .map(|(asset, (total, usd_value))| AssetAllocation {
                asset,
                total,
                usd_value,
                allocation_percent: pct(usd_value),
            })
            .collect();
        assets.sort_by(|a, b| b.usd_value.cmp(&a.usd_value));

        let mut venues: Vec<VenueExposure> = by_venue
            .into_iter()
            .map(|(venue_id, usd_value)| VenueExposure {
                venue_id,
                usd_value,
                share_percent: pct(usd_value),
            })
            .collect();
        venues.sort_by(|a, b| b.usd_value.cmp(&a.usd_value));

        let portfolio = CrossVenuePortfolio {
            total_value,
            concentration_risk: assets
                .first()
                .map(|a| a.allocation_percent)
                .unwrap_or(Decimal::ZERO),
            venue_risk: venues
                .first()
                .map(|v| v.share_percent)
                .unwrap_or(Decimal::ZERO),
            assets,
            venues,
            updated_at: Utc::now(),
        };

        *self.portfolio_cache.write().await = Some(portfolio.clone());
        Ok(portfolio)
    }

    /// Tag cache entries older than `3 x poll interval` as stale. Returns the
    /// number of entries newly tagged, so repeated runs converge to zero.
    pub async fn mark_stale_entries(&self) -> usize {
        let cutoff = Utc::now() - self.config.stale_after();
        let mut marked = 0;

        let mut market = self.market_cache.write().await;
        for entry in market.values_mut() {
            if !entry.stale && entry.fetched_at < cutoff {
                entry.stale = true;
                marked += 1;
            }
        }
        drop(market);

        let mut books = self.book_cache.write().await;
        for entry in books.values_mut() {
            if !entry.stale && entry.fetched_at < cutoff {
                entry.stale = true;
                marked += 1;
            }
        }

        marked
    }

    /// Drop all cached data belonging to one venue.
    pub async fn purge_venue(&self, venue_id: &str) {
        let mut market = self.market_cache.write().await;
        for entry in market.values_mut() {
            entry.per_venue.remove(venue_id);
        }
        drop(market);

        let mut books = self.book_cache.write().await;
        for entry in books.values_mut() {
            entry.per_venue.remove(venue_id);
        }
        drop(books);

        *self.portfolio_cache.write().await = None;
    }

    pub async fn clear_caches(&self) {
        self.market_cache.write().await.clear();
        self.book_cache.write().await.clear();
        *self.portfolio_cache.write().await = None;
    }

    fn report_data_error(&self, venue_id: &str, symbol: Option<&str>, error: &ArbError) {
        warn!("Data request failed for venue {}: {}", venue_id, error);
        let _ = self.events.send(ArbEvent::DataError {
            venue_id: venue_id.to_string(),
            symbol: symbol.map(|s| s.to_string()),
            message: error.to_string(),
        });
    }
}
