//! Simulated venue connector
//!
//! In-process venue used by the demo binary and the test harness: scripted
//! quotes, configurable latency and fees, and failure injection for both the
//! data and order paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use crate::errors::{ArbError, ArbResult};
use crate::types::{
    Balance, DataQuality, OrderBookLevel, OrderBookSnapshot, OrderRequest, OrderResult, OrderSide,
    UnifiedMarketData, VenueEvent, VenueHealth, VenueStatus,
};
use super::connector::VenueConnector;

#[derive(Debug, Clone)]
struct SimQuote {
    bid: Decimal,
    ask: Decimal,
    bid_depth: Decimal,
    ask_depth: Decimal,
    quality: DataQuality,
    last_update: DateTime<Utc>,
}

pub struct SimulatedVenue {
    name: String,
    latency: Duration,
    fee_percent: Decimal,
    fill_slippage_bps: u32,
    quotes: RwLock<HashMap<String, SimQuote>>,
    balances: RwLock<Vec<Balance>>,
    status: RwLock<VenueStatus>,
    reject_orders: AtomicBool,
    fail_orders: AtomicBool,
    fail_data: AtomicBool,
    events: broadcast::Sender<VenueEvent>,
}

impl SimulatedVenue {
    pub fn new(name: &str) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            name: name.to_string(),
            latency: Duration::from_millis(10),
            fee_percent: dec!(0.1),
            fill_slippage_bps: 0,
            quotes: RwLock::new(HashMap::new()),
            balances: RwLock::new(Vec::new()),
            status: RwLock::new(VenueStatus::Connecting),
            reject_orders: AtomicBool::new(false),
            fail_orders: AtomicBool::new(false),
            fail_data: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_fee_percent(mut self, fee_percent: Decimal) -> Self {
        self.fee_percent = fee_percent;
        self
    }

    pub fn with_fill_slippage_bps(mut self, bps: u32) -> Self {
        self.fill_slippage_bps = bps;
        self
    }

    pub fn with_quote(
        mut self,
        symbol: &str,
        bid: Decimal,
        ask: Decimal,
        bid_depth: Decimal,
        ask_depth: Decimal,
    ) -> Self {
        self.quotes.get_mut().insert(
            symbol.to_string(),
            SimQuote {
                bid,
                ask,
                bid_depth,
                ask_depth,
                quality: DataQuality::Realtime,
                last_update: Utc::now(),
            },
        );
        self
    }

    pub fn with_balance(mut self, asset: &str, total: Decimal, usd_value: Decimal) -> Self {
        self.balances.get_mut().push(Balance {
            asset: asset.to_string(),
            total,
            usd_value,
        });
        self
    }

    /// Replace a quote at runtime (shared-reference variant for live venues).
    pub async fn set_quote(
        &self,
        symbol: &str,
        bid: Decimal,
        ask: Decimal,
        bid_depth: Decimal,
        ask_depth: Decimal,
    ) {
        self.quotes.write().await.insert(
            symbol.to_string(),
            SimQuote {
                bid,
                ask,
                bid_depth,
                ask_depth,
                quality: DataQuality::Realtime,
                last_update: Utc::now(),
            },
        );
    }

    /// Exchange-side rejection: orders come back `success: false`.
    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Transport failure: orders come back as `Execution` errors.
    pub fn set_fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_data(&self, fail: bool) {
        self.fail_data.store(fail, Ordering::SeqCst);
    }

    pub async fn disconnect(&self) {
        *self.status.write().await = VenueStatus::Disconnected;
        let _ = self.events.send(VenueEvent::StatusChanged {
            venue_id: self.name.clone(),
            status: VenueStatus::Disconnected,
        });
    }

    fn slippage_factor(&self, side: OrderSide) -> Decimal {
        let bps = Decimal::from(self.fill_slippage_bps) / dec!(10000);
        match side {
            OrderSide::Buy => Decimal::ONE + bps,
            OrderSide::Sell => Decimal::ONE - bps,
        }
    }
}

#[async_trait]
impl VenueConnector for SimulatedVenue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> ArbResult<()> {
        *self.status.write().await = VenueStatus::Connected;
        let _ = self.events.send(VenueEvent::StatusChanged {
            venue_id: self.name.clone(),
            status: VenueStatus::Connected,
        });
        debug!("Simulated venue {} initialized", self.name);
        Ok(())
    }

    async fn cleanup(&self) -> ArbResult<()> {
        *self.status.write().await = VenueStatus::Disconnected;
        let _ = self.events.send(VenueEvent::StatusChanged {
            venue_id: self.name.clone(),
            status: VenueStatus::Disconnected,
        });
        Ok(())
    }

    async fn status(&self) -> VenueStatus {
        *self.status.read().await
    }

    async fn health(&self) -> VenueHealth {
        VenueHealth {
            status: *self.status.read().await,
            latency_ms: self.latency.as_millis() as u64,
            consecutive_errors: 0,
            last_heartbeat: Utc::now(),
        }
    }

    async fn market_data(&self, symbol: &str) -> ArbResult<UnifiedMarketData> {
        tokio::time::sleep(self.latency).await;

        if self.fail_data.load(Ordering::SeqCst) {
            return Err(ArbError::Data {
                venue_id: self.name.clone(),
                message: "simulated data outage".to_string(),
                source: None,
            });
        }

        let quotes = self.quotes.read().await;
        let quote = quotes.get(symbol).ok_or_else(|| ArbError::Data {
            venue_id: self.name.clone(),
            message: format!("no quote for {}", symbol),
            source: None,
        })?;

        Ok(UnifiedMarketData {
            venue_id: self.name.clone(),
            symbol: symbol.to_string(),
            bid: quote.bid,
            ask: quote.ask,
            bid_depth: quote.bid_depth,
            ask_depth: quote.ask_depth,
            spread: quote.ask - quote.bid,
            quality: quote.quality,
            last_update: quote.last_update,
        })
    }

    async fn order_book(&self, symbol: &str, _depth: usize) -> ArbResult<OrderBookSnapshot> {
        let data = self.market_data(symbol).await?;
        Ok(OrderBookSnapshot {
            venue_id: self.name.clone(),
            symbol: symbol.to_string(),
            bids: vec![OrderBookLevel {
                price: data.bid,
                quantity: data.bid_depth,
            }],
            asks: vec![OrderBookLevel {
                price: data.ask,
                quantity: data.ask_depth,
            }],
            last_update: data.last_update,
        })
    }

    async fn place_order(&self, order: &OrderRequest) -> ArbResult<OrderResult> {
        tokio::time::sleep(self.latency).await;

        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(ArbError::Execution {
                venue_id: self.name.clone(),
                message: "simulated transport failure".to_string(),
                source: None,
            });
        }

        if self.reject_orders.load(Ordering::SeqCst) {
            return Ok(OrderResult {
                success: false,
                order_id: None,
                execution_price: None,
                executed_quantity: None,
                fees: None,
                error: Some("simulated rejection: insufficient liquidity".to_string()),
            });
        }

        let quotes = self.quotes.read().await;
        let quote = quotes.get(&order.symbol).ok_or_else(|| ArbError::Execution {
            venue_id: self.name.clone(),
            message: format!("no market for {}", order.symbol),
            source: None,
        })?;

        let (touch, depth) = match order.side {
            OrderSide::Buy => (quote.ask, quote.ask_depth),
            OrderSide::Sell => (quote.bid, quote.bid_depth),
        };
        let execution_price = touch * self.slippage_factor(order.side);
        let executed_quantity = order.quantity.min(depth);
        let fees = execution_price * executed_quantity * self.fee_percent / Decimal::ONE_HUNDRED;
        let order_id = uuid::Uuid::new_v4().to_string();

        let _ = self.events.send(VenueEvent::OrderExecuted {
            venue_id: self.name.clone(),
            order_id: order_id.clone(),
        });

        Ok(OrderResult {
            success: true,
            order_id: Some(order_id),
            execution_price: Some(execution_price),
            executed_quantity: Some(executed_quantity),
            fees: Some(fees),
            error: None,
        })
    }

    async fn balances(&self) -> ArbResult<Vec<Balance>> {
        if self.fail_data.load(Ordering::SeqCst) {
            return Err(ArbError::Data {
                venue_id: self.name.clone(),
                message: "simulated data outage".to_string(),
                source: None,
            });
        }
        Ok(self.balances.read().await.clone())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<VenueEvent> {
        self.events.subscribe()
    }
}
