//! Venue registry: connector lifecycle, health tracking, event re-publishing

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use crate::errors::{ArbError, ArbResult};
use crate::types::{ArbEvent, ConnectionPoolSummary, VenueSlots, VenueStatus};
use super::connector::{VenueConfig, VenueConnector};

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One registered venue. Created on registration, destroyed on
/// unregistration after connector teardown completes.
pub struct VenueRegistration {
    pub venue_id: String,
    pub connector: Arc<dyn VenueConnector>,
    pub config: VenueConfig,
    pub last_health_check: DateTime<Utc>,
    pub active: bool,
    pub open_connections: u32,
    forwarder: JoinHandle<()>,
}

pub struct VenueRegistry {
    max_venues: usize,
    venues: RwLock<HashMap<String, VenueRegistration>>,
    pool_summary: RwLock<ConnectionPoolSummary>,
    events: broadcast::Sender<ArbEvent>,
}

impl VenueRegistry {
    pub fn new(max_venues: usize, events: broadcast::Sender<ArbEvent>) -> Self {
        Self {
            max_venues,
            venues: RwLock::new(HashMap::new()),
            pool_summary: RwLock::new(ConnectionPoolSummary::default()),
            events,
        }
    }

    /// Initialize a connector and store its registration. The connector's
    /// health/error/order notifications are re-published on the engine's
    /// event stream until the venue is unregistered.
    pub async fn register(
        &self,
        venue_id: &str,
        connector: Arc<dyn VenueConnector>,
        config: VenueConfig,
    ) -> ArbResult<()> {
        {
            let venues = self.venues.read().await;
            if venues.len() >= self.max_venues {
                return Err(ArbError::Capacity {
                    reason: format!("registry is at max_venues ({})", self.max_venues),
                });
            }
            if venues.contains_key(venue_id) {
                return Err(ArbError::Duplicate {
                    venue_id: venue_id.to_string(),
                });
            }
        }

        connector.initialize().await?;

        let forwarder = self.spawn_event_forwarder(venue_id, connector.as_ref());

        {
            let mut venues = self.venues.write().await;
            // Re-check: another registration may have landed while the
            // connector was initializing.
            if venues.contains_key(venue_id) {
                forwarder.abort();
                let _ = connector.cleanup().await;
                return Err(ArbError::Duplicate {
                    venue_id: venue_id.to_string(),
                });
            }
            venues.insert(
                venue_id.to_string(),
                VenueRegistration {
                    venue_id: venue_id.to_string(),
                    connector,
                    config,
                    last_health_check: Utc::now(),
                    active: true,
                    open_connections: 0,
                    forwarder,
                },
            );
        }

        self.refresh_pool_summary().await;
        let _ = self.events.send(ArbEvent::VenueRegistered {
            venue_id: venue_id.to_string(),
        });
        info!("Registered venue {}", venue_id);
        Ok(())
    }

    /// Tear down the connector and drop the registration.
    pub async fn unregister(&self, venue_id: &str) -> ArbResult<()> {
        let registration = {
            let mut venues = self.venues.write().await;
            venues.remove(venue_id).ok_or_else(|| ArbError::NotFound {
                venue_id: venue_id.to_string(),
            })?
        };

        registration.forwarder.abort();
        if let Err(e) = registration.connector.cleanup().await {
            warn!("Cleanup for venue {} failed: {}", venue_id, e);
        }

        self.refresh_pool_summary().await;
        let _ = self.events.send(ArbEvent::VenueUnregistered {
            venue_id: venue_id.to_string(),
        });
        info!("Unregistered venue {}", venue_id);
        Ok(())
    }

    fn spawn_event_forwarder(
        &self,
        venue_id: &str,
        connector: &dyn VenueConnector,
    ) -> JoinHandle<()> {
        let mut rx = connector.subscribe_events();
        let events = self.events.clone();
        let venue_id = venue_id.to_string();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let _ = events.send(ArbEvent::Venue(event));
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Event forwarder for {} lagged, missed {}", venue_id, missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Venues that currently participate in aggregation and detection.
    pub async fn active_connectors(&self) -> Vec<(String, Arc<dyn VenueConnector>)> {
        self.venues
            .read()
            .await
            .values()
            .filter(|r| r.active)
            .map(|r| (r.venue_id.clone(), Arc::clone(&r.connector)))
            .collect()
    }

    pub async fn active_ids(&self) -> Vec<String> {
        self.venues
            .read()
            .await
            .values()
            .filter(|r| r.active)
            .map(|r| r.venue_id.clone())
            .collect()
    }

    pub async fn connector(&self, venue_id: &str) -> ArbResult<Arc<dyn VenueConnector>> {
        let venues = self.venues.read().await;
        venues
            .get(venue_id)
            .filter(|r| r.active)
            .map(|r| Arc::clone(&r.connector))
            .ok_or_else(|| ArbError::NotFound {
                venue_id: venue_id.to_string(),
            })
    }

    pub async fn venue_config(&self, venue_id: &str) -> Option<VenueConfig> {
        self.venues
            .read()
            .await
            .get(venue_id)
            .map(|r| r.config.clone())
    }

    pub async fn len(&self) -> usize {
        self.venues.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.venues.read().await.is_empty()
    }

    pub async fn adjust_open_connections(&self, venue_id: &str, delta: i32) {
        let mut venues = self.venues.write().await;
        if let Some(r) = venues.get_mut(venue_id) {
            r.open_connections = r.open_connections.saturating_add_signed(delta);
        }
        drop(venues);
        self.refresh_pool_summary().await;
    }

    /// Poll each registration's health, stamp `last_health_check`, and flip
    /// `active` on connect/disconnect transitions.
    pub async fn run_health_checks(&self) {
        let connectors: Vec<(String, Arc<dyn VenueConnector>)> = {
            self.venues
                .read()
                .await
                .values()
                .map(|r| (r.venue_id.clone(), Arc::clone(&r.connector)))
                .collect()
        };

        for (venue_id, connector) in connectors {
            let health = tokio::time::timeout(HEALTH_PROBE_TIMEOUT, connector.health()).await;
            let connected = match &health {
                Ok(h) => h.status == VenueStatus::Connected,
                Err(_) => false,
            };

            let flipped = {
                let mut venues = self.venues.write().await;
                match venues.get_mut(&venue_id) {
                    Some(r) => {
                        r.last_health_check = Utc::now();
                        let flipped = r.active != connected;
                        r.active = connected;
                        flipped
                    }
                    // Unregistered while the probe was in flight.
                    None => continue,
                }
            };

            if flipped {
                if connected {
                    info!("Venue {} is healthy again", venue_id);
                } else {
                    warn!("Venue {} reported disconnected, removing from rotation", venue_id);
                }
                let _ = self.events.send(ArbEvent::VenueHealthChanged {
                    venue_id: venue_id.clone(),
                    healthy: connected,
                });
            }
        }

        self.refresh_pool_summary().await;
    }

    pub async fn pool_summary(&self) -> ConnectionPoolSummary {
        self.pool_summary.read().await.clone()
    }

    async fn refresh_pool_summary(&self) {
        let summary = {
            let venues = self.venues.read().await;
            let total_venues = venues.len();
            let healthy_venues = venues.values().filter(|r| r.active).count();
            let per_venue = venues
                .values()
                .map(|r| {
                    (
                        r.venue_id.clone(),
                        VenueSlots {
                            active: r.open_connections,
                            available: r.config.max_connections.saturating_sub(r.open_connections),
                        },
                    )
                })
                .collect();
            ConnectionPoolSummary {
                per_venue,
                total_venues,
                healthy_venues,
                health_ratio: if total_venues == 0 {
                    1.0
                } else {
                    healthy_venues as f64 / total_venues as f64
                },
            }
        };
        *self.pool_summary.write().await = summary;
    }

    /// Drop every registration without connector teardown; shutdown path.
    pub async fn clear(&self) {
        let mut venues = self.venues.write().await;
        for (_, registration) in venues.drain() {
            registration.forwarder.abort();
        }
        drop(venues);
        self.refresh_pool_summary().await;
    }
}
