//! Order-to-carrier synchronization engine
//!
//! The SyncEngine is responsible for:
//! - Requesting tracking codes for single orders and batches
//! - Refreshing carrier status onto the tracking record
//! - Moving host orders through the status state machine
//! - Reconciling held orders against the carrier
//!
//! ## Architecture
//!
//! ```text
//!   handlers / daemon
//!          │
//!          ▼
//!   ┌──────────────┐   build    ┌─────────────┐
//!   │  SyncEngine  │──────────▶ │   payload   │
//!   └──────────────┘            └─────────────┘
//!          │
//!    ┌─────┼──────────────────┬─────────────────┐
//!    ▼     ▼                  ▼                 ▼
//! Carrier  TrackingStore   OrderRepository   Events
//! ```
//!
//! Credentials are never stored on the engine: every operation receives the
//! caller's [`CarrierCredentials`] and asks the [`CarrierFactory`] for a
//! client.

mod event;

pub use event::{BulkOutcome, CodeOutcome, ReconcileReport, StatusOutcome, SyncEvent};

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::{CarrierCredentials, EngineConfig};
use crate::error::{Error, Result};
use crate::order::{OrderId, OrderSnapshot};
use crate::payload::{self, FieldPolicy};
use crate::sanitize;
use crate::status::{self, OrderStatus, Transition};
use crate::tracking::{META_ADMIN_VALIDATION, TrackingRecord, TrackingStore, TrackingUpdate};
use crate::traits::{Carrier, CarrierFactory, MetaStore, OrderRepository, ResponseKey};

/// Message returned when the carrier answers without a tracking code
pub const NO_TRACKING_CODE: &str = "Could not retrieve tracking code from API";

/// Core synchronization engine
///
/// Cheap to share behind an `Arc`; holds no per-order state of its own.
pub struct SyncEngine {
    orders: Arc<dyn OrderRepository>,
    meta: Arc<dyn MetaStore>,
    tracking: TrackingStore,
    carriers: Arc<dyn CarrierFactory>,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        meta: Arc<dyn MetaStore>,
        carriers: Arc<dyn CarrierFactory>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            tracking: TrackingStore::new(Arc::clone(&meta)),
            orders,
            meta,
            carriers,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Tracking record store used by the engine
    pub fn tracking(&self) -> &TrackingStore {
        &self.tracking
    }

    /// Request a tracking code for one order
    ///
    /// On success the code and link are stored, the status is refreshed
    /// (a refresh failure is logged, not returned) and an order awaiting
    /// admin validation is put on hold. Nothing is written when the carrier
    /// call fails or returns no code.
    pub async fn request_code(
        &self,
        creds: &CarrierCredentials,
        order_id: &OrderId,
        designation: &str,
    ) -> Result<CodeOutcome> {
        let order = self.load_order(order_id).await?;
        let carrier = self.carriers.create(creds)?;

        let request = payload::build(&order, designation, FieldPolicy::OnDemand);
        let response = carrier.request_tracking_code(&request).await?;

        let code = response.code(ResponseKey::TrackingCode);
        if code.is_empty() {
            warn!(order = %order_id, "Carrier returned no tracking code");
            return Err(Error::api(NO_TRACKING_CODE));
        }

        self.store_code(order_id, &code, &response.link()).await?;

        let status = match self.refresh_with(carrier.as_ref(), order_id).await {
            Ok(outcome) => outcome.status,
            Err(e) => {
                warn!(order = %order_id, "Status refresh after code request failed: {}", e);
                self.tracking.get(order_id).await?.status
            }
        };

        if let Some(t) = status::after_shipment(&order.status, false) {
            self.apply_transition(&order, t).await?;
        }

        Ok(CodeOutcome {
            tracking_code: sanitize::text_field(&code),
            status,
        })
    }

    /// Fetch and store the carrier status of one order
    pub async fn refresh_status(
        &self,
        creds: &CarrierCredentials,
        order_id: &OrderId,
    ) -> Result<StatusOutcome> {
        let carrier = self.carriers.create(creds)?;
        self.refresh_with(carrier.as_ref(), order_id).await
    }

    /// Ship a batch of orders, one after another
    ///
    /// Duplicate ids are collapsed. A failing order never aborts the batch;
    /// its id is reported in [`BulkOutcome::failed_ids`].
    pub async fn bulk_ship(
        &self,
        creds: &CarrierCredentials,
        order_ids: &[OrderId],
        designation: &str,
    ) -> Result<BulkOutcome> {
        if order_ids.is_empty() {
            return Err(Error::validation("No orders selected."));
        }

        let mut seen = HashSet::new();
        let ids: Vec<&OrderId> = order_ids.iter().filter(|id| seen.insert(*id)).collect();

        let carrier = self.carriers.create(creds)?;
        let designation = creds.designation_or_default(designation);
        let mut outcome = BulkOutcome::default();

        info!("Bulk shipping {} orders via {}", ids.len(), carrier.carrier_name());

        for id in ids {
            match self
                .ship_one(carrier.as_ref(), id, designation, FieldPolicy::Bulk, true)
                .await
            {
                Ok(code) => {
                    debug!(order = %id, code = %code, "Order shipped");
                    outcome.succeeded += 1;
                }
                Err(e) => {
                    warn!(order = %id, "Order not shipped: {}", e);
                    self.emit_event(SyncEvent::ShipmentFailed {
                        order_id: id.clone(),
                        error: e.to_string(),
                    });
                    outcome.failed_ids.push(id.clone());
                }
            }
        }

        info!(
            "Bulk ship finished: {} succeeded, {} failed",
            outcome.succeeded,
            outcome.failed_ids.len()
        );
        Ok(outcome)
    }

    /// Refresh every held order and complete the delivered ones
    ///
    /// Does nothing when any credential field is empty. Per-order failures
    /// are logged and counted; the pass always runs to the end.
    pub async fn reconcile_held_orders(&self, creds: &CarrierCredentials) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        if !creds.is_complete() {
            debug!("Carrier not configured, skipping reconciliation");
            return Ok(report);
        }

        let carrier = self.carriers.create(creds)?;
        let held = self.orders.list_by_status(&OrderStatus::held()).await?;
        debug!("Reconciling {} held orders", held.len());

        for id in held {
            report.checked += 1;
            match self.reconcile_one(carrier.as_ref(), &id).await {
                Ok(ReconcileStep::Skipped) => report.skipped += 1,
                Ok(ReconcileStep::Refreshed) => report.refreshed += 1,
                Ok(ReconcileStep::Completed) => {
                    report.refreshed += 1;
                    report.completed += 1;
                }
                Err(e) => {
                    error!(order = %id, "Reconciliation failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Reconciliation finished: {} checked, {} completed, {} failed",
            report.checked, report.completed, report.failed
        );
        self.emit_event(SyncEvent::ReconcileFinished { report });
        Ok(report)
    }

    /// Store a code typed in by staff and refresh its status
    ///
    /// An empty code (after sanitising) is ignored.
    pub async fn assign_tracking_code(
        &self,
        creds: &CarrierCredentials,
        order_id: &OrderId,
        code: &str,
    ) -> Result<()> {
        let code = sanitize::text_field(code);
        if code.is_empty() {
            return Ok(());
        }
        self.load_order(order_id).await?;

        self.tracking
            .set(
                order_id,
                TrackingUpdate {
                    tracking_code: Some(code.clone()),
                    ..TrackingUpdate::default()
                },
            )
            .await?;
        self.emit_event(SyncEvent::CodeAssigned {
            order_id: order_id.clone(),
            tracking_code: code,
        });

        if creds.is_complete() {
            if let Err(e) = self.refresh_status(creds, order_id).await {
                warn!(order = %order_id, "Status refresh after manual code failed: {}", e);
            }
        }
        Ok(())
    }

    /// React to a host status change
    ///
    /// An order entering `processing` without a tracking code gets one
    /// requested automatically. Returns the new code, if any.
    pub async fn on_status_changed(
        &self,
        creds: &CarrierCredentials,
        order_id: &OrderId,
        new_status: &OrderStatus,
    ) -> Result<Option<String>> {
        if new_status != &OrderStatus::Processing {
            return Ok(None);
        }
        if !creds.is_complete() {
            debug!(order = %order_id, "Carrier not configured, no automatic request");
            return Ok(None);
        }
        if self.tracking.get(order_id).await?.has_code() {
            return Ok(None);
        }

        let carrier = self.carriers.create(creds)?;
        let shipped = self
            .ship_one(carrier.as_ref(), order_id, &creds.designation, FieldPolicy::OnDemand, false)
            .await;
        match shipped {
            Ok(code) => Ok(Some(code)),
            Err(e) => {
                self.emit_event(SyncEvent::ShipmentFailed {
                    order_id: order_id.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Park a processing order until an admin validates it
    ///
    /// Runs once per order; returns whether the order was moved.
    pub async fn apply_admin_gate(&self, order_id: &OrderId) -> Result<bool> {
        let order = self.load_order(order_id).await?;
        let validated = self
            .meta
            .get_meta(order_id, META_ADMIN_VALIDATION)
            .await?
            .is_some_and(|v| v == "1");

        let Some(t) = status::admin_gate(&order.status, validated) else {
            return Ok(false);
        };

        self.meta.set_meta(order_id, META_ADMIN_VALIDATION, "1").await?;
        self.apply_transition(&order, t).await?;
        Ok(true)
    }

    /// Current tracking record of an order
    pub async fn tracking_record(&self, order_id: &OrderId) -> Result<TrackingRecord> {
        self.tracking.get(order_id).await
    }

    async fn load_order(&self, order_id: &OrderId) -> Result<OrderSnapshot> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("order {}", order_id)))
    }

    /// Ship one order reading the code from `status_message`, returning the
    /// stored code
    async fn ship_one(
        &self,
        carrier: &dyn Carrier,
        order_id: &OrderId,
        designation: &str,
        policy: FieldPolicy,
        hold: bool,
    ) -> Result<String> {
        let order = self.load_order(order_id).await?;

        let request = payload::build(&order, designation, policy);
        let response = carrier.request_tracking_code(&request).await?;

        let code = response.code(ResponseKey::StatusMessage);
        if code.is_empty() {
            return Err(Error::api(NO_TRACKING_CODE));
        }

        self.store_code(order_id, &code, &response.link()).await?;

        if let Err(e) = self.refresh_with(carrier, order_id).await {
            warn!(order = %order_id, "Status refresh after shipment failed: {}", e);
        }

        if let Some(t) = status::after_shipment(&order.status, hold) {
            self.apply_transition(&order, t).await?;
        }

        Ok(sanitize::text_field(&code))
    }

    async fn store_code(&self, order_id: &OrderId, code: &str, link: &str) -> Result<()> {
        self.tracking
            .set(order_id, TrackingUpdate::shipment(code, link))
            .await?;
        info!(order = %order_id, "Tracking code stored");
        self.emit_event(SyncEvent::CodeAssigned {
            order_id: order_id.clone(),
            tracking_code: sanitize::text_field(code),
        });
        Ok(())
    }

    async fn refresh_with(&self, carrier: &dyn Carrier, order_id: &OrderId) -> Result<StatusOutcome> {
        let record = self.tracking.get(order_id).await?;
        if !record.has_code() {
            return Err(Error::not_ready(format!(
                "order {} has no tracking code",
                order_id
            )));
        }

        let response = carrier.get_tracking_status(&record.tracking_code).await?;
        if response.is_empty() {
            return Err(Error::api("Empty response from carrier API."));
        }

        let label = sanitize::text_field(&response.etat());
        let now = chrono::Utc::now().timestamp();
        self.tracking
            .set(
                order_id,
                TrackingUpdate::status(label.clone(), response.details().cloned(), now),
            )
            .await?;

        debug!(order = %order_id, status = %label, "Carrier status stored");
        self.emit_event(SyncEvent::StatusRefreshed {
            order_id: order_id.clone(),
            status: label.clone(),
        });

        Ok(StatusOutcome {
            status: label,
            updated_at: now,
        })
    }

    async fn reconcile_one(&self, carrier: &dyn Carrier, order_id: &OrderId) -> Result<ReconcileStep> {
        if !self.tracking.get(order_id).await?.has_code() {
            debug!(order = %order_id, "Held order has no tracking code, skipping");
            return Ok(ReconcileStep::Skipped);
        }

        let outcome = self.refresh_with(carrier, order_id).await?;

        let order = self.load_order(order_id).await?;
        match status::after_refresh(&order.status, &outcome.status) {
            Some(t) => {
                self.apply_transition(&order, t).await?;
                Ok(ReconcileStep::Completed)
            }
            None => Ok(ReconcileStep::Refreshed),
        }
    }

    async fn apply_transition(&self, order: &OrderSnapshot, t: Transition) -> Result<()> {
        self.orders
            .update_status(&order.id, t.to.clone(), t.note)
            .await?;
        info!(order = %order.id, "Order {} -> {}", order.status, t.to);
        self.emit_event(SyncEvent::OrderTransitioned {
            order_id: order.id.clone(),
            from: order.status.clone(),
            to: t.to,
        });
        Ok(())
    }

    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping sync event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding sync event");
            }
        }
    }
}

enum ReconcileStep {
    Skipped,
    Refreshed,
    Completed,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish_non_exhaustive()
    }
}
