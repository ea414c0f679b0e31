//! Wire types exchanged with the shipping API.
//!
//! These are transient DTOs. The portal owns no authoritative state beyond its local drafts,
//! so everything here mirrors what the service sends or expects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapped around every API response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub status: EnvelopeStatus,
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

/// Item category used to classify shipment contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_tag: String,
    #[serde(default)]
    pub hs_code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Envelope,
    #[default]
    Box,
    Pallet,
    Tube,
    Pak,
    Other,
}

impl PackageType {
    /// Weight (kg) suggested when the package type is picked.
    pub fn default_weight(self) -> Option<f64> {
        match self {
            PackageType::Envelope => Some(0.2),
            PackageType::Box => Some(1.0),
            PackageType::Pallet => Some(10.0),
            PackageType::Tube => Some(0.5),
            PackageType::Pak => Some(0.3),
            PackageType::Other => None,
        }
    }
}

/// Route endpoint as sent in a quote request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// A line item as the quote and shipment endpoints expect it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub category_id: String,
    pub category_name: String,
    #[serde(default)]
    pub category_description: String,
    #[serde(default)]
    pub category_hs_code: String,
    #[serde(default)]
    pub category_group_tag: String,
    pub description: String,
    pub package_type: PackageType,
    pub quantity: u32,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub declared_value: f64,
}

/// The exact payload posted to `/quotes/`. Cached next to the results so later steps can
/// reproduce the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSearchParams {
    pub origin: Location,
    pub destination: Location,
    pub items: Vec<QuoteItem>,
    pub currency: String,
    pub is_insured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationType {
    Fixed,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub calculation_type: CalculationType,
    #[serde(default)]
    pub rate: Option<f64>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
}

/// A priced, time-limited offer from one carrier service. Never re-priced locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: String,
    pub carrier_code: String,
    pub carrier_name: String,
    pub service_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub service_name: String,
    pub base_rate: f64,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    #[serde(default)]
    pub discounts: Vec<Discount>,
    pub total_amount: f64,
    pub currency: String,
    #[serde(default)]
    pub estimated_delivery_date: Option<String>,
    pub estimated_days: u32,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub carrier_logo_url: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl Quote {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn total_fees(&self) -> f64 {
        self.adjustments.iter().map(|a| a.amount).sum()
    }

    pub fn total_discounts(&self) -> f64 {
        self.discounts.iter().map(|d| d.amount).sum()
    }
}

/// Route endpoint echoed back by the quote service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoedLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Richer `/quotes/` payload echoing the search context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSearchResult {
    #[serde(default)]
    pub origin: Option<EchoedLocation>,
    #[serde(default)]
    pub destination: Option<EchoedLocation>,
    #[serde(default)]
    pub items: Vec<QuoteItem>,
    #[serde(default)]
    pub is_insured: Option<bool>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub preferred_service_type: Option<String>,
    pub rates: Vec<Quote>,
}

/// `/quotes/` answers with either a bare list or the richer search result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuotesPayload {
    Rates(Vec<Quote>),
    Search(QuoteSearchResult),
}

impl QuotesPayload {
    pub fn into_rates(self) -> Vec<Quote> {
        match self {
            QuotesPayload::Rates(rates) => rates,
            QuotesPayload::Search(result) => result.rates,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub address_line_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupType {
    #[default]
    ScheduledPickup,
    DropOff,
}

/// Payload for `POST /shipments/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateShipmentRequest {
    pub quote_id: String,
    pub channel_code: String,
    pub is_insured: bool,
    pub save_origin_address: bool,
    pub save_destination_address: bool,
    pub items: Vec<QuoteItem>,
    pub origin_address: Address,
    pub destination_address: Address,
    pub pickup_type: PickupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_scheduled_at: Option<NaiveDate>,
    pub customer_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Drafted,
    Processing,
    InTransit,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Item as stored on a created shipment (partial, only fields we need)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentItem {
    #[serde(default)]
    pub id: Option<String>,
    pub category_id: String,
    #[serde(default)]
    pub category_name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub package_type: Option<PackageType>,
    pub quantity: u32,
    pub weight: f64,
    pub declared_value: f64,
}

/// Server-created booking (partial, only fields we need)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub code: String,
    #[serde(default)]
    pub awb_no: Option<String>,
    #[serde(default)]
    pub status: ShipmentStatus,
    #[serde(default)]
    pub pickup_type: Option<PickupType>,
    #[serde(default)]
    pub carrier_name: String,
    #[serde(default)]
    pub service_type: String,
    pub final_price: f64,
    pub currency: String,
    pub origin_address: Address,
    pub destination_address: Address,
    #[serde(default)]
    pub estimated_delivery_date: Option<String>,
    #[serde(default)]
    pub is_insured: bool,
    #[serde(default)]
    pub channel_code: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub selected_payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub items: Vec<ShipmentItem>,
    #[serde(default)]
    pub customer_notes: Option<String>,
}

/// Payload for `PATCH /shipments/{id}/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateShipmentRequest {
    pub selected_payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_primary: bool,
}

/// A payment method as configured for the tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantPaymentMethod {
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub is_enabled: bool,
    #[serde(default)]
    pub provider_code: String,
    #[serde(default)]
    pub provider_name: String,
    pub payment_method: PaymentMethod,
}

/// Payload for `POST /checkouts/{paymentId}/pay/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayerInfo {
    pub payer_name: String,
    pub payer_email: String,
    pub payer_phone: String,
}

/// Bank account a transfer has to be sent to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualAccount {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    #[serde(default)]
    pub routing_number: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Provider transaction details (partial, only fields we need)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<String>,
    #[serde(default)]
    pub provider_reference: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub open_url: Option<String>,
    #[serde(default)]
    pub virtual_account: Option<VirtualAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPayData {
    pub transaction_id: String,
    pub transaction_data: TransactionData,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadProofData {
    pub transaction_id: String,
    pub proof_url: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: String,
    pub event_time: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_description: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_state: Option<String>,
    #[serde(default)]
    pub location_country: Option<String>,
    #[serde(default)]
    pub location_description: Option<String>,
    #[serde(default)]
    pub is_exception: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub description: String,
    pub quantity: u32,
    pub weight: f64,
}

/// Shipment summary shown on the tracking page (partial, only fields we need)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentDetails {
    pub origin_city: String,
    pub origin_state: String,
    pub origin_country: String,
    pub destination_city: String,
    pub destination_state: String,
    pub destination_country: String,
    pub carrier_name: String,
    #[serde(default)]
    pub carrier_code: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub total_weight: f64,
    #[serde(default)]
    pub weight_unit: String,
    #[serde(default)]
    pub package_count: u32,
    pub current_status: String,
    #[serde(default)]
    pub estimated_delivery_date: Option<String>,
    #[serde(default)]
    pub actual_delivery_date: Option<String>,
    #[serde(default)]
    pub items: Vec<TrackedItem>,
    #[serde(default)]
    pub is_insured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusStep {
    pub status: String,
    pub label: String,
    pub completed: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusProgression {
    pub current_step: u32,
    pub total_steps: u32,
    #[serde(default)]
    pub steps: Vec<StatusStep>,
}

/// `GET /shipments/{code}/track/` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingData {
    pub shipment_code: String,
    #[serde(default)]
    pub awb_number: Option<String>,
    pub shipment: ShipmentDetails,
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
    #[serde(default)]
    pub total: u32,
    pub status_progression: StatusProgression,
}
