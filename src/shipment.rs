use anyhow::Result;

use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::{Gateway, Transport, UploadFile, resource_path};
use crate::models::{
    Category, CheckoutPayData, CreateShipmentRequest, PayerInfo, Quote, QuoteSearchParams,
    QuotesPayload, Shipment, TenantPaymentMethod, TrackingData, UpdateShipmentRequest,
    UploadProofData,
};
use crate::theme::{ThemeConfigData, ThemeVersion};

/// Typed wrappers around every shipping API endpoint the portal uses.
pub struct ShipmentClient {
    gateway: Gateway,
}

impl ShipmentClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            gateway: Gateway::new(config)?,
        })
    }

    pub fn with_transport(config: &Config, transport: Box<dyn Transport>) -> Self {
        Self {
            gateway: Gateway::with_transport(config, transport),
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>, GatewayError> {
        Ok(self.gateway.get::<Vec<Category>>("/categories/").await?.data)
    }

    pub async fn fetch_quotes(&self, request: &QuoteSearchParams) -> Result<Vec<Quote>, GatewayError> {
        let payload = self.gateway.post::<_, QuotesPayload>("/quotes/", request).await?;
        Ok(payload.data.into_rates())
    }

    pub async fn create_shipment(
        &self,
        request: &CreateShipmentRequest,
    ) -> Result<Shipment, GatewayError> {
        Ok(self.gateway.post::<_, Shipment>("/shipments/", request).await?.data)
    }

    pub async fn get_shipment(&self, shipment_id: &str) -> Result<Shipment, GatewayError> {
        Ok(self
            .gateway
            .get::<Shipment>(&resource_path(&["shipments", shipment_id])?)
            .await?
            .data)
    }

    pub async fn update_shipment(
        &self,
        shipment_id: &str,
        request: &UpdateShipmentRequest,
    ) -> Result<Shipment, GatewayError> {
        Ok(self
            .gateway
            .patch::<_, Shipment>(&resource_path(&["shipments", shipment_id])?, request)
            .await?
            .data)
    }

    pub async fn get_payment_methods(&self) -> Result<Vec<TenantPaymentMethod>, GatewayError> {
        Ok(self.gateway.get::<Vec<TenantPaymentMethod>>("/payment-methods/tenant/").await?.data)
    }

    pub async fn initiate_payment(
        &self,
        payment_id: &str,
        payer: &PayerInfo,
    ) -> Result<CheckoutPayData, GatewayError> {
        Ok(self
            .gateway
            .post::<_, CheckoutPayData>(&resource_path(&["checkouts", payment_id, "pay"])?, payer)
            .await?
            .data)
    }

    pub async fn upload_payment_proof(
        &self,
        transaction_id: &str,
        file: UploadFile,
    ) -> Result<UploadProofData, GatewayError> {
        Ok(self
            .gateway
            .upload::<UploadProofData>(
                &resource_path(&["transactions", transaction_id, "upload-proof"])?,
                file,
            )
            .await?
            .data)
    }

    pub async fn track_shipment(&self, code: &str) -> Result<TrackingData, GatewayError> {
        Ok(self
            .gateway
            .get::<TrackingData>(&resource_path(&["shipments", code, "track"])?)
            .await?
            .data)
    }

    pub async fn get_theme_version(&self) -> Result<ThemeVersion, GatewayError> {
        Ok(self.gateway.get::<ThemeVersion>("/theme-config/version/").await?.data)
    }

    pub async fn get_theme_config(&self) -> Result<ThemeConfigData, GatewayError> {
        Ok(self.gateway.get::<ThemeConfigData>("/theme-config/").await?.data)
    }
}
