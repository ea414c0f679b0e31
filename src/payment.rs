//! Payment step state machine.
//!
//! ```text
//! load ──► Reviewing ──proceed──► AwaitingProof ──upload──► Completed
//!                          └────► Redirecting (flow ends here)
//! ```
//!
//! A failed transition leaves the caller on the state it started from.

use std::time::Duration;
use tracing::{debug, info};

use crate::error::{FileValidationError, GatewayError, PortalError};
use crate::gateway::UploadFile;
use crate::models::{
    CheckoutPayData, PayerInfo, Shipment, TenantPaymentMethod, UpdateShipmentRequest,
    VirtualAccount,
};
use crate::shipment::ShipmentClient;
use crate::validation;

/// Delay before the front end moves on to the success page.
pub const SUCCESS_REDIRECT_DELAY: Duration = Duration::from_secs(2);

pub fn success_path(shipment_code: &str) -> String {
    format!("/shipment/{}/success", shipment_code)
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentStep {
    Reviewing(PaymentReview),
    AwaitingProof(ProofUpload),
    /// The provider page takes over; completion is confirmed out of band
    Redirecting { url: String },
    Completed(PaymentReceipt),
}

impl PaymentStep {
    pub async fn load(client: &ShipmentClient, shipment_id: &str) -> Result<Self, PortalError> {
        Ok(PaymentStep::Reviewing(PaymentReview::load(client, shipment_id).await?))
    }
}

/// How the provider wants to be paid, decided by the initiation response.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentInstruction {
    BankTransfer {
        transaction_id: String,
        account: VirtualAccount,
    },
    Redirect {
        transaction_id: String,
        url: String,
    },
}

impl TryFrom<CheckoutPayData> for PaymentInstruction {
    type Error = GatewayError;

    fn try_from(data: CheckoutPayData) -> Result<Self, Self::Error> {
        let CheckoutPayData {
            transaction_id,
            transaction_data,
            ..
        } = data;

        if let Some(account) = transaction_data.virtual_account {
            return Ok(PaymentInstruction::BankTransfer {
                transaction_id,
                account,
            });
        }

        match transaction_data.open_url.filter(|url| !url.is_empty()) {
            Some(url) => Ok(PaymentInstruction::Redirect {
                transaction_id,
                url,
            }),
            None => Err(GatewayError::InvalidResponse {
                reason: "payment initiation returned neither bank details nor a redirect URL"
                    .to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayerEdit {
    Name(String),
    Email(String),
    Phone(String),
    /// Tenant payment method id
    Method(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReview {
    pub shipment: Shipment,
    /// Enabled methods only
    pub methods: Vec<TenantPaymentMethod>,
    pub payer: PayerInfo,
    pub selected_method: Option<String>,
}

impl PaymentReview {
    /// Fetches the shipment and the payment methods concurrently.
    pub async fn load(client: &ShipmentClient, shipment_id: &str) -> Result<Self, PortalError> {
        let (shipment, methods) =
            tokio::try_join!(client.get_shipment(shipment_id), client.get_payment_methods())?;

        Ok(Self::new(shipment, methods))
    }

    pub fn new(shipment: Shipment, methods: Vec<TenantPaymentMethod>) -> Self {
        let methods: Vec<TenantPaymentMethod> =
            methods.into_iter().filter(|m| m.is_enabled).collect();

        let selected_method = match methods.as_slice() {
            [only] => Some(only.id.clone()),
            _ => None,
        };

        let origin = &shipment.origin_address;
        let payer = PayerInfo {
            payer_name: origin.name.clone(),
            payer_email: origin.email.clone(),
            payer_phone: origin.phone.clone(),
        };

        debug!(
            shipment_id = %shipment.id,
            methods = methods.len(),
            auto_selected = selected_method.is_some(),
            "payment review loaded"
        );

        Self {
            shipment,
            methods,
            payer,
            selected_method,
        }
    }

    pub fn apply(mut self, edit: PayerEdit) -> Self {
        match edit {
            PayerEdit::Name(value) => self.payer.payer_name = value,
            PayerEdit::Email(value) => self.payer.payer_email = value,
            PayerEdit::Phone(value) => self.payer.payer_phone = value,
            PayerEdit::Method(id) => self.selected_method = Some(id),
        }
        self
    }

    /// Syncs the chosen method to the shipment when needed, then starts the payment.
    ///
    /// The shipment returned by the update replaces the local copy, so its `payment_id` is
    /// the one used for initiation.
    pub async fn proceed(&mut self, client: &ShipmentClient) -> Result<PaymentStep, PortalError> {
        validation::validate_payer(&self.payer, self.selected_method.as_deref())?;
        let method = self.selected_method.clone().unwrap_or_default();

        if self.shipment.selected_payment_method.as_deref() != Some(method.as_str()) {
            let request = UpdateShipmentRequest {
                selected_payment_method: method.clone(),
            };
            self.shipment = client.update_shipment(&self.shipment.id, &request).await?;
            debug!(shipment_id = %self.shipment.id, method = %method, "payment method saved");
        }

        let payment_id = self
            .shipment
            .payment_id
            .clone()
            .ok_or_else(|| PortalError::workflow("Payment ID not found"))?;

        let data = client.initiate_payment(&payment_id, &self.payer).await?;
        let instruction = PaymentInstruction::try_from(data)?;

        Ok(match instruction {
            PaymentInstruction::BankTransfer {
                transaction_id,
                account,
            } => {
                info!(%transaction_id, bank = %account.bank_name, "awaiting bank transfer proof");
                PaymentStep::AwaitingProof(ProofUpload::new(
                    self.shipment.code.clone(),
                    transaction_id,
                    account,
                ))
            }
            PaymentInstruction::Redirect {
                transaction_id,
                url,
            } => {
                info!(%transaction_id, "redirecting to payment provider");
                PaymentStep::Redirecting { url }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProofUpload {
    pub shipment_code: String,
    pub transaction_id: String,
    pub account: VirtualAccount,
    file: Option<UploadFile>,
}

impl ProofUpload {
    pub fn new(shipment_code: String, transaction_id: String, account: VirtualAccount) -> Self {
        Self {
            shipment_code,
            transaction_id,
            account,
            file: None,
        }
    }

    pub fn file(&self) -> Option<&UploadFile> {
        self.file.as_ref()
    }

    /// Replaces the attached file. A rejected file leaves the previous one in place.
    pub fn attach(&mut self, file: UploadFile) -> Result<(), FileValidationError> {
        validation::validate_proof_file(&file)?;
        self.file = Some(file);
        Ok(())
    }

    pub async fn upload(&self, client: &ShipmentClient) -> Result<PaymentReceipt, PortalError> {
        let file = self.file.clone().ok_or(FileValidationError::Missing)?;
        validation::validate_proof_file(&file)?;

        let proof = client.upload_payment_proof(&self.transaction_id, file).await?;
        info!(transaction_id = %proof.transaction_id, "payment proof uploaded");

        Ok(PaymentReceipt {
            shipment_code: self.shipment_code.clone(),
            transaction_id: proof.transaction_id,
            proof_url: proof.proof_url,
            redirect_after: SUCCESS_REDIRECT_DELAY,
            success_path: success_path(&self.shipment_code),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub shipment_code: String,
    pub transaction_id: String,
    pub proof_url: String,
    pub redirect_after: Duration,
    pub success_path: String,
}
