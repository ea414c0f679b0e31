use crate::error::{FormSection, PortalError, ValidationError};
use crate::models::TrackingData;
use crate::shipment::ShipmentClient;

/// Looks a shipment up by its tracking code. Nothing is cached or stored.
pub async fn track(client: &ShipmentClient, code: &str) -> Result<TrackingView, PortalError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::new(
            FormSection::Tracking,
            "code",
            "Please enter a tracking code",
        )
        .into());
    }

    if code.contains(['/', '?', '#', '\\']) || matches!(code, "." | "..") {
        return Err(ValidationError::new(
            FormSection::Tracking,
            "code",
            "Please enter a valid tracking code",
        )
        .into());
    }

    let data = client.track_shipment(code).await?;
    Ok(TrackingView::new(data))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingView {
    pub data: TrackingData,
}

impl TrackingView {
    pub fn new(data: TrackingData) -> Self {
        Self { data }
    }

    /// Progress as reported by the service. Never derived from event text.
    pub fn progress_percent(&self) -> f64 {
        let progression = &self.data.status_progression;
        if progression.total_steps == 0 {
            return 0.0;
        }
        f64::from(progression.current_step) / f64::from(progression.total_steps) * 100.0
    }

    pub fn display_code(&self) -> String {
        self.data.shipment_code.to_uppercase()
    }

    pub fn current_status_label(&self) -> String {
        status_label(&self.data.shipment.current_status)
    }
}

/// `in_transit` -> `In Transit`
pub fn status_label(status: &str) -> String {
    status
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
