//! Shipment finalization.
//!
//! Two flavours share one step: [`CheckoutMode::StraightThrough`] takes the selected quote
//! as final, while [`CheckoutMode::Editable`] lets items and route change and re-quotes
//! before creating anything when the priced parameters moved or the quote went stale.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::draft::{DraftEdit, ShipmentDraft};
use crate::error::{FormSection, PortalError, ValidationError};
use crate::models::{
    Address, Category, CreateShipmentRequest, Location, PickupType, Quote, QuoteSearchParams,
    Shipment,
};
use crate::quote_selection::default_index;
use crate::shipment::ShipmentClient;
use crate::store::{DraftStore, StorageKey};
use crate::validation;

pub const CHANNEL_CODE: &str = "web";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    StraightThrough,
    Editable,
}

/// The contact part of an address. Country, state and city come from the quoted route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub postal_code: String,
}

impl ContactForm {
    fn from_address(address: &Address) -> Self {
        Self {
            name: address.name.clone(),
            email: address.email.clone(),
            phone: address.phone.clone(),
            address_line_1: address.address_line_1.clone(),
            address_line_2: address.address_line_2.clone().unwrap_or_default(),
            postal_code: address.postal_code.clone(),
        }
    }

    fn to_address(&self, location: &Location) -> Address {
        let line_2 = self.address_line_2.trim();
        Address {
            name: self.name.trim().to_string(),
            address_line_1: self.address_line_1.trim().to_string(),
            address_line_2: (!line_2.is_empty()).then(|| line_2.to_string()),
            city: location.city.clone().unwrap_or_default(),
            state: location.state.clone(),
            postal_code: self.postal_code.trim().to_string(),
            country: location.country.clone(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            company: None,
        }
    }

    fn apply(&mut self, edit: ContactEdit) {
        match edit {
            ContactEdit::Name(value) => self.name = value,
            ContactEdit::Email(value) => self.email = value,
            ContactEdit::Phone(value) => self.phone = value,
            ContactEdit::AddressLine1(value) => self.address_line_1 = value,
            ContactEdit::AddressLine2(value) => self.address_line_2 = value,
            ContactEdit::PostalCode(value) => self.postal_code = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactEdit {
    Name(String),
    Email(String),
    Phone(String),
    AddressLine1(String),
    AddressLine2(String),
    PostalCode(String),
}

/// Addresses of the last created shipment, used to prefill the next checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastAddresses {
    pub sender: Address,
    pub receiver: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupChoice {
    Scheduled(Option<NaiveDate>),
    DropOff,
}

impl PickupChoice {
    pub fn pickup_type(&self) -> PickupType {
        match self {
            PickupChoice::Scheduled(_) => PickupType::ScheduledPickup,
            PickupChoice::DropOff => PickupType::DropOff,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            PickupChoice::Scheduled(date) => *date,
            PickupChoice::DropOff => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEdit {
    Sender(ContactEdit),
    Receiver(ContactEdit),
    Pickup(PickupChoice),
    /// Ignored in straight-through mode
    Draft(DraftEdit),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    Created(Shipment),
    /// Prices were refreshed; the user has to confirm the new quote and submit again
    Requoted(Quote),
}

/// Where the payment step for a created shipment lives.
pub fn payment_path(shipment_id: &str) -> String {
    format!("/payment/{}", shipment_id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutStep {
    pub mode: CheckoutMode,
    pub quote: Quote,
    pub search: QuoteSearchParams,
    pub draft: ShipmentDraft,
    pub categories: Vec<Category>,
    pub sender: ContactForm,
    pub receiver: ContactForm,
    pub pickup: PickupChoice,
    pub expanded: Option<FormSection>,
}

impl CheckoutStep {
    /// Builds the step from what quote selection left in the store. The selected quote must
    /// belong to the last fetched quotes.
    pub fn load(
        store: &DraftStore,
        mode: CheckoutMode,
        categories: Vec<Category>,
        today: NaiveDate,
    ) -> Result<Self, PortalError> {
        let quote: Quote = store
            .get(StorageKey::SelectedQuote)
            .ok_or_else(|| PortalError::workflow("No quote selected"))?;
        let search: QuoteSearchParams = store
            .get(StorageKey::QuoteSearch)
            .ok_or_else(|| PortalError::workflow("No quote search found"))?;

        let offered: Vec<Quote> = store.get(StorageKey::QuotesCache).unwrap_or_default();
        if !offered.iter().any(|q| q.quote_id == quote.quote_id) {
            warn!(quote_id = %quote.quote_id, "selected quote is not among the last fetched quotes");
            return Err(PortalError::workflow(
                "The selected quote is no longer available. Please select a quote again.",
            ));
        }

        let last: Option<LastAddresses> = store.get(StorageKey::LastAddresses);
        let (sender, receiver) = match &last {
            Some(last) => (
                ContactForm::from_address(&last.sender),
                ContactForm::from_address(&last.receiver),
            ),
            None => (ContactForm::default(), ContactForm::default()),
        };

        let tomorrow = today.checked_add_days(Days::new(1));
        let draft = ShipmentDraft::from_search(&search);
        let categories = with_search_categories(categories, &search);

        debug!(quote_id = %quote.quote_id, ?mode, prefilled = last.is_some(), "checkout loaded");

        Ok(Self {
            mode,
            quote,
            search,
            draft,
            categories,
            sender,
            receiver,
            pickup: PickupChoice::Scheduled(tomorrow),
            expanded: None,
        })
    }

    pub fn apply(mut self, edit: CheckoutEdit) -> Self {
        match edit {
            CheckoutEdit::Sender(edit) => self.sender.apply(edit),
            CheckoutEdit::Receiver(edit) => self.receiver.apply(edit),
            CheckoutEdit::Pickup(choice) => self.pickup = choice,
            CheckoutEdit::Draft(edit) => match self.mode {
                CheckoutMode::Editable => self.draft = self.draft.apply(edit),
                CheckoutMode::StraightThrough => debug!("ignoring draft edit in straight-through checkout"),
            },
        }
        self
    }

    fn route(&self) -> (Location, Location) {
        match self.mode {
            CheckoutMode::StraightThrough => {
                (self.search.origin.clone(), self.search.destination.clone())
            }
            CheckoutMode::Editable => (
                self.draft.route.origin.to_location(),
                self.draft.route.destination.to_location(),
            ),
        }
    }

    pub fn sender_address(&self) -> Address {
        self.sender.to_address(&self.route().0)
    }

    pub fn receiver_address(&self) -> Address {
        self.receiver.to_address(&self.route().1)
    }

    /// Items, sender, receiver, pickup, in that order. Returns the quote parameters the
    /// shipment would be priced with.
    pub fn validate(&self, today: NaiveDate) -> Result<QuoteSearchParams, ValidationError> {
        validation::validate_line_items(&self.draft.items, &self.categories)?;
        validation::validate_address(&self.sender_address(), FormSection::Sender)?;
        validation::validate_address(&self.receiver_address(), FormSection::Receiver)?;
        validation::validate_pickup(self.pickup.pickup_type(), self.pickup.date(), today)?;

        match self.mode {
            CheckoutMode::StraightThrough => Ok(self.search.clone()),
            CheckoutMode::Editable => self.draft.to_search_params(&self.categories),
        }
    }

    pub fn build_request(&self, params: &QuoteSearchParams) -> CreateShipmentRequest {
        CreateShipmentRequest {
            quote_id: self.quote.quote_id.clone(),
            channel_code: CHANNEL_CODE.to_string(),
            is_insured: params.is_insured,
            save_origin_address: false,
            save_destination_address: false,
            items: params.items.clone(),
            origin_address: self.sender_address(),
            destination_address: self.receiver_address(),
            pickup_type: self.pickup.pickup_type(),
            pickup_scheduled_at: self.pickup.date(),
            customer_notes: None,
        }
    }

    pub async fn submit(
        &mut self,
        client: &ShipmentClient,
        store: &DraftStore,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, PortalError> {
        let params = match self.validate(now.date_naive()) {
            Ok(params) => params,
            Err(err) => {
                self.expanded = Some(err.section);
                return Err(err.into());
            }
        };
        self.expanded = None;

        let expired = self.quote.is_expired_at(now);

        if self.mode == CheckoutMode::Editable && (params != self.search || expired) {
            return self.requote(client, store, params).await;
        }

        if expired {
            return Err(PortalError::QuoteExpired {
                quote_id: self.quote.quote_id.clone(),
            });
        }

        let request = self.build_request(&params);
        let shipment = client.create_shipment(&request).await?;
        info!(shipment_id = %shipment.id, code = %shipment.code, "shipment created");

        self.forget_quote(store, &request);

        Ok(CheckoutOutcome::Created(shipment))
    }

    async fn requote(
        &mut self,
        client: &ShipmentClient,
        store: &DraftStore,
        params: QuoteSearchParams,
    ) -> Result<CheckoutOutcome, PortalError> {
        let rates = client.fetch_quotes(&params).await?;
        if rates.is_empty() {
            return Err(PortalError::workflow(
                "No quotes are available for the updated shipment",
            ));
        }

        let index = default_index(&rates, Some(&self.quote.quote_id));
        self.quote = rates[index].clone();
        self.search = params;

        store.set(StorageKey::QuotesCache, &rates)?;
        store.set(StorageKey::QuoteSearch, &self.search)?;
        store.set(StorageKey::SelectedQuote, &self.quote)?;
        store.set(StorageKey::ShipmentDraft, &self.draft)?;

        info!(quote_id = %self.quote.quote_id, quotes = rates.len(), "re-quoted before checkout");

        Ok(CheckoutOutcome::Requoted(self.quote.clone()))
    }

    /// The shipment exists now, so the quote trail is stale. Failures here only warn.
    fn forget_quote(&self, store: &DraftStore, request: &CreateShipmentRequest) {
        let last = LastAddresses {
            sender: request.origin_address.clone(),
            receiver: request.destination_address.clone(),
        };
        if let Err(err) = store.set(StorageKey::LastAddresses, &last) {
            warn!(error = %err, "failed to remember addresses");
        }

        for key in [
            StorageKey::SelectedQuote,
            StorageKey::QuotesCache,
            StorageKey::QuoteSearch,
            StorageKey::ShipmentDraft,
        ] {
            if let Err(err) = store.remove(key) {
                warn!(key = key.as_str(), error = %err, "failed to clear stale value");
            }
        }
    }
}

/// Categories referenced by the quoted search keep the metadata they were quoted with, so a
/// catalogue change alone never looks like an edit. Unknown ids are appended.
fn with_search_categories(mut categories: Vec<Category>, search: &QuoteSearchParams) -> Vec<Category> {
    for item in &search.items {
        let quoted = Category {
            id: item.category_id.clone(),
            name: item.category_name.clone(),
            description: item.category_description.clone(),
            group_tag: item.category_group_tag.clone(),
            hs_code: item.category_hs_code.clone(),
        };
        match categories.iter_mut().find(|c| c.id == quoted.id) {
            Some(existing) => *existing = quoted,
            None => categories.push(quoted),
        }
    }
    categories
}
