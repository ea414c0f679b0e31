//! Quote acquisition: collect route and items, validate, fetch quotes.

use tracing::{debug, info, warn};

use crate::autosave::AutosaveHandle;
use crate::draft::{dedup_categories, DraftEdit, ItemEdit, ShipmentDraft};
use crate::error::{FormSection, PortalError, ValidationError};
use crate::models::{Category, Quote, QuoteSearchParams};
use crate::shipment::ShipmentClient;
use crate::store::{DraftStore, StorageKey};

/// Result of a successful quote search. An empty search is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Found(Vec<Quote>),
    NoQuotes,
}

impl QuoteOutcome {
    fn from_rates(rates: Vec<Quote>) -> Self {
        if rates.is_empty() {
            QuoteOutcome::NoQuotes
        } else {
            QuoteOutcome::Found(rates)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequestStep {
    pub draft: ShipmentDraft,
    pub categories: Vec<Category>,
    /// Section the front end should reveal after a failed validation
    pub expanded: Option<FormSection>,
    autosave: Option<AutosaveHandle>,
}

impl QuoteRequestStep {
    pub fn new(draft: ShipmentDraft, categories: Vec<Category>) -> Self {
        Self {
            draft,
            categories,
            expanded: None,
            autosave: None,
        }
    }

    /// Queues every later edit on a running draft autosaver.
    pub fn with_autosave(mut self, handle: AutosaveHandle) -> Self {
        self.autosave = Some(handle);
        self
    }

    /// Fetches the category catalogue and restores the saved draft, if any.
    pub async fn load(client: &ShipmentClient, store: &DraftStore) -> Result<Self, PortalError> {
        let categories = dedup_categories(client.get_categories().await?);
        debug!(count = categories.len(), "loaded categories");

        let mut draft = store
            .get::<ShipmentDraft>(StorageKey::ShipmentDraft)
            .unwrap_or_default();

        if let Some(default) = categories.first() {
            let missing: Vec<usize> = draft
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.category_id.is_none())
                .map(|(index, _)| index)
                .collect();
            for index in missing {
                draft = draft.apply(DraftEdit::Item(index, ItemEdit::Category(default.id.clone())));
            }
        }

        Ok(Self::new(draft, categories))
    }

    pub fn default_category_id(&self) -> Option<&str> {
        self.categories.first().map(|c| c.id.as_str())
    }

    pub fn apply(mut self, edit: DraftEdit) -> Self {
        self.draft = self.draft.apply(edit);
        if let Some(autosave) = &self.autosave {
            autosave.push(self.draft.clone());
        }
        self
    }

    /// Appends an item in the default category.
    pub fn add_item(self) -> Self {
        let category_id = self.default_category_id().map(str::to_string);
        self.apply(DraftEdit::AddItem { category_id })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.build_request().map(|_| ())
    }

    pub fn build_request(&self) -> Result<QuoteSearchParams, ValidationError> {
        self.draft.to_search_params(&self.categories)
    }

    /// Validates, fetches quotes and persists both the quotes and the exact request sent.
    /// A stored selection that is not among the new quotes is dropped.
    ///
    /// On a validation failure the owning section is recorded in `expanded` and nothing is
    /// sent.
    pub async fn submit(
        &mut self,
        client: &ShipmentClient,
        store: &DraftStore,
    ) -> Result<QuoteOutcome, PortalError> {
        let request = match self.build_request() {
            Ok(request) => request,
            Err(err) => {
                self.expanded = Some(err.section);
                return Err(err.into());
            }
        };
        self.expanded = None;

        let rates = client.fetch_quotes(&request).await?;
        info!(
            origin = %request.origin.state,
            destination = %request.destination.state,
            quotes = rates.len(),
            "fetched quotes"
        );

        let previous: Option<Quote> = store.get(StorageKey::SelectedQuote);
        if previous.is_some_and(|quote| !rates.iter().any(|r| r.quote_id == quote.quote_id)) {
            debug!("previous selection is not in the new quotes, dropping it");
            store.remove(StorageKey::SelectedQuote)?;
        }

        store.set(StorageKey::QuotesCache, &rates)?;
        store.set(StorageKey::QuoteSearch, &request)?;
        if let Err(err) = store.set(StorageKey::ShipmentDraft, &self.draft) {
            warn!(error = %err, "failed to save draft after quote search");
        }

        Ok(QuoteOutcome::from_rates(rates))
    }
}
