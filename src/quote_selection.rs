//! Pure selection over already-fetched quotes. Nothing here talks to the network.

use tracing::{debug, warn};

use crate::error::PortalError;
use crate::models::{Quote, QuoteSearchParams};
use crate::store::{DraftStore, StorageKey};

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteSelectionView {
    /// The search succeeded but no carrier offered a rate
    Empty,
    Choosing(QuoteSelection),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSelection {
    quotes: Vec<Quote>,
    search: Option<QuoteSearchParams>,
    selected: usize,
}

impl QuoteSelectionView {
    /// Rebuilds the view from the cached quotes, keeping the previous selection when it
    /// is still on offer. The resulting default is persisted; with nothing on offer any
    /// stored selection is removed.
    pub fn load(store: &DraftStore) -> Result<Self, PortalError> {
        let quotes: Vec<Quote> = store.get(StorageKey::QuotesCache).unwrap_or_default();
        let search: Option<QuoteSearchParams> = store.get(StorageKey::QuoteSearch);
        let previous: Option<Quote> = store.get(StorageKey::SelectedQuote);

        let view = Self::from_quotes(quotes, search, previous.as_ref().map(|q| q.quote_id.as_str()));
        match &view {
            QuoteSelectionView::Choosing(selection) => {
                store.set(StorageKey::SelectedQuote, selection.selected())?
            }
            QuoteSelectionView::Empty => store.remove(StorageKey::SelectedQuote)?,
        }

        Ok(view)
    }

    pub fn from_quotes(
        quotes: Vec<Quote>,
        search: Option<QuoteSearchParams>,
        previous_id: Option<&str>,
    ) -> Self {
        if quotes.is_empty() {
            return QuoteSelectionView::Empty;
        }

        let selected = default_index(&quotes, previous_id);
        QuoteSelectionView::Choosing(QuoteSelection {
            quotes,
            search,
            selected,
        })
    }
}

/// Index of `previous_id` in `quotes`, or the first quote.
pub fn default_index(quotes: &[Quote], previous_id: Option<&str>) -> usize {
    previous_id
        .and_then(|id| quotes.iter().position(|q| q.quote_id == id))
        .unwrap_or(0)
}

impl QuoteSelection {
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn search(&self) -> Option<&QuoteSearchParams> {
        self.search.as_ref()
    }

    pub fn selected(&self) -> &Quote {
        &self.quotes[self.selected]
    }

    pub fn is_selected(&self, quote_id: &str) -> bool {
        self.selected().quote_id == quote_id
    }

    /// Selects the quote with `quote_id` and persists it.
    pub fn select(&mut self, quote_id: &str, store: &DraftStore) -> Result<&Quote, PortalError> {
        let Some(index) = self.quotes.iter().position(|q| q.quote_id == quote_id) else {
            warn!(quote_id, "selection of unknown quote");
            return Err(PortalError::workflow(format!("Quote {} is not available", quote_id)));
        };

        self.selected = index;
        store.set(StorageKey::SelectedQuote, self.selected())?;
        debug!(quote_id, "quote selected");

        Ok(self.selected())
    }
}
