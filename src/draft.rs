//! The in-progress shipment configuration and its field-level transitions.
//!
//! A [`ShipmentDraft`] is never mutated in place. Every form edit is a [`DraftEdit`]
//! applied through [`ShipmentDraft::apply`], which returns the next draft.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{Category, Location, PackageType, QuoteItem, QuoteSearchParams};
use crate::validation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteEnd {
    pub country: String,
    pub state: String,
    pub city: String,
}

impl RouteEnd {
    fn with_country(country: &str) -> Self {
        Self {
            country: country.to_string(),
            ..Self::default()
        }
    }

    /// State and city lower-cased, empty city omitted.
    pub fn to_location(&self) -> Location {
        let city = self.city.trim().to_lowercase();
        Location {
            country: self.country.trim().to_string(),
            state: self.state.trim().to_lowercase(),
            city: (!city.is_empty()).then_some(city),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub origin: RouteEnd,
    pub destination: RouteEnd,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            origin: RouteEnd::with_country("NG"),
            destination: RouteEnd::with_country("US"),
        }
    }
}

/// One line of the item list as the user is typing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Local identity for list rendering only, never sent to the API
    pub id: Uuid,
    pub category_id: Option<String>,
    pub description: String,
    pub package_type: PackageType,
    pub quantity: i64,
    pub weight: f64,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub declared_value: f64,
}

impl LineItem {
    pub fn new(category_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            description: String::new(),
            package_type: PackageType::Box,
            quantity: 1,
            weight: 0.0,
            length: None,
            width: None,
            height: None,
            declared_value: 0.0,
        }
    }

    fn from_quote_item(item: &QuoteItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id: Some(item.category_id.clone()),
            description: item.description.clone(),
            package_type: item.package_type,
            quantity: i64::from(item.quantity),
            weight: item.weight,
            length: item.length,
            width: item.width,
            height: item.height,
            declared_value: item.declared_value,
        }
    }

    fn to_quote_item(&self, category: &Category) -> QuoteItem {
        QuoteItem {
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            category_description: category.description.clone(),
            category_hs_code: category.hs_code.clone(),
            category_group_tag: category.group_tag.clone(),
            description: self.description.trim().to_string(),
            package_type: self.package_type,
            quantity: u32::try_from(self.quantity).unwrap_or(u32::MAX),
            weight: self.weight,
            length: self.length,
            width: self.width,
            height: self.height,
            declared_value: self.declared_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentDraft {
    pub route: Route,
    pub items: Vec<LineItem>,
    pub currency: String,
    pub is_insured: bool,
}

impl Default for ShipmentDraft {
    fn default() -> Self {
        Self {
            route: Route::default(),
            items: vec![LineItem::new(None)],
            currency: "NGN".to_string(),
            is_insured: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemEdit {
    Category(String),
    Description(String),
    /// Also resets the weight to the package default, when there is one
    PackageType(PackageType),
    Quantity(i64),
    Weight(f64),
    Dimensions {
        length: Option<f64>,
        width: Option<f64>,
        height: Option<f64>,
    },
    DeclaredValue(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    OriginCountry(String),
    OriginState(String),
    OriginCity(String),
    DestinationCountry(String),
    DestinationState(String),
    DestinationCity(String),
    Currency(String),
    Insured(bool),
    /// Appends a box of 1kg in the given category
    AddItem { category_id: Option<String> },
    /// Ignored when it would leave the list empty
    RemoveItem(usize),
    Item(usize, ItemEdit),
}

impl ShipmentDraft {
    /// Rebuilds a draft from a search that was already sent.
    pub fn from_search(search: &QuoteSearchParams) -> Self {
        let end = |location: &Location| RouteEnd {
            country: location.country.clone(),
            state: location.state.clone(),
            city: location.city.clone().unwrap_or_default(),
        };

        Self {
            route: Route {
                origin: end(&search.origin),
                destination: end(&search.destination),
            },
            items: search.items.iter().map(LineItem::from_quote_item).collect(),
            currency: search.currency.clone(),
            is_insured: search.is_insured,
        }
    }

    pub fn apply(mut self, edit: DraftEdit) -> Self {
        match edit {
            DraftEdit::OriginCountry(value) => self.route.origin.country = value,
            DraftEdit::OriginState(value) => self.route.origin.state = value,
            DraftEdit::OriginCity(value) => self.route.origin.city = value,
            DraftEdit::DestinationCountry(value) => self.route.destination.country = value,
            DraftEdit::DestinationState(value) => self.route.destination.state = value,
            DraftEdit::DestinationCity(value) => self.route.destination.city = value,
            DraftEdit::Currency(value) => self.currency = value,
            DraftEdit::Insured(value) => self.is_insured = value,
            DraftEdit::AddItem { category_id } => {
                let mut item = LineItem::new(category_id);
                item.weight = 1.0;
                self.items.push(item);
            }
            DraftEdit::RemoveItem(index) => {
                if self.items.len() > 1 && index < self.items.len() {
                    self.items.remove(index);
                }
            }
            DraftEdit::Item(index, edit) => {
                if let Some(item) = self.items.get_mut(index) {
                    apply_item_edit(item, edit);
                }
            }
        }

        self
    }

    /// Normalized quote request for this draft. Validates first.
    pub fn to_search_params(
        &self,
        categories: &[Category],
    ) -> Result<QuoteSearchParams, ValidationError> {
        validation::validate_line_items(&self.items, categories)?;
        validation::validate_route(&self.route)?;

        let items = self
            .items
            .iter()
            .filter_map(|item| {
                let id = item.category_id.as_deref()?;
                let category = categories.iter().find(|c| c.id == id)?;
                Some(item.to_quote_item(category))
            })
            .collect();

        Ok(QuoteSearchParams {
            origin: self.route.origin.to_location(),
            destination: self.route.destination.to_location(),
            items,
            currency: self.currency.clone(),
            is_insured: self.is_insured,
        })
    }
}

fn apply_item_edit(item: &mut LineItem, edit: ItemEdit) {
    match edit {
        ItemEdit::Category(id) => item.category_id = Some(id),
        ItemEdit::Description(value) => item.description = value,
        ItemEdit::PackageType(package_type) => {
            item.package_type = package_type;
            if let Some(weight) = package_type.default_weight() {
                item.weight = weight;
            }
        }
        ItemEdit::Quantity(value) => item.quantity = value,
        // a hand-typed weight no longer matches any package preset
        ItemEdit::Weight(value) => {
            item.weight = value;
            item.package_type = PackageType::Other;
        }
        ItemEdit::Dimensions {
            length,
            width,
            height,
        } => {
            item.length = length;
            item.width = width;
            item.height = height;
        }
        ItemEdit::DeclaredValue(value) => item.declared_value = value,
    }
}

/// Keeps the first category of every `group_tag`.
pub fn dedup_categories(categories: Vec<Category>) -> Vec<Category> {
    let mut unique: Vec<Category> = Vec::with_capacity(categories.len());
    for category in categories {
        if !unique.iter().any(|c| c.group_tag == category.group_tag) {
            unique.push(category);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_type_resets_weight_except_for_other() {
        let draft = ShipmentDraft::default()
            .apply(DraftEdit::Item(0, ItemEdit::Weight(7.0)));
        assert_eq!(draft.items[0].package_type, PackageType::Other);

        let draft = draft.apply(DraftEdit::Item(0, ItemEdit::PackageType(PackageType::Pallet)));
        assert_eq!(draft.items[0].weight, 10.0);
        assert_eq!(draft.items[0].package_type, PackageType::Pallet);

        let draft = draft
            .apply(DraftEdit::Item(0, ItemEdit::Weight(12.5)))
            .apply(DraftEdit::Item(0, ItemEdit::PackageType(PackageType::Other)));
        assert_eq!(draft.items[0].weight, 12.5);
    }

    #[test]
    fn last_item_cannot_be_removed() {
        let draft = ShipmentDraft::default().apply(DraftEdit::RemoveItem(0));
        assert_eq!(draft.items.len(), 1);

        let draft = draft
            .apply(DraftEdit::AddItem {
                category_id: Some("c1".into()),
            })
            .apply(DraftEdit::RemoveItem(0));
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].category_id.as_deref(), Some("c1"));
        assert_eq!(draft.items[0].weight, 1.0);
    }

    #[test]
    fn categories_are_deduplicated_by_group_tag() {
        let category = |id: &str, tag: &str| Category {
            id: id.into(),
            name: id.into(),
            description: String::new(),
            group_tag: tag.into(),
            hs_code: String::new(),
        };

        let unique = dedup_categories(vec![
            category("a", "general"),
            category("b", "general"),
            category("c", "electronics"),
        ]);
        let ids: Vec<_> = unique.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }
}
