//! Client-side checks run before any request is sent. The first failure wins.

use chrono::{Days, NaiveDate};

use crate::draft::{LineItem, Route};
use crate::error::{FileValidationError, FormSection, ValidationError};
use crate::gateway::UploadFile;
use crate::models::{Address, Category, PayerInfo, PickupType};

pub const MAX_PROOF_BYTES: u64 = 5 * 1024 * 1024;

pub const PROOF_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/jpg", "application/pdf"];

/// Per item: category, description, weight, quantity, declared value, then dimensions.
pub fn validate_line_items(items: &[LineItem], categories: &[Category]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::new(
            FormSection::Item(0),
            "items",
            "At least one item is required",
        ));
    }

    for (index, item) in items.iter().enumerate() {
        validate_line_item(index, item, categories)?;
    }

    Ok(())
}

fn validate_line_item(
    index: usize,
    item: &LineItem,
    categories: &[Category],
) -> Result<(), ValidationError> {
    let section = FormSection::Item(index);
    let n = index + 1;

    let known_category = item
        .category_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .is_some_and(|id| categories.iter().any(|c| c.id == id));
    if !known_category {
        return Err(ValidationError::new(
            section,
            "category",
            format!("Please select category for item {}", n),
        ));
    }

    if item.description.trim().is_empty() {
        return Err(ValidationError::new(
            section,
            "description",
            format!("Please enter description for item {}", n),
        ));
    }

    if !(item.weight > 0.0) {
        return Err(ValidationError::new(
            section,
            "weight",
            format!("Please enter valid weight for item {}", n),
        ));
    }

    if item.quantity < 1 || item.quantity > i64::from(u32::MAX) {
        return Err(ValidationError::new(
            section,
            "quantity",
            format!("Please enter valid quantity for item {}", n),
        ));
    }

    if !(item.declared_value > 0.0) {
        return Err(ValidationError::new(
            section,
            "declared_value",
            format!("Please enter declared value for item {}", n),
        ));
    }

    for (field, value) in [
        ("length", item.length),
        ("width", item.width),
        ("height", item.height),
    ] {
        if value.is_some_and(|v| !(v > 0.0)) {
            return Err(ValidationError::new(
                section,
                field,
                format!("Please enter a valid {} for item {}", field, n),
            ));
        }
    }

    Ok(())
}

pub fn validate_route(route: &Route) -> Result<(), ValidationError> {
    let checks = [
        ("origin_state", &route.origin.state, "Please select origin state"),
        ("destination_state", &route.destination.state, "Please select destination state"),
        ("origin_city", &route.origin.city, "Please select origin city"),
        ("destination_city", &route.destination.city, "Please select destination city"),
    ];

    for (field, value, message) in checks {
        if value.trim().is_empty() {
            return Err(ValidationError::new(FormSection::Route, field, message));
        }
    }

    Ok(())
}

/// Sender and receiver share the same shape; `section` decides which one is blamed.
pub fn validate_address(address: &Address, section: FormSection) -> Result<(), ValidationError> {
    let party = match section {
        FormSection::Receiver => "receiver",
        _ => "sender",
    };
    let fail = |field: &'static str, what: &str| {
        Err(ValidationError::new(
            section,
            field,
            format!("Please enter {} {}", party, what),
        ))
    };

    if address.name.trim().is_empty() {
        return fail("name", "name");
    }
    if address.email.trim().is_empty() || !address.email.contains('@') {
        return Err(ValidationError::new(
            section,
            "email",
            format!("Please enter a valid {} email", party),
        ));
    }
    if address.phone.trim().is_empty() {
        return fail("phone", "phone number");
    }
    if address.country.trim().is_empty() {
        return fail("country", "country");
    }
    if address.state.trim().is_empty() {
        return fail("state", "state");
    }
    if address.city.trim().is_empty() {
        return fail("city", "city");
    }
    if address.address_line_1.trim().is_empty() {
        return fail("address_line_1", "address");
    }
    if address.postal_code.trim().is_empty() {
        return fail("postal_code", "postal code");
    }

    Ok(())
}

/// Scheduled pickups need a date no earlier than tomorrow; drop-offs need nothing.
pub fn validate_pickup(
    pickup_type: PickupType,
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    if pickup_type == PickupType::DropOff {
        return Ok(());
    }

    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    match date {
        None => Err(ValidationError::new(
            FormSection::Pickup,
            "pickup_date",
            "Please select a pickup date",
        )),
        Some(date) if date < tomorrow => Err(ValidationError::new(
            FormSection::Pickup,
            "pickup_date",
            "Pickup date must be tomorrow or later",
        )),
        Some(_) => Ok(()),
    }
}

pub fn validate_payer(payer: &PayerInfo, method: Option<&str>) -> Result<(), ValidationError> {
    let missing = [
        ("payer_name", &payer.payer_name),
        ("payer_email", &payer.payer_email),
        ("payer_phone", &payer.payer_phone),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    if let Some((field, _)) = missing {
        return Err(ValidationError::new(
            FormSection::Payer,
            field,
            "Please fill in all payer information",
        ));
    }

    if method.is_none_or(|m| m.trim().is_empty()) {
        return Err(ValidationError::new(
            FormSection::Payer,
            "payment_method",
            "Please select a payment method",
        ));
    }

    Ok(())
}

pub fn validate_proof_file(file: &UploadFile) -> Result<(), FileValidationError> {
    let mime = file.mime_type.trim().to_ascii_lowercase();
    if !PROOF_MIME_TYPES.contains(&mime.as_str()) {
        return Err(FileValidationError::UnsupportedType {
            mime: file.mime_type.clone(),
        });
    }

    let size = file.bytes.len() as u64;
    if size > MAX_PROOF_BYTES {
        return Err(FileValidationError::TooLarge {
            size,
            max: MAX_PROOF_BYTES,
        });
    }

    Ok(())
}
