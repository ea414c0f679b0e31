mod common;

use anyhow::Result;
use chrono::Utc;
use serde_json::json;

use common::{MockTransport, categories_json, ok, quote_json, request_json};
use shipping_portal::checkout::{CheckoutMode, CheckoutStep};
use shipping_portal::draft::{DraftEdit, ItemEdit, ShipmentDraft};
use shipping_portal::error::{FormSection, PortalError};
use shipping_portal::gateway::Method;
use shipping_portal::models::{PackageType, Quote};
use shipping_portal::quote_request::{QuoteOutcome, QuoteRequestStep};
use shipping_portal::quote_selection::QuoteSelectionView;
use shipping_portal::store::{DraftStore, StorageKey};

const FUTURE: &str = "2099-01-01T00:00:00Z";

fn lagos_to_new_york(step: QuoteRequestStep) -> QuoteRequestStep {
    step.apply(DraftEdit::OriginState("Lagos".into()))
        .apply(DraftEdit::OriginCity("Lagos".into()))
        .apply(DraftEdit::DestinationState("NY".into()))
        .apply(DraftEdit::DestinationCity("New York".into()))
        .apply(DraftEdit::Item(0, ItemEdit::Description("Books".into())))
        .apply(DraftEdit::Item(0, ItemEdit::Weight(2.5)))
        .apply(DraftEdit::Item(0, ItemEdit::DeclaredValue(1000.0)))
}

async fn loaded_step(mock: &MockTransport, store: &DraftStore) -> Result<QuoteRequestStep> {
    mock.on(Method::Get, "/categories/", ok(categories_json()));
    Ok(QuoteRequestStep::load(&mock.client(), store).await?)
}

#[tokio::test]
async fn lagos_to_new_york_scenario() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let client = mock.client();
    let mut step = lagos_to_new_york(loaded_step(&mock, &store).await?);

    mock.on(
        Method::Post,
        "/quotes/",
        ok(json!([quote_json("q-dhl", 45000.0, FUTURE), quote_json("q-ups", 52000.0, FUTURE)])),
    );

    let outcome = step.submit(&client, &store).await?;
    let QuoteOutcome::Found(quotes) = outcome else {
        panic!("expected quotes, got {:?}", outcome);
    };
    assert_eq!(quotes.len(), 2);

    let calls = mock.calls();
    let sent = request_json(calls.last().expect("quote request sent"))?;
    assert_eq!(
        sent,
        json!({
            "origin": {"country": "NG", "state": "lagos", "city": "lagos"},
            "destination": {"country": "US", "state": "ny", "city": "new york"},
            "items": [{
                "category_id": "cat-general",
                "category_name": "General",
                "category_description": "General goods",
                "category_hs_code": "9999",
                "category_group_tag": "general",
                "description": "Books",
                "package_type": "other",
                "quantity": 1,
                "weight": 2.5,
                "declared_value": 1000.0
            }],
            "currency": "NGN",
            "is_insured": true
        })
    );

    let view = QuoteSelectionView::load(&store)?;
    let QuoteSelectionView::Choosing(selection) = view else {
        panic!("expected a selection");
    };
    assert_eq!(selection.selected().quote_id, "q-dhl");

    let persisted: Quote = store.get(StorageKey::SelectedQuote).expect("selection persisted");
    assert_eq!(persisted.quote_id, "q-dhl");
    Ok(())
}

#[tokio::test]
async fn invalid_items_never_reach_the_network() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let client = mock.client();
    let step = lagos_to_new_york(loaded_step(&mock, &store).await?);

    let broken = [
        ItemEdit::Weight(0.0),
        ItemEdit::Weight(-3.0),
        ItemEdit::Quantity(0),
        ItemEdit::Quantity(-1),
        ItemEdit::Description("   ".into()),
    ];

    for edit in broken {
        let mut candidate = step.clone().apply(DraftEdit::Item(0, edit.clone()));
        let err = candidate.submit(&client, &store).await.unwrap_err();

        assert!(matches!(err, PortalError::Validation(_)), "{:?} was accepted", edit);
        assert_eq!(candidate.expanded, Some(FormSection::Item(0)));
    }

    assert_eq!(mock.count(Method::Post, "/quotes/"), 0);
    Ok(())
}

#[tokio::test]
async fn missing_route_is_reported_after_items() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let mut step = loaded_step(&mock, &store)
        .await?
        .apply(DraftEdit::Item(0, ItemEdit::Description("Books".into())))
        .apply(DraftEdit::Item(0, ItemEdit::Weight(1.0)))
        .apply(DraftEdit::Item(0, ItemEdit::DeclaredValue(10.0)));

    let err = step.submit(&mock.client(), &store).await.unwrap_err();

    assert_eq!(err.user_message(), "Please select origin state");
    assert_eq!(step.expanded, Some(FormSection::Route));
    assert_eq!(mock.count(Method::Post, "/quotes/"), 0);
    Ok(())
}

#[tokio::test]
async fn zero_quotes_is_an_empty_state() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let client = mock.client();
    let mut step = lagos_to_new_york(loaded_step(&mock, &store).await?);
    mock.on(Method::Post, "/quotes/", ok(json!([])));

    let outcome = step.submit(&client, &store).await?;

    assert_eq!(outcome, QuoteOutcome::NoQuotes);
    assert_eq!(QuoteSelectionView::load(&store)?, QuoteSelectionView::Empty);
    Ok(())
}

#[tokio::test]
async fn empty_refetch_drops_the_previous_selection() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let client = mock.client();
    let step = lagos_to_new_york(loaded_step(&mock, &store).await?);
    mock.on(Method::Post, "/quotes/", ok(json!([quote_json("q-old", 45000.0, FUTURE)])))
        .on(Method::Post, "/quotes/", ok(json!([])));

    let mut first = step.clone();
    first.submit(&client, &store).await?;
    assert!(matches!(QuoteSelectionView::load(&store)?, QuoteSelectionView::Choosing(_)));
    assert!(store.get::<Quote>(StorageKey::SelectedQuote).is_some());

    let mut heavier = step.apply(DraftEdit::Item(0, ItemEdit::Weight(40.0)));
    let outcome = heavier.submit(&client, &store).await?;
    assert_eq!(outcome, QuoteOutcome::NoQuotes);
    assert!(store.get::<Quote>(StorageKey::SelectedQuote).is_none());
    assert_eq!(QuoteSelectionView::load(&store)?, QuoteSelectionView::Empty);

    let today = Utc::now().date_naive();
    let err = CheckoutStep::load(&store, CheckoutMode::StraightThrough, Vec::new(), today)
        .unwrap_err();
    assert_eq!(err.user_message(), "No quote selected");
    Ok(())
}

#[tokio::test]
async fn checkout_rejects_a_selection_outside_the_last_search() -> Result<()> {
    let store = DraftStore::in_memory();
    let quote = |id: &str| -> Result<Quote> { Ok(serde_json::from_value(quote_json(id, 100.0, FUTURE))?) };
    let mock = MockTransport::new();
    let step = lagos_to_new_york(loaded_step(&mock, &store).await?);

    store.set(StorageKey::SelectedQuote, &quote("q-old")?)?;
    store.set(StorageKey::QuotesCache, &vec![quote("q-new")?])?;
    store.set(StorageKey::QuoteSearch, &step.build_request()?)?;

    let today = Utc::now().date_naive();
    let err = CheckoutStep::load(&store, CheckoutMode::StraightThrough, step.categories, today)
        .unwrap_err();

    assert!(matches!(err, PortalError::Workflow(_)));
    assert_eq!(
        err.user_message(),
        "The selected quote is no longer available. Please select a quote again."
    );
    Ok(())
}

#[tokio::test]
async fn search_envelope_responses_are_understood() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let client = mock.client();
    let mut step = lagos_to_new_york(loaded_step(&mock, &store).await?);
    mock.on(
        Method::Post,
        "/quotes/",
        ok(json!({
            "origin": {"country": "NG", "state": "lagos", "city": "lagos"},
            "destination": {"country": "US", "state": "ny"},
            "is_insured": true,
            "quote_id": "search-1",
            "rates": [quote_json("q-fedex", 39000.0, FUTURE)]
        })),
    );

    let outcome = step.submit(&client, &store).await?;

    assert!(matches!(outcome, QuoteOutcome::Found(ref quotes) if quotes[0].quote_id == "q-fedex"));
    Ok(())
}

#[tokio::test]
async fn previous_selection_survives_a_refetch() -> Result<()> {
    let store = DraftStore::in_memory();
    let quote = |id: &str| -> Result<Quote> { Ok(serde_json::from_value(quote_json(id, 100.0, FUTURE))?) };

    store.set(StorageKey::QuotesCache, &vec![quote("a")?, quote("b")?, quote("c")?])?;
    store.set(StorageKey::SelectedQuote, &quote("b")?)?;

    let QuoteSelectionView::Choosing(selection) = QuoteSelectionView::load(&store)? else {
        panic!("expected a selection");
    };
    assert_eq!(selection.selected().quote_id, "b");

    store.set(StorageKey::QuotesCache, &vec![quote("x")?, quote("y")?])?;
    let QuoteSelectionView::Choosing(mut selection) = QuoteSelectionView::load(&store)? else {
        panic!("expected a selection");
    };
    assert_eq!(selection.selected().quote_id, "x");

    selection.select("y", &store)?;
    let persisted: Quote = store.get(StorageKey::SelectedQuote).expect("selection persisted");
    assert_eq!(persisted.quote_id, "y");

    assert!(matches!(selection.select("zzz", &store), Err(PortalError::Workflow(_))));
    assert!(selection.is_selected("y"));
    Ok(())
}

#[tokio::test]
async fn load_restores_the_saved_draft() -> Result<()> {
    let mock = MockTransport::new();
    let store = DraftStore::in_memory();
    let saved = ShipmentDraft::default()
        .apply(DraftEdit::OriginState("Abuja".into()))
        .apply(DraftEdit::Item(0, ItemEdit::PackageType(PackageType::Pallet)));
    store.set(StorageKey::ShipmentDraft, &saved)?;

    let step = loaded_step(&mock, &store).await?;

    // duplicates by group tag are dropped
    let ids: Vec<_> = step.categories.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["cat-general", "cat-electronics"]);

    assert_eq!(step.draft.route.origin.state, "Abuja");
    assert_eq!(step.draft.items[0].weight, 10.0);
    assert_eq!(step.draft.items[0].category_id.as_deref(), Some("cat-general"));

    let step = step.add_item();
    assert_eq!(step.draft.items.len(), 2);
    assert_eq!(step.draft.items[1].category_id.as_deref(), Some("cat-general"));
    Ok(())
}
