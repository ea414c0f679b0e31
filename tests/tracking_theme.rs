mod common;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{Value, json};
use std::time::Duration;

use common::{MockTransport, fail, ok};
use shipping_portal::error::{FormSection, PortalError};
use shipping_portal::gateway::Method;
use shipping_portal::theme::{DEFAULT_THEME, ThemeService};
use shipping_portal::tracking;

fn tracking_json(current_step: u32, total_steps: u32) -> Value {
    json!({
        "shipment_code": "sh13651729",
        "awb_number": "1234567890",
        "shipment": {
            "origin_city": "lagos",
            "origin_state": "lagos",
            "origin_country": "NG",
            "destination_city": "new york",
            "destination_state": "ny",
            "destination_country": "US",
            "carrier_name": "DHL Express",
            "current_status": "in_transit",
            "package_count": 1,
            "items": [{"description": "Books", "quantity": 1, "weight": 2.5}]
        },
        "events": [
            {"id": "e1", "event_time": "2026-03-10T08:00:00Z", "status": "picked_up", "description": "Delivered to the moon"},
            {"id": "e2", "event_time": "2026-03-11T09:30:00Z", "status": "in_transit"}
        ],
        "total": 2,
        "status_progression": {
            "current_step": current_step,
            "total_steps": total_steps,
            "steps": [
                {"status": "picked_up", "label": "Picked up", "completed": true},
                {"status": "in_transit", "label": "In transit", "completed": true},
                {"status": "delivered", "label": "Delivered", "completed": false}
            ]
        }
    })
}

fn theme_json(version: u64, name: &str) -> Value {
    json!({
        "id": "theme-1",
        "version": version,
        "branding": {"name": name, "tagline": "Fast", "logo_url": null},
        "theme": {
            "primary_color": "#000000",
            "success_color": "#00ff00",
            "warning_color": "#ffff00",
            "danger_color": "#ff0000",
            "font_family": "Inter",
            "font_url": null
        },
        "content": {
            "login_header": "Hi",
            "login_subtitle": "Sign in",
            "signup_header": "Join",
            "signup_subtitle": "Start",
            "support_text": "Help?",
            "support_subtext": "Ask us",
            "support_button": "Support"
        },
        "links": {"terms_url": "/t", "privacy_url": "/p", "support_url": "/s"},
        "features": {"show_support_section": false, "enable_remember_me": true, "show_wallet_balance": false}
    })
}

#[tokio::test]
async fn tracking_uses_the_service_progression() -> Result<()> {
    let mock = MockTransport::new();
    mock.on(Method::Get, "/shipments/SH13651729/track/", ok(tracking_json(2, 3)));

    let view = tracking::track(&mock.client(), " SH13651729 ").await?;

    assert!((view.progress_percent() - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(view.display_code(), "SH13651729");
    assert_eq!(view.current_status_label(), "In Transit");
    assert_eq!(view.data.events.len(), 2);
    Ok(())
}

#[tokio::test]
async fn tracking_is_repeatable_and_handles_zero_steps() -> Result<()> {
    let mock = MockTransport::new();
    mock.on(Method::Get, "/shipments/SH1/track/", ok(tracking_json(0, 0)));
    let client = mock.client();

    let first = tracking::track(&client, "SH1").await?;
    let second = tracking::track(&client, "SH1").await?;

    assert_eq!(first, second);
    assert_eq!(first.progress_percent(), 0.0);
    assert_eq!(mock.count(Method::Get, "/shipments/SH1/track/"), 2);
    Ok(())
}

#[tokio::test]
async fn empty_tracking_code_is_rejected_locally() -> Result<()> {
    let mock = MockTransport::new();

    let err = tracking::track(&mock.client(), "   ").await.unwrap_err();

    assert!(matches!(err, PortalError::Validation(ref v) if v.section == FormSection::Tracking));
    assert!(mock.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn tracking_codes_cannot_address_other_endpoints() -> Result<()> {
    let mock = MockTransport::new();
    mock.on(Method::Get, "/payment-methods/tenant/", ok(json!([])));
    let client = mock.client();

    for code in ["SH1/../../payment-methods/tenant/?x=", "SH1?x=1", "SH1#frag", ".."] {
        let err = tracking::track(&client, code).await.unwrap_err();
        assert!(
            matches!(err, PortalError::Validation(ref v) if v.section == FormSection::Tracking),
            "{:?} was accepted",
            code
        );
    }
    assert!(mock.calls().is_empty());

    // identifiers handed straight to the client are encoded instead
    let _ = client.get_shipment("shp/../payment-methods/tenant").await;
    assert_eq!(
        mock.paths(),
        ["GET /shipments/shp%2F..%2Fpayment-methods%2Ftenant/"]
    );
    assert_eq!(mock.count(Method::Get, "/payment-methods/tenant/"), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_tracking_code_surfaces_not_found() -> Result<()> {
    let mock = MockTransport::new();

    let err = tracking::track(&mock.client(), "NOPE").await.unwrap_err();

    assert_eq!(err.user_message(), "The requested resource was not found.");
    Ok(())
}

#[tokio::test]
async fn theme_falls_back_to_default_when_api_is_down() -> Result<()> {
    let mock = MockTransport::new();
    mock.on(Method::Get, "/theme-config/version/", fail(400, json!({"status": "error", "message": "nope"})));
    let themes = ThemeService::new(Duration::from_secs(30 * 60));

    let theme = themes.resolve(&mock.client()).await;

    assert_eq!(theme, *DEFAULT_THEME);
    assert_eq!(theme.branding.name, "OhShip");
    assert_eq!(themes.cached_version(), None);
    Ok(())
}

#[tokio::test]
async fn theme_cache_is_keyed_by_version() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();
    let themes = ThemeService::new(Duration::from_secs(30 * 60));
    let start = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

    mock.on(Method::Get, "/theme-config/version/", ok(json!({"version": 1, "updated_at": "2026-03-01"})));
    mock.on(Method::Get, "/theme-config/", ok(theme_json(1, "Acme Ship")));

    let theme = themes.resolve_at(&client, start).await;
    assert_eq!(theme.branding.name, "Acme Ship");
    assert_eq!(theme.copy.login_header, "Hi");
    assert_eq!(theme.theme.border_radius.as_deref(), Some("lg"));
    assert_eq!(themes.cached_version(), Some(1));

    // fresh: no calls at all
    themes.resolve_at(&client, start + ChronoDuration::minutes(10)).await;
    assert_eq!(mock.count(Method::Get, "/theme-config/version/"), 1);

    // stale but same version: only the version check
    let theme = themes.resolve_at(&client, start + ChronoDuration::minutes(31)).await;
    assert_eq!(theme.branding.name, "Acme Ship");
    assert_eq!(mock.count(Method::Get, "/theme-config/version/"), 2);
    assert_eq!(mock.count(Method::Get, "/theme-config/"), 1);
    Ok(())
}

#[tokio::test]
async fn theme_refetches_on_new_version_and_keeps_stale_copy_on_failure() -> Result<()> {
    let mock = MockTransport::new();
    let client = mock.client();
    let themes = ThemeService::new(Duration::from_secs(30 * 60));
    let start = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

    mock.on(Method::Get, "/theme-config/version/", ok(json!({"version": 1})))
        .on(Method::Get, "/theme-config/version/", ok(json!({"version": 2})))
        .on(Method::Get, "/theme-config/version/", fail(403, json!({"status": "error", "message": "denied"})));
    mock.on(Method::Get, "/theme-config/", ok(theme_json(1, "Acme Ship")))
        .on(Method::Get, "/theme-config/", ok(theme_json(2, "Acme Ship 2")));

    themes.resolve_at(&client, start).await;

    let theme = themes.resolve_at(&client, start + ChronoDuration::minutes(40)).await;
    assert_eq!(theme.branding.name, "Acme Ship 2");
    assert_eq!(themes.cached_version(), Some(2));

    let theme = themes.resolve_at(&client, start + ChronoDuration::minutes(80)).await;
    assert_eq!(theme.branding.name, "Acme Ship 2");
    Ok(())
}
