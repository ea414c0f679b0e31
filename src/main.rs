use anyhow::Result;
use futures::future::join_all;
use shipping_portal::{
    config::Config,
    draft::ShipmentDraft,
    error,
    store::{DraftStore, StorageKey},
    shipment::ShipmentClient,
    theme::ThemeService,
    tracking,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shipping_portal=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    let client = ShipmentClient::new(&config)?;

    let themes = ThemeService::new(config.theme_cache_ttl);
    let theme = themes.resolve(&client).await;
    tracing::info!(brand = %theme.branding.name, api = %config.api_base_url, "portal ready");

    let store = DraftStore::file(&config.draft_store_path);
    if let Some(draft) = store.get::<ShipmentDraft>(StorageKey::ShipmentDraft) {
        tracing::info!(
            path = %config.draft_store_path.display(),
            items = draft.items.len(),
            "unfinished shipment draft on disk"
        );
    }

    let codes: Vec<String> = std::env::args().skip(1).collect();
    if codes.is_empty() {
        tracing::info!("no tracking codes given, nothing to do");
        return Ok(());
    }

    let lookups = codes.iter().map(|code| tracking::track(&client, code));
    let results = join_all(lookups).await;

    let mut failed = 0;
    for (code, result) in codes.iter().zip(results) {
        match result {
            Ok(view) => tracing::info!(
                code = %view.display_code(),
                status = %view.current_status_label(),
                progress = %format!("{:.0}%", view.progress_percent()),
                events = view.data.events.len(),
                "tracked shipment"
            ),
            Err(err) => {
                failed += 1;
                let message = error::report(&err);
                tracing::warn!(code = %code, "{}", message);
            }
        }
    }

    if failed > 0 {
        tracing::warn!(failed, total = codes.len(), "some lookups failed");
    }

    Ok(())
}
