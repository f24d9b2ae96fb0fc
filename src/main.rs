//! VolunteerConnect service
//!
//! Main application entry point

use anyhow::Context;
use futures::StreamExt;
use tracing::{info, warn};

use VolunteerConnect::{
    config::Settings,
    database::DatabaseService,
    services::ServiceFactory,
    utils::{helpers, logging},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate().context("Invalid configuration")?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging).context("Failed to initialize logging")?;

    info!("Starting {}...", VolunteerConnect::info());

    // Initialize storage backend
    let database = DatabaseService::from_settings(&settings)
        .await
        .context("Failed to initialize storage")?;

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, database).context("Failed to initialize services")?;
    info!(policy = ?services.registration_service.policy(), "Registration service ready");

    let mut open_events = services.listing_service.list_open_events();

    info!("VolunteerConnect is ready!");

    loop {
        tokio::select! {
            snapshot = open_events.next() => match snapshot {
                Some(Ok(events)) => {
                    info!(count = events.len(), "Open events refreshed");
                    for event in events.iter() {
                        info!(
                            event_id = %event.id,
                            title = %event.title,
                            schedule = %helpers::format_event_schedule(event),
                            capacity = %helpers::format_capacity(event),
                            "Open event"
                        );
                    }
                }
                Some(Err(e)) => {
                    // the feed keeps running; the next change triggers a fresh read
                    warn!(error = %e, "Failed to refresh open events");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    services.database.stop_notify_listener();
    info!("VolunteerConnect has been shut down.");

    Ok(())
}
