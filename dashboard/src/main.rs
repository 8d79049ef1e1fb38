//! Tour Desk command-line dashboard
//!
//! Prints the dashboard and the ticket list, then the detail of the ticket
//! named by `TOUR_DESK_TICKET_ID` if set.
//!
//! # Usage
//!
//! ```bash
//! TOUR_DESK_TICKET_ID=3 RUST_LOG=tour_desk=debug cargo run --bin tour-desk
//! ```

use tour_desk::{Config, TourDeskApp};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tour_desk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(api_url = %config.api_url, "Configuration loaded");

    let app = TourDeskApp::new(&config);
    app.refresh_tickets().await;

    println!("{}", app.dashboard().await);
    println!("{}", app.ticket_list().await);

    let opened = match config.ticket_id {
        Some(id) => Some(app.open_ticket(id).await),
        None => None,
    };

    let result = match opened {
        Some(Ok(ticket)) => {
            println!("{}", ticket.detail().await);
            ticket.close().await;
            Ok(())
        },
        Some(Err(error)) => Err(error),
        None => Ok(()),
    };

    for alert in app.alert_broker().alerts().await {
        println!("[{}] {}", alert.kind, alert.message);
    }
    app.shutdown().await;

    result?;
    Ok(())
}
