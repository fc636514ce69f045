use std::time::Duration;
use realtime_notifications::{
    EndpointStrategy, NotificationClient, NotificationClientOptions, Session,
};
use tracing_subscriber::EnvFilter;

/// Follow the notification feed of a running backend
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var("NOTIFICATIONS_URL").unwrap_or_else(|_| "http://localhost:8000".into());
    let token = std::env::var("NOTIFICATIONS_TOKEN").expect("NOTIFICATIONS_TOKEN must be set in .env");
    let user = std::env::var("NOTIFICATIONS_USER").unwrap_or_else(|_| "1".into());

    println!("📡 Connecting to: {}\n", url);

    let client = NotificationClient::new(NotificationClientOptions {
        endpoint: EndpointStrategy::explicit(url),
        ..Default::default()
    })?;
    client.init(Session::with_token(user, token)).await?;

    println!(
        "✅ Loaded {} notifications, {} unread\n",
        client.store().len().await,
        client.store().unread_count().await
    );

    let mut states = client.state_changes();
    let mut revisions = client.store().subscribe();

    // Simulated network drop half way through
    let presence = client.presence().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(20)).await;
        println!("⚠️  Going offline");
        presence.set_online(false);
        tokio::time::sleep(Duration::from_secs(5)).await;
        println!("🟢 Back online");
        presence.set_online(true);
    });

    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Ok(()) = states.changed() => {
                let status = client.status().await;
                println!(
                    "🔌 {} (attempts: {}, last error: {})",
                    status.state,
                    status.reconnect_attempts,
                    status.last_error.as_deref().unwrap_or("-")
                );
            }
            Ok(()) = revisions.changed() => {
                let _ = revisions.borrow_and_update();
                if let Some(latest) = client.store().snapshot().await.first() {
                    println!(
                        "🔔 [{}] {} ({} unread)",
                        if latest.read { "read" } else { "new" },
                        latest.title,
                        client.store().unread_count().await
                    );
                }
            }
        }
    }

    client.shutdown().await?;
    println!("\n🎉 Done");
    Ok(())
}
