use loan_advisory_agent::{
    agent::LoanAdvisor,
    api::start_server,
    applications::InMemoryApplicationStore,
    responder::responder_from_env,
    state::store_from_env,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 Loan Advisory Agent - API Server");
    info!("📍 Port: {}", api_port);

    let store = store_from_env();
    let responder = responder_from_env();
    let advisor = Arc::new(
        LoanAdvisor::new(responder, store).with_reply_delay(LoanAdvisor::reply_delay_from_env()),
    );
    let applications = Arc::new(InMemoryApplicationStore::new());

    info!("✅ Advisor initialized");
    info!("📡 Starting API server...");

    start_server(advisor, applications, api_port).await?;

    Ok(())
}
