use loan_advisory_agent::{
    agent::LoanAdvisor,
    responder::RuleBasedResponder,
    state::{InMemoryStateStore, StateStore},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Loan Advisory Agent starting");

    let store = Arc::new(InMemoryStateStore::new());
    let advisor = LoanAdvisor::new(Arc::new(RuleBasedResponder), store.clone());

    let conversation_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    // Scripted eligibility dialogue
    let script = [
        "Hello",
        "Am I eligible for a personal loan?",
        "salaried",
        "40000",
        "700",
        "no",
        "500000",
        "what is emi?",
    ];

    println!("\n=== LOAN ADVISORY DIALOGUE ===");
    for message in script {
        let outcome = advisor.handle_turn(conversation_id, user_id, message).await?;
        println!("\nYou: {}", message);
        println!("[{}]", outcome.agent_tag);
        println!("Advisor: {}", outcome.reply_text);
    }

    let conversation = store
        .load_conversation(conversation_id)
        .await?
        .expect("conversation was persisted");
    println!("\n=== TRANSCRIPT SUMMARY ===");
    println!("Title: {}", conversation.title);
    println!("Messages: {}", conversation.message_count());

    Ok(())
}
