//! State persistence layer
//!
//! Dialogue contexts are keyed strictly by conversation id (one entry per
//! conversation, last write wins) and transcripts by their owning user.
//! In-memory by default; Postgres when a database URL is configured.

use crate::models::{AgentTag, Conversation, DialogueContext, Message, Sender};
use crate::Result;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Trait for state persistence
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn load_context(&self, conversation_id: Uuid) -> Result<Option<DialogueContext>>;
    async fn save_context(&self, conversation_id: Uuid, context: &DialogueContext) -> Result<()>;
    async fn clear_context(&self, conversation_id: Uuid) -> Result<()>;

    async fn load_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>>;
    async fn save_conversation(&self, conversation: &Conversation) -> Result<()>;
    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>>;
    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()>;
}

//
// ================= In-memory =================
//

/// In-memory state store for development and tests
pub struct InMemoryStateStore {
    contexts: Arc<RwLock<HashMap<Uuid, DialogueContext>>>,
    conversations: Arc<RwLock<HashMap<Uuid, Conversation>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_context(&self, conversation_id: Uuid) -> Result<Option<DialogueContext>> {
        let contexts = self.contexts.read().await;
        Ok(contexts.get(&conversation_id).cloned())
    }

    async fn save_context(&self, conversation_id: Uuid, context: &DialogueContext) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        contexts.insert(conversation_id, context.clone());
        Ok(())
    }

    async fn clear_context(&self, conversation_id: Uuid) -> Result<()> {
        let mut contexts = self.contexts.write().await;
        contexts.remove(&conversation_id);
        Ok(())
    }

    async fn load_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(&conversation_id).cloned())
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut owned: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned)
    }

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()> {
        self.conversations.write().await.remove(&conversation_id);
        self.contexts.write().await.remove(&conversation_id);
        Ok(())
    }
}

//
// ================= Postgres =================
//

/// Postgres-backed state store. The pool connects lazily and the schema is
/// created once on first use.
pub struct PostgresStateStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS dialogue_contexts (
                      conversation_id UUID PRIMARY KEY,
                      context TEXT NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversations (
                      conversation_id UUID PRIMARY KEY,
                      user_id UUID NOT NULL,
                      title TEXT NOT NULL,
                      current_agent TEXT,
                      created_at TIMESTAMPTZ NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_messages (
                      message_id UUID PRIMARY KEY,
                      conversation_id UUID NOT NULL,
                      position INTEGER NOT NULL,
                      sender TEXT NOT NULL,
                      content TEXT NOT NULL,
                      agent_tag TEXT,
                      created_at TIMESTAMPTZ NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_conversation_messages_order
                    ON conversation_messages (conversation_id, position);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_conversations_owner
                    ON conversations (user_id, updated_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                crate::error::AdvisorError::DatabaseError(format!(
                    "Failed to initialize state schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn sender_to_db(sender: Sender) -> &'static str {
        match sender {
            Sender::User => "user",
            Sender::Agent => "agent",
        }
    }

    fn sender_from_db(sender: &str) -> Sender {
        match sender {
            "agent" => Sender::Agent,
            _ => Sender::User,
        }
    }

    fn tag_to_db(tag: AgentTag) -> &'static str {
        match tag {
            AgentTag::IntentClassifier => "IntentClassifier",
            AgentTag::LoanEligibilityChecker => "LoanEligibilityChecker",
            AgentTag::LoanApplicationGuide => "LoanApplicationGuide",
            AgentTag::FinancialLiteracyCoach => "FinancialLiteracyCoach",
        }
    }

    fn tag_from_db(tag: &str) -> Option<AgentTag> {
        match tag {
            "IntentClassifier" => Some(AgentTag::IntentClassifier),
            "LoanEligibilityChecker" => Some(AgentTag::LoanEligibilityChecker),
            "LoanApplicationGuide" => Some(AgentTag::LoanApplicationGuide),
            "FinancialLiteracyCoach" => Some(AgentTag::FinancialLiteracyCoach),
            _ => None,
        }
    }

    async fn load_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT message_id, sender, content, agent_tag, created_at
            FROM conversation_messages
            WHERE conversation_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!("Failed to load messages: {}", e))
        })?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let sender: String = row.try_get("sender").unwrap_or_else(|_| "user".to_string());
            let agent_tag: Option<String> = row.try_get("agent_tag").ok();

            messages.push(Message {
                id: row.try_get("message_id").unwrap_or_else(|_| Uuid::new_v4()),
                content: row.try_get("content").unwrap_or_default(),
                sender: Self::sender_from_db(&sender),
                timestamp: row
                    .try_get("created_at")
                    .unwrap_or_else(|_| chrono::Utc::now()),
                agent_tag: agent_tag.as_deref().and_then(Self::tag_from_db),
            });
        }

        Ok(messages)
    }
}

#[async_trait::async_trait]
impl StateStore for PostgresStateStore {
    async fn load_context(&self, conversation_id: Uuid) -> Result<Option<DialogueContext>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT context FROM dialogue_contexts WHERE conversation_id = $1")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                crate::error::AdvisorError::DatabaseError(format!(
                    "Failed to load dialogue context: {}",
                    e
                ))
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("context").unwrap_or_default();
        match serde_json::from_str::<DialogueContext>(&raw) {
            Ok(context) => Ok(Some(context)),
            Err(e) => {
                // Unreadable persisted state triggers the defensive reset
                // downstream instead of poisoning the conversation.
                warn!(
                    conversation_id = %conversation_id,
                    "Stored dialogue context unreadable, dropping it: {}", e
                );
                Ok(None)
            }
        }
    }

    async fn save_context(&self, conversation_id: Uuid, context: &DialogueContext) -> Result<()> {
        self.ensure_schema().await?;

        let raw = serde_json::to_string(context)?;
        sqlx::query(
            r#"
            INSERT INTO dialogue_contexts (conversation_id, context, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (conversation_id)
            DO UPDATE SET context = EXCLUDED.context, updated_at = NOW()
            "#,
        )
        .bind(conversation_id)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to save dialogue context: {}",
                e
            ))
        })?;

        Ok(())
    }

    async fn clear_context(&self, conversation_id: Uuid) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query("DELETE FROM dialogue_contexts WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                crate::error::AdvisorError::DatabaseError(format!(
                    "Failed to clear dialogue context: {}",
                    e
                ))
            })?;

        Ok(())
    }

    async fn load_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            SELECT user_id, title, current_agent, created_at, updated_at
            FROM conversations
            WHERE conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to load conversation: {}",
                e
            ))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let current_agent: Option<String> = row.try_get("current_agent").ok();
        let messages = self.load_messages(conversation_id).await?;

        Ok(Some(Conversation {
            id: conversation_id,
            user_id: row.try_get("user_id").unwrap_or_else(|_| Uuid::nil()),
            title: row.try_get("title").unwrap_or_default(),
            messages,
            created_at: row
                .try_get("created_at")
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .try_get("updated_at")
                .unwrap_or_else(|_| chrono::Utc::now()),
            current_agent: current_agent.as_deref().and_then(Self::tag_from_db),
        }))
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to begin conversation transaction: {}",
                e
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO conversations
              (conversation_id, user_id, title, current_agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (conversation_id)
            DO UPDATE SET title = EXCLUDED.title,
                          current_agent = EXCLUDED.current_agent,
                          updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(&conversation.title)
        .bind(conversation.current_agent.map(Self::tag_to_db))
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to upsert conversation: {}",
                e
            ))
        })?;

        sqlx::query("DELETE FROM conversation_messages WHERE conversation_id = $1")
            .bind(conversation.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                crate::error::AdvisorError::DatabaseError(format!(
                    "Failed to clear old messages: {}",
                    e
                ))
            })?;

        for (position, msg) in conversation.messages.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO conversation_messages
                  (message_id, conversation_id, position, sender, content, agent_tag, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(msg.id)
            .bind(conversation.id)
            .bind(position as i32)
            .bind(Self::sender_to_db(msg.sender))
            .bind(&msg.content)
            .bind(msg.agent_tag.map(Self::tag_to_db))
            .bind(msg.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                crate::error::AdvisorError::DatabaseError(format!(
                    "Failed to insert message: {}",
                    e
                ))
            })?;
        }

        tx.commit().await.map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to commit conversation transaction: {}",
                e
            ))
        })?;

        Ok(())
    }

    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT conversation_id
            FROM conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to list conversations: {}",
                e
            ))
        })?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            let conversation_id: Uuid = row
                .try_get("conversation_id")
                .unwrap_or_else(|_| Uuid::nil());
            if let Some(conversation) = self.load_conversation(conversation_id).await? {
                conversations.push(conversation);
            }
        }

        Ok(conversations)
    }

    async fn delete_conversation(&self, conversation_id: Uuid) -> Result<()> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to begin delete transaction: {}",
                e
            ))
        })?;

        for statement in [
            "DELETE FROM conversation_messages WHERE conversation_id = $1",
            "DELETE FROM conversations WHERE conversation_id = $1",
            "DELETE FROM dialogue_contexts WHERE conversation_id = $1",
        ] {
            sqlx::query(statement)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    crate::error::AdvisorError::DatabaseError(format!(
                        "Failed to delete conversation: {}",
                        e
                    ))
                })?;
        }

        tx.commit().await.map_err(|e| {
            crate::error::AdvisorError::DatabaseError(format!(
                "Failed to commit delete transaction: {}",
                e
            ))
        })?;

        Ok(())
    }
}

/// Pick the store from the environment: a Postgres URL selects the database
/// store (lazy pool), anything else falls back to in-memory.
pub fn store_from_env() -> Arc<dyn StateStore> {
    let database_url = env::var("POSTGRES_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok();

    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&url)
        {
            Ok(pool) => {
                info!("State store backend: postgres");
                return Arc::new(PostgresStateStore::new(pool));
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres state store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("State store backend: in-memory");
    Arc::new(InMemoryStateStore::new())
}
