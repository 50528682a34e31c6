//! Conversational query orchestrator
//!
//! Ties a chat session to retrieval and generation: titles fresh chats,
//! feeds recent history back into the prompt and persists each exchange.

use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::ChainConfig;
use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::providers::{EmbeddingProvider, LlmProvider, TitleProvider, VectorStoreProvider};
use crate::storage::ChatDb;
use crate::types::{ChatSession, QueryResponse};

/// Orchestrates embedding, search, prompt assembly, generation and persistence
pub struct ConversationalChain {
    db: ChatDb,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    titles: Option<Arc<dyn TitleProvider>>,
    config: ChainConfig,
}

impl ConversationalChain {
    /// Create a chain without title generation
    pub fn new(
        db: ChatDb,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
        config: ChainConfig,
    ) -> Self {
        Self {
            db,
            embedder,
            vector_store,
            llm,
            titles: None,
            config,
        }
    }

    /// Attach a title provider used to name fresh chats
    pub fn with_titles(mut self, titles: Arc<dyn TitleProvider>) -> Self {
        self.titles = Some(titles);
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Answer a question inside a chat owned by `user_id`, recording the exchange
    pub async fn ask(&self, user_id: Uuid, chat_id: Uuid, question: &str) -> Result<QueryResponse> {
        let start = Instant::now();
        let chat = self.db.require_chat(user_id, chat_id)?;

        if chat.title == self.config.default_title {
            self.assign_title(&chat, question).await;
        }

        let history = self.db.recent_messages(chat_id, self.config.history_limit)?;
        let transcript = PromptBuilder::render_transcript(&history);

        let Some(response) = self.retrieve_and_generate(&transcript, question).await? else {
            tracing::info!("No chunks matched question in chat {}", chat_id);
            return Ok(QueryResponse::not_found(&self.config.no_match_answer));
        };

        self.db
            .append_exchange(user_id, chat_id, question, &response.answer)?;

        tracing::info!(
            "Answered in chat {} with {} prior messages and {} sources in {}ms",
            chat_id,
            history.len(),
            response.sources.len(),
            start.elapsed().as_millis()
        );

        Ok(response)
    }

    /// Answer a single question with no history, title or persistence
    pub async fn ask_once(&self, question: &str) -> Result<QueryResponse> {
        Ok(self
            .retrieve_and_generate("", question)
            .await?
            .unwrap_or_else(|| QueryResponse::not_found(&self.config.no_match_answer)))
    }

    /// Embed, search and generate. `None` when search finds nothing.
    async fn retrieve_and_generate(
        &self,
        transcript: &str,
        question: &str,
    ) -> Result<Option<QueryResponse>> {
        let embedding = self.embedder.embed(question).await?;

        let chunks = self.vector_store.search(&embedding, self.config.top_k).await?;
        if chunks.is_empty() {
            return Ok(None);
        }

        let context = PromptBuilder::build_context(&chunks);
        let prompt = PromptBuilder::build_chat_prompt(transcript, &context, question);

        let raw = self.llm.generate(&prompt).await?;
        let answer = PromptBuilder::clean_answer(&raw);

        let sources = chunks.into_iter().map(|c| c.content).collect();
        Ok(Some(QueryResponse::new(answer, sources)))
    }

    /// Best-effort: any failure leaves the placeholder in place
    async fn assign_title(&self, chat: &ChatSession, question: &str) {
        let Some(titles) = &self.titles else {
            return;
        };

        let title = match titles.generate_title(question).await {
            Ok(title) if !title.is_empty() => title,
            Ok(_) => {
                tracing::warn!("{} returned an empty title for chat {}", titles.name(), chat.id);
                return;
            }
            Err(e) => {
                tracing::warn!("Title generation failed for chat {}: {}", chat.id, e);
                return;
            }
        };

        if let Err(e) = self.db.rename_chat(chat.user_id, chat.id, &title) {
            tracing::warn!("Failed to store generated title for chat {}: {}", chat.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::generation::ChatPrompt;
    use crate::types::{RetrievedChunk, Role};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FakeEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(Error::embedding("service down"));
            }
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct FakeStore {
        chunks: Vec<RetrievedChunk>,
    }

    #[async_trait]
    impl VectorStoreProvider for FakeStore {
        async fn search(&self, _embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
            Ok(self.chunks.iter().take(top_k).cloned().collect())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    /// Records every prompt it is given
    #[derive(Default)]
    struct FakeLlm {
        prompts: Mutex<Vec<ChatPrompt>>,
    }

    #[async_trait]
    impl LlmProvider for FakeLlm {
        async fn generate(&self, prompt: &ChatPrompt) -> Result<String> {
            let mut prompts = self.prompts.lock();
            prompts.push(prompt.clone());
            Ok(format!("<think>hmm</think> answer {}", prompts.len()))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fake"
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    struct FakeTitles {
        result: TitleOutcome,
    }

    #[async_trait]
    impl TitleProvider for FakeTitles {
        async fn generate_title(&self, _question: &str) -> Result<String> {
            self.result
                .map(str::to_string)
                .map_err(|e| Error::Title(e.to_string()))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct Fixture {
        db: ChatDb,
        llm: Arc<FakeLlm>,
        chain: ConversationalChain,
        user_id: Uuid,
        chat_id: Uuid,
    }

    type TitleOutcome = std::result::Result<&'static str, &'static str>;

    fn fixture(chunks: &[&str], embed_fails: bool, title: TitleOutcome) -> Fixture {
        let db = ChatDb::in_memory().unwrap();
        let user = db.create_user("student@example.com", "hash").unwrap();
        let chat = db.create_chat(user.id, "New Chat").unwrap();
        let llm = Arc::new(FakeLlm::default());

        let chain = ConversationalChain::new(
            db.clone(),
            Arc::new(FakeEmbedder { fail: embed_fails }),
            Arc::new(FakeStore {
                chunks: chunks.iter().map(|c| RetrievedChunk::from_content(*c)).collect(),
            }),
            llm.clone(),
            ChainConfig::default(),
        )
        .with_titles(Arc::new(FakeTitles { result: title }));

        Fixture {
            db,
            llm,
            chain,
            user_id: user.id,
            chat_id: chat.id,
        }
    }

    #[tokio::test]
    async fn test_usa_visa_question() {
        let f = fixture(&["USA visa: apply for an F-1"], false, Ok("Usa Visa Requirements"));

        let response = f
            .chain
            .ask(f.user_id, f.chat_id, "What visa do I need for the USA?")
            .await
            .unwrap();

        assert_eq!(response.answer, "answer 1");
        assert_eq!(response.sources, vec!["USA visa: apply for an F-1".to_string()]);

        let messages = f.db.list_messages(f.chat_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What visa do I need for the USA?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "answer 1");
    }

    #[tokio::test]
    async fn test_title_replaced_on_first_question_only() {
        let f = fixture(&["chunk"], false, Ok("Usa Visa Requirements"));

        f.chain.ask(f.user_id, f.chat_id, "first").await.unwrap();
        let chat = f.db.require_chat(f.user_id, f.chat_id).unwrap();
        assert_eq!(chat.title, "Usa Visa Requirements");

        f.db.rename_chat(f.user_id, f.chat_id, "Mine").unwrap();
        f.chain.ask(f.user_id, f.chat_id, "second").await.unwrap();
        let chat = f.db.require_chat(f.user_id, f.chat_id).unwrap();
        assert_eq!(chat.title, "Mine");
    }

    #[tokio::test]
    async fn test_title_failure_keeps_placeholder() {
        let f = fixture(&["chunk"], false, Err("quota exceeded"));

        let response = f.chain.ask(f.user_id, f.chat_id, "question").await;
        tokio_test::assert_ok!(&response);

        let chat = f.db.require_chat(f.user_id, f.chat_id).unwrap();
        assert_eq!(chat.title, "New Chat");
    }

    #[tokio::test]
    async fn test_empty_title_keeps_placeholder() {
        let f = fixture(&["chunk"], false, Ok(""));

        f.chain.ask(f.user_id, f.chat_id, "question").await.unwrap();
        let chat = f.db.require_chat(f.user_id, f.chat_id).unwrap();
        assert_eq!(chat.title, "New Chat");
    }

    #[tokio::test]
    async fn test_no_chunks_persists_nothing() {
        let f = fixture(&[], false, Ok("Title"));

        let response = f.chain.ask(f.user_id, f.chat_id, "anything").await.unwrap();
        assert_eq!(response.answer, "No relevant content found in the documents.");
        assert!(response.sources.is_empty());
        assert_eq!(f.db.count_messages(f.chat_id).unwrap(), 0);
        assert!(f.llm.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_second_query_sees_prior_turns() {
        let f = fixture(&["chunk"], false, Ok("Title"));

        f.chain.ask(f.user_id, f.chat_id, "Do I need a visa?").await.unwrap();
        f.chain.ask(f.user_id, f.chat_id, "How much does it cost?").await.unwrap();

        let prompts = f.llm.prompts.lock();
        assert!(prompts[0].system.contains("Previous Conversation:\n\n"));
        assert!(prompts[1]
            .system
            .contains("User: Do I need a visa?\nAssistant: answer 1"));
        assert!(prompts[1].user.contains("How much does it cost?"));
    }

    #[tokio::test]
    async fn test_history_limited_to_recent_messages() {
        let f = fixture(&["chunk"], false, Ok("Title"));
        for i in 0..6 {
            f.db
                .append_exchange(f.user_id, f.chat_id, &format!("q{}", i), &format!("a{}", i))
                .unwrap();
        }

        f.chain.ask(f.user_id, f.chat_id, "latest").await.unwrap();

        let prompts = f.llm.prompts.lock();
        assert!(!prompts[0].system.contains("User: q0\n"));
        assert!(prompts[0].system.contains("User: q1\n"));
        assert!(prompts[0].system.contains("Assistant: a5"));
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces() {
        let f = fixture(&["chunk"], true, Ok("Title"));

        let result = f.chain.ask(f.user_id, f.chat_id, "question").await;
        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(f.db.count_messages(f.chat_id).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_foreign_chat_not_found() {
        let f = fixture(&["chunk"], false, Ok("Title"));
        let other = f.db.create_user("other@example.com", "hash").unwrap();

        let result = f.chain.ask(other.id, f.chat_id, "question").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    /// Deletes the chat while the question is in flight
    struct DeletingTitles {
        db: ChatDb,
        user_id: Uuid,
        chat_id: Uuid,
    }

    #[async_trait]
    impl TitleProvider for DeletingTitles {
        async fn generate_title(&self, _question: &str) -> Result<String> {
            self.db.delete_chat(self.user_id, self.chat_id)?;
            Ok("Too Late".to_string())
        }

        fn name(&self) -> &str {
            "deleting"
        }
    }

    #[tokio::test]
    async fn test_chat_deleted_mid_query_is_not_found() {
        let db = ChatDb::in_memory().unwrap();
        let user = db.create_user("student@example.com", "hash").unwrap();
        let chat = db.create_chat(user.id, "New Chat").unwrap();

        let chain = ConversationalChain::new(
            db.clone(),
            Arc::new(FakeEmbedder { fail: false }),
            Arc::new(FakeStore {
                chunks: vec![RetrievedChunk::from_content("chunk")],
            }),
            Arc::new(FakeLlm::default()),
            ChainConfig::default(),
        )
        .with_titles(Arc::new(DeletingTitles {
            db: db.clone(),
            user_id: user.id,
            chat_id: chat.id,
        }));

        let result = chain.ask(user.id, chat.id, "question").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(db.count_messages(chat.id).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ask_once_is_stateless() {
        let f = fixture(&["a", "b", "c", "d", "e"], false, Ok("Title"));

        let response = f.chain.ask_once("question").await.unwrap();
        assert_eq!(response.sources.len(), 4);
        assert_eq!(f.db.count_messages(f.chat_id).unwrap(), 0);
        assert!(f.llm.prompts.lock()[0]
            .system
            .contains("Previous Conversation:\n\n\nRelevant Context"));
    }
}
