//! The reading engine: draw, prompt, generate, respond.
//!
//! Implements the RPC server's collaborator trait. The backend client is
//! constructed and warmed up on the first reading, then reused; generate
//! calls are serialized so the model never runs two readings at once.

use crate::deck::{Deck, Spread};
use crate::llm::LlmClient;
use crate::prompt;
use arcana_core::{Infer, InferenceGate, Mode, ReadingRequest, Result, RpcResponse};
use serde_json::json;
use tracing::{debug, info};

pub struct ReadingEngine {
    deck: Deck,
    gate: InferenceGate<LlmClient>,
    base_url: Option<String>,
    model: Option<String>,
}

impl ReadingEngine {
    pub fn new(deck: Deck, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            deck,
            gate: InferenceGate::new(),
            base_url,
            model,
        }
    }

    async fn client(&self) -> Result<&LlmClient> {
        self.gate
            .get_or_init(|| async {
                let client = LlmClient::new(self.base_url.as_deref(), self.model.as_deref());
                client.warm_up().await?;
                Ok(client)
            })
            .await
    }

    /// Assemble the success body: echo of the request, the slim cards,
    /// the keyword excerpts, and the answer text.
    fn response_body(
        &self,
        request: &ReadingRequest,
        spread: &Spread,
        answer: String,
    ) -> serde_json::Map<String, serde_json::Value> {
        let mut cards = serde_json::Map::new();
        for (role, drawn) in spread.roles() {
            cards.insert(role.to_string(), json!(self.deck.slim(drawn)));
        }

        let mut body = serde_json::Map::new();
        body.insert("mode".into(), json!(request.mode));
        body.insert("question".into(), json!(request.question));
        body.insert("information".into(), json!(request.information));
        body.insert("cards".into(), serde_json::Value::Object(cards));
        body.insert(
            "excerpts".into(),
            serde_json::Value::Object(prompt::build_excerpts(&self.deck, spread)),
        );
        body.insert("answer".into(), json!(answer));
        body
    }
}

#[async_trait::async_trait]
impl Infer for ReadingEngine {
    async fn infer(&self, request: &ReadingRequest) -> Result<RpcResponse> {
        // The caller validated the mode before dispatching.
        let mode = Mode::from_str(&request.mode).unwrap_or_default();

        let spread = self.deck.draw();
        debug!(
            "Drew spread: past={} present={} future={}",
            spread.past.number, spread.present.number, spread.future.number
        );

        let user_prompt = prompt::build_user_prompt(&self.deck, &spread, mode, request);

        let client = self.client().await?;
        let answer = self
            .gate
            .serialized(|| client.generate(prompt::SYSTEM_PROMPT, &user_prompt))
            .await?;

        info!(
            "Reading done: mode={} answer_chars={}",
            mode,
            answer.chars().count()
        );

        Ok(RpcResponse::success(self.response_body(request, &spread, answer)))
    }
}
