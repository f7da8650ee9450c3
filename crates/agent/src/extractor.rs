//! Constraint extraction behind a single trait, with a model-backed variant
//! and a deterministic rule-based variant. The extractor is strictly a
//! translator: it never decides search results, relaxation, or turn outcomes.

use async_trait::async_trait;
use serde::Deserialize;

use finda_core::{
    Extraction, ExtractionContext, ExtractionIntent, Lexicon, MemberDelta, RuleBasedParser,
};

use crate::llm::LlmClient;

#[async_trait]
pub trait ConstraintExtractor: Send + Sync {
    async fn extract(&self, text: &str, context: &ExtractionContext) -> Extraction;
}

/// Deterministic extractor. Also the fallback when the model misbehaves.
pub struct RuleBasedExtractor {
    parser: RuleBasedParser,
}

impl RuleBasedExtractor {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { parser: RuleBasedParser::new(lexicon) }
    }
}

#[async_trait]
impl ConstraintExtractor for RuleBasedExtractor {
    async fn extract(&self, text: &str, context: &ExtractionContext) -> Extraction {
        self.parser.parse(text, context)
    }
}

/// Model-backed extractor. Prompts for a strict JSON envelope and falls back
/// to the rule-based parser on transport or parse failure, so a flaky model
/// can degrade quality but never break a turn.
pub struct LlmExtractor<C> {
    client: C,
    fallback: RuleBasedParser,
}

impl<C> LlmExtractor<C>
where
    C: LlmClient,
{
    pub fn new(client: C, lexicon: Lexicon) -> Self {
        Self { client, fallback: RuleBasedParser::new(lexicon) }
    }

    fn build_prompt(&self, text: &str, context: &ExtractionContext) -> String {
        let mut prompt = String::from(
            "Translate the user's message into a JSON object with fields \
             \"intent\" (one of \"refine\", \"cancel\", \"out_of_scope\") and \
             \"delta\" (constraint changes). Respond with JSON only.\n",
        );
        if let Some(summary) = &context.summary {
            prompt.push_str("Known constraints so far: ");
            prompt.push_str(summary);
            prompt.push('\n');
        }
        if let Some(slot) = context.pending_question {
            prompt.push_str(&format!("The user was just asked about: {slot:?}\n"));
        }
        prompt.push_str("User message: ");
        prompt.push_str(text);
        prompt
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireIntent {
    Refine,
    Cancel,
    OutOfScope,
}

#[derive(Debug, Deserialize)]
struct WireExtraction {
    intent: WireIntent,
    #[serde(default)]
    delta: MemberDelta,
}

fn parse_wire(raw: &str) -> Option<Extraction> {
    let trimmed = raw.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    let wire: WireExtraction = serde_json::from_str(trimmed).ok()?;
    let intent = match wire.intent {
        WireIntent::Refine => ExtractionIntent::Refine,
        WireIntent::Cancel => ExtractionIntent::Cancel,
        WireIntent::OutOfScope => ExtractionIntent::OutOfScope,
    };
    Some(Extraction { intent, delta: wire.delta })
}

#[async_trait]
impl<C> ConstraintExtractor for LlmExtractor<C>
where
    C: LlmClient,
{
    async fn extract(&self, text: &str, context: &ExtractionContext) -> Extraction {
        let prompt = self.build_prompt(text, context);
        match self.client.complete(&prompt).await {
            Ok(raw) => {
                if let Some(extraction) = parse_wire(&raw) {
                    extraction
                } else {
                    tracing::warn!(event = "extractor_parse_failed", "model reply was not valid extraction JSON, using rule-based fallback");
                    self.fallback.parse(text, context)
                }
            }
            Err(error) => {
                tracing::warn!(event = "extractor_call_failed", error = %error, "model call failed, using rule-based fallback");
                self.fallback.parse(text, context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use finda_core::{ExtractionContext, ExtractionIntent, Lexicon};

    use super::{ConstraintExtractor, LlmExtractor, RuleBasedExtractor};
    use crate::llm::LlmClient;

    struct CannedClient(Result<&'static str, &'static str>);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match self.0 {
                Ok(reply) => Ok(reply.to_string()),
                Err(message) => bail!(message),
            }
        }
    }

    fn lexicon() -> Lexicon {
        Lexicon { brands: vec!["Pars".to_string()], cities: vec!["Tehran".to_string()] }
    }

    #[tokio::test]
    async fn rule_based_extractor_delegates_to_the_parser() {
        let extractor = RuleBasedExtractor::new(lexicon());
        let extraction =
            extractor.extract("a Pars kettle under 2m", &ExtractionContext::default()).await;

        assert_eq!(extraction.intent, ExtractionIntent::Refine);
        assert_eq!(extraction.delta.brands, vec!["Pars"]);
        assert_eq!(extraction.delta.max_price, Some(2_000_000));
    }

    #[tokio::test]
    async fn model_json_is_decoded_into_an_extraction() {
        let client = CannedClient(Ok(
            r#"{"intent": "refine", "delta": {"cities": ["Tehran"], "warranty_required": true}}"#,
        ));
        let extractor = LlmExtractor::new(client, lexicon());
        let extraction = extractor.extract("anything", &ExtractionContext::default()).await;

        assert_eq!(extraction.intent, ExtractionIntent::Refine);
        assert_eq!(extraction.delta.cities, vec!["Tehran"]);
        assert_eq!(extraction.delta.warranty_required, Some(true));
    }

    #[tokio::test]
    async fn out_of_scope_intent_survives_the_wire() {
        let client = CannedClient(Ok(r#"{"intent": "out_of_scope"}"#));
        let extractor = LlmExtractor::new(client, lexicon());
        let extraction = extractor.extract("what's the weather", &ExtractionContext::default()).await;
        assert_eq!(extraction.intent, ExtractionIntent::OutOfScope);
    }

    #[tokio::test]
    async fn garbage_model_output_falls_back_to_rules() {
        let client = CannedClient(Ok("sorry, I can't do JSON today"));
        let extractor = LlmExtractor::new(client, lexicon());
        let extraction =
            extractor.extract("Pars kettle in Tehran", &ExtractionContext::default()).await;

        assert_eq!(extraction.intent, ExtractionIntent::Refine);
        assert_eq!(extraction.delta.brands, vec!["Pars"]);
        assert_eq!(extraction.delta.cities, vec!["Tehran"]);
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_rules() {
        let client = CannedClient(Err("connection refused"));
        let extractor = LlmExtractor::new(client, lexicon());
        let extraction = extractor.extract("kettle", &ExtractionContext::default()).await;

        assert_eq!(extraction.intent, ExtractionIntent::Refine);
        assert_eq!(extraction.delta.keywords, vec!["kettle"]);
    }

    #[tokio::test]
    async fn fenced_model_output_is_unwrapped() {
        let client = CannedClient(Ok("```json\n{\"intent\": \"cancel\"}\n```"));
        let extractor = LlmExtractor::new(client, lexicon());
        let extraction = extractor.extract("stop", &ExtractionContext::default()).await;
        assert_eq!(extraction.intent, ExtractionIntent::Cancel);
    }
}
