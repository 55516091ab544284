use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::traits::{Translator, TranslatorInfo};
use crate::config::{Lang, TranslatorConfig};
use crate::error::{Error, Result};

/// OpenAI-compatible API translator
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
pub struct OpenAiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Number of attempts per request
    pub retry_count: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiTranslator {
    /// Create a translator from configuration.
    ///
    /// Fails when the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::TranslatorInit(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            retry_count: config.retry_count.max(1),
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn create_prompt(text: &str, source: &Lang, target: &Lang) -> String {
        format!(
            "Translate the following text from {} into {}. Output only the translation, no explanations.\n\nText: \"{}\"",
            language_name(source),
            language_name(target),
            text
        )
    }

    fn create_batch_prompt(texts: &[String], source: &Lang, target: &Lang) -> Result<String> {
        let payload = serde_json::to_string(texts)
            .map_err(|e| Error::TranslationRequest(format!("Failed to encode batch: {e}")))?;
        Ok(format!(
            "Translate each string of the following JSON array from {} into {}. \
            Answer with a JSON array of exactly {} strings in the same order, one translation per input string, \
            and nothing else.\n\n{}",
            language_name(source),
            language_name(target),
            texts.len(),
            payload
        ))
    }

    /// Send a single-message chat completion with retry logic, returning the
    /// raw message content.
    async fn request_with_retry(&self, prompt: String) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: Some(0.3), // Lower temperature for more consistent translations
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            let mut req = self.client.post(&url).json(&request);

            if let Some(ref key) = self.api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }

            match req.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        match response.json::<ChatResponse>().await {
                            Ok(chat_response) => {
                                if let Some(choice) = chat_response.choices.into_iter().next() {
                                    return Ok(choice.message.content);
                                }
                                last_error = Some(Error::TranslationInvalidResponse(
                                    "No choices in response".to_string(),
                                ));
                            }
                            Err(e) => {
                                warn!("Failed to parse response: {}", e);
                                last_error = Some(Error::TranslationInvalidResponse(e.to_string()));
                            }
                        }
                    } else if response.status().as_u16() == 429 {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse().ok());

                        warn!("Rate limited, retry after {:?}s", retry_after);
                        last_error = Some(Error::TranslationRateLimited { retry_after });

                        // Wait longer on rate limit
                        let wait_time = retry_after.unwrap_or(5) * 1000;
                        tokio::time::sleep(Duration::from_millis(wait_time)).await;
                        continue;
                    } else {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        warn!("API error: {} - {}", status, body);
                        last_error = Some(Error::TranslationRequest(format!(
                            "HTTP {status}: {body}"
                        )));
                    }
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    if e.is_timeout() {
                        last_error = Some(Error::TranslationTimeout);
                    } else {
                        last_error = Some(Error::TranslationRequest(e.to_string()));
                    }
                }
            }

            if attempt + 1 < self.retry_count {
                tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: false, // Optional for local servers
            native_batching: true,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        if text.trim().is_empty() || source == target {
            return Ok(text.to_string());
        }

        let content = self
            .request_with_retry(Self::create_prompt(text, source, target))
            .await?;
        Ok(clean_translation(&content))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source: &Lang,
        target: &Lang,
    ) -> Result<Vec<String>> {
        if texts.is_empty() || source == target {
            return Ok(texts.to_vec());
        }
        if let [text] = texts {
            return Ok(vec![self.translate(text, source, target).await?]);
        }

        let content = self
            .request_with_retry(Self::create_batch_prompt(texts, source, target)?)
            .await?;
        parse_batch_response(&content, texts.len())
    }
}

/// Strip whitespace and the quotes models like to wrap answers in.
fn clean_translation(content: &str) -> String {
    content
        .trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .to_string()
}

/// Extract the JSON array of translations from a chat answer, tolerating
/// Markdown code fences and surrounding prose.
fn parse_batch_response(content: &str, expected: usize) -> Result<Vec<String>> {
    let start = content.find('[');
    let end = content.rfind(']');
    let array = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(Error::TranslationInvalidResponse(
                "No JSON array in batch response".to_string(),
            ));
        }
    };

    let translations: Vec<String> = serde_json::from_str(array)
        .map_err(|e| Error::TranslationInvalidResponse(format!("Malformed batch response: {e}")))?;

    if translations.len() != expected {
        return Err(Error::TranslationInvalidResponse(format!(
            "Expected {expected} translations, got {}",
            translations.len()
        )));
    }

    Ok(translations.iter().map(|t| t.trim().to_string()).collect())
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> &'static str {
    match lang.as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "nl" => "Dutch",
        "pt" => "Portuguese",
        "pl" => "Polish",
        // For unknown languages, the LLM should still understand most ISO codes
        _ => "the specified language",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_language_name() {
        assert_eq!(language_name(&Lang::new("de")), "German");
        assert_eq!(language_name(&Lang::new("en")), "English");
        assert_eq!(language_name(&Lang::new("unknown")), "the specified language");
    }

    #[test]
    fn test_clean_translation_strips_quotes() {
        assert_eq!(clean_translation("  \"Good morning\"\n"), "Good morning");
    }

    #[test]
    fn test_parse_batch_response_with_code_fence() {
        let content = "```json\n[\"house\", \"tree\"]\n```";
        assert_eq!(
            parse_batch_response(content, 2).unwrap(),
            vec!["house".to_string(), "tree".to_string()]
        );
    }

    #[test]
    fn test_parse_batch_response_length_mismatch() {
        assert!(matches!(
            parse_batch_response("[\"house\"]", 2),
            Err(Error::TranslationInvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_batch_response_without_array() {
        assert!(parse_batch_response("Sorry, I cannot do that.", 1).is_err());
    }

    #[test]
    fn test_batch_prompt_embeds_json() {
        let texts = vec!["Guten \"Tag\"".to_string()];
        let prompt =
            OpenAiTranslator::create_batch_prompt(&texts, &Lang::new("de"), &Lang::new("en")).unwrap();
        assert!(prompt.contains(r#"["Guten \"Tag\""]"#));
        assert!(prompt.contains("from German into English"));
    }

    #[tokio::test]
    async fn test_same_language_is_identity() {
        let translator = OpenAiTranslator::new(&TranslatorConfig::default()).unwrap();
        let lang = Lang::new("de");
        let texts = vec!["Hallo".to_string(), "Welt".to_string()];
        assert_eq!(translator.translate_batch(&texts, &lang, &lang).await.unwrap(), texts);
    }
}
