use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ExtractorConfig;
use crate::models::ServiceCandidate;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("API key not configured")]
    MissingApiKey,
    #[error("Page {0} is blank or has no searchable text")]
    BlankPage(u32),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Provider response has no choices")]
    EmptyResponse,
    #[error("Malformed candidate list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Candidates for one page. When `error` is set the list is empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub candidates: Vec<ServiceCandidate>,
    pub error: Option<String>,
}

/// Client for an OpenAI-compatible chat endpoint that turns drawing text into
/// service candidates with reference-sheet search terms
pub struct CandidateExtractor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl CandidateExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Extracts candidates from one page of text. Failures never escape:
    /// they come back as an empty list plus the reason.
    pub async fn extract(&self, page: u32, text: &str, api_key: Option<&str>) -> Extraction {
        match self.request_candidates(page, text, api_key).await {
            Ok(candidates) => {
                tracing::info!("[EXTRACT] Page {}: {} services", page, candidates.len());
                Extraction {
                    candidates,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("[EXTRACT] Page {} failed: {}", page, e);
                Extraction {
                    candidates: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn request_candidates(
        &self,
        page: u32,
        text: &str,
        api_key: Option<&str>,
    ) -> Result<Vec<ServiceCandidate>, ExtractError> {
        let key = api_key
            .or(self.api_key.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ExtractError::MissingApiKey)?;
        if text.trim().is_empty() {
            return Err(ExtractError::BlankPage(page));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| ExtractError::MissingApiKey)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let prompt = build_prompt(text);
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ExtractError::Status { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ExtractError::EmptyResponse)?;

        parse_candidates(&content)
    }
}

/// Parses the model's reply, tolerating a markdown code fence around the JSON array
pub fn parse_candidates(raw: &str) -> Result<Vec<ServiceCandidate>, ExtractError> {
    let cleaned = raw.trim().replace("```json", "").replace("```", "");
    Ok(serde_json::from_str(cleaned.trim())?)
}

/// Prompt asking for reference-sheet vocabulary instead of the architect's wording
pub fn build_prompt(page_text: &str) -> String {
    format!(
        r#"Atue como um Engenheiro de Custos sênior especialista na base de dados SINAPI.
Extraia os serviços do texto da prancha de arquitetura abaixo e traduza cada um para a linguagem técnica do SINAPI, fornecendo os melhores termos de busca.

Jargões do SINAPI:
- Itens de acabamento (pisos, portas, bancadas) usam "REMOÇÃO" em vez de "DEMOLIÇÃO".
- "Fazer parede" vira "ALVENARIA DE VEDAÇÃO".
- "Pintar" vira "PINTURA ACRÍLICA" ou "EMASSAMENTO".
- "Colocar piso" vira "ASSENTAMENTO DE PISO" ou "REVESTIMENTO CERÂMICO".

Regras de saída:
1. Retorne SOMENTE um array JSON puro, sem markdown.
2. Use exatamente estas chaves:
[
  {{
    "servico_original": "texto exato da prancha",
    "termo_principal": "MELHOR TERMO SINAPI",
    "termos_alternativos": ["TERMO 2", "TERMO 3", "TERMO 4", "TERMO 5"],
    "quantidade": 1.0,
    "unidade": "vb",
    "observacao": "..."
  }}
]
3. Forneça sempre de 4 a 6 termos alternativos focados em substantivos técnicos do SINAPI.

Texto bruto da prancha:
{}"#,
        page_text
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(api_key: Option<&str>) -> CandidateExtractor {
        CandidateExtractor::new(&ExtractorConfig {
            base_url: "http://127.0.0.1:9/v1/".into(),
            api_key: api_key.map(str::to_string),
            model: "test-model".into(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn parses_fenced_array() {
        let raw = "```json\n[{\"servico_original\": \"Demolir piso\", \"termo_principal\": \"REMOÇÃO DE PISO\", \"termos_alternativos\": [\"PISO CERÂMICO\"], \"quantidade\": 20}]\n```";
        let list = parse_candidates(raw).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].primary_term(), "REMOÇÃO DE PISO");
        assert_eq!(list[0].quantity(), 20.0);
    }

    #[test]
    fn malformed_reply_is_a_parse_error() {
        assert!(matches!(parse_candidates("Here are the services: ..."), Err(ExtractError::Parse(_))));
        assert!(matches!(parse_candidates("{\"servico_original\": \"x\"}"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn prompt_embeds_page_text() {
        let prompt = build_prompt("PAREDE NOVA 12m");
        assert!(prompt.ends_with("PAREDE NOVA 12m"));
        assert!(prompt.contains("\"termos_alternativos\""));
    }

    #[tokio::test]
    async fn missing_key_degrades_to_empty_list() {
        let extraction = extractor(None).extract(1, "PAREDE", None).await;
        assert!(extraction.candidates.is_empty());
        assert_eq!(extraction.error.as_deref(), Some("API key not configured"));
    }

    #[tokio::test]
    async fn blank_page_degrades_to_empty_list() {
        let extraction = extractor(Some("k")).extract(3, "  \n ", None).await;
        assert!(extraction.candidates.is_empty());
        assert!(extraction.error.unwrap().contains("Page 3"));
    }

    #[tokio::test]
    async fn unreachable_provider_degrades_to_empty_list() {
        let extraction = extractor(Some("k")).extract(1, "PAREDE", None).await;
        assert!(extraction.candidates.is_empty());
        assert!(extraction.error.is_some());
    }
}
