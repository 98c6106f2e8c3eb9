use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ ChatClient, LlmError };
use crate::llm::{ LlmConfig, LlmType, SamplingParams };
use crate::models::chat::ChatMessage;

/// Client for any provider speaking the OpenAI `/chat/completions` dialect
/// (Groq, OpenAI).
pub struct CompletionsClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
    sampling: SamplingParams,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionsClient {
    pub fn new(
        llm_type: LlmType,
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        sampling: SamplingParams,
    ) -> Result<Self, LlmError> {
        let chat_model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| llm_type.default_model().to_string());
        let api_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| llm_type.default_base_url().to_string());
        Url::parse(&api_url).map_err(|source| LlmError::InvalidBaseUrl {
            url: api_url.clone(),
            source,
        })?;
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| LlmError::InvalidApiKey)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            api_key,
            model: chat_model,
            base_url: api_url,
            sampling,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(
            config.llm_type,
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone(),
            config.sampling,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatClient for CompletionsClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage]
    ) -> Result<String, LlmError> {
        if self.api_key.is_none() {
            return Err(LlmError::NotConfigured);
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage { role: "system", content: system_prompt });
        messages.extend(
            history.iter().map(|m| WireMessage { role: m.role.as_str(), content: &m.content })
        );

        let req = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
            stream: false,
        };

        let url = self.endpoint();
        debug!("POST {} ({} history messages)", url, history.len());
        let resp = self.http.post(&url).json(&req).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let bytes = resp.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&bytes)?;

        parsed.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{ json, Value };
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{ any, header, method, path },
    };

    fn client_for(server: &MockServer, api_key: Option<&str>) -> CompletionsClient {
        CompletionsClient::new(
            LlmType::Groq,
            api_key.map(str::to_string),
            None,
            Some(server.uri()),
            SamplingParams::default(),
        ).unwrap()
    }

    #[tokio::test]
    async fn sends_system_prompt_then_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let history = vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hey"), ChatMessage::user("Bye")];
        let reply = client.complete("You are a test.", &history).await.unwrap();
        assert_eq!(reply, "Hello!");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["max_tokens"], 350);
        assert_eq!(body["stream"], false);
        let temperature = body["temperature"].as_f64().unwrap();
        assert!((temperature - 0.65).abs() < 1e-6);
        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "You are a test." },
                { "role": "user", "content": "Hi" },
                { "role": "assistant", "content": "Hey" },
                { "role": "user", "content": "Bye" },
            ])
        );
    }

    #[tokio::test]
    async fn missing_key_never_touches_the_network() {
        let server = MockServer::start().await;
        Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let client = client_for(&server, None);
        assert!(!client.is_configured());
        let err = client.complete("sys", &[ChatMessage::user("Hi")]).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));

        let blank = client_for(&server, Some("   "));
        assert!(!blank.is_configured());
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k")).complete("sys", &[]).await.unwrap_err();
        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_or_garbled_bodies_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("k"));
        assert!(matches!(client.complete("sys", &[]).await, Err(LlmError::EmptyResponse)));
        assert!(matches!(client.complete("sys", &[]).await, Err(LlmError::Decode(_))));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let result = CompletionsClient::new(
            LlmType::OpenAI,
            Some("k".into()),
            None,
            Some("not a url".into()),
            SamplingParams::default(),
        );
        assert!(matches!(result, Err(LlmError::InvalidBaseUrl { .. })));
    }

    #[test]
    fn openai_defaults() {
        let client = CompletionsClient::new(LlmType::OpenAI, None, None, None, SamplingParams::default()).unwrap();
        assert_eq!(client.get_model(), "gpt-4o-mini");
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
    }
}
