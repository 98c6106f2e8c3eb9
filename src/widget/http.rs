use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ ChatTransport, TransportError };
use crate::models::chat::ChatMessage;

/// Posts the conversation to a running proxy's `/api/chat`.
pub struct HttpTransport {
    http: HttpClient,
    endpoint: Url,
}

#[derive(Serialize)]
struct OutgoingChat<'a> {
    messages: &'a [ChatMessage],
}

/// Read loosely: a 400 envelope carries `error` and no `reply`, which the
/// widget turns into its empty-reply fallback.
#[derive(Deserialize)]
struct IncomingReply {
    #[serde(default)]
    reply: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint).map_err(|source| TransportError::InvalidEndpoint {
            url: endpoint.to_string(),
            source,
        })?;
        let http = HttpClient::builder().build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn post(&self, messages: &[ChatMessage]) -> Result<Option<String>, TransportError> {
        let resp = self.http
            .post(self.endpoint.clone())
            .json(&OutgoingChat { messages })
            .send()
            .await?
            .json::<IncomingReply>()
            .await?;
        Ok(resp.reply)
    }
}
