//! Terms and conditions endpoints

use crate::api::{path_segment, with_query};
use crate::error::ClientError;
use crate::services::BitsoClient;
use serde::Serialize;
use serde_json::Value;

pub const TERMS_PATH: &str = "/api/v3/terms";

/// Which terms to fetch or accept, and how to render them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermsQuery {
    /// Jurisdiction codes, e.g. `["MX", "CO"]`
    pub jurisdictions: Vec<String>,
    pub include_text: bool,
    pub markdown: bool,
}

impl TermsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jurisdictions<I, S>(mut self, jurisdictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jurisdictions = jurisdictions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_include_text(mut self, include_text: bool) -> Self {
        self.include_text = include_text;
        self
    }

    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    /// `/api/v3/terms[/MX,CO][?include_text=1&markdown=1]`
    pub fn path(&self) -> Result<String, ClientError> {
        let mut path = TERMS_PATH.to_string();

        if !self.jurisdictions.is_empty() {
            let codes = self
                .jurisdictions
                .iter()
                .map(|j| path_segment("jurisdiction", j))
                .collect::<Result<Vec<_>, _>>()?;
            path.push('/');
            path.push_str(&codes.join(","));
        }

        let mut params = Vec::new();
        if self.include_text {
            params.push(("include_text", "1"));
        }
        if self.markdown {
            params.push(("markdown", "1"));
        }

        Ok(with_query(path, &params))
    }
}

/// Body of the accept-terms call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptTerms {
    /// `1` to agree, `0` otherwise
    pub agree_to_terms: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl AcceptTerms {
    pub fn new(agree: bool, password: Option<String>) -> Self {
        Self {
            agree_to_terms: u8::from(agree),
            password: password.filter(|p| !p.is_empty()),
        }
    }
}

/// `GET /api/v3/terms...`
pub async fn get_terms(client: &BitsoClient, query: &TermsQuery) -> Result<Value, ClientError> {
    let path = query.path()?;
    client.get(&path).await
}

/// `POST /api/v3/terms...`
pub async fn accept_terms(
    client: &BitsoClient,
    query: &TermsQuery,
    acceptance: &AcceptTerms,
) -> Result<Value, ClientError> {
    if query.jurisdictions.is_empty() {
        return Err(ClientError::InvalidArgument(
            "at least one jurisdiction is required to accept terms".to_string(),
        ));
    }

    let path = query.path()?;
    tracing::info!(
        path = %path,
        agree = acceptance.agree_to_terms,
        "Submitting terms acceptance"
    );
    client.post(&path, acceptance).await
}
