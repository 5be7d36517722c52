use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    UnexpectedStatus(reqwest::StatusCode),
}

/// What the server said about the session. `valid: false` is authoritative,
/// the session is gone and no retry will bring it back.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Verdict {
    pub valid: bool,
    #[serde(default)]
    pub role: Option<i16>,
    #[serde(default)]
    pub user: Option<VerdictUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct VerdictUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginOutcome {
    pub ok: bool,
    pub redirect: String,
    pub role: i16,
    pub user: VerdictUser,
}

/// One authoritative session check against the server.
#[async_trait]
pub trait SessionProbe: Send + Sync + 'static {
    async fn validate(&self) -> Result<Verdict, ProbeError>;
}

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Talks to the portal API over http, holding the session cookie in an
/// in-memory jar.
pub struct HttpProbe {
    client: reqwest::Client,
    base: String,
}

impl HttpProbe {
    pub fn new(base: impl Into<String>) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()?;

        let base = base.into();

        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `Ok(None)` is a credential rejection, the caller cannot tell whether
    /// the username or the password was wrong.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<LoginOutcome>, ProbeError> {
        let response = self
            .client
            .post(format!("{}/v1/login", self.base))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(Some(response.json().await?)),
            reqwest::StatusCode::UNAUTHORIZED => Ok(None),
            status => Err(ProbeError::UnexpectedStatus(status)),
        }
    }

    pub async fn logout(&self) -> Result<(), ProbeError> {
        let response = self
            .client
            .post(format!("{}/v1/logout", self.base))
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => Ok(()),
            status => Err(ProbeError::UnexpectedStatus(status)),
        }
    }
}

#[async_trait]
impl SessionProbe for HttpProbe {
    async fn validate(&self) -> Result<Verdict, ProbeError> {
        let response = self
            .client
            .get(format!("{}/v1/session", self.base))
            .send()
            .await?;

        match response.status() {
            // Both carry a verdict body. Anything else means the server
            // could not answer, which is not a verdict.
            reqwest::StatusCode::OK | reqwest::StatusCode::UNAUTHORIZED => {
                Ok(response.json().await?)
            }
            status => Err(ProbeError::UnexpectedStatus(status)),
        }
    }
}
