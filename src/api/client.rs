use reqwest::{Method, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ApiError;
use super::types::{Page, PageArgs, TeamMember, TeamMemberInput, TeamMemberUpdate};

/// HTTP client for the team member resource.
///
/// Paths are relative to the base URL, which is normalized to end in `/` so
/// that `http://host/api` and `http://host/api/` resolve `teammembers/` the
/// same way.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Transport(format!("invalid request path {path:?}: {e}")))
    }

    /// Sends one request and returns the parsed JSON body, or `None` when the
    /// response has no body.
    ///
    /// # Errors
    ///
    /// [`ApiError::Http`] for any non-2xx status, [`ApiError::Transport`] when
    /// no response arrives, [`ApiError::Decode`] when a 2xx body is not JSON.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.url(path)?;
        self.send(method, url, body).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<Value>, ApiError> {
        debug!(%method, %url, "sending request");
        let mut req = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            warn!(%method, %url, error = %e, "request failed without a response");
            ApiError::Transport(e.to_string())
        })?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            warn!(%method, %url, status = status.as_u16(), "request rejected");
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_json<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self
            .send(method, url, body)
            .await?
            .ok_or_else(|| ApiError::Decode("empty response body".to_string()))?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET teammembers/?limit=&offset=`
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn list_team_members(&self, args: PageArgs) -> Result<Page<TeamMember>, ApiError> {
        let mut url = self.url("teammembers/")?;
        url.query_pairs_mut()
            .append_pair("limit", &args.limit.to_string())
            .append_pair("offset", &args.offset.to_string());
        self.send_json::<_, Value>(Method::GET, url, None).await
    }

    /// `GET teammembers/{id}/`
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get_team_member(&self, id: &str) -> Result<TeamMember, ApiError> {
        let url = self.url(&format!("teammembers/{id}/"))?;
        self.send_json::<_, Value>(Method::GET, url, None).await
    }

    /// `POST teammembers/`
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn create_team_member(&self, input: &TeamMemberInput) -> Result<TeamMember, ApiError> {
        let url = self.url("teammembers/")?;
        self.send_json(Method::POST, url, Some(input)).await
    }

    /// `PUT teammembers/{id}/`
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn update_team_member(&self, update: &TeamMemberUpdate) -> Result<TeamMember, ApiError> {
        let url = self.url(&format!("teammembers/{}/", update.id))?;
        self.send_json(Method::PUT, url, Some(update)).await
    }

    /// `DELETE teammembers/{id}/`
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete_team_member(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("teammembers/{id}/"))?;
        self.send::<Value>(Method::DELETE, url, None).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(Url::parse(base).expect("valid url"))
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        assert_eq!(client("http://localhost:8000/api").base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(client("http://localhost:8000/api/").base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(client("http://localhost:8000").base_url().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_url_joins_relative_paths() {
        let api = client("http://localhost:8000/api");
        assert_eq!(
            api.url("teammembers/42/").expect("joins").as_str(),
            "http://localhost:8000/api/teammembers/42/"
        );
        assert_eq!(
            api.url("/teammembers/").expect("joins").as_str(),
            "http://localhost:8000/api/teammembers/"
        );
    }
}
