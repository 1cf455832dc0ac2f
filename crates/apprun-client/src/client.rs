use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::ApplicationApi;
use crate::auth::AccessKey;
use crate::error::{ClientError, Result};
use crate::model::{
    Application, ApplicationList, CreateApplicationRequest, ErrorResponse, PacketFilter,
    PatchApplicationRequest,
};

/// Production endpoint of the AppRun API.
pub const DEFAULT_BASE_URL: &str = "https://secure.sakura.ad.jp/cloud/api/apprun/1.0/apprun/api/";

/// HTTP client for the AppRun application endpoints.
///
/// Every request carries the same precomputed `Authorization` header. No
/// timeout or retry policy is layered on top of reqwest's defaults.
pub struct AppRunClient {
    http: reqwest::Client,
    base_url: Url,
    auth_header: HeaderValue,
}

/// One outbound call: what it is called in error messages, which
/// application it targets and where it goes.
struct Call<'a> {
    action: &'static str,
    id: Option<&'a str>,
    url: Url,
}

impl AppRunClient {
    pub fn new(base_url: &str, access_key: &AccessKey) -> Result<Self> {
        Self::with_http_client(reqwest::Client::new(), base_url, access_key)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: &str,
        access_key: &AccessKey,
    ) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self {
            http,
            base_url,
            auth_header: access_key.authorization_header(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn call<'a>(&self, action: &'static str, id: Option<&'a str>, path: &str) -> Result<Call<'a>> {
        Ok(Call {
            action,
            id,
            url: self.base_url.join(path)?,
        })
    }

    fn request(&self, method: Method, call: &Call<'_>) -> RequestBuilder {
        self.http
            .request(method, call.url.clone())
            .header(AUTHORIZATION, self.auth_header.clone())
    }

    async fn send<T>(&self, call: Call<'_>, request: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(action = call.action, url = %call.url, "sending AppRun request");
        let resp = request.send().await.map_err(|source| ClientError::Transport {
            action: call.action,
            url: call.url.to_string(),
            source,
        })?;
        handle_response(call, resp).await
    }

    async fn send_json<B, T>(&self, method: Method, call: Call<'_>, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(method, &call).json(body);
        self.send(call, request).await
    }
}

#[async_trait]
impl ApplicationApi for AppRunClient {
    async fn list_applications(&self) -> Result<ApplicationList> {
        let call = self.call("get all application", None, "applications")?;
        let request = self.request(Method::GET, &call);
        self.send(call, request).await
    }

    async fn create_application(&self, request: &CreateApplicationRequest) -> Result<Application> {
        let call = self.call("create application", None, "applications")?;
        self.send_json(Method::POST, call, request).await
    }

    async fn get_application(&self, id: &str) -> Result<Application> {
        let call = self.call("get application", Some(id), &format!("applications/{id}"))?;
        let request = self.request(Method::GET, &call);
        self.send(call, request).await
    }

    async fn patch_application(&self, request: &PatchApplicationRequest) -> Result<Application> {
        let id = request.id.as_str();
        let call = self.call("patch application", Some(id), &format!("applications/{id}"))?;
        // PatchApplicationRequest never serializes `id`; it travels in the path only
        self.send_json(Method::PATCH, call, request).await
    }

    async fn patch_packet_filter(&self, id: &str, filter: &PacketFilter) -> Result<PacketFilter> {
        let call = self.call(
            "patch packet filter",
            Some(id),
            &format!("applications/{id}/packet_filter"),
        )?;
        self.send_json(Method::PATCH, call, filter).await
    }
}

async fn handle_response<T>(call: Call<'_>, resp: reqwest::Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let status = resp.status();
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                action = call.action,
                url = %call.url,
                status = status.as_u16(),
                error = %e,
                "failed to read AppRun response body"
            );
            String::new()
        }
    };

    if status.as_u16() >= 400 {
        if let Ok(envelope) = serde_json::from_str::<ErrorResponse>(&body) {
            tracing::warn!(
                action = call.action,
                code = envelope.error.code,
                message = %envelope.error.message,
                log_url = envelope.log_url.as_deref().unwrap_or("-"),
                "AppRun API rejected the request"
            );
        }
        return Err(ClientError::Status {
            action: call.action,
            id: call.id.map(str::to_string),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            url: call.url.to_string(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        action: call.action,
        url: call.url.to_string(),
        source,
    })
}
