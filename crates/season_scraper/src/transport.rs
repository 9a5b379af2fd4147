use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Proxy};

use crate::config::{ClientSettings, ProxySettings, DEFAULT_USER_AGENTS};
use crate::error::TransportError;

/// The raw document for one request, owned by the fetch step until parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
	pub status: u16,
	pub body: String,
}

impl HttpResponse {
	pub const fn is_success(&self) -> bool {
		self.status >= 200 && self.status < 300
	}

	/// Statuses meaning the page does not exist, so retrying is pointless.
	pub const fn is_absent(&self) -> bool {
		matches!(self.status, 404 | 410)
	}
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
	async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct UserAgentPool(Vec<String>);

impl UserAgentPool {
	pub fn new(agents: &[String]) -> Self {
		Self(agents.to_vec())
	}

	pub fn pick(&self) -> &str {
		self.0.choose(&mut rand::thread_rng()).map_or(DEFAULT_USER_AGENTS[0], String::as_str)
	}
}

pub struct ReqwestTransport {
	client: Client,
}

impl ReqwestTransport {
	/// Builds a client that ignores proxy environment variables and only uses `proxy.explicit`.
	pub fn new(settings: &ClientSettings, proxy: &ProxySettings) -> Result<Self, TransportError> {
		let mut headers = HeaderMap::new();
		for (name, value) in &settings.headers {
			let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::InvalidHeader {
				name: name.clone(),
				reason: e.to_string(),
			})?;
			let header_value = HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
				name: name.clone(),
				reason: e.to_string(),
			})?;
			headers.insert(header_name, header_value);
		}

		let mut builder = Client::builder().timeout(settings.timeout()).default_headers(headers).no_proxy();
		if let Some(url) = &proxy.explicit {
			builder = builder.proxy(Proxy::all(url).map_err(TransportError::Build)?);
		}
		if settings.accept_invalid_certs {
			tracing::warn!("TLS certificate verification disabled");
			builder = builder.danger_accept_invalid_certs(true);
		}

		let client = builder.build().map_err(TransportError::Build)?;
		Ok(Self { client })
	}
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
	async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
		let response = self.client.get(url).header(USER_AGENT, user_agent).send().await.map_err(TransportError::Request)?;
		let status = response.status().as_u16();
		let body = response.text().await.map_err(TransportError::Request)?;
		Ok(HttpResponse { status, body })
	}
}
