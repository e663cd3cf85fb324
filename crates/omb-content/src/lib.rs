//! HTTP content providers behind the bot's informational commands.
//!
//! Every fetch is best-effort: failures are logged here and surface to the core
//! as "no content".

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use omb_core::{
    errors::Error,
    ports::{ContentProvider, PictureKind, Quote},
    Result,
};

mod coliru;
mod forismatic;
mod jandan;

pub use coliru::COMPILE_COMMAND;

/// Upstream endpoints. Overridable for self-hosted mirrors.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub quote: String,
    pub jandan: String,
    pub compile: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            quote: "http://api.forismatic.com/api/1.0/".to_string(),
            jandan: "http://jandan.net/".to_string(),
            compile: "http://coliru.stacked-crooked.com/compile".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpContentProvider {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpContentProvider {
    pub fn new(endpoints: Endpoints, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("invalid http proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;

        Ok(Self { http, endpoints })
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn quote(&self) -> Option<Quote> {
        forismatic::fetch_quote(&self.http, &self.endpoints.quote)
            .await
            .map_err(|e| warn!("quote: {e}"))
            .ok()
    }

    async fn joke(&self) -> Option<String> {
        jandan::fetch_joke(&self.http, &self.endpoints.jandan)
            .await
            .map_err(|e| warn!("joke: {e}"))
            .ok()
            .flatten()
    }

    async fn pictures(&self, kind: PictureKind) -> Option<Vec<String>> {
        jandan::fetch_pictures(&self.http, &self.endpoints.jandan, kind)
            .await
            .map_err(|e| warn!(?kind, "pictures: {e}"))
            .ok()
            .flatten()
    }

    async fn run_code(&self, source: &str) -> Option<String> {
        coliru::compile_and_run(&self.http, &self.endpoints.compile, source)
            .await
            .map_err(|e| warn!("run code: {e}"))
            .ok()
    }
}

/// GET `url` and decode a JSON body, mapping every failure to `Error::Provider`.
async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    let resp = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| Error::Provider(format!("request error: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Provider(format!(
            "{url} failed: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    let raw = resp
        .text()
        .await
        .map_err(|e| Error::Provider(format!("body read error: {e}")))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Uniform pick in `0..len`. `len` must be non-zero.
fn random_index(len: usize) -> usize {
    rand::random::<u32>() as usize % len
}
