use serde::Deserialize;

use omb_core::{errors::Error, ports::Quote, Result};

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "quoteText")]
    text: String,
    #[serde(rename = "quoteAuthor", default)]
    author: String,
}

pub(crate) async fn fetch_quote(http: &reqwest::Client, url: &str) -> Result<Quote> {
    let query = [
        ("method", "getQuote".to_string()),
        ("format", "json".to_string()),
        ("lang", "en".to_string()),
    ];
    let resp: QuoteResponse = crate::get_json(http, url, &query).await?;
    into_quote(resp)
}

fn into_quote(resp: QuoteResponse) -> Result<Quote> {
    let text = resp.text.trim().to_string();
    if text.is_empty() {
        return Err(Error::Provider("empty quote".to_string()));
    }

    let author = match resp.author.trim() {
        "" => "Unknown".to_string(),
        a => a.to_string(),
    };
    Ok(Quote { text, author })
}
