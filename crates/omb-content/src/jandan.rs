//! jandan.net comment feeds: text jokes and picture posts.

use serde::Deserialize;

use omb_core::{ports::PictureKind, Result};

/// The feeds expose this many pages of history.
const PAGES: u32 = 300;

#[derive(Debug, Deserialize)]
struct CommentsResponse {
    status: String,
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    #[serde(default)]
    text_content: Option<String>,
    #[serde(default)]
    pics: Vec<String>,
}

fn api_method(kind: Option<PictureKind>) -> &'static str {
    match kind {
        None => "jandan.get_duan_comments",
        Some(PictureKind::Funny) => "jandan.get_pic_comments",
        Some(PictureKind::Girls) => "jandan.get_ooxx_comments",
    }
}

async fn fetch_random_comment(
    http: &reqwest::Client,
    base: &str,
    kind: Option<PictureKind>,
) -> Result<Option<Comment>> {
    let page = 1 + rand::random::<u32>() % PAGES;
    let query = [
        ("oxwlxojflwblxbsapi", api_method(kind).to_string()),
        ("page", page.to_string()),
    ];
    let resp: CommentsResponse = crate::get_json(http, base, &query).await?;
    Ok(pick_comment(resp))
}

fn pick_comment(resp: CommentsResponse) -> Option<Comment> {
    if resp.status != "ok" || resp.comments.is_empty() {
        return None;
    }
    let idx = crate::random_index(resp.comments.len());
    resp.comments.into_iter().nth(idx)
}

pub(crate) async fn fetch_joke(http: &reqwest::Client, base: &str) -> Result<Option<String>> {
    let comment = fetch_random_comment(http, base, None).await?;
    Ok(comment
        .and_then(|c| c.text_content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

pub(crate) async fn fetch_pictures(
    http: &reqwest::Client,
    base: &str,
    kind: PictureKind,
) -> Result<Option<Vec<String>>> {
    let comment = fetch_random_comment(http, base, Some(kind)).await?;
    let pics: Vec<String> = comment
        .map(|c| c.pics)
        .unwrap_or_default()
        .iter()
        .map(|uri| full_size_uri(uri))
        .collect();
    Ok(if pics.is_empty() { None } else { Some(pics) })
}

/// Swap the size segment of an image CDN URI for `large`:
/// `http://host/mw600/x.jpg` becomes `http://host/large/x.jpg`.
///
/// Protocol-relative URIs (`//host/...`) are completed with `http:`.
fn full_size_uri(uri: &str) -> String {
    let uri = if uri.starts_with("//") {
        format!("http:{uri}")
    } else {
        uri.to_string()
    };

    // Slashes at indices 0,1 (scheme), 2 (after host), 3 (after size segment).
    let slashes: Vec<usize> = uri.match_indices('/').map(|(i, _)| i).take(4).collect();
    match slashes.as_slice() {
        [_, _, host_end, size_end] => {
            format!("{}large{}", &uri[..=*host_end], &uri[*size_end..])
        }
        _ => uri,
    }
}
