use serde::Serialize;

use omb_core::{errors::Error, Result};

/// Build-and-run command line sent with every snippet.
pub const COMPILE_COMMAND: &str = "g++ -std=c++1z -O3 -Wall -Wextra -pedantic-errors \
main.cpp -pthread -lm -latomic -lstdc++fs && ./a.out";

#[derive(Debug, Serialize)]
struct CompileRequest<'a> {
    cmd: &'a str,
    src: &'a str,
}

/// POST the snippet to the remote compiler and return its combined output.
pub(crate) async fn compile_and_run(
    http: &reqwest::Client,
    url: &str,
    source: &str,
) -> Result<String> {
    let body = CompileRequest {
        cmd: COMPILE_COMMAND,
        src: source,
    };

    let resp = http
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Provider(format!("compile request error: {e}")))?;

    if !resp.status().is_success() {
        return Err(Error::Provider(format!(
            "compile request failed: {}",
            resp.status()
        )));
    }

    resp.text()
        .await
        .map_err(|e| Error::Provider(format!("compile output read error: {e}")))
}
