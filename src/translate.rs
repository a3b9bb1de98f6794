use anyhow::{Context, Result};
use serde_json::Value;

/// Client for the public Google translate web endpoint.
///
/// The endpoint answers `GET /translate_a/single?client=gtx&sl=auto&tl=<dest>
/// &dt=t&q=<text>` with a nested JSON array: the translated segments live at
/// `[0][i][0]` and the detected source language at `[2]`. One request serves
/// both detection and translation.
#[derive(Clone)]
pub struct Translator {
    client: reqwest::Client,
    base_url: String,
}

impl Translator {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Detect the language of `text`, returning the provider's language code.
    pub async fn detect(&self, text: &str) -> Result<String> {
        // Any destination works for detection; the detected source language
        // comes back regardless.
        let body = self.fetch(text, "en").await?;

        body.get(2)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .context("Translation response carried no detected language")
    }

    /// Translate `text` into the destination language code.
    pub async fn translate(&self, text: &str, dest: &str) -> Result<String> {
        let body = self.fetch(text, dest).await?;

        let segments = body
            .get(0)
            .and_then(Value::as_array)
            .context("Translation response carried no segments")?;

        // Long inputs are split into sentence segments; the translation is
        // their concatenation.
        let mut translated = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(Value::as_str) {
                translated.push_str(part);
            }
        }

        if translated.is_empty() {
            anyhow::bail!("Translation response contained no translated text");
        }

        Ok(translated)
    }

    async fn fetch(&self, text: &str, dest: &str) -> Result<Value> {
        let url = format!("{}/translate_a/single", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", dest),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("Failed to send request to translation endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!("Translation endpoint error ({}): {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse translation response")
    }
}
