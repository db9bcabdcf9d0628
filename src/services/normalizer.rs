use crate::models::{NormalizedQuery, SongInfo};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

const MAX_ATTEMPTS: u32 = 3;
const ATTEMPT_DELAY: Duration = Duration::from_secs(10);

/// Instruction block sent ahead of the query. The examples are fake data
/// so the model cannot mistake them for the input.
const EXTRACT_PROMPT: &str = r#"### Remove artist names from song titles

**Delete:**

* Everything **before** `-` or `:`
* `(feat. ...)`, `(ft. ...)`, `(featuring ...)` **anywhere** in the title

**Keep:**

* Only the actual song name (trim spaces) (No ft or names of artists)

**Return JSON only. No hello. No extra words.**

---

### Examples (DO NOT PROCESS - FAKE DATA)

**Input (Example Only, Do Not Process):**
`Nebula Vibes (feat. Zeta Ray & Comet Child) [DJ Quanta Remix]`
**Output:**

```json
{
  "title": "Nebula Vibes",
  "artist": ["Zeta Ray", "Comet Child", "DJ Quanta"]
}
```

**Input (Example Only, Do Not Process):**
`Echo Prime - Lunar Drift (ft. Nova Ghost)`
**Output:**

```json
{
  "title": "Lunar Drift",
  "artist": ["Echo Prime", "Nova Ghost"]
}
```

**Input (Example Only, Do Not Process):**
`Synth Fox & Melody Arc - Light Pulse`
**Output:**

```json
{
  "title": "Light Pulse",
  "artist": ["Synth Fox", "Melody Arc"]
}
```

**Input (Example Only, Do Not Process):**
`Crimson Veil: Skybreak (ft. Phantom Note)`
**Output:**

```json
{
  "title": "Skybreak",
  "artist": ["Crimson Veil", "Phantom Note"]
}
```"#;

/// A structured-generation call that turns a raw song query into the
/// JSON text of a `{title, artist[]}` object.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn extract_song_details(&self, raw_query: &str) -> anyhow::Result<String>;
}

/// Delay between normalization attempts. Constant in production; kept as
/// its own type so a backoff curve can be swapped in without touching the
/// retry or validation logic.
#[derive(Debug, Clone)]
pub enum RetryDelay {
    None,
    Constant(Duration),
}

impl RetryDelay {
    async fn wait(&self) {
        match self {
            RetryDelay::None => {}
            RetryDelay::Constant(d) => tokio::time::sleep(*d).await,
        }
    }
}

/// Optional AI pass over the raw query. Failure here never aborts the
/// pipeline; the caller always gets usable `SongInfo` back.
pub struct QueryNormalizer {
    model: Option<Arc<dyn LanguageModel>>,
    delay: RetryDelay,
}

/// What the response schema obliges the model to produce. Parsing with
/// serde is the validation: both fields required, artist a string array.
#[derive(Debug, Deserialize)]
struct ExtractedSong {
    title: String,
    artist: Vec<String>,
}

impl QueryNormalizer {
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self::with_delay(model, RetryDelay::Constant(ATTEMPT_DELAY))
    }

    pub fn with_delay(model: Option<Arc<dyn LanguageModel>>, delay: RetryDelay) -> Self {
        Self { model, delay }
    }

    pub async fn normalize(&self, raw_query: &str, requested: bool) -> NormalizedQuery {
        let model = match (&self.model, requested) {
            (Some(model), true) => model,
            _ => return NormalizedQuery::Fallback(SongInfo::raw(raw_query)),
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match model.extract_song_details(raw_query).await {
                Ok(text) => match parse_extraction(&text) {
                    Some(song) => {
                        tracing::debug!(
                            "Normalized \"{}\" to \"{}\" on attempt {}",
                            raw_query,
                            song.title,
                            attempt
                        );
                        return NormalizedQuery::Normalized(song);
                    }
                    None => {
                        tracing::warn!(
                            "Attempt {}: model returned invalid extraction for \"{}\"",
                            attempt,
                            raw_query
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!("Attempt {}: extraction call failed: {}", attempt, e);
                }
            }

            if attempt < MAX_ATTEMPTS {
                self.delay.wait().await;
            }
        }

        tracing::warn!(
            "Query normalization exhausted {} attempts, falling back to raw query",
            MAX_ATTEMPTS
        );
        NormalizedQuery::Fallback(SongInfo::raw(raw_query))
    }
}

fn parse_extraction(text: &str) -> Option<SongInfo> {
    let extracted: ExtractedSong = serde_json::from_str(text).ok()?;
    if extracted.title.trim().is_empty() {
        return None;
    }
    Some(SongInfo {
        title: extracted.title,
        artists: extracted.artist,
    })
}

pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn extract_song_details(&self, raw_query: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": EXTRACT_PROMPT },
                    { "text": format!("# Process with this:\n\n**Input:**\n`{}`", raw_query) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "required": ["title", "artist"],
                    "properties": {
                        "title": {
                            "type": "STRING",
                            "description": "Cleaned song title with artist names removed, remix/version info preserved"
                        },
                        "artist": {
                            "type": "ARRAY",
                            "description": "Ordered list of all artists as they appear in the original title",
                            "items": { "type": "STRING" }
                        }
                    }
                }
            }
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                GEMINI_API_URL, GEMINI_MODEL
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_json: serde_json::Value = response.json().await?;
        if !status.is_success() {
            anyhow::bail!("Gemini API returned status {}: {}", status, response_json);
        }

        let text = response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Gemini response carried no text part"))?;

        Ok(text.to_string())
    }
}
