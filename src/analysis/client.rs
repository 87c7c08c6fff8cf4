// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Single-shot text generation against Gemini generateContent, with deterministic per-tier fallback text
// role: analysis/client
// inputs: Tier, rendered prompt; backend credential and model name at construction
// outputs: Raw model text, or fallback text that follows the tier's output contract
// side_effects: Network calls to generativelanguage.googleapis.com (GeminiBackend); reads a JSON file (FixtureBackend)
// invariants:
// - At most one backend attempt per call; no retry
// - generate never fails: backend errors map to score 0, empty output maps to score 50
// - The client is built once and passed by reference; no global state
// errors: Backend errors are logged with tracing::warn! and folded into the fallback text
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ext::serde_json::JsonFetch;
use crate::model::Tier;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Env var naming a JSON file of canned responses; when set, the fixture backend replaces Gemini.
pub const LLM_FIXTURE_ENV: &str = "RR_TEST_LLM_FIXTURE";

#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
  pub tier: Tier,
  pub prompt: &'a str,
}

/// Vendor seam for the generative model.
pub trait ModelBackend {
  fn generate_content(&self, req: &GenerationRequest<'_>) -> Result<String>;

  fn describe(&self) -> String {
    "model backend".to_string()
  }
}

/// Wraps a backend and guarantees a parseable answer for every call.
pub struct TextGenerationClient {
  backend: Box<dyn ModelBackend>,
}

impl TextGenerationClient {
  pub fn new(backend: Box<dyn ModelBackend>) -> Self {
    Self { backend }
  }

  pub fn describe(&self) -> String {
    self.backend.describe()
  }

  pub fn generate(&self, tier: Tier, prompt: &str) -> String {
    let req = GenerationRequest { tier, prompt };

    match self.backend.generate_content(&req) {
      Ok(text) if text.trim().is_empty() => {
        tracing::warn!(tier = %tier, "model returned no text content");
        empty_output_text(tier)
      }
      Ok(text) => text,
      Err(err) => {
        tracing::warn!(tier = %tier, error = %format!("{err:#}"), "model call failed");
        failure_text(tier, &format!("{err:#}"))
      }
    }
  }
}

/// Fallback for a failed call; parses to score 0.
pub fn failure_text(tier: Tier, cause: &str) -> String {
  format!(
    "{}: 0\nJustification: Model call failed: {}\nActionable Improvements:\n- Check the API key, network connectivity, or rate limits.",
    tier.score_label(),
    crate::util::one_line(cause)
  )
}

/// Fallback for an empty answer; parses to score 50.
pub fn empty_output_text(tier: Tier) -> String {
  format!(
    "{}: 50\nJustification: The model returned no text content.\nActionable Improvements:\n- Re-run the analysis or revise the prompt input.",
    tier.score_label()
  )
}

// --- Gemini wire shapes ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
  contents: Vec<RequestContent<'a>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
  role: &'static str,
  parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
  text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
  text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  block_reason: Option<String>,
}

/// Text of the first candidate, parts concatenated. A blocked prompt is an error.
fn candidate_text(resp: GenerateContentResponse) -> Result<String> {
  if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
    bail!("prompt blocked: {}", reason);
  }

  let text = resp
    .candidates
    .into_iter()
    .next()
    .and_then(|c| c.content)
    .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
    .unwrap_or_default();

  Ok(text)
}

/// One row of `list_models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
  pub name: String,
  pub display_name: String,
  pub supports_generate_content: bool,
}

pub struct GeminiBackend {
  api_key: String,
  model: String,
  base_url: String,
  agent: ureq::Agent,
}

impl GeminiBackend {
  pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
    Self::with_base_url(api_key, model, GEMINI_API_BASE)
  }

  pub fn with_base_url(api_key: impl Into<String>, model: impl Into<String>, base_url: &str) -> Self {
    let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(120)).build();

    Self {
      api_key: api_key.into(),
      model: model.into(),
      base_url: base_url.trim_end_matches('/').to_string(),
      agent,
    }
  }

  fn generate_url(&self) -> String {
    let model = self.model.trim_start_matches("models/");
    format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
  }

  /// Models visible to the API key, following `nextPageToken`.
  pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
    let mut out = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
      let mut req = self
        .agent
        .get(&format!("{}/v1beta/models", self.base_url))
        .query("pageSize", "100")
        .set("x-goog-api-key", &self.api_key);

      if let Some(t) = &page_token {
        req = req.query("pageToken", t);
      }

      let v: serde_json::Value = req
        .call()
        .map_err(describe_ureq_error)?
        .into_json()
        .context("decoding model list")?;

      for m in v.fetch("models").items() {
        let methods: Vec<String> = m.fetch("supportedGenerationMethods").to_or_default();

        out.push(ModelInfo {
          name: m.fetch("name").to_or_default(),
          display_name: m.fetch("displayName").to_or_default(),
          supports_generate_content: methods.iter().any(|s| s == "generateContent"),
        });
      }

      page_token = v.fetch("nextPageToken").to::<String>().filter(|t| !t.is_empty());

      if page_token.is_none() {
        break;
      }
    }

    Ok(out)
  }
}

impl ModelBackend for GeminiBackend {
  fn generate_content(&self, req: &GenerationRequest<'_>) -> Result<String> {
    let body = GenerateContentRequest {
      contents: vec![RequestContent {
        role: "user",
        parts: vec![RequestPart { text: req.prompt }],
      }],
      generation_config: Some(GenerationConfig { temperature: Some(0.2) }),
    };

    tracing::debug!(tier = %req.tier, model = %self.model, prompt_bytes = req.prompt.len(), "generateContent");

    let resp: GenerateContentResponse = self
      .agent
      .post(&self.generate_url())
      .set("x-goog-api-key", &self.api_key)
      .set("Content-Type", "application/json")
      .send_json(&body)
      .map_err(describe_ureq_error)?
      .into_json()
      .context("decoding generateContent response")?;

    candidate_text(resp)
  }

  fn describe(&self) -> String {
    format!("gemini ({})", self.model)
  }
}

fn describe_ureq_error(err: ureq::Error) -> anyhow::Error {
  match err {
    ureq::Error::Status(code, resp) => {
      let body = resp.into_string().unwrap_or_default();
      let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.fetch("error.message").to::<String>())
        .unwrap_or(body);
      anyhow!("HTTP {}: {}", code, crate::util::snippet(&message, 300))
    }
    ureq::Error::Transport(t) => anyhow!("transport error: {}", t),
  }
}

/// Canned answers keyed by tier (`commit`, `pull_request`, `milestone`).
///
/// A `fail` array listing tier names makes those tiers return an error, and an
/// empty string answer exercises the empty-output fallback.
pub struct FixtureBackend {
  doc: serde_json::Value,
  source: PathBuf,
}

impl FixtureBackend {
  pub fn from_file(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading LLM fixture {}", path.display()))?;
    let doc = serde_json::from_str(&text).with_context(|| format!("parsing LLM fixture {}", path.display()))?;

    Ok(Self {
      doc,
      source: path.to_path_buf(),
    })
  }

  pub fn from_value(doc: serde_json::Value) -> Self {
    Self {
      doc,
      source: PathBuf::from("<inline>"),
    }
  }
}

impl ModelBackend for FixtureBackend {
  fn generate_content(&self, req: &GenerationRequest<'_>) -> Result<String> {
    let key = req.tier.as_str();
    let fails: Vec<String> = self.doc.fetch("fail").to_or_default();

    if fails.iter().any(|f| f == key) {
      bail!("fixture failure for {} tier", key);
    }

    self
      .doc
      .fetch(key)
      .to::<String>()
      .ok_or_else(|| anyhow!("fixture {} has no `{}` answer", self.source.display(), key))
  }

  fn describe(&self) -> String {
    format!("fixture ({})", self.source.display())
  }
}

pub fn env_wants_fixture() -> Option<PathBuf> {
  std::env::var(LLM_FIXTURE_ENV)
    .ok()
    .filter(|s| !s.trim().is_empty())
    .map(PathBuf::from)
}

/// Pick the backend: fixture file when requested through the environment, Gemini otherwise.
pub fn build_client(api_key: &str, model: &str) -> Result<TextGenerationClient> {
  let backend: Box<dyn ModelBackend> = match env_wants_fixture() {
    Some(path) => Box::new(FixtureBackend::from_file(&path)?),
    None => Box::new(GeminiBackend::new(api_key, model)),
  };

  tracing::info!(backend = %backend.describe(), "text generation client ready");

  Ok(TextGenerationClient::new(backend))
}
