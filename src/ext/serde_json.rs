// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path fetching and safe typed extraction for forge JSON payloads (serde_json::Value)
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper (typed extraction, defaults, array iteration, presence checks)
// invariants: No panics; missing paths yield None/empty; JSON null counts as absent
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;

/// Wrapper around a JSON location to allow typed extraction via a clear second step.
pub struct JsonFetched<'a> {
  inner: Option<&'a serde_json::Value>,
}

impl<'a> JsonFetched<'a> {
  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }

  /// Deserialize as `T`, returning `T::default()` on failure.
  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// Elements when the location holds an array; empty otherwise.
  pub fn items(&self) -> &'a [serde_json::Value] {
    self.inner.and_then(|v| v.as_array()).map(Vec::as_slice).unwrap_or(&[])
  }

  /// True when the path resolves to a non-null value.
  pub fn is_present(&self) -> bool {
    self.inner.map(|v| !v.is_null()).unwrap_or(false)
  }
}

/// Extension to fetch nested values via dotted paths like "user.login".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for serde_json::Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      match cur.get(key) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}
