use crate::error::{Result, ScanError};
use url::Url;

/// A validated base URL that candidates are appended to
#[derive(Debug, Clone)]
pub struct Target {
    base: Url,
}

impl Target {
    pub fn parse(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ScanError::InvalidUrl(format!("'{}': {}", base_url, e)))?;

        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(ScanError::InvalidUrl(format!(
                "'{}' is not an absolute URL with a host",
                base_url
            )));
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Join the base path and the candidate with exactly one separator.
    /// A trailing slash on the candidate is preserved.
    pub fn resolve(&self, candidate: &str) -> String {
        let mut url = self.base.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            candidate.trim_start_matches('/')
        );
        url.set_path(&joined);
        url.to_string()
    }
}

/// Resolve `candidate` against `base_url`
pub fn resolve(base_url: &str, candidate: &str) -> Result<String> {
    Ok(Target::parse(base_url)?.resolve(candidate))
}
