//! Per-domain fetch configuration
//!
//! Each domain that can be synchronized carries a URL pattern, request
//! headers, and politeness settings. Built-in configs cover the known
//! domains; a JSON config file can add or override entries.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use glyph_fs::io;

use crate::{Error, Result};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_rate_limit_delay() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// How to fetch images for one domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Domain name, matching the mapping file stem
    #[serde(default)]
    pub domain: String,

    /// Image URL pattern; `{filename}` is replaced with the image filename,
    /// otherwise the filename is appended as a path segment
    pub image_url_pattern: String,

    /// Extra request headers sent with every fetch
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Minimum seconds between request starts against this domain
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay: f64,

    /// Attempts per image before giving up on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether the domain rejects requests without a Referer header
    #[serde(default)]
    pub referrer_required: bool,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl DomainConfig {
    /// The built-in config for www.xiguashuwu.com.
    pub fn xiguashuwu() -> Self {
        Self {
            domain: "www.xiguashuwu.com".to_string(),
            image_url_pattern: "https://www.xiguashuwu.com/wzbodyimg/{filename}".to_string(),
            headers: BTreeMap::new(),
            rate_limit_delay: 1.5,
            max_retries: 3,
            timeout_secs: 30,
            referrer_required: true,
            user_agent: default_user_agent(),
        }
    }

    /// Build the fetch URL for one image filename.
    pub fn build_image_url(&self, filename: &str) -> String {
        if self.image_url_pattern.contains("{filename}") {
            self.image_url_pattern.replace("{filename}", filename)
        } else {
            format!(
                "{}/{}",
                self.image_url_pattern.trim_end_matches('/'),
                filename
            )
        }
    }

    /// Headers for one request: User-Agent, Referer when the domain demands
    /// one, then the configured extras.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("User-Agent".to_string(), self.user_agent.clone())];
        if self.referrer_required {
            headers.push(("Referer".to_string(), format!("https://{}/", self.domain)));
        }
        for (name, value) in &self.headers {
            headers.push((name.clone(), value.clone()));
        }
        headers
    }

    /// Check the config for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomainConfig`] naming the first problem.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(Error::InvalidDomainConfig {
                domain: self.domain.clone(),
                reason: reason.to_string(),
            })
        };

        if self.domain.is_empty() {
            return fail("domain must not be empty");
        }
        if !self.image_url_pattern.starts_with("http://")
            && !self.image_url_pattern.starts_with("https://")
        {
            return fail("image_url_pattern must be an http(s) URL");
        }
        if !self.rate_limit_delay.is_finite() || self.rate_limit_delay < 0.0 {
            return fail("rate_limit_delay must be a non-negative number");
        }
        if self.max_retries == 0 {
            return fail("max_retries must be at least 1");
        }
        if self.timeout_secs == 0 {
            return fail("timeout_secs must be at least 1");
        }
        Ok(())
    }
}

/// The set of domains the synchronizer knows how to fetch from.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    configs: BTreeMap<String, DomainConfig>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in domain configs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // validated at construction, cannot fail
        let _ = registry.insert(DomainConfig::xiguashuwu());
        registry
    }

    /// Add or replace a domain config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomainConfig`] if the config fails validation.
    pub fn insert(&mut self, config: DomainConfig) -> Result<()> {
        config.validate()?;
        self.configs.insert(config.domain.clone(), config);
        Ok(())
    }

    pub fn get(&self, domain: &str) -> Option<&DomainConfig> {
        self.configs.get(domain)
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.configs.contains_key(domain)
    }

    /// Registered domain names, sorted.
    pub fn domains(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }

    /// Merge configs from a JSON file into the registry.
    ///
    /// The file is an object of `domain -> config`; a config's `domain`
    /// field defaults to its key. Entries override built-ins of the same
    /// name.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigParse`] for unreadable or malformed files,
    /// [`Error::InvalidDomainConfig`] for entries that fail validation.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = io::read_text(path)?;
        let entries: BTreeMap<String, DomainConfig> =
            serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        for (key, mut config) in entries {
            if config.domain.is_empty() {
                config.domain = key;
            }
            self.insert(config)?;
        }

        tracing::debug!(path = %path.display(), "merged domain configs");
        Ok(())
    }
}
