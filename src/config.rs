//! Client configuration: token endpoint, credentials and extra form parameters.

use log::debug;
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

pub const ENV_TOKEN_ENDPOINT: &str = "HTTP_CLIENT_TOKEN_ENDPOINT";
pub const ENV_CLIENT_ID: &str = "HTTP_CLIENT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "HTTP_CLIENT_SECRET";
pub const ENV_ADDITIONAL_PARAMS: &str = "HTTP_CLIENT_ADD_PARAMS";
pub const ENV_TIMEOUT_SECS: &str = "HTTP_CLIENT_TIMEOUT_SECS";

/// Overall per-request timeout applied to the underlying transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub additional_params: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            additional_params: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_params.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup` and validates it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::load(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads every `HTTP_CLIENT_*` key through `lookup` without validating the
    /// result. Malformed parameter lists and timeouts are still rejected.
    pub fn load<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup(ENV_TOKEN_ENDPOINT).unwrap_or_default(),
            lookup(ENV_CLIENT_ID).unwrap_or_default(),
            lookup(ENV_CLIENT_SECRET).unwrap_or_default(),
        );

        if let Some(raw) = lookup(ENV_ADDITIONAL_PARAMS) {
            config.additional_params = parse_params(&raw)?;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|e| {
                Error::new(
                    ErrorKind::Validation,
                    format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS),
                    Some(e),
                )
                .with_context_entry("field", ENV_TIMEOUT_SECS)
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Checks every mandatory field. A config that passes is safe to build a
    /// client from; there is no warn-and-continue mode.
    pub fn validate(&self) -> Result<()> {
        require(&self.token_endpoint, "token_endpoint", "token endpoint")?;
        require(&self.client_id, "client_id", "client ID")?;
        require(&self.client_secret, "client_secret", "client secret")?;

        let url = Url::parse(&self.token_endpoint).map_err(|e| {
            Error::new(
                ErrorKind::Validation,
                format!("token endpoint is not a valid URL: {}", self.token_endpoint),
                Some(e),
            )
            .with_context_entry("field", "token_endpoint")
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "token endpoint must use http or https, got {}",
                url.scheme()
            ))
            .with_context_entry("field", "token_endpoint"));
        }

        if self.timeout.is_zero() {
            return Err(Error::validation("timeout must be greater than zero")
                .with_context_entry("field", "timeout"));
        }

        debug!(
            "Client config valid: endpoint={}, client_id={}, {} extra params",
            self.token_endpoint,
            self.client_id,
            self.additional_params.len()
        );
        Ok(())
    }

    /// Form parameters for a token request: the credentials followed by the
    /// additional parameters. Additional parameters may override credentials.
    pub fn token_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), self.client_secret.clone()),
        ];
        for (key, value) in &self.additional_params {
            match params.iter_mut().find(|(existing, _)| existing == key) {
                Some(entry) => entry.1 = value.clone(),
                None => params.push((key.clone(), value.clone())),
            }
        }
        params
    }
}

fn require(value: &str, field: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is not configured", label))
            .with_context_entry("field", field));
    }
    Ok(())
}

/// Parses a single `key=value` pair.
pub fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::invalid_input(format!(
            "Invalid parameter '{}'. Expected 'key=value'.",
            raw
        ))),
    }
}

/// Parses a comma separated `k=v,k2=v2` list. Empty segments are skipped.
pub fn parse_params(raw: &str) -> Result<BTreeMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_param)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{get_error_context, is_validation_error};
    use std::collections::HashMap;

    fn valid() -> ClientConfig {
        ClientConfig::new("https://auth.example.com/oauth/token", "id", "secret")
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_fields() {
        for (config, field) in [
            (ClientConfig { token_endpoint: String::new(), ..valid() }, "token_endpoint"),
            (ClientConfig { client_id: " ".to_string(), ..valid() }, "client_id"),
            (ClientConfig { client_secret: String::new(), ..valid() }, "client_secret"),
        ] {
            let err = config.validate().unwrap_err();
            assert!(is_validation_error(&err));
            assert_eq!(
                get_error_context(&err).unwrap().get("field"),
                Some(&serde_json::json!(field))
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let err = ClientConfig::new("not a url", "id", "secret")
            .validate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = ClientConfig::new("ftp://auth.example.com/token", "id", "secret")
            .validate()
            .unwrap_err();
        assert!(err.message().contains("ftp"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let err = valid().with_timeout(Duration::ZERO).validate().unwrap_err();
        assert!(is_validation_error(&err));
    }

    #[test]
    fn test_token_params() {
        let params = valid()
            .with_param("grant_type", "client_credentials")
            .with_param("scope", "read")
            .token_params();

        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["client_id", "client_secret", "grant_type", "scope"]);
        assert_eq!(params[0].1, "id");
        assert_eq!(params[1].1, "secret");
        assert_eq!(params[2].1, "client_credentials");
    }

    #[test]
    fn test_token_params_override_credentials() {
        let params = valid().with_param("client_id", "other").token_params();

        assert_eq!(params.len(), 2);
        assert_eq!(params[0], ("client_id".to_string(), "other".to_string()));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_TOKEN_ENDPOINT, "http://localhost:9000/token"),
            (ENV_CLIENT_ID, "cm-api"),
            (ENV_CLIENT_SECRET, "s3cret"),
            (ENV_ADDITIONAL_PARAMS, "grant_type=client_credentials, audience=customers"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();

        assert_eq!(config.client_id, "cm-api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.additional_params.get("audience").map(String::as_str),
            Some("customers")
        );
    }

    #[test]
    fn test_from_lookup_fails_fast_on_missing_secret() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_TOKEN_ENDPOINT, "http://localhost:9000/token"),
            (ENV_CLIENT_ID, "cm-api"),
        ]))
        .unwrap_err();

        assert!(err.message().contains("client secret"));
    }

    #[test]
    fn test_from_lookup_tolerates_trailing_comma() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_TOKEN_ENDPOINT, "http://localhost:9000/token"),
            (ENV_CLIENT_ID, "cm-api"),
            (ENV_CLIENT_SECRET, "s3cret"),
            (ENV_ADDITIONAL_PARAMS, "audience=kpi,"),
        ]))
        .unwrap();

        assert_eq!(config.additional_params.len(), 1);
        assert_eq!(
            config.additional_params.get("audience").map(String::as_str),
            Some("kpi")
        );
    }

    #[test]
    fn test_load_does_not_validate() {
        let config = ClientConfig::load(lookup_from(&[(ENV_CLIENT_ID, "cm-api")])).unwrap();

        assert_eq!(config.client_id, "cm-api");
        assert!(config.token_endpoint.is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_TOKEN_ENDPOINT, "http://localhost:9000/token"),
            (ENV_CLIENT_ID, "cm-api"),
            (ENV_CLIENT_SECRET, "s3cret"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();

        assert!(is_validation_error(&err));
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("scope=read write").unwrap(),
            ("scope".to_string(), "read write".to_string())
        );
        assert_eq!(
            parse_param("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=value").is_err());
    }

    #[test]
    fn test_parse_params_skips_empty_segments() {
        let params = parse_params("a=1,,b=2,").unwrap();
        assert_eq!(params.len(), 2);
    }
}
