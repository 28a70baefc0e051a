use crate::config::types::{Config, FetchConfig, FilterConfig, OutputConfig, SiteConfig, Variant};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_thread_num(config.thread_num)?;
    validate_filter(&config.filter)?;
    validate_site(&config.site)?;
    validate_fetch(&config.fetch)?;
    validate_output(&config.output)?;

    if config.variant == Variant::SectorLevel
        && (!config.level_code_blacklist.is_empty() || !config.school_type_blacklist.is_empty())
    {
        tracing::warn!("Blacklists are only applied by the single-sector variant; ignoring them");
    }

    Ok(())
}

fn validate_thread_num(thread_num: usize) -> Result<(), ConfigError> {
    if thread_num == 0 {
        return Err(ConfigError::Validation(
            "thread_num must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// A crawl with neither levels nor sectors has no URL slug to search under
fn validate_filter(filter: &FilterConfig) -> Result<(), ConfigError> {
    if filter.levels.is_empty() && filter.sectors.is_empty() {
        return Err(ConfigError::Validation(
            "filter must select at least one level or sector".to_string(),
        ));
    }
    Ok(())
}

fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&site.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            site.base_url
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' cannot carry path segments",
            site.base_url
        )));
    }

    Ok(())
}

fn validate_fetch(fetch: &FetchConfig) -> Result<(), ConfigError> {
    if fetch.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            fetch.max_attempts
        )));
    }

    if fetch.backoff_max_ms < fetch.backoff_initial_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_max_ms ({}) must not be below backoff_initial_ms ({})",
            fetch.backoff_max_ms, fetch.backoff_initial_ms
        )));
    }

    if fetch.timeout_secs == 0 || fetch.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    for (name, value) in &fetch.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("bad header name '{}'", name)))?;
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::InvalidHeader(format!("bad value for header '{}'", name))
        })?;
    }

    Ok(())
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    if output.states_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "states_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_validate_thread_num() {
        assert!(validate_thread_num(1).is_ok());
        assert!(validate_thread_num(64).is_ok());
        assert!(validate_thread_num(200).is_ok());

        assert!(validate_thread_num(0).is_err());
    }

    #[test]
    fn test_empty_filter_rejected() {
        assert!(validate_filter(&FilterConfig::default()).is_err());
    }

    #[test]
    fn test_validate_site() {
        let mut site = SiteConfig::default();
        assert!(validate_site(&site).is_ok());

        site.base_url = "ftp://example.com/search".to_string();
        assert!(validate_site(&site).is_err());

        site.base_url = "not a url".to_string();
        assert!(validate_site(&site).is_err());

        site.base_url = "mailto:someone@example.com".to_string();
        assert!(validate_site(&site).is_err());
    }

    #[test]
    fn test_validate_fetch() {
        let mut fetch = FetchConfig::default();
        assert!(validate_fetch(&fetch).is_ok());

        fetch.max_attempts = 0;
        assert!(validate_fetch(&fetch).is_err());

        fetch.max_attempts = 3;
        fetch.backoff_initial_ms = 1_000;
        fetch.backoff_max_ms = 10;
        assert!(validate_fetch(&fetch).is_err());
    }

    #[test]
    fn test_validate_header_overrides() {
        let mut fetch = FetchConfig::default();
        fetch.headers = BTreeMap::from([("X-Test".to_string(), "yes".to_string())]);
        assert!(validate_fetch(&fetch).is_ok());

        fetch.headers = BTreeMap::from([("Bad Header".to_string(), "yes".to_string())]);
        assert!(matches!(
            validate_fetch(&fetch),
            Err(ConfigError::InvalidHeader(_))
        ));
    }
}
