//! Base URL discovery for sibling services
//!
//! `PLEK_SERVICE_<NAME>_URI` overrides a single service. Otherwise the URL is
//! `https://<PLEK_HOSTNAME_PREFIX><name>.<app domain>`, where the app domain
//! comes from `GOVUK_APP_DOMAIN`, then `DEV_DOMAIN`, then `dev.gov.uk`. The
//! development domain is served over plain HTTP.

const DEV_DOMAIN: &str = "dev.gov.uk";

pub fn resolve_service_url<F>(service: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let override_key = format!("PLEK_SERVICE_{}_URI", service.replace('-', "_").to_uppercase());
    if let Some(url) = var(&override_key) {
        return url;
    }

    let domain = var("GOVUK_APP_DOMAIN")
        .or_else(|| var("DEV_DOMAIN"))
        .unwrap_or_else(|| DEV_DOMAIN.to_string());
    let prefix = var("PLEK_HOSTNAME_PREFIX").unwrap_or_default();
    let scheme = if domain == DEV_DOMAIN { "http" } else { "https" };

    format!("{scheme}://{prefix}{service}.{domain}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn dev_domain_uses_http() {
        assert_eq!(resolve_service_url("need-api", none), "http://need-api.dev.gov.uk");
    }

    #[test]
    fn app_domain_uses_https_and_prefix() {
        let lookup = |key: &str| match key {
            "GOVUK_APP_DOMAIN" => Some("publishing.service.gov.uk".to_string()),
            "PLEK_HOSTNAME_PREFIX" => Some("draft-".to_string()),
            _ => None,
        };
        assert_eq!(
            resolve_service_url("content-store", lookup),
            "https://draft-content-store.publishing.service.gov.uk"
        );
    }

    #[test]
    fn service_override_wins() {
        let lookup = |key: &str| {
            (key == "PLEK_SERVICE_CONTENT_STORE_URI").then(|| "http://localhost:3068".to_string())
        };
        assert_eq!(resolve_service_url("content-store", lookup), "http://localhost:3068");
    }
}
