//! CORS policy built from configuration

use axum::http::{HeaderName, HeaderValue, Method};
use newsdesk_common::config::CorsConfig;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Build the CORS layer; `None` when CORS is disabled
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let origin = if config.allow_origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parse_list(&config.allow_origin, |s| HeaderValue::from_str(s).ok()))
    };

    let layer = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(parse_list(&config.allow_methods, |s| {
            Method::from_bytes(s.to_ascii_uppercase().as_bytes()).ok()
        }))
        .allow_headers(parse_list(&config.allow_headers, |s| {
            HeaderName::from_bytes(s.as_bytes()).ok()
        }));

    Some(layer)
}

fn parse_list<T>(raw: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| {
            let parsed = parse(item);
            if parsed.is_none() {
                tracing::warn!(item, "Ignoring invalid CORS entry");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let methods = parse_list("GET, post ,, BOGUS METHOD", |s| {
            Method::from_bytes(s.to_ascii_uppercase().as_bytes()).ok()
        });
        assert_eq!(methods, [Method::GET, Method::POST]);
    }

    #[test]
    fn test_disabled_cors() {
        let config = CorsConfig {
            enabled: false,
            ..CorsConfig::default()
        };
        assert!(cors_layer(&config).is_none());
        assert!(cors_layer(&CorsConfig::default()).is_some());
    }
}
