//! OAuth 1.0a request signing (HMAC-SHA1) for user-context API calls.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::config::TwitterCredentials;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 encoding: everything except `A-Z a-z 0-9 - . _ ~` is escaped.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Compute the `oauth_signature` for a request.
///
/// `params` holds every oauth_* parameter (minus the signature itself) plus
/// any query or form parameters. JSON request bodies are not signed.
pub fn sign(
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac =
        HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Build the `Authorization` header value for a request without query
/// parameters.
pub fn authorization_header(method: &str, url: &str, credentials: &TwitterCredentials) -> String {
    let nonce = generate_nonce();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(method, url, credentials, &nonce, &timestamp)
}

fn authorization_header_with(
    method: &str,
    url: &str,
    credentials: &TwitterCredentials,
    nonce: &str,
    timestamp: &str,
) -> String {
    let mut oauth_params = vec![
        ("oauth_consumer_key", credentials.api_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let signature = sign(
        method,
        url,
        &oauth_params,
        &credentials.api_secret,
        &credentials.access_secret,
    );
    oauth_params.push(("oauth_signature", signature.as_str()));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_encode_reserved_characters() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("!"), "%21");
    }

    #[test]
    fn test_sign_matches_published_example() {
        // Worked example from the platform's OAuth 1.0a documentation
        let params = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            (
                "oauth_token",
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            ),
            ("oauth_version", "1.0"),
        ];

        let signature = sign(
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn test_authorization_header_lists_all_oauth_fields() {
        let credentials = TwitterCredentials {
            api_key: "consumer".to_string(),
            api_secret: "consumer-secret".to_string(),
            access_token: "token".to_string(),
            access_secret: "token-secret".to_string(),
        };

        let header = authorization_header_with(
            "POST",
            "https://api.twitter.com/2/tweets",
            &credentials,
            "abc123",
            "1700000000",
        );

        assert!(header.starts_with("OAuth "));
        for field in [
            "oauth_consumer_key=\"consumer\"",
            "oauth_nonce=\"abc123\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_timestamp=\"1700000000\"",
            "oauth_token=\"token\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=\"",
        ] {
            assert!(header.contains(field), "missing {field} in {header}");
        }
        assert!(!header.contains("token-secret"));
    }

    #[test]
    fn test_nonce_is_alphanumeric_and_unique() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
