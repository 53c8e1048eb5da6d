//! OAuth 1.0a request signing (HMAC-SHA1), per RFC 5849.
//!
//! Covers exactly what a signed REST call needs: percent-encoding with the
//! strict unreserved set, the canonical parameter string, and rendering the
//! `Authorization` header. Body parameters are never signed because every
//! call in this workspace carries its parameters in the query string.

use std::borrow::Cow;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const NONCE_LEN: usize = 32;

/// The four credentials a user-context call signs with.
#[derive(Clone)]
pub struct OAuth1Token {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl OAuth1Token {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }
}

// Secrets must not leak through debug logs.
impl fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Token")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

/// Render the `Authorization: OAuth ...` header for one request, with a
/// fresh nonce and the current timestamp.
///
/// `url` must carry no query string of its own; `query` is the single
/// source of request parameters for signing.
pub(crate) fn authorization_header(
    method: &str,
    url: &reqwest::Url,
    query: &[(&str, Cow<'_, str>)],
    token: &OAuth1Token,
) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    authorization_header_at(method, url, query, token, &nonce(), timestamp)
}

fn authorization_header_at(
    method: &str,
    url: &reqwest::Url,
    query: &[(&str, Cow<'_, str>)],
    token: &OAuth1Token,
    nonce: &str,
    timestamp: u64,
) -> String {
    let timestamp = timestamp.to_string();
    let oauth_params: [(&str, &str); 6] = [
        ("oauth_consumer_key", token.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", token.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let base = signature_base_string(method, url, query, &oauth_params);
    let signature = sign(&base, &token.consumer_secret, &token.access_token_secret);

    let mut fields: Vec<(&str, String)> = oauth_params
        .iter()
        .map(|(k, v)| (*k, percent_encode(v)))
        .collect();
    fields.push(("oauth_signature", percent_encode(&signature)));
    fields.sort();

    let rendered: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect();
    format!("OAuth {}", rendered.join(", "))
}

fn signature_base_string(
    method: &str,
    url: &reqwest::Url,
    query: &[(&str, Cow<'_, str>)],
    oauth_params: &[(&str, &str)],
) -> String {
    let mut pairs: Vec<(String, String)> = Vec::with_capacity(query.len() + oauth_params.len());
    for (k, v) in query {
        pairs.push((percent_encode(k), percent_encode(v)));
    }
    for (k, v) in oauth_params {
        pairs.push((percent_encode(k), percent_encode(v)));
    }
    // Byte order over the encoded names, ties broken by encoded value.
    pairs.sort();

    let parameter_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(&base_url(url)),
        percent_encode(&parameter_string)
    )
}

/// scheme://host[:port]/path, with default ports dropped. `Url` strips a
/// default port at parse time, so `port()` is `Some` only when it matters.
fn base_url(url: &reqwest::Url) -> String {
    let mut out = format!("{}://", url.scheme());
    if let Some(host) = url.host_str() {
        out.push_str(host);
    }
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(url.path());
    out
}

fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(base_string.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// RFC 3986 unreserved characters pass through; every other byte becomes
/// uppercase `%XX`. `urlencoding` implements exactly that set; form
/// encoding would leave `*` bare and break the signature.
fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}
