//! Inbound header handling for outbound requests.
//!
//! # Responsibilities
//! - Detect requests that already passed through this proxy (`Via` loop)
//! - Copy the fixed allow-list of inbound headers onto the outbound request
//! - Append this hop to the `Via` chain
//!
//! # Design Decisions
//! - Allow-list, not deny-list: cookies, auth and anything else never leave
//! - `Accept` falls back to a configured default when the caller sent none

use axum::http::header::{
    HeaderMap, HeaderValue, InvalidHeaderValue, ACCEPT, ACCEPT_ENCODING, IF_MODIFIED_SINCE,
    IF_NONE_MATCH, USER_AGENT, VIA,
};

/// Protocol version advertised in our `Via` entry.
const VIA_PROTOCOL: &str = "1.1";

/// Header rules applied to every forwarded request.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    via_token: String,
    via_entry: String,
    default_accept: HeaderValue,
}

impl HeaderPolicy {
    pub fn new(via_token: &str, default_accept: &str) -> Result<Self, InvalidHeaderValue> {
        let via_entry = format!("{} {}", VIA_PROTOCOL, via_token);
        HeaderValue::from_str(&via_entry)?;
        Ok(Self {
            via_token: via_token.to_string(),
            via_entry,
            default_accept: HeaderValue::from_str(default_accept)?,
        })
    }

    /// True when the inbound `Via` chain already names this proxy.
    pub fn is_self_request(&self, inbound: &HeaderMap) -> bool {
        inbound
            .get_all(VIA)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains(&self.via_token))
    }

    /// Build the outbound header set from the inbound request.
    pub fn outbound_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(user_agent) = inbound.get(USER_AGENT) {
            headers.insert(USER_AGENT, user_agent.clone());
        }

        let accept = inbound
            .get(ACCEPT)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| self.default_accept.clone());
        headers.insert(ACCEPT, accept);

        for name in [ACCEPT_ENCODING, IF_MODIFIED_SINCE, IF_NONE_MATCH] {
            if let Some(value) = inbound.get(&name).filter(|v| !v.is_empty()) {
                headers.insert(name, value.clone());
            }
        }

        headers.insert(VIA, self.via_chain(inbound));
        headers
    }

    /// Existing `Via` chain with this hop appended.
    fn via_chain(&self, inbound: &HeaderMap) -> HeaderValue {
        let mut chain: Vec<&str> = inbound
            .get_all(VIA)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();
        chain.push(&self.via_entry);

        // via_entry was checked in new(); the inbound parts were valid header text.
        HeaderValue::from_str(&chain.join(", "))
            .unwrap_or_else(|_| HeaderValue::from_static("1.1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> HeaderPolicy {
        HeaderPolicy::new("assetproxy", "image/*").unwrap()
    }

    fn inbound(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn detects_own_token_in_via() {
        let p = policy();
        assert!(p.is_self_request(&inbound(&[(VIA, "1.1 cdn, 1.1 assetproxy")])));
        assert!(!p.is_self_request(&inbound(&[(VIA, "1.1 cdn")])));
        assert!(!p.is_self_request(&HeaderMap::new()));
    }

    #[test]
    fn via_chain_appends_this_hop() {
        let p = policy();
        let out = p.outbound_headers(&HeaderMap::new());
        assert_eq!(out.get(VIA).unwrap(), "1.1 assetproxy");

        let out = p.outbound_headers(&inbound(&[(VIA, "1.0 edge")]));
        assert_eq!(out.get(VIA).unwrap(), "1.0 edge, 1.1 assetproxy");
    }

    #[test]
    fn accept_defaults_to_images() {
        let p = policy();
        let out = p.outbound_headers(&HeaderMap::new());
        assert_eq!(out.get(ACCEPT).unwrap(), "image/*");

        let out = p.outbound_headers(&inbound(&[(ACCEPT, "image/webp")]));
        assert_eq!(out.get(ACCEPT).unwrap(), "image/webp");
    }

    #[test]
    fn copies_only_allow_listed_headers() {
        let p = policy();
        let out = p.outbound_headers(&inbound(&[
            (USER_AGENT, "test-agent/1.0"),
            (ACCEPT_ENCODING, "gzip"),
            (IF_NONE_MATCH, "\"abc\""),
            (IF_MODIFIED_SINCE, "Wed, 21 Oct 2015 07:28:00 GMT"),
            (axum::http::header::COOKIE, "session=secret"),
            (axum::http::header::AUTHORIZATION, "Bearer token"),
        ]));

        assert_eq!(out.get(USER_AGENT).unwrap(), "test-agent/1.0");
        assert_eq!(out.get(ACCEPT_ENCODING).unwrap(), "gzip");
        assert_eq!(out.get(IF_NONE_MATCH).unwrap(), "\"abc\"");
        assert!(out.get(IF_MODIFIED_SINCE).is_some());
        assert!(out.get(axum::http::header::COOKIE).is_none());
        assert!(out.get(axum::http::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn rejects_invalid_token() {
        assert!(HeaderPolicy::new("bad\ntoken", "image/*").is_err());
    }
}
