//! Target URL extraction from the inbound request.
//!
//! Two forms are accepted:
//! - `GET /?url=<target>`: the `url` query parameter, verbatim
//! - `GET /<hex(target)>`: the path, minus the leading `/`, hex-decoded
//!
//! The query form wins when its value is non-empty.

use url::Url;

use crate::http::error::ProxyError;

/// Extract and validate the target URL.
pub fn decode_target(path: &str, query: Option<&str>) -> Result<Url, ProxyError> {
    let raw = match query_target(query) {
        Some(target) => target,
        None => hex_decode(path.strip_prefix('/').unwrap_or(path))?,
    };

    let url = Url::parse(&raw)?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ProxyError::InvalidScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProxyError::MissingHost);
    }

    Ok(url)
}

fn query_target(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn hex_decode(encoded: &str) -> Result<String, ProxyError> {
    if encoded.len() % 2 != 0 {
        return Err(ProxyError::InvalidEncoding("odd length"));
    }

    let bytes = encoded
        .as_bytes()
        .chunks(2)
        .map(|pair| match (hex_value(pair[0]), hex_value(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(ProxyError::InvalidEncoding("non-hex character")),
        })
        .collect::<Result<Vec<u8>, _>>()?;

    String::from_utf8(bytes).map_err(|_| ProxyError::InvalidEncoding("not UTF-8"))
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> String {
        s.bytes().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn decodes_hex_path() {
        let path = format!("/{}", hex("https://example.com/cat.png"));
        let url = decode_target(&path, None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/cat.png");
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let path = format!("/{}", hex("http://example.com/a.gif").to_uppercase());
        assert!(decode_target(&path, None).is_ok());
    }

    #[test]
    fn query_parameter_takes_precedence() {
        let url = decode_target(
            "/ignored",
            Some("url=https%3A%2F%2Fexample.com%2Fdog.jpg&x=1"),
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://example.com/dog.jpg");
    }

    #[test]
    fn empty_query_value_falls_back_to_path() {
        let path = format!("/{}", hex("http://example.com/a.png"));
        let url = decode_target(&path, Some("url=")).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn bad_hex_is_an_encoding_error() {
        assert!(matches!(
            decode_target("/abc", None),
            Err(ProxyError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode_target("/zz", None),
            Err(ProxyError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode_target("/c328", None),
            Err(ProxyError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let path = format!("/{}", hex("not a url"));
        assert!(matches!(decode_target(&path, None), Err(ProxyError::InvalidUrl(_))));
        assert!(matches!(decode_target("/", None), Err(ProxyError::InvalidUrl(_))));
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        for target in ["ftp://example.com/a.png", "file:///etc/passwd", "data:image/png;base64,AA"] {
            let path = format!("/{}", hex(target));
            assert!(
                matches!(decode_target(&path, None), Err(ProxyError::InvalidScheme(_))),
                "{} should be rejected",
                target
            );
        }
    }
}
