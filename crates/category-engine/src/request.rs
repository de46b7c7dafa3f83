use url::Url;

/// Immutable view of one protocol request line.
///
/// A line has the fixed whitespace-separated shape
///
/// ```text
/// URL ADDRESS[/FQDN] IDENT METHOD [EXTRA...]
/// ```
///
/// where `-` encodes an absent FQDN or IDENT.  Only the URL field is
/// mandatory; every other field degrades to `None` when missing.  Trailing
/// fields are accepted and ignored so that newer proxies can extend the line
/// without breaking the helper.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The full request URL, exactly as received.
    pub url: String,
    /// URL scheme, when the URL carried one (`CONNECT` requests do not).
    pub scheme: Option<String>,
    /// Lowercased host with any port stripped.
    pub host: Option<String>,
    /// Path plus `?query`, with its leading `/` intact.  Empty for
    /// authority-form URLs.
    pub path_query: String,
    /// Host followed by path plus query; the probe input for URL tables.
    pub authority_path_query: String,
    /// Client IP address.
    pub client_addr: Option<String>,
    /// Reverse-DNS name of the client, when the proxy resolved one.
    pub client_fqdn: Option<String>,
    /// Authenticated identity of the client.
    pub ident: Option<String>,
    /// Request method (`GET`, `CONNECT`, ...).
    pub method: Option<String>,
}

/// The only unrecoverable parse failure: a line with no URL field.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("request line has no URL field")]
pub struct ParseRequestError;

impl Request {
    /// Parse one protocol line (already stripped of its terminator).
    pub fn parse(line: &str) -> Result<Self, ParseRequestError> {
        let mut fields = line.split_whitespace();

        let url = fields.next().ok_or(ParseRequestError)?.to_string();
        let parts = decompose_url(&url);

        let (client_addr, client_fqdn) = match fields.next() {
            Some(field) => match field.split_once('/') {
                Some((addr, fqdn)) => (present(addr), present(fqdn)),
                None => (present(field), None),
            },
            None => (None, None),
        };
        let ident = fields.next().and_then(present);
        let method = fields.next().and_then(present);

        Ok(Self {
            url,
            scheme: parts.scheme,
            host: parts.host,
            path_query: parts.path_query,
            authority_path_query: parts.authority_path_query,
            client_addr,
            client_fqdn,
            ident,
            method,
        })
    }
}

/// Treat `-` and the empty string as "field not supplied".
fn present(field: &str) -> Option<String> {
    if field.is_empty() || field == "-" {
        None
    } else {
        Some(field.to_string())
    }
}

struct UrlParts {
    scheme: Option<String>,
    host: Option<String>,
    path_query: String,
    authority_path_query: String,
}

/// Split a request URL into the pieces the matching tiers probe.
///
/// Absolute URLs go through the `url` crate.  `CONNECT` requests carry a bare
/// `host:port` authority instead of a URL; the `url` crate either rejects
/// those or mis-reads the host as a scheme, so authority forms are split by
/// hand.
fn decompose_url(url: &str) -> UrlParts {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            let host = host.to_ascii_lowercase();
            let mut path_query = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                path_query.push('?');
                path_query.push_str(query);
            }
            let authority_path_query = format!("{host}{path_query}");
            return UrlParts {
                scheme: Some(parsed.scheme().to_string()),
                host: Some(host),
                path_query,
                authority_path_query,
            };
        }
    }

    let (authority, path_query) = match url.find('/') {
        Some(i) => (&url[..i], &url[i..]),
        None => (url, ""),
    };
    let host = strip_port(authority).to_ascii_lowercase();
    let authority_path_query = if host.is_empty() {
        String::new()
    } else {
        format!("{host}{path_query}")
    };
    UrlParts {
        scheme: None,
        host: if host.is_empty() { None } else { Some(host) },
        path_query: path_query.to_string(),
        authority_path_query,
    }
}

/// Drop a trailing `:port` from an authority.  Bracketed IPv6 authorities
/// keep their brackets; everything up to `]` is the host.
fn strip_port(authority: &str) -> &str {
    if authority.starts_with('[') {
        if let Some(end) = authority.find(']') {
            return &authority[..=end];
        }
        return authority;
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_line() {
        let r = Request::parse(
            "http://www.Example.COM/a/b?x=1 172.31.30.132/client.lan user1 GET myip=1.2.3.4",
        )
        .unwrap();
        assert_eq!(r.url, "http://www.Example.COM/a/b?x=1");
        assert_eq!(r.scheme.as_deref(), Some("http"));
        assert_eq!(r.host.as_deref(), Some("www.example.com"));
        assert_eq!(r.path_query, "/a/b?x=1");
        assert_eq!(r.authority_path_query, "www.example.com/a/b?x=1");
        assert_eq!(r.client_addr.as_deref(), Some("172.31.30.132"));
        assert_eq!(r.client_fqdn.as_deref(), Some("client.lan"));
        assert_eq!(r.ident.as_deref(), Some("user1"));
        assert_eq!(r.method.as_deref(), Some("GET"));
    }

    #[test]
    fn dash_encodes_absent_fields() {
        let r = Request::parse("http://foo.com/ 10.0.0.1/- - GET").unwrap();
        assert_eq!(r.client_addr.as_deref(), Some("10.0.0.1"));
        assert!(r.client_fqdn.is_none());
        assert!(r.ident.is_none());
    }

    #[test]
    fn url_only_line_parses_with_everything_absent() {
        let r = Request::parse("http://foo.com/").unwrap();
        assert!(r.client_addr.is_none());
        assert!(r.client_fqdn.is_none());
        assert!(r.ident.is_none());
        assert!(r.method.is_none());
    }

    #[test]
    fn empty_line_is_a_parse_error() {
        assert_eq!(Request::parse(""), Err(ParseRequestError));
        assert_eq!(Request::parse("   "), Err(ParseRequestError));
    }

    #[test]
    fn connect_authority_form() {
        let r = Request::parse("www.example.com:443 10.0.0.1/- - CONNECT").unwrap();
        assert!(r.scheme.is_none());
        assert_eq!(r.host.as_deref(), Some("www.example.com"));
        assert_eq!(r.path_query, "");
        assert_eq!(r.authority_path_query, "www.example.com");
        assert_eq!(r.method.as_deref(), Some("CONNECT"));
    }

    #[test]
    fn port_is_stripped_from_absolute_url() {
        let r = Request::parse("http://foo.com:8080/bar - - GET").unwrap();
        assert_eq!(r.host.as_deref(), Some("foo.com"));
        assert_eq!(r.authority_path_query, "foo.com/bar");
    }

    #[test]
    fn bracketed_ipv6_authority() {
        let r = Request::parse("[2001:db8::1]:443 - - CONNECT").unwrap();
        assert_eq!(r.host.as_deref(), Some("[2001:db8::1]"));
    }

    #[test]
    fn bare_pathless_url_has_root_path() {
        let r = Request::parse("http://foo.com - - GET").unwrap();
        assert_eq!(r.path_query, "/");
        assert_eq!(r.authority_path_query, "foo.com/");
    }

    #[test]
    fn host_is_lowercased() {
        let r = Request::parse("FOO.Example.COM:443 - - CONNECT").unwrap();
        assert_eq!(r.host.as_deref(), Some("foo.example.com"));
    }
}
