use category_engine::Request;
use serde::{Deserialize, Serialize};

/// How the redirect target is produced when the classifier flags a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RedirectRule {
    /// Render `template`, substituting request macros.
    Template { template: String },
    /// Sentinel mode: the classifier's result is the target, verbatim.
    Classifier,
}

/// Build the redirect target for a flagged request.
///
/// `verdict` is the classifier's result value.  In sentinel mode it is the
/// target itself; otherwise it is available to the template through `%t`.
/// `CONNECT` requests get a `302:` prefix, because a tunnel response cannot
/// carry an ordinary rewritten URL and the numeric code forces the proxy to
/// treat the target specially.
pub fn render_target(rule: &RedirectRule, request: &Request, verdict: &str) -> String {
    let target = match rule {
        RedirectRule::Classifier => verdict.to_string(),
        RedirectRule::Template { template } => substitute(template, request, verdict),
    };
    if request.method.as_deref() == Some("CONNECT") {
        format!("302:{target}")
    } else {
        target
    }
}

/// Substitute macros left-to-right.  A macro is suppressed when preceded by
/// a literal `%`: the `%%` pair emits one `%` and whatever follows is kept
/// as-is.  Unknown `%x` pairs pass through verbatim.
///
/// * `%a` - client address
/// * `%n` - client reverse-DNS name, or `unknown`
/// * `%i` - client identity, or `unknown`
/// * `%u` - the full request URL
/// * `%p` - path+query with one leading `/` stripped
/// * `%t` - the classifier's result value
fn substitute(template: &str, request: &Request, verdict: &str) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('a') => out.push_str(request.client_addr.as_deref().unwrap_or("")),
            Some('n') => out.push_str(request.client_fqdn.as_deref().unwrap_or("unknown")),
            Some('i') => out.push_str(request.ident.as_deref().unwrap_or("unknown")),
            Some('u') => out.push_str(&request.url),
            Some('p') => {
                out.push_str(request.path_query.strip_prefix('/').unwrap_or(&request.path_query));
            }
            Some('t') => out.push_str(verdict),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use category_engine::Request;

    fn request(line: &str) -> Request {
        Request::parse(line).unwrap()
    }

    fn template(t: &str) -> RedirectRule {
        RedirectRule::Template {
            template: t.to_string(),
        }
    }

    #[test]
    fn substitutes_every_macro() {
        let r = request("http://foo.com/a/b?x=1 10.0.0.1/client.lan user1 GET");
        let rendered = render_target(
            &template("a=%a n=%n i=%i u=%u p=%p t=%t"),
            &r,
            "porn",
        );
        assert_eq!(
            rendered,
            "a=10.0.0.1 n=client.lan i=user1 u=http://foo.com/a/b?x=1 p=a/b?x=1 t=porn"
        );
    }

    #[test]
    fn absent_name_and_ident_render_unknown() {
        let r = request("http://foo.com/ 10.0.0.1/- - GET");
        let rendered = render_target(&template("%n/%i"), &r, "x");
        assert_eq!(rendered, "unknown/unknown");
    }

    #[test]
    fn escaped_macro_is_not_substituted() {
        let r = request("http://actual.url/ 10.0.0.1/- - GET");
        let rendered = render_target(&template("%%u blocked: %u"), &r, "x");
        assert_eq!(rendered, "%u blocked: http://actual.url/");
    }

    #[test]
    fn double_escape_before_macro() {
        let r = request("http://foo.com/ - - GET");
        // "%%%u" is an escaped percent followed by a live %u.
        let rendered = render_target(&template("%%%u"), &r, "x");
        assert_eq!(rendered, "%http://foo.com/");
    }

    #[test]
    fn unknown_macro_passes_through() {
        let r = request("http://foo.com/ - - GET");
        assert_eq!(render_target(&template("%z%q"), &r, "x"), "%z%q");
    }

    #[test]
    fn trailing_percent_is_literal() {
        let r = request("http://foo.com/ - - GET");
        assert_eq!(render_target(&template("50%"), &r, "x"), "50%");
    }

    #[test]
    fn connect_method_gets_numeric_redirect_prefix() {
        let r = request("www.example.com:443 10.0.0.1/- - CONNECT");
        let rendered = render_target(&template("http://x/y"), &r, "porn");
        assert_eq!(rendered, "302:http://x/y");
    }

    #[test]
    fn sentinel_mode_uses_verdict_verbatim() {
        let r = request("http://foo.com/ 10.0.0.1/- - GET");
        let rendered = render_target(&RedirectRule::Classifier, &r, "http://deny/%u");
        // No substitution in sentinel mode, even of macro-looking text.
        assert_eq!(rendered, "http://deny/%u");
    }

    #[test]
    fn sentinel_mode_still_shapes_connect() {
        let r = request("foo.com:443 - - CONNECT");
        let rendered = render_target(&RedirectRule::Classifier, &r, "http://deny/");
        assert_eq!(rendered, "302:http://deny/");
    }

    #[test]
    fn rule_deserializes_from_yaml() {
        let rule: RedirectRule =
            serde_yml::from_str("mode: template\ntemplate: \"http://proxy/deny?url=%u\"\n")
                .unwrap();
        assert_eq!(
            rule,
            RedirectRule::Template {
                template: "http://proxy/deny?url=%u".to_string()
            }
        );
        let sentinel: RedirectRule = serde_yml::from_str("mode: classifier\n").unwrap();
        assert_eq!(sentinel, RedirectRule::Classifier);
    }
}
