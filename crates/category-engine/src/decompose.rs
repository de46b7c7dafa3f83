//! Probe-key generators.
//!
//! A single request expands into a set of candidate keys: every dot-delimited
//! suffix of the host is probed against the domain table, and every
//! slash-delimited prefix of authority+path+query is probed against the URL
//! table.  Matching is pure existence testing, so the emission order does not
//! affect results; both generators emit shortest-first.

/// Produce every right-aligned dot-delimited suffix of `host`, including the
/// full host itself.
///
/// `domain_suffixes("a.b.c")` yields `["c", "b.c", "a.b.c"]`.  An empty host
/// yields nothing.
pub fn domain_suffixes(host: &str) -> Vec<String> {
    if host.is_empty() {
        return Vec::new();
    }
    let labels: Vec<&str> = host.split('.').collect();
    (0..labels.len())
        .rev()
        .map(|i| labels[i..].join("."))
        .collect()
}

/// Produce every left-aligned slash-delimited prefix of `input`, and for each
/// prefix except the final (full) one, the same prefix with a trailing slash
/// appended.
///
/// Externally sourced URL lists mix the `dir` and `dir/` conventions, so both
/// forms are probed.  `uri_prefixes("h/p1/f")` yields
/// `["h", "h/", "h/p1", "h/p1/", "h/p1/f"]`.  An empty input yields nothing.
pub fn uri_prefixes(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    let segments: Vec<&str> = input.split('/').collect();
    let mut out: Vec<String> = Vec::with_capacity(segments.len() * 2);
    for i in 1..=segments.len() {
        let prefix = segments[..i].join("/");
        push_unique(&mut out, prefix.clone());
        if i < segments.len() {
            push_unique(&mut out, format!("{prefix}/"));
        }
    }
    out
}

/// A trailing slash in the input makes the slashed form of one prefix equal
/// to the join of the next; drop those consecutive duplicates.
fn push_unique(out: &mut Vec<String>, candidate: String) {
    if out.last().map(String::as_str) != Some(candidate.as_str()) {
        out.push(candidate);
    }
}
