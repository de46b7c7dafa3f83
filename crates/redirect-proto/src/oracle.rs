//! Collaborator contracts for classifier business logic.
//!
//! Group membership is owned by the operating system or a directory service,
//! not by this helper; classifiers consult it through the [`GroupOracle`]
//! trait so the core stays free of process-execution side effects.

/// An opaque boolean oracle for group membership.
///
/// Implementations may be backed by the local user/group database or by a
/// directory-service query.  Lookups may fail; implementations report a
/// failed lookup as `false` with a diagnostic, never as a fatal error.
pub trait GroupOracle {
    fn is_member(&self, ident: &str, group: &str) -> bool;
}

/// Whether `host` is a literal IP address rather than a name.
///
/// Recognizes IPv4, IPv6, and the bracketed IPv6 form that appears in URL
/// authorities.  Pure and stateless; classifiers use it to special-case
/// requests that bypass DNS.
pub fn is_literal_ip(host: &str) -> bool {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<std::net::IpAddr>().is_ok()
}
