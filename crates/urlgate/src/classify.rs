use anyhow::{Context, Result};
use tracing::debug;

use category_engine::{CategoryStore, Request};
use redirect_proto::{is_literal_ip, Classifier, GroupOracle};

/// Result value used for requests caught by the literal-IP rule rather than
/// a category; visible to redirect templates through `%t`.
const IP_HOST_CLASS: &str = "in-addr";

/// The config-driven default classifier.
///
/// Decision order: identities in an exempt group always pass, then requests
/// whose host is a literal IP address are redirected (when enabled), then the
/// blocked categories are folded over with [`CategoryStore::match_any`]; the
/// first matching category's name becomes the verdict.
pub struct BlocklistClassifier {
    block: Vec<String>,
    exempt_groups: Vec<String>,
    block_ip_hosts: bool,
    oracle: Box<dyn GroupOracle>,
}

impl BlocklistClassifier {
    /// Build the classifier, checking every blocked category against the
    /// store so that a misspelled name fails at startup rather than on the
    /// first matching request.
    pub fn new(
        store: &CategoryStore,
        block: Vec<String>,
        exempt_groups: Vec<String>,
        block_ip_hosts: bool,
        oracle: Box<dyn GroupOracle>,
    ) -> Result<Self> {
        for name in &block {
            store
                .category(name)
                .with_context(|| format!("blocked category '{name}' is not configured"))?;
        }
        Ok(Self {
            block,
            exempt_groups,
            block_ip_hosts,
            oracle,
        })
    }
}

impl std::fmt::Debug for BlocklistClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlocklistClassifier")
            .field("block", &self.block)
            .field("exempt_groups", &self.exempt_groups)
            .field("block_ip_hosts", &self.block_ip_hosts)
            .finish_non_exhaustive()
    }
}

impl Classifier for BlocklistClassifier {
    fn classify(&self, store: &CategoryStore, request: &Request) -> Result<Option<String>> {
        if let Some(ident) = request.ident.as_deref() {
            if self
                .exempt_groups
                .iter()
                .any(|g| self.oracle.is_member(ident, g))
            {
                debug!(ident, "identity is in an exempt group; passing");
                return Ok(None);
            }
        }

        if self.block_ip_hosts {
            if let Some(host) = request.host.as_deref() {
                if is_literal_ip(host) {
                    return Ok(Some(IP_HOST_CLASS.to_string()));
                }
            }
        }

        let hit = store.match_any(request, &self.block)?;
        Ok(hit.map(str::to_string))
    }
}
