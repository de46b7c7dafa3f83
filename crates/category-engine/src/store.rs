use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::decompose::{domain_suffixes, uri_prefixes};
use crate::error::StoreError;
use crate::expression::ExpressionList;
use crate::request::Request;
use crate::table::{self, BuildOutcome, CompiledTable};

/// Source-file names inside a category directory.
pub const DOMAINS_FILE: &str = "domains";
pub const URLS_FILE: &str = "urls";
pub const EXPRESSIONS_FILE: &str = "expressions";

/// One named policy bucket with up to three matching tiers.
///
/// A category directory may carry any subset of `domains`, `urls`, and
/// `expressions`; an absent source file simply leaves that tier out.
#[derive(Debug)]
pub struct Category {
    name: String,
    domains: Option<CompiledTable>,
    urls: Option<CompiledTable>,
    expressions: Option<ExpressionList>,
}

impl Category {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the category has no matching tiers at all.  Such a category
    /// never matches any request.
    pub fn is_empty(&self) -> bool {
        self.domains.is_none() && self.urls.is_none() && self.expressions.is_none()
    }

    /// Test `request` against the present tiers, in the fixed order
    /// domains -> urls -> expressions, first hit wins.
    fn matches(&self, request: &Request) -> bool {
        if let (Some(table), Some(host)) = (&self.domains, request.host.as_deref()) {
            for suffix in domain_suffixes(host) {
                if table.contains(&suffix) {
                    trace!(category = self.name, key = suffix, "domain tier hit");
                    return true;
                }
            }
        }
        if let Some(table) = &self.urls {
            let probe = request.authority_path_query.to_ascii_lowercase();
            for prefix in uri_prefixes(&probe) {
                if table.contains(&prefix) {
                    trace!(category = self.name, key = prefix, "url tier hit");
                    return true;
                }
            }
        }
        if let Some(expressions) = &self.expressions {
            if expressions.matches(&request.url) {
                trace!(category = self.name, "expression tier hit");
                return true;
            }
        }
        false
    }
}

/// The read-only registry of categories the matching engine consults.
///
/// Constructed once at startup from a database root directory holding one
/// subdirectory per category; never mutated while serving.  The offline
/// rebuild path ([`CategoryStore::build_tables`]) is a separate invocation
/// and must not run concurrently with a process serving the same tables.
#[derive(Debug)]
pub struct CategoryStore {
    root: PathBuf,
    categories: BTreeMap<String, Category>,
}

impl CategoryStore {
    /// Open the store for serving.
    ///
    /// Runs a non-forced freshness build pass first, so a stale or missing
    /// compiled table is regenerated under the mtime rule, then loads every
    /// category read-only.
    pub fn open(root: &Path, names: &[String]) -> Result<Self, StoreError> {
        Self::build_tables(root, names, false)?;
        Self::load(root, names)
    }

    /// Load compiled tables and expression lists without building anything.
    ///
    /// A source list whose compiled table is missing is a fatal error here;
    /// a tier with no source file at all is skipped.
    pub fn load(root: &Path, names: &[String]) -> Result<Self, StoreError> {
        let mut categories = BTreeMap::new();
        for name in names {
            let dir = root.join(name);
            let category = Category {
                name: name.clone(),
                domains: load_table(&dir, DOMAINS_FILE)?,
                urls: load_table(&dir, URLS_FILE)?,
                expressions: load_expressions(&dir)?,
            };
            if category.is_empty() {
                debug!(category = %name, "category has no tiers configured; it will never match");
            }
            categories.insert(name.clone(), category);
        }
        info!(
            root = %root.display(),
            categories = categories.len(),
            "category store loaded"
        );
        Ok(Self {
            root: root.to_path_buf(),
            categories,
        })
    }

    /// Regenerate stale compiled tables for the named categories.
    ///
    /// With `force` set every table is rewritten regardless of mtimes.
    /// Categories without a given source list are skipped.  This is the
    /// offline rebuild path; it has no effect on tables already loaded into
    /// a running process.
    pub fn build_tables(root: &Path, names: &[String], force: bool) -> Result<(), StoreError> {
        for name in names {
            let dir = root.join(name);
            for file in [DOMAINS_FILE, URLS_FILE] {
                let source = dir.join(file);
                if !source.exists() {
                    debug!(category = %name, list = file, "no source list; skipping");
                    continue;
                }
                match table::build(&source, force)? {
                    BuildOutcome::Rebuilt(keys) => {
                        info!(category = %name, list = file, keys, "compiled table rebuilt");
                    }
                    BuildOutcome::Fresh => {}
                }
            }
        }
        Ok(())
    }

    /// The database root this store was opened from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Result<&Category, StoreError> {
        self.categories
            .get(name)
            .ok_or_else(|| StoreError::UnknownCategory(name.to_string()))
    }

    /// Test whether `request` belongs to the named category.
    ///
    /// A reference to a category the store was never configured with is an
    /// error, not a non-match.
    pub fn matches(&self, request: &Request, name: &str) -> Result<bool, StoreError> {
        Ok(self.category(name)?.matches(request))
    }

    /// Fold [`matches`](Self::matches) across `names`, returning the first
    /// matching category's name.
    pub fn match_any<'a>(
        &self,
        request: &Request,
        names: &'a [String],
    ) -> Result<Option<&'a str>, StoreError> {
        for name in names {
            if self.matches(request, name)? {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }
}

/// Open one tier's compiled table.
///
/// Tier present: compiled table exists (leftover tables without a source are
/// still honored).  Source without a compiled table means the build pass was
/// skipped, which is a misconfiguration.  Neither file: tier absent.
fn load_table(dir: &Path, file: &str) -> Result<Option<CompiledTable>, StoreError> {
    let source = dir.join(file);
    let compiled = table::compiled_path(&source);
    if compiled.exists() {
        return CompiledTable::open(&compiled).map(Some);
    }
    if source.exists() {
        return Err(StoreError::OpenTable {
            path: compiled,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source list has no compiled table; run a build first",
            ),
        });
    }
    Ok(None)
}

fn load_expressions(dir: &Path) -> Result<Option<ExpressionList>, StoreError> {
    let path = dir.join(EXPRESSIONS_FILE);
    if path.exists() {
        ExpressionList::load(&path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_category(root: &Path, name: &str, file: &str, contents: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), contents).unwrap();
    }

    fn request(line: &str) -> Request {
        Request::parse(line).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn domain_table_matches_host_and_subdomains() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "porn", DOMAINS_FILE, "foo.com # flagged\n# note\n");
        let store = CategoryStore::open(root.path(), &names(&["porn"])).unwrap();

        let hit = request("http://foo.com/ 10.0.0.1/- - GET");
        let sub = request("http://www.foo.com/index.html 10.0.0.1/- - GET");
        let miss = request("http://bar.com/ 10.0.0.1/- - GET");

        assert!(store.matches(&hit, "porn").unwrap());
        assert!(store.matches(&sub, "porn").unwrap());
        assert!(!store.matches(&miss, "porn").unwrap());
    }

    #[test]
    fn url_table_matches_both_directory_conventions() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "ads", URLS_FILE, "host.com/banners/\nother.com/ad\n");
        let store = CategoryStore::open(root.path(), &names(&["ads"])).unwrap();

        // Listed with a trailing slash; probed via the "dir/" form.
        assert!(store
            .matches(&request("http://host.com/banners/img.gif - - GET"), "ads")
            .unwrap());
        // Listed without one; probed via the "dir" form.
        assert!(store
            .matches(&request("http://other.com/ad/x.js - - GET"), "ads")
            .unwrap());
        assert!(!store
            .matches(&request("http://host.com/news/ - - GET"), "ads")
            .unwrap());
    }

    #[test]
    fn url_probes_are_lowercased() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "ads", URLS_FILE, "host.com/banners\n");
        let store = CategoryStore::open(root.path(), &names(&["ads"])).unwrap();

        assert!(store
            .matches(&request("http://Host.com/Banners/x - - GET"), "ads")
            .unwrap());
    }

    #[test]
    fn expression_tier_matches_the_full_url() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "warez", EXPRESSIONS_FILE, "(crack|keygen)\n");
        let store = CategoryStore::open(root.path(), &names(&["warez"])).unwrap();

        assert!(store
            .matches(&request("http://files.example/KeyGen.zip - - GET"), "warez")
            .unwrap());
        assert!(!store
            .matches(&request("http://files.example/readme.txt - - GET"), "warez")
            .unwrap());
    }

    #[test]
    fn category_with_no_tiers_never_matches() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("empty")).unwrap();
        let store = CategoryStore::open(root.path(), &names(&["empty"])).unwrap();

        assert!(store.category("empty").unwrap().is_empty());
        assert!(!store
            .matches(&request("http://anything.com/ - - GET"), "empty")
            .unwrap());
    }

    #[test]
    fn unknown_category_is_an_error() {
        let root = TempDir::new().unwrap();
        let store = CategoryStore::open(root.path(), &[]).unwrap();
        let err = store
            .matches(&request("http://foo.com/ - - GET"), "nope")
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownCategory(name) if name == "nope"));
    }

    #[test]
    fn match_any_returns_first_hit() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "porn", DOMAINS_FILE, "xxx.example\n");
        write_category(root.path(), "ads", DOMAINS_FILE, "ads.example\n");
        let store = CategoryStore::open(root.path(), &names(&["porn", "ads"])).unwrap();

        let check = names(&["porn", "ads"]);
        let r = request("http://banner.ads.example/ 10.0.0.1/- - GET");
        assert_eq!(store.match_any(&r, &check).unwrap(), Some("ads"));

        let r2 = request("http://neither.example/ 10.0.0.1/- - GET");
        assert_eq!(store.match_any(&r2, &check).unwrap(), None);
    }

    #[test]
    fn connect_request_matches_domain_table() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "porn", DOMAINS_FILE, "youporn.com\n");
        let store = CategoryStore::open(root.path(), &names(&["porn"])).unwrap();

        assert!(store
            .matches(&request("www.youporn.com:443 10.0.0.1/- - CONNECT"), "porn")
            .unwrap());
    }

    #[test]
    fn load_without_build_rejects_uncompiled_source() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "porn", DOMAINS_FILE, "foo.com\n");
        let err = CategoryStore::load(root.path(), &names(&["porn"])).unwrap_err();
        assert!(matches!(err, StoreError::OpenTable { .. }));
    }

    #[test]
    fn open_rebuilds_after_source_change() {
        let root = TempDir::new().unwrap();
        write_category(root.path(), "porn", DOMAINS_FILE, "old.com\n");
        CategoryStore::open(root.path(), &names(&["porn"])).unwrap();

        // Rewrite the source with a future mtime so it is strictly newer
        // than the compiled table.
        let source = root.path().join("porn").join(DOMAINS_FILE);
        fs::write(&source, "new.com\n").unwrap();
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        let file = fs::File::options().append(true).open(&source).unwrap();
        file.set_modified(later).unwrap();

        let store = CategoryStore::open(root.path(), &names(&["porn"])).unwrap();
        assert!(store
            .matches(&request("http://new.com/ - - GET"), "porn")
            .unwrap());
        assert!(!store
            .matches(&request("http://old.com/ - - GET"), "porn")
            .unwrap());
    }
}
