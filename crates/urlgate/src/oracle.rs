use std::fs;
use std::path::PathBuf;

use tracing::warn;

use redirect_proto::GroupOracle;

/// Group oracle backed by a group(5) file (`/etc/group` by default).
///
/// The file is re-read on every lookup; membership checks happen at most
/// once per request line and the file is small.  Any read or parse problem
/// is a diagnostic plus a `false` answer, never a fatal error.
pub struct UnixGroupOracle {
    path: PathBuf,
}

impl UnixGroupOracle {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl GroupOracle for UnixGroupOracle {
    fn is_member(&self, ident: &str, group: &str) -> bool {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "group file unreadable; treating membership as false"
                );
                return false;
            }
        };

        for line in contents.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            // group(5): name:password:gid:member,member,...
            let mut fields = line.splitn(4, ':');
            if fields.next() != Some(group) {
                continue;
            }
            let members = fields.nth(2).unwrap_or("");
            return members.split(',').any(|m| m.trim() == ident);
        }
        false
    }
}
