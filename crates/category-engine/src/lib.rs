//! # category-engine
//!
//! Categorization and matching core for the urlgate redirect helper.  This
//! crate owns the persisted, sorted lookup tables for domains and URLs, the
//! domain/URI decomposition that expands a request into its candidate probe
//! keys, and the ordered three-tier match policy
//! (domains -> urls -> expressions).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use category_engine::{CategoryStore, Request};
//!
//! let names = vec!["porn".to_string(), "ads".to_string()];
//! let store = CategoryStore::open("/var/lib/urlgate/db".as_ref(), &names).unwrap();
//! let request = Request::parse("http://www.foo.com/ 10.0.0.1/- user1 GET").unwrap();
//! if store.matches(&request, "porn").unwrap() {
//!     println!("blocked");
//! }
//! ```

pub mod decompose;
mod error;
mod expression;
mod request;
mod store;
pub mod table;

// Re-export primary public API at crate root.
pub use error::StoreError;
pub use expression::ExpressionList;
pub use request::{ParseRequestError, Request};
pub use store::{Category, CategoryStore, DOMAINS_FILE, EXPRESSIONS_FILE, URLS_FILE};
pub use table::{BuildOutcome, CompiledTable};
