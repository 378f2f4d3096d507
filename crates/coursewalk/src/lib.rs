//! coursewalk: depth-first traversal of an authenticated course tree
//! (course → subcourse → subject → activity), with pluggable filtering,
//! download/listing/completion sinks and offline dump reconciliation.

pub mod auth;
pub mod driver;
pub mod filter;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod sink;
pub mod site;
pub mod traverse;
pub mod types;
pub mod watcher;

pub use auth::{AuthGateway, Authenticator, FormLoginAuthenticator};
pub use driver::PageDriver;
pub use filter::{FilterSpec, FilterVisitor, Visitor};
pub use reconcile::{build_overlay, deflatten, diff, flatten, patch, CompletionOverlay, OverlayEntry};
pub use session::NavigationSession;
pub use settings::CrawlSettings;
pub use sink::{
    CompletionFilterSink, CompletionSyncSink, CompositeSink, DownloadSink, FlatListSink,
    ListDetail, ListSink, Sink, SinkContext,
};
pub use site::{moodle::{MoodleLayout, MoodleSelectors}, CourseScopes, FetchOutcome, SiteLayout};
pub use traverse::{crawl, TraversalEngine, TraversalStats};
pub use types::*;
pub use watcher::DownloadCompletionWatcher;
