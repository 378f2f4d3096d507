//! Core data types for the content tree, locators and serialized records.

mod activity;
mod error;
mod locator;
mod record;

pub use activity::{Activity, ActivityId, ActivityKind, CourseRef, FetchStrategy, SubcourseRef, SubjectRef};
pub use error::{CrawlError, CrawlResult};
pub use locator::Locator;
pub use record::ActivityRecord;
