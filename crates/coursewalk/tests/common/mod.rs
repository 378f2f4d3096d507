//! In-memory backend for driving the traversal engine in tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use coursewalk::{
    Activity, ActivityId, ActivityKind, AuthGateway, CourseRef, CourseScopes, CrawlError,
    CrawlResult, FetchOutcome, FormLoginAuthenticator, NavigationSession, PageDriver,
    SinkContext, SiteLayout, SubcourseRef, SubjectRef, Visitor,
};

pub const ROOT: &str = "fake://root";
pub const ELSEWHERE: &str = "fake://elsewhere";
pub const LOGIN_TITLE: &str = "Fake Login";

#[derive(Debug, Default)]
pub struct DriverState {
    pub url: String,
    pub title: String,
    pub navigations: Vec<String>,
    pub login_pending: bool,
    /// Credentials are never accepted.
    pub login_rejected: bool,
    pub logins: usize,
    pub download_dir: Option<PathBuf>,
    pub closed: bool,
}

/// Browser stand-in. Every script evaluates to `true`; a script clicking
/// `#submitbutton` completes a pending login.
#[derive(Clone, Default)]
pub struct FakeDriver {
    pub state: Arc<Mutex<DriverState>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requiring_login() -> Self {
        let driver = Self::new();
        driver.state.lock().unwrap().login_pending = true;
        driver
    }

    pub fn rejecting_login() -> Self {
        let driver = Self::requiring_login();
        driver.state.lock().unwrap().login_rejected = true;
        driver
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> CrawlResult<()> {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.navigations.push(url.to_string());
        state.title = if state.login_pending {
            LOGIN_TITLE.to_string()
        } else {
            format!("Page {url}")
        };
        Ok(())
    }

    async fn wait_for_load(&mut self) -> CrawlResult<()> {
        Ok(())
    }

    async fn current_url(&self) -> CrawlResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn title(&self) -> CrawlResult<String> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn evaluate(&mut self, script: &str) -> CrawlResult<Value> {
        let mut state = self.state.lock().unwrap();
        if script.contains("submitbutton") && state.login_pending && !state.login_rejected {
            state.login_pending = false;
            state.logins += 1;
            state.title = "Dashboard".to_string();
        }
        Ok(Value::Bool(true))
    }

    async fn set_download_dir(&mut self, dir: &Path) -> CrawlResult<()> {
        self.state.lock().unwrap().download_dir = Some(dir.to_path_buf());
        Ok(())
    }

    async fn close(self: Box<Self>) -> CrawlResult<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

pub fn activity(name: &str, kind: ActivityKind, complete: Option<bool>) -> Activity {
    Activity {
        id: ActivityId(String::new()),
        name: name.to_string(),
        kind,
        complete,
        completed: None,
        subtext: None,
        href: Some(format!("fake://activity/{name}")),
    }
}

pub struct FakeSubject {
    pub name: String,
    pub activities: Vec<Activity>,
}

pub fn subject(name: &str, activities: Vec<Activity>) -> FakeSubject {
    FakeSubject {
        name: name.to_string(),
        activities,
    }
}

pub enum FakeCourse {
    Flat {
        name: String,
        subjects: Vec<FakeSubject>,
    },
    /// The first subcourse is the one the course page shows.
    Nested {
        name: String,
        subcourses: Vec<(String, Vec<FakeSubject>)>,
    },
}

pub fn flat_course(name: &str, subjects: Vec<FakeSubject>) -> FakeCourse {
    FakeCourse::Flat {
        name: name.to_string(),
        subjects,
    }
}

pub fn nested_course(name: &str, subcourses: Vec<(&str, Vec<FakeSubject>)>) -> FakeCourse {
    FakeCourse::Nested {
        name: name.to_string(),
        subcourses: subcourses
            .into_iter()
            .map(|(n, s)| (n.to_string(), s))
            .collect(),
    }
}

fn course_url(course: &str) -> String {
    format!("fake://course/{course}")
}

#[derive(Debug, Default)]
pub struct SiteLog {
    pub fetches: Vec<String>,
    pub toggles: Vec<String>,
    pub logouts: usize,
}

struct Scope {
    subjects: Vec<FakeSubject>,
}

/// Site layout serving a fixed tree.
///
/// Resolving an activity while the backend is not on its scope page fails
/// with a backend error, like a stale DOM handle would. Fetching a page
/// navigates away.
pub struct FakeSite {
    courses: Vec<CourseRef>,
    scopes: BTreeMap<String, CourseScopes>,
    pages: BTreeMap<String, Scope>,
    pub log: Mutex<SiteLog>,
}

impl FakeSite {
    pub fn new(courses: Vec<FakeCourse>) -> Self {
        let mut site = Self {
            courses: Vec::new(),
            scopes: BTreeMap::new(),
            pages: BTreeMap::new(),
            log: Mutex::new(SiteLog::default()),
        };
        for course in courses {
            match course {
                FakeCourse::Flat { name, subjects } => {
                    let url = course_url(&name);
                    site.courses.push(CourseRef {
                        name,
                        location: url.clone(),
                    });
                    site.scopes.insert(url.clone(), CourseScopes::default());
                    site.pages.insert(url, Scope { subjects });
                }
                FakeCourse::Nested { name, subcourses } => {
                    let url = course_url(&name);
                    let mut scopes = CourseScopes::default();
                    for (i, (sub, subjects)) in subcourses.into_iter().enumerate() {
                        let location = if i == 0 {
                            url.clone()
                        } else {
                            format!("{url}/{sub}")
                        };
                        site.pages.insert(location.clone(), Scope { subjects });
                        let sub_ref = SubcourseRef {
                            name: sub,
                            location,
                        };
                        if i == 0 {
                            scopes.current = Some(sub_ref);
                        } else {
                            scopes.secondary.push(sub_ref);
                        }
                    }
                    site.courses.push(CourseRef {
                        name,
                        location: url.clone(),
                    });
                    site.scopes.insert(url, scopes);
                }
            }
        }
        site
    }

    pub fn fetches(&self) -> Vec<String> {
        self.log.lock().unwrap().fetches.clone()
    }

    pub fn toggles(&self) -> Vec<String> {
        self.log.lock().unwrap().toggles.clone()
    }

    pub fn logouts(&self) -> usize {
        self.log.lock().unwrap().logouts
    }

    async fn page<'s>(&'s self, session: &NavigationSession) -> CrawlResult<(String, &'s Scope)> {
        let url = session.current_location().await?;
        match self.pages.get(&url) {
            Some(scope) => Ok((url, scope)),
            None => Err(CrawlError::Backend(format!("no scope page at {url}"))),
        }
    }
}

fn subject_key(location: &str, name: &str) -> String {
    format!("{location}#{name}")
}

#[async_trait]
impl SiteLayout for FakeSite {
    async fn courses(&self, session: &mut NavigationSession) -> CrawlResult<Vec<CourseRef>> {
        let url = session.current_location().await?;
        if url != ROOT {
            return Err(CrawlError::Backend(format!("courses requested on {url}")));
        }
        Ok(self.courses.clone())
    }

    async fn scopes(&self, session: &mut NavigationSession) -> CrawlResult<CourseScopes> {
        let url = session.current_location().await?;
        self.scopes
            .get(&url)
            .cloned()
            .ok_or_else(|| CrawlError::Backend(format!("no course page at {url}")))
    }

    async fn subjects(&self, session: &mut NavigationSession) -> CrawlResult<Vec<SubjectRef>> {
        let (url, scope) = self.page(session).await?;
        Ok(scope
            .subjects
            .iter()
            .map(|s| SubjectRef {
                name: s.name.clone(),
                key: subject_key(&url, &s.name),
            })
            .collect())
    }

    async fn activity_ids(
        &self,
        session: &mut NavigationSession,
        subject: &SubjectRef,
    ) -> CrawlResult<Vec<ActivityId>> {
        let (url, scope) = self.page(session).await?;
        let found = scope
            .subjects
            .iter()
            .find(|s| subject_key(&url, &s.name) == subject.key)
            .ok_or_else(|| CrawlError::Backend(format!("no subject {}", subject.key)))?;
        Ok((0..found.activities.len())
            .map(|i| ActivityId(format!("{}/{i}", subject.key)))
            .collect())
    }

    async fn activity(
        &self,
        session: &mut NavigationSession,
        subject: &SubjectRef,
        id: &ActivityId,
    ) -> CrawlResult<Option<Activity>> {
        let (url, scope) = self.page(session).await?;
        let Some(found) = scope
            .subjects
            .iter()
            .find(|s| subject_key(&url, &s.name) == subject.key)
        else {
            return Err(CrawlError::Backend(format!(
                "stale handle: subject {} is not on {url}",
                subject.key
            )));
        };
        let index = id
            .0
            .rsplit('/')
            .next()
            .and_then(|i| i.parse::<usize>().ok());
        Ok(index.and_then(|i| found.activities.get(i)).map(|a| Activity {
            id: id.clone(),
            ..a.clone()
        }))
    }

    async fn fetch(
        &self,
        session: &mut NavigationSession,
        activity: &Activity,
    ) -> CrawlResult<FetchOutcome> {
        self.log.lock().unwrap().fetches.push(activity.name.clone());
        match activity.kind {
            ActivityKind::Label => Ok(FetchOutcome::Inline {
                content: format!("<p>{}</p>", activity.name),
                extension: "html",
            }),
            ActivityKind::Page => {
                session.driver().navigate(ELSEWHERE).await?;
                Ok(FetchOutcome::Inline {
                    content: format!("<main>{}</main>", activity.name),
                    extension: "html",
                })
            }
            ActivityKind::Resource => {
                let file = format!("{}.pdf", activity.name.replace('/', "-"));
                let saved = session.staging_dir().join(file);
                tokio::fs::write(saved, b"%PDF").await?;
                Ok(FetchOutcome::Deferred)
            }
            // Never produces a file.
            ActivityKind::Folder => Ok(FetchOutcome::Deferred),
            _ => Err(CrawlError::UnsupportedActivity(activity.kind.clone())),
        }
    }

    async fn toggle_completion(
        &self,
        _session: &mut NavigationSession,
        activity: &Activity,
    ) -> CrawlResult<()> {
        if activity.kind == ActivityKind::Label {
            return Err(CrawlError::Uncompletable(activity.name.clone()));
        }
        self.log.lock().unwrap().toggles.push(activity.name.clone());
        Ok(())
    }

    async fn logout(&self, _session: &mut NavigationSession) -> CrawlResult<()> {
        self.log.lock().unwrap().logouts += 1;
        Ok(())
    }
}

pub async fn open_session(driver: &FakeDriver) -> NavigationSession {
    open_session_with(driver, CancellationToken::new()).await
}

pub async fn open_session_with(driver: &FakeDriver, cancel: CancellationToken) -> NavigationSession {
    let gateway =
        AuthGateway::new().with(FormLoginAuthenticator::new(LOGIN_TITLE, "student", "secret"));
    NavigationSession::open(Box::new(driver.clone()), gateway, ROOT, cancel)
        .await
        .unwrap()
}

/// Records every hook call and enters whatever `allow` admits.
pub struct RecordingVisitor<F> {
    allow: F,
    fail_on: Option<String>,
    pub events: Vec<String>,
}

impl<F: FnMut(&str) -> bool + Send> RecordingVisitor<F> {
    pub fn new(allow: F) -> Self {
        Self {
            allow,
            fail_on: None,
            events: Vec::new(),
        }
    }

    /// Make `accept_activity` fail with a backend error for `name`.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    fn enter(&mut self, level: &str, name: &str) -> bool {
        let entered = (self.allow)(name);
        if entered {
            self.events.push(format!("enter {level} {name}"));
        }
        entered
    }
}

#[async_trait]
impl<F: FnMut(&str) -> bool + Send> Visitor for RecordingVisitor<F> {
    fn enter_course(&mut self, name: &str) -> bool {
        self.enter("course", name)
    }

    fn exit_course(&mut self) {
        self.events.push("exit course".to_string());
    }

    fn enter_subcourse(&mut self, name: &str) -> bool {
        self.enter("subcourse", name)
    }

    fn exit_subcourse(&mut self) {
        self.events.push("exit subcourse".to_string());
    }

    fn enter_subject(&mut self, name: &str) -> bool {
        self.enter("subject", name)
    }

    fn exit_subject(&mut self) {
        self.events.push("exit subject".to_string());
    }

    async fn accept_activity(
        &mut self,
        activity: &Activity,
        _cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        self.events.push(format!("activity {}", activity.name));
        if self.fail_on.as_deref() == Some(activity.name.as_str()) {
            return Err(CrawlError::Backend(format!("lost {}", activity.name)));
        }
        Ok(())
    }
}
