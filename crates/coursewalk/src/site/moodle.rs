//! Layout of Moodle-based learning platforms.

use async_trait::async_trait;
use serde::Deserialize;

use super::{query, CourseScopes, FetchOutcome, SiteLayout};
use crate::driver::script::{self, iife, js_str};
use crate::session::NavigationSession;
use crate::settings::CrawlSettings;
use crate::types::{
    Activity, ActivityId, CourseRef, CrawlError, CrawlResult, FetchStrategy, SubcourseRef,
    SubjectRef,
};

/// CSS selectors and texts the layout relies on.
#[derive(Debug, Clone)]
pub struct MoodleSelectors {
    pub course_name: String,
    pub subcourse_current: String,
    pub subcourse_links: String,
    pub section: String,
    pub section_name: String,
    pub section_toggle: String,
    pub activity: String,
    pub instance_name: String,
    pub logout_text: String,
}

impl Default for MoodleSelectors {
    fn default() -> Self {
        Self {
            course_name: ".coursename".to_string(),
            subcourse_current: ".subcourse-nav .active".to_string(),
            subcourse_links: ".subcourse-nav a:not(.active)".to_string(),
            section: "li.section".to_string(),
            section_name: ".sectionname".to_string(),
            section_toggle: "span.toggle_closed".to_string(),
            activity: "li.activity".to_string(),
            instance_name: "span.instancename".to_string(),
            logout_text: crate::settings::DEFAULT_LOGOUT_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MoodleLayout {
    selectors: MoodleSelectors,
}

#[derive(Deserialize)]
struct RawScopes {
    current: Option<SubcourseRef>,
    secondary: Vec<SubcourseRef>,
}

impl MoodleLayout {
    pub fn new(selectors: MoodleSelectors) -> Self {
        Self { selectors }
    }

    /// Default selectors with the logout label taken from `settings`.
    pub fn from_settings(settings: &CrawlSettings) -> Self {
        Self::new(MoodleSelectors {
            logout_text: settings.logout_text.clone(),
            ..MoodleSelectors::default()
        })
    }

    fn logout_script(&self) -> String {
        script::click_parent_of_text("span", &self.selectors.logout_text)
    }

    fn expand_section(&self, key: &str) -> String {
        format!(
            "const sec = document.getElementById({}); \
             if (sec) sec.querySelectorAll({}).forEach(b => b.click());",
            js_str(key),
            js_str(&self.selectors.section_toggle)
        )
    }

    fn courses_script(&self) -> String {
        iife(&format!(
            "const seen = new Set(); \
             return Array.from(document.querySelectorAll({})).map(el => {{ \
               const link = el.closest('a') || el.querySelector('a'); \
               return {{ name: el.textContent.trim(), location: link ? link.href : null }}; \
             }}).filter(c => c.name && c.location && !seen.has(c.name) && seen.add(c.name));",
            js_str(&self.selectors.course_name)
        ))
    }

    fn scopes_script(&self) -> String {
        iife(&format!(
            "const cur = document.querySelector({}); \
             const secondary = Array.from(document.querySelectorAll({})) \
               .filter(a => a.href) \
               .map(a => ({{ name: a.textContent.trim(), location: a.href }})); \
             return {{ current: cur ? {{ name: cur.textContent.trim(), location: location.href }} : null, secondary }};",
            js_str(&self.selectors.subcourse_current),
            js_str(&self.selectors.subcourse_links)
        ))
    }

    fn subjects_script(&self) -> String {
        iife(&format!(
            "return Array.from(document.querySelectorAll({})).filter(s => s.id).map(s => {{ \
               const title = s.querySelector({}); \
               return {{ name: title ? title.textContent.trim() : '', key: s.id }}; \
             }});",
            js_str(&self.selectors.section),
            js_str(&self.selectors.section_name)
        ))
    }

    fn activity_ids_script(&self, subject: &SubjectRef) -> String {
        iife(&format!(
            "{} if (!sec) return null; \
             return Array.from(sec.querySelectorAll({})).map(a => a.id).filter(Boolean);",
            self.expand_section(&subject.key),
            js_str(&self.selectors.activity)
        ))
    }

    fn activity_script(&self, subject: &SubjectRef, id: &ActivityId) -> String {
        iife(&format!(
            "{expand} \
             const el = document.getElementById({id}); \
             if (!el) return null; \
             const kind = Array.from(el.classList).find(c => c.startsWith('modtype_')) || 'modtype_unknown'; \
             const inst = el.querySelector({instance}); \
             const label = el.querySelector('.contentwithoutlink'); \
             const raw = inst ? inst.innerText : (label ? label.innerText : el.innerText); \
             const name = (raw || '').split('\\n')[0].trim(); \
             const link = inst ? inst.closest('a') : el.querySelector('a.aalink'); \
             let complete = null; \
             const form = el.querySelector('form.togglecompletion'); \
             const manual = el.querySelector('button[data-action=\"toggle-manual-completion\"]'); \
             const auto = el.querySelector('.autocompletion img'); \
             if (form) {{ \
               const state = form.querySelector('input[name=completionstate]'); \
               complete = state ? state.value === '0' : null; \
             }} else if (manual) {{ \
               complete = manual.dataset.toggletype === 'manual:undo'; \
             }} else if (auto) {{ \
               complete = /^(completed|erledigt|abgeschlossen)/i.test(auto.title || auto.alt || ''); \
             }} \
             const after = el.querySelector('.contentafterlink'); \
             const subtext = after ? after.innerHTML.trim() : ''; \
             return {{ id: el.id, name, kind, complete, completed: null, \
                       subtext: subtext || null, href: link ? link.href : null }};",
            expand = self.expand_section(&subject.key),
            id = js_str(&id.0),
            instance = js_str(&self.selectors.instance_name),
        ))
    }

    fn toggle_script(id: &ActivityId) -> String {
        iife(&format!(
            "const el = document.getElementById({}); \
             if (!el) return 'missing'; \
             const form = el.querySelector('form.togglecompletion'); \
             if (form) {{ \
               const b = form.querySelector('button, input[type=image], input[type=submit]'); \
               if (b) b.click(); else form.submit(); \
               return 'submitted'; \
             }} \
             const manual = el.querySelector('button[data-action=\"toggle-manual-completion\"]'); \
             if (manual) {{ manual.click(); return 'clicked'; }} \
             return 'uncompletable';",
            js_str(&id.0)
        ))
    }

    async fn fetch_inline(
        &self,
        session: &mut NavigationSession,
        activity: &Activity,
        extension: &'static str,
    ) -> CrawlResult<FetchOutcome> {
        let content: Option<String> = match activity.kind.fetch_strategy() {
            FetchStrategy::LinkTarget => {
                session.acquire(require_href(activity)?).await?;
                query(
                    session,
                    &iife("const a = document.querySelector('.urlworkaround a'); return a ? a.href : location.href;"),
                )
                .await?
            }
            _ => match &activity.href {
                Some(href) => {
                    session.acquire(href).await?;
                    query(
                        session,
                        &iife("const main = document.querySelector('[role=main]') || document.body; return main.innerHTML;"),
                    )
                    .await?
                }
                None => {
                    query(
                        session,
                        &iife(&format!(
                            "const el = document.getElementById({}); \
                             const c = el ? el.querySelector('.contentwithoutlink') : null; \
                             return c ? c.innerHTML : null;",
                            js_str(&activity.id.0)
                        )),
                    )
                    .await?
                }
            },
        };

        let content = content.ok_or_else(|| CrawlError::UnsupportedActivity(activity.kind.clone()))?;
        Ok(FetchOutcome::Inline { content, extension })
    }
}

fn require_href(activity: &Activity) -> CrawlResult<&str> {
    activity.href.as_deref().ok_or_else(|| {
        tracing::warn!("Activity '{}' has no link to follow", activity.name);
        CrawlError::UnsupportedActivity(activity.kind.clone())
    })
}

/// Resource URL that makes Moodle hand out the file instead of a viewer page.
fn direct_download_url(href: &str) -> String {
    let sep = if href.contains('?') { '&' } else { '?' };
    format!("{href}{sep}redirect=1")
}

#[async_trait]
impl SiteLayout for MoodleLayout {
    async fn courses(&self, session: &mut NavigationSession) -> CrawlResult<Vec<CourseRef>> {
        query(session, &self.courses_script()).await
    }

    async fn scopes(&self, session: &mut NavigationSession) -> CrawlResult<CourseScopes> {
        let raw: RawScopes = query(session, &self.scopes_script()).await?;
        Ok(CourseScopes {
            current: raw.current,
            secondary: raw.secondary,
        })
    }

    async fn subjects(&self, session: &mut NavigationSession) -> CrawlResult<Vec<SubjectRef>> {
        query(session, &self.subjects_script()).await
    }

    async fn activity_ids(
        &self,
        session: &mut NavigationSession,
        subject: &SubjectRef,
    ) -> CrawlResult<Vec<ActivityId>> {
        let ids: Option<Vec<ActivityId>> =
            query(session, &self.activity_ids_script(subject)).await?;
        Ok(ids.unwrap_or_else(|| {
            tracing::warn!("Subject '{}' ({}) not found on page", subject.name, subject.key);
            Vec::new()
        }))
    }

    async fn activity(
        &self,
        session: &mut NavigationSession,
        subject: &SubjectRef,
        id: &ActivityId,
    ) -> CrawlResult<Option<Activity>> {
        query(session, &self.activity_script(subject, id)).await
    }

    async fn fetch(
        &self,
        session: &mut NavigationSession,
        activity: &Activity,
    ) -> CrawlResult<FetchOutcome> {
        match activity.kind.fetch_strategy() {
            FetchStrategy::InlineHtml | FetchStrategy::LinkTarget => {
                let extension = activity
                    .kind
                    .inline_extension()
                    .ok_or_else(|| CrawlError::UnsupportedActivity(activity.kind.clone()))?;
                self.fetch_inline(session, activity, extension).await
            }
            FetchStrategy::DirectFile => {
                let url = direct_download_url(require_href(activity)?);
                session
                    .evaluate(&iife(&format!(
                        "const a = document.createElement('a'); a.href = {}; a.download = ''; \
                         document.body.appendChild(a); a.click(); a.remove(); return true;",
                        js_str(&url)
                    )))
                    .await?;
                Ok(FetchOutcome::Deferred)
            }
            FetchStrategy::FolderArchive => {
                session.acquire(require_href(activity)?).await?;
                let submitted: bool = query(
                    session,
                    &iife(
                        "const f = document.querySelector('form[action*=\"download_folder.php\"]'); \
                         if (!f) return false; f.submit(); return true;",
                    ),
                )
                .await?;
                if !submitted {
                    tracing::warn!("Folder '{}' offers no archive download", activity.name);
                    return Err(CrawlError::UnsupportedActivity(activity.kind.clone()));
                }
                Ok(FetchOutcome::Deferred)
            }
            FetchStrategy::Unsupported => {
                Err(CrawlError::UnsupportedActivity(activity.kind.clone()))
            }
        }
    }

    async fn toggle_completion(
        &self,
        session: &mut NavigationSession,
        activity: &Activity,
    ) -> CrawlResult<()> {
        let outcome: String = query(session, &Self::toggle_script(&activity.id)).await?;
        match outcome.as_str() {
            "submitted" => session.driver().wait_for_load().await,
            "clicked" => Ok(()),
            "missing" => Err(CrawlError::Backend(format!(
                "activity {} vanished from the page",
                activity.id
            ))),
            _ => Err(CrawlError::Uncompletable(activity.name.clone())),
        }
    }

    async fn logout(&self, session: &mut NavigationSession) -> CrawlResult<()> {
        let clicked: bool = query(session, &self.logout_script()).await?;
        if !clicked {
            return Err(CrawlError::Backend("logout link not found".into()));
        }
        session.driver().wait_for_load().await
    }
}
