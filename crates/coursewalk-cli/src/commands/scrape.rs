//! Live crawls against the platform.

use std::path::PathBuf;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use coursewalk::driver::chromium::{ChromiumDriver, ChromiumOptions};
use coursewalk::{
    crawl, AuthGateway, CompletionFilterSink, CompletionOverlay, CompletionSyncSink,
    CompositeSink, CrawlSettings, DownloadCompletionWatcher, DownloadSink, FilterSpec,
    FilterVisitor, FlatListSink, FormLoginAuthenticator, ListDetail, ListSink, MoodleLayout,
    NavigationSession, Sink, SiteLayout,
};

use super::{read_json, write_json, write_json_to};
use crate::config::Credentials;

/// How activities are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Hierarchical(ListDetail),
    Flat,
}

/// Listing destination; `-` is stdout.
#[derive(Debug, Clone)]
pub struct ListTarget {
    pub path: String,
    pub format: ListFormat,
}

/// Everything a scrape run needs. Each action enables its own sink.
#[derive(Debug)]
pub struct ScrapeOptions {
    pub credentials: PathBuf,
    pub filter: FilterSpec,
    pub settings: CrawlSettings,
    pub headless: bool,
    pub list: Option<ListTarget>,
    pub download: Option<PathBuf>,
    pub sync: Option<String>,
    /// Only act on activities whose completion equals this.
    pub completion: Option<bool>,
}

impl ScrapeOptions {
    pub fn has_action(&self) -> bool {
        self.list.is_some() || self.download.is_some() || self.sync.is_some()
    }
}

enum Listing {
    Tree(ListSink),
    Flat(FlatListSink),
}

/// Launch the browser and open an authenticated-on-demand session.
async fn open_session(
    credentials: &Credentials,
    settings: &CrawlSettings,
    headless: bool,
    cancel: CancellationToken,
) -> anyhow::Result<NavigationSession> {
    let options = ChromiumOptions {
        headless,
        navigation_timeout: settings.navigation_timeout,
        ..ChromiumOptions::default()
    };
    let driver = ChromiumDriver::launch(&options)
        .await
        .context("cannot start the browser")?;

    let gateway = AuthGateway::new().with(FormLoginAuthenticator::new(
        settings.login_title.clone(),
        credentials.username.clone(),
        credentials.password.clone(),
    ));
    Ok(NavigationSession::open(Box::new(driver), gateway, settings.root_url.clone(), cancel).await?)
}

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current step");
            token.cancel();
        }
    });
}

pub async fn run(opts: ScrapeOptions, cancel: CancellationToken) -> anyhow::Result<()> {
    if !opts.has_action() {
        anyhow::bail!("nothing to do: pass --list, --download or --sync");
    }

    let credentials = Credentials::load(&opts.credentials)?;
    let overlay: Option<CompletionOverlay> = opts
        .sync
        .as_deref()
        .map(|path| read_json(Some(path)))
        .transpose()?;

    let mut listing = opts.list.as_ref().map(|target| match target.format {
        ListFormat::Hierarchical(detail) => Listing::Tree(ListSink::new(detail)),
        ListFormat::Flat => Listing::Flat(FlatListSink::new()),
    });

    let layout = MoodleLayout::from_settings(&opts.settings);
    let session = open_session(&credentials, &opts.settings, opts.headless, cancel).await?;

    let stats = {
        let mut composite = CompositeSink::new(Vec::new());
        match listing.as_mut() {
            Some(Listing::Tree(sink)) => composite.push(sink),
            Some(Listing::Flat(sink)) => composite.push(sink),
            None => {}
        }
        if let Some(root) = &opts.download {
            let watcher = DownloadCompletionWatcher::new(
                opts.settings.poll_interval,
                opts.settings.download_timeout,
            );
            composite.push(DownloadSink::new(
                root,
                watcher,
                opts.settings.download_attempts,
            ));
        }
        if let Some(overlay) = overlay {
            composite.push(CompletionSyncSink::new(overlay));
        }

        let sink: Box<dyn Sink + '_> = match opts.completion {
            Some(desired) => Box::new(CompletionFilterSink::new(composite, desired)),
            None => Box::new(composite),
        };
        let mut visitor = FilterVisitor::new(opts.filter, sink);
        crawl(session, &layout, &mut visitor).await?
    };
    tracing::info!(
        "Done: {} activities, {} skipped after errors",
        stats.activities,
        stats.failed
    );

    if let (Some(target), Some(listing)) = (&opts.list, listing) {
        match listing {
            Listing::Tree(sink) => write_json_to(&target.path, &sink.into_value())?,
            Listing::Flat(sink) => write_json_to(&target.path, sink.records())?,
        }
    }
    Ok(())
}

/// Print the names of all courses on the dashboard.
pub async fn courses(
    credentials: PathBuf,
    settings: CrawlSettings,
    headless: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let credentials = Credentials::load(&credentials)?;
    let layout = MoodleLayout::from_settings(&settings);
    let mut session = open_session(&credentials, &settings, headless, cancel).await?;

    let listed = match session.acquire(&settings.root_url).await {
        Ok(()) => layout.courses(&mut session).await,
        Err(e) => Err(e),
    };
    session.close(&layout).await?;

    let names: Vec<String> = listed?.into_iter().map(|c| c.name).collect();
    write_json(&names)
}
