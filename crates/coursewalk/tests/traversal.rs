mod common;

use common::*;
use coursewalk::{
    crawl, ActivityKind, CrawlError, FilterSpec, FilterVisitor, FlatListSink, TraversalEngine,
};
use tokio_util::sync::CancellationToken;

fn school() -> FakeSite {
    FakeSite::new(vec![
        flat_course(
            "Math",
            vec![
                subject(
                    "Algebra",
                    vec![
                        activity("Sheet 1", ActivityKind::Resource, Some(false)),
                        activity("Notes", ActivityKind::Page, Some(true)),
                        activity("Intro", ActivityKind::Label, None),
                    ],
                ),
                subject(
                    "Geometry",
                    vec![activity("Triangles", ActivityKind::Page, Some(false))],
                ),
            ],
        ),
        flat_course(
            "History",
            vec![subject(
                "Rome",
                vec![activity("Caesar", ActivityKind::Label, None)],
            )],
        ),
        nested_course(
            "Bio",
            vec![
                (
                    "9a",
                    vec![subject(
                        "Cells",
                        vec![activity("Mitosis", ActivityKind::Page, Some(false))],
                    )],
                ),
                (
                    "9b",
                    vec![subject(
                        "Plants",
                        vec![activity("Leaves", ActivityKind::Label, None)],
                    )],
                ),
            ],
        ),
    ])
}

#[tokio::test]
async fn test_filter_visits_only_allowed_subjects() {
    let site = school();
    let driver = FakeDriver::new();
    let session = open_session(&driver).await;

    let spec = FilterSpec::from_json(r#"{"Math": {"subjects": {"Algebra": {}}}}"#).unwrap();
    let mut visitor = FilterVisitor::new(spec, FlatListSink::new());
    let stats = crawl(session, &site, &mut visitor).await.unwrap();

    let locators: Vec<String> = visitor
        .into_sink()
        .into_records()
        .iter()
        .map(|r| r.locator().to_string())
        .collect();
    assert_eq!(
        locators,
        vec!["Math/Algebra/Sheet 1", "Math/Algebra/Notes", "Math/Algebra/Intro"]
    );
    assert_eq!(stats.courses, 1);
    assert_eq!(stats.activities, 3);
    assert!(!driver.navigations().iter().any(|u| u.contains("History")));
}

#[tokio::test]
async fn test_subcourses_are_walked_current_first() {
    let site = school();
    let driver = FakeDriver::new();
    let session = open_session(&driver).await;

    let spec = FilterSpec::default()
        .allow_subcourse_subject("Bio", "9a", "Cells")
        .allow_subcourse_subject("Bio", "9b", "Plants");
    let mut visitor = FilterVisitor::new(spec, FlatListSink::new());
    crawl(session, &site, &mut visitor).await.unwrap();

    let locators: Vec<String> = visitor
        .into_sink()
        .into_records()
        .iter()
        .map(|r| r.locator().to_string())
        .collect();
    assert_eq!(locators, vec!["Bio/9a/Cells/Mitosis", "Bio/9b/Plants/Leaves"]);

    // The current subcourse is the course page itself.
    let navigations = driver.navigations();
    assert_eq!(
        navigations.iter().filter(|u| *u == "fake://course/Bio").count(),
        1
    );
    assert!(navigations.contains(&"fake://course/Bio/9b".to_string()));
}

#[tokio::test]
async fn test_enter_exit_pairing() {
    let site = school();
    let driver = FakeDriver::new();
    let mut session = open_session(&driver).await;

    let mut visitor = RecordingVisitor::new(|name: &str| {
        matches!(name, "Math" | "Geometry" | "Bio" | "9b" | "Plants")
    });
    TraversalEngine::new(&site)
        .run(&mut session, &mut visitor)
        .await
        .unwrap();

    assert_eq!(
        visitor.events,
        vec![
            "enter course Math",
            "enter subject Geometry",
            "activity Triangles",
            "exit subject",
            "exit course",
            "enter course Bio",
            "enter subcourse 9b",
            "enter subject Plants",
            "activity Leaves",
            "exit subject",
            "exit subcourse",
            "exit course",
        ]
    );
}

#[tokio::test]
async fn test_failed_walk_still_exits_every_entered_level() {
    let site = school();
    let driver = FakeDriver::new();
    let mut session = open_session(&driver).await;

    let mut visitor = RecordingVisitor::new(|name: &str| {
        matches!(name, "Bio" | "9a" | "Cells" | "9b" | "Plants")
    })
    .failing_on("Mitosis");
    let err = TraversalEngine::new(&site)
        .run(&mut session, &mut visitor)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Backend(_)));
    assert_eq!(
        visitor.events,
        vec![
            "enter course Bio",
            "enter subcourse 9a",
            "enter subject Cells",
            "activity Mitosis",
            "exit subject",
            "exit subcourse",
            "exit course",
        ]
    );
}

#[tokio::test]
async fn test_drift_is_recovered_between_activities() {
    // Fetching a page navigates away; later activities of the same subject
    // must still resolve.
    let site = FakeSite::new(vec![flat_course(
        "Math",
        vec![subject(
            "Algebra",
            vec![
                activity("First", ActivityKind::Page, None),
                activity("Second", ActivityKind::Page, None),
                activity("Third", ActivityKind::Label, None),
            ],
        )],
    )]);
    let driver = FakeDriver::new();
    let session = open_session(&driver).await;
    let out = tempfile::tempdir().unwrap();

    let sink = coursewalk::DownloadSink::new(
        out.path(),
        coursewalk::DownloadCompletionWatcher::new(
            std::time::Duration::from_millis(5),
            std::time::Duration::from_millis(100),
        ),
        1,
    );
    let mut visitor = FilterVisitor::new(FilterSpec::default().allow_subject("Math", "Algebra"), sink);
    let stats = crawl(session, &site, &mut visitor).await.unwrap();

    assert_eq!(stats.activities, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(site.fetches(), vec!["First", "Second", "Third"]);
    for name in ["First.html", "Second.html", "Third.html"] {
        assert!(out.path().join("Math/Algebra").join(name).is_file(), "{name}");
    }
    let returns = driver
        .navigations()
        .iter()
        .filter(|u| *u == "fake://course/Math")
        .count();
    assert_eq!(returns, 3);
}

#[tokio::test]
async fn test_login_challenge_is_answered() {
    let site = school();
    let driver = FakeDriver::requiring_login();
    let session = open_session(&driver).await;

    let mut visitor = FilterVisitor::new(
        FilterSpec::default().allow_subject("History", "Rome"),
        FlatListSink::new(),
    );
    crawl(session, &site, &mut visitor).await.unwrap();

    assert_eq!(visitor.into_sink().records().len(), 1);
    assert_eq!(driver.state.lock().unwrap().logins, 1);
}

#[tokio::test]
async fn test_persistent_challenge_is_fatal_but_session_closes() {
    let site = school();
    let driver = FakeDriver::rejecting_login();
    let session = open_session(&driver).await;
    let staging = session.staging_dir().to_path_buf();

    let mut visitor = RecordingVisitor::new(|_: &str| true);
    let err = crawl(session, &site, &mut visitor).await.unwrap_err();

    assert!(matches!(err, CrawlError::Authentication(_)));
    assert!(visitor.events.is_empty());
    assert!(driver.state.lock().unwrap().closed);
    assert!(!staging.exists());
}

#[tokio::test]
async fn test_logout_runs_after_success() {
    let site = school();
    let driver = FakeDriver::new();
    let session = open_session(&driver).await;
    let staging = session.staging_dir().to_path_buf();
    assert_eq!(driver.state.lock().unwrap().download_dir.as_deref(), Some(staging.as_path()));

    let mut visitor = RecordingVisitor::new(|_: &str| false);
    crawl(session, &site, &mut visitor).await.unwrap();

    assert_eq!(site.logouts(), 1);
    assert_eq!(driver.navigations().last().map(String::as_str), Some(ROOT));
    assert!(driver.state.lock().unwrap().closed);
    assert!(!staging.exists());
}

#[tokio::test]
async fn test_cancelled_crawl_still_logs_out() {
    let site = school();
    let driver = FakeDriver::new();
    let cancel = CancellationToken::new();
    let session = open_session_with(&driver, cancel.clone()).await;
    cancel.cancel();

    let mut visitor = RecordingVisitor::new(|_: &str| true);
    let err = crawl(session, &site, &mut visitor).await.unwrap_err();

    assert!(matches!(err, CrawlError::Cancelled));
    assert_eq!(site.logouts(), 1);
    assert!(driver.state.lock().unwrap().closed);
}

#[tokio::test]
async fn test_unsupported_activity_does_not_abort() {
    let site = FakeSite::new(vec![flat_course(
        "Math",
        vec![subject(
            "Algebra",
            vec![
                activity("Quiz 1", ActivityKind::Quiz, None),
                activity("Empty folder", ActivityKind::Folder, None),
                activity("Sheet", ActivityKind::Resource, None),
            ],
        )],
    )]);
    let driver = FakeDriver::new();
    let session = open_session(&driver).await;
    let out = tempfile::tempdir().unwrap();

    let sink = coursewalk::DownloadSink::new(
        out.path(),
        coursewalk::DownloadCompletionWatcher::new(
            std::time::Duration::from_millis(5),
            std::time::Duration::from_millis(30),
        ),
        2,
    );
    let mut visitor = FilterVisitor::new(FilterSpec::default().allow_subject("Math", "Algebra"), sink);
    let stats = crawl(session, &site, &mut visitor).await.unwrap();

    // The folder times out twice and is skipped; the quiz is never fetched.
    assert_eq!(stats.activities, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(site.fetches(), vec!["Empty folder", "Empty folder", "Sheet"]);
    assert!(out.path().join("Math/Algebra/Sheet.pdf").is_file());
}
