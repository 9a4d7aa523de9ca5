use docpreload::preload::{
    ClientBox, FixedContainer, PreloadError, PreloadEvent, PreloadManager, PreloadOutcome,
    PreloadRequest, PreloadState, ScaledDimensions,
};
use docpreload::test_utils::fixtures::{
    RecordingHost, ScriptedFetcher, SharedContainer, jpeg_with_comment, plain_jpeg,
};

const PRIMARY: &str = "https://cdn.test/doc/preload.jpg";
const TEMPLATE: &str = "https://cdn.test/doc/pages/asset_url";
const LETTER_COMMENT: &str = "pdfWidth:612pts,pdfHeight:792pts,numPages:5";

fn page(n: u32) -> String {
    format!("https://cdn.test/doc/pages/{n}.png")
}

fn container(width: u32, height: u32) -> FixedContainer {
    FixedContainer(ClientBox::new(width, height))
}

fn manager(fetcher: &ScriptedFetcher) -> PreloadManager<ScriptedFetcher, RecordingHost> {
    PreloadManager::new(fetcher.clone(), RecordingHost::default())
}

/// Five-page document where the third page image is missing
fn five_pages_without_third() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .with_page(PRIMARY, jpeg_with_comment(100, 129, LETTER_COMMENT))
        .with_page(&page(2), plain_jpeg(100, 129))
        .with_page(&page(4), plain_jpeg(100, 129))
        .with_page(&page(5), plain_jpeg(100, 129))
}

fn assert_close(actual: u32, expected: u32) {
    assert!(
        actual.abs_diff(expected) <= 1,
        "expected about {expected}, got {actual}"
    );
}

#[tokio::test]
async fn test_mosaic_skips_failed_secondary_page() {
    let fetcher = five_pages_without_third();
    let mut manager = manager(&fetcher);

    let request = PreloadRequest::new(PRIMARY, 5).with_paged_template(TEMPLATE);
    let outcome = manager
        .show_preload(request, container(800, 600))
        .await
        .expect("preload should succeed");

    assert_eq!(outcome, PreloadOutcome::Showing { pages: 4 });
    assert_eq!(manager.state(), PreloadState::Showing);

    let element = manager
        .view()
        .and_then(|view| view.preload.as_ref())
        .expect("mosaic should be attached");
    assert_eq!(element.page_numbers(), vec![1, 2, 4, 5]);
    assert!(!element.invisible);
    assert!(element.placeholders.iter().all(|p| p.loaded));

    let session = manager.session().expect("session should be live");
    let slots: Vec<u32> = session.handles.keys().copied().collect();
    assert_eq!(slots, vec![1, 2, 3, 4]);
    assert_eq!(manager.registry().live_count(), 4);
    assert_eq!(manager.host().thumbnail_inits, 1);
    assert!(manager.load_elapsed().is_some());

    assert_eq!(fetcher.calls().len(), 5);
}

#[tokio::test]
async fn test_placeholder_images_resolve_to_fetched_bytes() {
    let fetcher = five_pages_without_third();
    let mut manager = manager(&fetcher);

    let request = PreloadRequest::new(PRIMARY, 2).with_paged_template(TEMPLATE);
    manager
        .show_preload(request, container(800, 600))
        .await
        .expect("preload should succeed");

    let element = manager
        .view()
        .and_then(|view| view.preload.as_ref())
        .expect("mosaic should be attached");
    let second = element.placeholders[1]
        .image
        .expect("second placeholder should have an image");
    let bytes = manager
        .resource(second.resource)
        .expect("resource should be live while showing");
    assert_eq!(&bytes[..], &plain_jpeg(100, 129)[..]);
}

#[tokio::test]
async fn test_page_requests_capped() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let mut manager = manager(&fetcher);

    let request = PreloadRequest::new(PRIMARY, 20).with_paged_template(TEMPLATE);
    let outcome = manager
        .show_preload(request, container(800, 600))
        .await
        .expect("primary page alone is enough");

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 8);
    assert_eq!(calls[0], PRIMARY);
    assert_eq!(calls[7], page(8));
    assert_eq!(outcome, PreloadOutcome::Showing { pages: 1 });
}

#[tokio::test]
async fn test_missing_template_fetches_primary_only() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let mut manager = manager(&fetcher);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 6), container(800, 600))
        .await
        .expect("preload should succeed");

    assert_eq!(fetcher.calls(), vec![PRIMARY.to_string()]);
}

#[tokio::test]
async fn test_primary_failure_aborts_preload() {
    let fetcher = ScriptedFetcher::new().with_page(&page(2), plain_jpeg(60, 80));
    let (tx, rx) = flume::unbounded();
    let mut manager = manager(&fetcher).with_events(tx);

    let request = PreloadRequest::new(PRIMARY, 2).with_paged_template(TEMPLATE);
    let result = manager.show_preload(request, container(800, 600)).await;

    assert!(matches!(result, Err(PreloadError::Acquire(_))));
    assert!(manager.view().is_none());
    assert_eq!(manager.state(), PreloadState::CleanedUp);
    assert_eq!(manager.host().thumbnail_inits, 0);
    assert_eq!(manager.registry().live_count(), 0);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![PreloadEvent::CleanedUp]);
}

#[tokio::test]
async fn test_undecodable_primary_is_a_failure() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, b"not an image".to_vec());
    let mut manager = manager(&fetcher);

    let result = manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await;

    assert!(result.is_err());
    assert!(manager.session().is_none());
}

#[tokio::test]
async fn test_embedded_geometry_sizes_placeholders() {
    let fetcher = five_pages_without_third();
    let mut manager = manager(&fetcher);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("preload should succeed");

    let geometry = manager.geometry().expect("geometry should be embedded");
    assert!((geometry.pdf_width - 816.0).abs() < 1e-6);
    assert!((geometry.pdf_height - 1056.0).abs() < 1e-6);
    assert_eq!(geometry.num_pages, 5);

    // Portrait letter page fit to 760px of usable width
    let dims = manager.dimensions().expect("dimensions should be set");
    assert_close(dims.width, 760);
    assert_close(dims.height, 983);
    assert_eq!(manager.view().and_then(|view| view.width), Some(dims.width));
}

#[tokio::test]
async fn test_falls_back_to_image_size_without_metadata() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(100, 200));
    let mut manager = manager(&fetcher);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(140, 600))
        .await
        .expect("preload should succeed");

    assert_eq!(manager.geometry(), None);
    assert_eq!(manager.dimensions(), Some(ScaledDimensions::new(100, 200)));
}

#[tokio::test]
async fn test_resize_refits_every_placeholder() {
    let fetcher = ScriptedFetcher::new()
        .with_page(PRIMARY, plain_jpeg(100, 200))
        .with_page(&page(2), plain_jpeg(100, 200));
    let mut manager = manager(&fetcher);
    let shared = SharedContainer::new(140, 600);

    let request = PreloadRequest::new(PRIMARY, 2).with_paged_template(TEMPLATE);
    manager
        .show_preload(request, shared.clone())
        .await
        .expect("preload should succeed");
    assert_eq!(manager.dimensions(), Some(ScaledDimensions::new(100, 200)));

    // Scale 2.0 is capped at the automatic zoom limit
    shared.set(240, 600);
    manager.resize();

    let expected = ScaledDimensions::new(125, 250);
    assert_eq!(manager.dimensions(), Some(expected));
    let element = manager
        .view()
        .and_then(|view| view.preload.as_ref())
        .expect("mosaic should be attached");
    assert!(
        element
            .placeholders
            .iter()
            .all(|p| p.dimensions == Some(expected))
    );
}

#[tokio::test]
async fn test_document_already_loaded_starts_hide() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let host = RecordingHost {
        document_loaded: true,
        ..RecordingHost::default()
    };
    let mut manager = PreloadManager::new(fetcher, host);

    let outcome = manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("preload should succeed");

    assert_eq!(outcome, PreloadOutcome::DocumentAlreadyLoaded);
    assert_eq!(manager.state(), PreloadState::Hiding);
    assert!(manager.view().is_some_and(|view| view.transparent));

    manager.transition_ended();
    assert_eq!(manager.state(), PreloadState::CleanedUp);
    assert_eq!(manager.registry().live_count(), 0);
}

#[tokio::test]
async fn test_hide_restores_scroll_and_is_idempotent() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let (tx, rx) = flume::unbounded();
    let mut manager = manager(&fetcher).with_events(tx);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("preload should succeed");

    manager.wrapper_scrolled(120);
    assert_eq!(manager.state(), PreloadState::Showing);

    manager.hide_preload();
    manager.hide_preload();

    assert_eq!(manager.host().document_scroll_top, Some(120));
    assert_eq!(manager.state(), PreloadState::Hiding);
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![PreloadEvent::Preload { pages: 1 }, PreloadEvent::Hidden]
    );
}

#[tokio::test]
async fn test_hide_without_scroll_leaves_document_alone() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let mut manager = manager(&fetcher);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("preload should succeed");
    manager.hide_preload();

    assert_eq!(manager.host().document_scroll_top, None);
}

#[tokio::test]
async fn test_scroll_while_hiding_cleans_up() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let (tx, rx) = flume::unbounded();
    let mut manager = manager(&fetcher).with_events(tx);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("preload should succeed");

    // Transition end outside of a hide is ignored
    manager.transition_ended();
    assert_eq!(manager.state(), PreloadState::Showing);

    manager.hide_preload();
    manager.wrapper_scrolled(40);

    assert_eq!(manager.state(), PreloadState::CleanedUp);
    assert!(manager.view().is_none());
    assert_eq!(manager.registry().live_count(), 0);
    assert_eq!(manager.registry().released_count(), 1);

    manager.cleanup_preload();
    assert_eq!(
        rx.try_iter().collect::<Vec<_>>(),
        vec![
            PreloadEvent::Preload { pages: 1 },
            PreloadEvent::Hidden,
            PreloadEvent::CleanedUp,
        ]
    );
}

#[tokio::test]
async fn test_results_after_cleanup_are_discarded() {
    let fetcher = five_pages_without_third();
    let mut manager = manager(&fetcher);

    let request = PreloadRequest::new(PRIMARY, 5).with_paged_template(TEMPLATE);
    let pending = manager.begin_preload(request, container(800, 600));
    assert_eq!(pending.requests().len(), 5);
    assert_eq!(manager.state(), PreloadState::Fetching);

    let (session, result) = pending.acquire().await;
    manager.cleanup_preload();

    let outcome = manager
        .complete_preload(session, result)
        .expect("stale results are not an error");
    assert_eq!(outcome, PreloadOutcome::Discarded);
    assert_eq!(manager.registry().live_count(), 0);
    assert_eq!(manager.host().thumbnail_inits, 0);
    assert!(manager.view().is_none());
}

#[tokio::test]
async fn test_superseded_session_results_are_discarded() {
    let fetcher = five_pages_without_third();
    let mut manager = manager(&fetcher);

    let first = manager.begin_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600));
    let second = manager.begin_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600));
    assert_ne!(first.session(), second.session());

    let (stale_id, stale) = first.acquire().await;
    let outcome = manager
        .complete_preload(stale_id, stale)
        .expect("stale results are not an error");
    assert_eq!(outcome, PreloadOutcome::Discarded);
    assert_eq!(manager.state(), PreloadState::Fetching);

    let (id, result) = second.acquire().await;
    let outcome = manager
        .complete_preload(id, result)
        .expect("current session should complete");
    assert_eq!(outcome, PreloadOutcome::Showing { pages: 1 });
    assert_eq!(manager.registry().live_count(), 1);
}

#[tokio::test]
async fn test_hide_during_fetch_discards_results() {
    let fetcher = five_pages_without_third();
    let mut manager = manager(&fetcher);

    let pending = manager.begin_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600));
    manager.hide_preload();
    assert_eq!(manager.state(), PreloadState::Hiding);

    let (id, result) = pending.acquire().await;
    let outcome = manager
        .complete_preload(id, result)
        .expect("stale results are not an error");
    assert_eq!(outcome, PreloadOutcome::Discarded);
    assert_eq!(manager.registry().live_count(), 0);

    manager.transition_ended();
    assert_eq!(manager.state(), PreloadState::CleanedUp);
}

#[tokio::test]
async fn test_scale_and_show_pads_with_blank_pages() {
    let fetcher = ScriptedFetcher::new().with_page(PRIMARY, plain_jpeg(60, 80));
    let mut manager = manager(&fetcher);

    assert!(!manager.scale_and_show_preload(50, 60, 3));

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("preload should succeed");
    assert!(manager.scale_and_show_preload(50, 60, 3));

    let element = manager
        .view()
        .and_then(|view| view.preload.as_ref())
        .expect("mosaic should be attached");
    assert_eq!(element.placeholders.len(), 3);
    assert_eq!(
        element.placeholders[0].dimensions,
        Some(ScaledDimensions::new(50, 60))
    );
    assert!(element.placeholders[1].image.is_none());
    assert!(!element.placeholders[2].loaded);
    assert_eq!(manager.view().and_then(|view| view.width), Some(50));
}

#[tokio::test]
async fn test_new_preload_replaces_previous_session() {
    let fetcher = ScriptedFetcher::new()
        .with_page(PRIMARY, plain_jpeg(60, 80))
        .with_page(&page(2), plain_jpeg(60, 80));
    let mut manager = manager(&fetcher);

    let request = PreloadRequest::new(PRIMARY, 2).with_paged_template(TEMPLATE);
    manager
        .show_preload(request, container(800, 600))
        .await
        .expect("first preload should succeed");
    assert_eq!(manager.registry().live_count(), 2);

    manager
        .show_preload(PreloadRequest::new(PRIMARY, 1), container(800, 600))
        .await
        .expect("second preload should succeed");
    assert_eq!(manager.registry().live_count(), 1);
    assert_eq!(manager.registry().released_count(), 2);
}
