use parking_lot::Mutex;
use rfscope::cache::{highlight_key, ContentCache, EvictionPolicy, FileContent, RenderedContentCache};
use rfscope::grammar::GrammarAssetLoader;
use rfscope::search::SearchMatch;
use rfscope::view::{
    ChunkedContentRenderer, MemoryDocument, RenderMode, RenderOptions, RenderOutcome,
    RenderRequest, ScrollSurface, Virtualizer, VirtualizerOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_content_cache_evicts_oldest_and_reloads_on_demand() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<_> = (0..4)
        .map(|n| {
            let path = dir.path().join(format!("f{n}.txt"));
            fs::write(&path, format!("contents {n}")).unwrap();
            path
        })
        .collect();

    let cache = ContentCache::new(3, EvictionPolicy::Fifo);
    for path in &paths[..3] {
        cache.get(path).await.unwrap();
    }
    // Re-reading f0 does not refresh its position.
    cache.get(&paths[0]).await.unwrap();
    cache.get(&paths[3]).await.unwrap();

    assert!(!cache.contains(&paths[0]));
    assert!(cache.contains(&paths[1]));
    assert_eq!(cache.stats().size, 3);

    fs::write(&paths[1], "changed").unwrap();
    assert_eq!(
        cache.get(&paths[1]).await.unwrap(),
        FileContent::Text(Arc::from("contents 1"))
    );
    assert!(cache.invalidate(&paths[1]));
    assert_eq!(
        cache.get(&paths[1]).await.unwrap(),
        FileContent::Text(Arc::from("changed"))
    );
}

#[tokio::test]
async fn test_content_cache_prefix_invalidation() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/nested")).unwrap();
    fs::create_dir_all(dir.path().join("srcs")).unwrap();
    let inside = dir.path().join("src/nested/a.rs");
    let sibling = dir.path().join("srcs/b.rs");
    fs::write(&inside, "a").unwrap();
    fs::write(&sibling, "b").unwrap();

    let cache = ContentCache::new(10, EvictionPolicy::Fifo);
    cache.get(&inside).await.unwrap();
    cache.get(&sibling).await.unwrap();

    assert_eq!(cache.invalidate_by_prefix(&dir.path().join("src")), 1);
    assert!(cache.contains(&sibling));
}

#[test]
fn test_rendered_cache_file_invalidation_is_exact() {
    let cache: RenderedContentCache<u32> = RenderedContentCache::new(10, EvictionPolicy::Fifo);
    let a = Path::new("/w/a.rs");
    cache.insert(highlight_key(a, None), 1);
    cache.insert(highlight_key(a, Some(3)), 2);
    cache.insert(highlight_key(Path::new("/w/a.rs.bak"), None), 3);
    cache.insert(highlight_key(Path::new("/w/b.rs"), Some(3)), 4);

    assert_eq!(cache.invalidate_file(a), 2);
    assert_eq!(cache.get("/w/a.rs.bak"), Some(3));
    assert_eq!(cache.get("/w/b.rs:3"), Some(4));
}

fn matches(count: usize) -> Vec<SearchMatch> {
    (0..count)
        .map(|n| SearchMatch::raw(PathBuf::from(format!("/w/f{n}.rs")), n + 1, 1, format!("hit {n}")))
        .collect()
}

#[test]
fn test_result_list_switches_modes_and_filters() {
    let options = VirtualizerOptions {
        threshold: 200,
        buffer_size: 5,
        item_height: 1,
    };
    let mut list: Virtualizer<SearchMatch, usize> = Virtualizer::new(options, 20);

    let viewport = list.render_virtualized(matches(5000), Some(0), "", |_, index, _| index);
    assert_eq!(viewport.mode, RenderMode::Virtualized);
    assert_eq!((viewport.window.start_index, viewport.window.end_index), (0, 25));
    assert_eq!(viewport.bottom_spacer, (5000 - 25));

    list.on_scroll(1000);
    let viewport = list.on_animation_frame().unwrap();
    assert_eq!((viewport.window.start_index, viewport.window.end_index), (995, 1025));

    let viewport = list.filter("hit 42");
    assert_eq!(viewport.mode, RenderMode::FullRender);
    assert_eq!(list.len(), 111);

    let viewport = list.filter("no such hit");
    assert_eq!(viewport.mode, RenderMode::Empty);
    assert!(viewport.rows.is_empty());
}

#[tokio::test]
async fn test_preview_of_large_document_loads_on_scroll() {
    let text: String = (1..=2000).map(|n| format!("line {n}\n")).collect();
    let surface = Arc::new(Mutex::new(MemoryDocument::new(20, 1)));
    let loader = Arc::new(GrammarAssetLoader::builtin(Duration::from_millis(500)));
    let renderer = ChunkedContentRenderer::new(
        Arc::clone(&surface),
        loader,
        RenderOptions {
            lazy_threshold_bytes: 1024,
            ..RenderOptions::default()
        },
    );

    let outcome = renderer
        .render(RenderRequest {
            text: Arc::from(text),
            highlight_line: Some(1500),
            language: "plaintext".to_string(),
        })
        .await;
    assert!(matches!(outcome, RenderOutcome::Rendered { .. }));
    assert_eq!(renderer.loaded_chunks(), vec![29, 30, 31]);

    // Walk down to the end of what is loaded; each frame loads at most one chunk.
    for _ in 0..3 {
        {
            let mut surface = surface.lock();
            let bottom = surface.max_scroll_top();
            surface.set_scroll_top(bottom);
        }
        renderer.on_scroll();
        renderer.on_animation_frame().await;
    }
    assert_eq!(renderer.loaded_chunks(), (29..=34).collect::<Vec<_>>());
}
