use super::*;

fn image(render_id: RenderId) -> RenderedImage {
    RenderedImage { render_id, content_type: "image/svg+xml".into(), bytes: b"<svg/>".to_vec() }
}

#[test]
fn arenas_get_distinct_ids() {
    let registry = ScaffoldRegistry::new();
    let a = RenderArena::mount(&registry);
    let b = RenderArena::mount(&registry);
    assert_ne!(a.id(), b.id());
    assert_eq!(registry.mounted_count(), 2);
}

#[test]
fn deposit_is_visible_through_clones() {
    let registry = ScaffoldRegistry::new();
    let arena = RenderArena::mount(&registry);
    let clone = arena.scaffold().clone();

    assert!(arena.scaffold().artifact().is_none());
    clone.deposit(image(arena.id()));
    assert_eq!(arena.scaffold().artifact(), Some(image(arena.id())));
}

#[test]
fn dispose_is_idempotent() {
    let registry = ScaffoldRegistry::new();
    let arena = RenderArena::mount(&registry);
    let id = arena.id();

    arena.dispose();
    arena.dispose();
    assert!(!registry.is_mounted(id));
    assert!(!registry.unmount(id));
}

#[tokio::test(start_paused = true)]
async fn dispose_after_waits_for_grace() {
    let registry = ScaffoldRegistry::new();
    let arena = RenderArena::mount(&registry);
    let id = arena.id();

    arena.dispose_after(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(registry.is_mounted(id));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!registry.is_mounted(id));
}
