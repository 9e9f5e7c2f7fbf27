//! Cache paths emit the expected metric keys.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use uuid::Uuid;

use sigillo::cache::{
    CONTEXT_USER_PERMISSIONS, CacheBackend, CacheItem, ContextRegistry, MemoryBackend,
    PermissionsHashGenerator, RequestCache, RequestContext,
};
use sigillo::config::CacheConfig;
use sigillo::domain::{Account, MemoryRoleStore, Role};
use sigillo::render::{BuilderRegistry, Element, Renderer};
use sigillo::telemetry::{self, LogFormat};

#[test]
fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    telemetry::init(LogFormat::Compact).expect("telemetry should initialise once");

    let store = Arc::new(MemoryRoleStore::new());
    store.upsert(Role::new("authenticated"));
    store.upsert(Role::new("editor").with_permissions(["access comments"]));

    let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(64).unwrap()));
    let generator = Arc::new(PermissionsHashGenerator::new(store, backend.clone()));

    // Permissions tiers: compute, static hit, persistent hit.
    let account = Account::authenticated(Uuid::new_v4(), ["editor"]);
    let statics = RequestCache::new();
    generator.generate(&account, &statics);
    generator.generate(&account, &statics);
    generator.generate(&account, &RequestCache::new());

    // Render cache: miss then hit.
    let contexts = ContextRegistry::with_defaults(generator);
    let renderer = Renderer::new(
        backend,
        contexts,
        BuilderRegistry::new(),
        CacheConfig::default(),
    );
    let req = RequestContext::new(account);
    let element = Element::markup("<p>metrics</p>")
        .with_keys(["metrics"])
        .with_contexts([CONTEXT_USER_PERMISSIONS]);
    renderer.render_root(&element, &req).expect("first render");
    renderer.render_root(&element, &req).expect("second render");

    // Memory backend eviction due to capacity.
    let tiny = MemoryBackend::new(NonZeroUsize::new(1).unwrap());
    tiny.set("one", CacheItem::permanent("1")).expect("set one");
    tiny.set("two", CacheItem::permanent("2")).expect("set two");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "sigillo_render_cache_hit_total",
        "sigillo_render_cache_miss_total",
        "sigillo_permissions_static_hit_total",
        "sigillo_permissions_persistent_hit_total",
        "sigillo_permissions_computed_total",
        "sigillo_backend_evict_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
