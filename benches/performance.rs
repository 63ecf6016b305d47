//! Performance benchmarks for the timeline store.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use neodb_timeline::{
    Account, ContentFilter, Post, PostId, SubscriptionConfig, TimelineCache, TimelineKind,
    TimelineStore, Visibility,
};
use tempfile::TempDir;

fn post(n: usize) -> Post {
    let author = (n % 5).to_string();
    let mut post = Post {
        id: PostId::new(format!("{:020}", n)),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        account: Account {
            id: author.clone(),
            username: format!("user{}", author),
            acct: String::new(),
            display_name: String::new(),
            avatar: String::new(),
        },
        content: "<p>a fairly ordinary post body</p>".to_string(),
        visibility: Visibility::Public,
        in_reply_to_id: None,
        in_reply_to_account_id: None,
        reblog: None,
        media_attachments: vec![],
        tags: vec![],
        replies_count: 0,
        reblogs_count: 0,
        favourites_count: 0,
        is_hidden: false,
    };
    match n % 4 {
        1 => {
            post.in_reply_to_id = Some(PostId::new(format!("{:020}", n + 1)));
            post.in_reply_to_account_id = Some(((n + 1) % 5).to_string());
        }
        2 => {
            post.content = format!(
                r#"<p>quoting <a href="https://neodb.social/@someone/{}">this</a></p>"#,
                n
            )
        }
        _ => {}
    }
    post
}

fn filled_store(len: usize) -> TimelineStore {
    let store = TimelineStore::new();
    store.set((0..len).rev().map(post).collect());
    store
}

/// Benchmark filtered reads at different timeline lengths
fn bench_filtered_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_snapshot");
    let filter = ContentFilter {
        show_replies: false,
        show_boosts: true,
        show_threads: true,
        show_quote_posts: true,
    };

    for len in [40, 400, 2000] {
        let store = filled_store(len);
        group.bench_with_input(BenchmarkId::new("posts", len), &len, |b, _| {
            b.iter(|| black_box(store.filtered_snapshot(&filter)));
        });
    }

    group.finish();
}

/// Benchmark reconnect backfill merges into a populated store
fn bench_insert_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_all");

    for batch in [10, 40, 200] {
        group.bench_with_input(BenchmarkId::new("batch", batch), &batch, |b, &batch| {
            b.iter_batched(
                || {
                    let store = filled_store(800);
                    // Overlap half the batch with what is already there.
                    let incoming: Vec<Post> =
                        (800 - batch / 2..800 + batch / 2).rev().map(post).collect();
                    (store, incoming)
                },
                |(store, incoming)| black_box(store.insert_all(incoming, 0)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark live update fan-out with subscribers attached
fn bench_live_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("live_inserts");

    for subscribers in [0, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let store = filled_store(400);
                let handles: Vec<_> = (0..subscribers)
                    .map(|_| store.subscribe(SubscriptionConfig::default()))
                    .collect();
                let mut next = 400;
                b.iter(|| {
                    store.insert(post(next), 0);
                    next += 1;
                    for handle in &handles {
                        handle.drain();
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark cache save and load
fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let dir = TempDir::new().unwrap();
    let cache = TimelineCache::new(dir.path()).unwrap();
    let posts: Vec<Post> = (0..800).rev().map(post).collect();

    group.bench_function("save_800", |b| {
        b.iter(|| cache.save(TimelineKind::Home, black_box(&posts)).unwrap());
    });

    cache.save(TimelineKind::Home, &posts).unwrap();
    group.bench_function("load_800", |b| {
        b.iter(|| black_box(cache.load(TimelineKind::Home).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_filtered_snapshot,
    bench_insert_all,
    bench_live_inserts,
    bench_cache,
);
criterion_main!(benches);
