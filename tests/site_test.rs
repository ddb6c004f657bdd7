// 基于源文件目录的站点测试：FileStore、Engine 生成与清理

use std::fs;
use std::path::Path;

use content_lister::core::{ContentStore, Engine, FileStore, ListerError};
use content_lister::models::{Config, ContentFilter, ContentQuery, ContentType, FieldValue};

const CONFIG: &str = r#"
title: Campus
url: http://example.com
root: /
categories:
  - { id: 5, name: Workshops, slug: workshops }
  - { id: 6, name: Talks, slug: talks }
home:
  - name: slider
    query: { type: slide, limit: 5 }
  - name: workshops
    title: Workshops
    query: { type: event, limit: 2, filter: { category: workshops } }
listings:
  staff:
    title: Staff
    query: { type: employee, limit: 10, order: ascending }
related:
  event: 2
"#;

fn write(base: &Path, relative: &str, content: &str) {
    let path = base.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn site(base: &Path) {
    write(base, "_config.yml", CONFIG);
    write(
        base,
        "source/_events/a.md",
        "---\nid: 10\ntitle: Soldering 101\ndate: 2024-03-01 10:00:00\ncategories: [5]\nlocation: Lab\n---\nBring goggles.\n",
    );
    write(
        base,
        "source/_events/b.md",
        "---\nid: 11\ntitle: Printing\ndate: 2024-03-03 10:00:00\ncategories: [workshops]\n---\n",
    );
    write(
        base,
        "source/_events/c.md",
        "---\nid: 12\ntitle: Keynote\ndate: 2024-03-05 10:00:00\ncategories: [Talks]\n---\n",
    );
    write(
        base,
        "source/_slides/hero.md",
        "---\ntitle: Hero\ndate: 2024-01-01\nimage: /img/hero.jpg\n---\n",
    );
    write(
        base,
        "source/_slides/empty.md",
        "---\ntitle: Empty\ndate: 2024-01-02\ncaption: no picture\n---\n",
    );
    write(
        base,
        "source/_employees/ada.md",
        "---\ntitle: Ada\ndate: 2020-01-01\nemail: ada@example.com\n---\n",
    );
    write(
        base,
        "source/_employees/bob.md",
        "---\ntitle: Bob\ndate: 2021-01-01\n---\n",
    );
}

#[test]
fn file_store_loads_items_and_categories() {
    let dir = tempfile::tempdir().unwrap();
    site(dir.path());
    let config = Config::load(&dir.path().join("_config.yml")).unwrap();
    let store = FileStore::from_config(dir.path(), &config);

    let query = ContentQuery::new(ContentType::Event, 5).with_filter(ContentFilter::category(5));
    let ids: Vec<u64> = store.query(&query).unwrap().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![11, 10]);

    let keynote = store.find(ContentType::Event, "keynote").unwrap().unwrap();
    assert_eq!(keynote.categories, vec![6]);
    assert_eq!(keynote.permalink, "http://example.com/event/keynote/");

    let soldering = store.find(ContentType::Event, "soldering-101").unwrap().unwrap();
    assert!(soldering.body.contains("Bring goggles."));
    assert_eq!(
        store.resolve_field(&soldering, "location").unwrap(),
        FieldValue::text("Lab")
    );
}

#[test]
fn items_without_id_are_numbered_after_explicit_ids() {
    let dir = tempfile::tempdir().unwrap();
    site(dir.path());
    let config = Config::load(&dir.path().join("_config.yml")).unwrap();
    let store = FileStore::from_config(dir.path(), &config);

    let staff = store
        .query(&ContentQuery::new(ContentType::Employee, 10))
        .unwrap();
    let mut ids: Vec<u64> = staff.iter().map(|i| i.id).collect();
    ids.sort_unstable();
    assert!(ids.iter().all(|id| *id > 12));
}

#[test]
fn store_sees_changes_on_next_query() {
    let dir = tempfile::tempdir().unwrap();
    site(dir.path());
    let config = Config::load(&dir.path().join("_config.yml")).unwrap();
    let store = FileStore::from_config(dir.path(), &config);
    let query = ContentQuery::new(ContentType::Post, 5);

    assert!(store.query(&query).unwrap().is_empty());
    write(dir.path(), "source/_posts/new.md", "---\ntitle: New\ndate: 2024-06-01\n---\n");
    assert_eq!(store.query(&query).unwrap().len(), 1);
}

#[test]
fn missing_source_dir_is_store_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::from_config(dir.path(), &Config::default());
    let result = store.query(&ContentQuery::new(ContentType::Post, 1));
    assert!(matches!(result, Err(ListerError::StoreUnavailable { .. })));
}

#[test]
fn duplicate_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "source/_posts/a.md", "---\nid: 1\ntitle: A\n---\n");
    write(dir.path(), "source/_pages/b.md", "---\nid: 1\ntitle: B\n---\n");
    let store = FileStore::from_config(dir.path(), &Config::default());
    assert!(matches!(
        store.query(&ContentQuery::new(ContentType::Post, 1)),
        Err(ListerError::StoreUnavailable { .. })
    ));
}

#[test]
fn engine_generates_and_cleans_site() {
    let dir = tempfile::tempdir().unwrap();
    site(dir.path());
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();

    let count = engine.generate(&engine.public_dir).unwrap();
    // 首页、一个列表页、三个活动、两个幻灯片、两个员工
    assert_eq!(count, 9);

    let home = fs::read_to_string(engine.public_dir.join("index.html")).unwrap();
    assert!(home.contains("/img/hero.jpg"));
    assert!(!home.contains("no picture"));
    assert!(home.contains("Printing"));
    assert!(home.contains("Soldering 101"));
    assert!(!home.contains("Keynote"));

    let staff = fs::read_to_string(engine.public_dir.join("staff/index.html")).unwrap();
    assert!(staff.find("Ada").unwrap() < staff.find("Bob").unwrap());
    assert!(staff.contains("mailto:ada@example.com"));
    assert_eq!(staff.matches("mailto:").count(), 1);

    let event = fs::read_to_string(engine.public_dir.join("event/printing/index.html")).unwrap();
    let related = &event[event.find("section-related-event").unwrap()..];
    assert!(related.contains("Keynote"));
    assert!(related.contains("Soldering 101"));
    assert!(!related.contains("Printing"));

    engine.clean().unwrap();
    assert!(!engine.public_dir.exists());
}

#[test]
fn explicit_slug_cannot_leave_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    write(
        &site,
        "source/_posts/sneaky.md",
        "---\ntitle: Sneaky\nslug: ../../../escaped\n---\n",
    );
    let engine = Engine::with_config(site.clone(), Config::default()).unwrap();

    let post = engine
        .store
        .query(&ContentQuery::new(ContentType::Post, 1))
        .unwrap()
        .remove(0);
    assert_eq!(post.slug, "escaped");
    assert_eq!(post.path, "/post/escaped/");

    engine.generate(&engine.public_dir).unwrap();
    assert!(engine.public_dir.join("post/escaped/index.html").exists());
    assert!(!dir.path().join("escaped").exists());
}

#[test]
fn duplicate_slugs_within_a_type_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "source/_events/a.md", "---\ntitle: Open Day\n---\n");
    write(dir.path(), "source/_events/b.md", "---\ntitle: Open Day\n---\n");
    write(dir.path(), "source/_posts/c.md", "---\ntitle: Open Day\n---\n");
    let engine = Engine::with_config(dir.path().to_path_buf(), Config::default()).unwrap();

    assert!(matches!(
        engine.store.query(&ContentQuery::new(ContentType::Event, 5)),
        Err(ListerError::StoreUnavailable { .. })
    ));
    assert!(engine.generate(&engine.public_dir).is_err());

    fs::remove_file(dir.path().join("source/_events/b.md")).unwrap();
    assert_eq!(engine.generate(&engine.public_dir).unwrap(), 3);
}

#[test]
fn generate_reads_source_once() {
    let dir = tempfile::tempdir().unwrap();
    site(dir.path());
    let engine = Engine::new(dir.path().to_path_buf()).unwrap();

    engine.generate(&engine.public_dir).unwrap();
    assert_eq!(engine.store.load_count(), 1);
}
