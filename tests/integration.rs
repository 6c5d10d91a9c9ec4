use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn storemap_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("storemap");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/storemap.sqlite"

[media]
upload_root = "{root}/uploads"

[server]
bind = "127.0.0.1:7440"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("storemap.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_storemap(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = storemap_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run storemap binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn add_store(config_path: &Path, name: &str, extra: &[&str]) -> serde_json::Value {
    let mut args = vec![
        "add",
        "--name",
        name,
        "--lng",
        "0.0",
        "--lat",
        "0.0",
        "--author",
        "alice",
    ];
    args.extend_from_slice(extra);
    let (stdout, stderr, ok) = run_storemap(config_path, &args);
    assert!(ok, "add '{name}' failed: {stderr}");
    serde_json::from_str(&stdout).unwrap()
}

fn write_test_png(path: &Path, width: u32, height: u32) {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([200, 120, 40, 255]),
    ));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    fs::write(path, bytes).unwrap();
}

#[test]
fn init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    let (stdout, stderr, ok) = run_storemap(&config_path, &["init"]);
    assert!(ok, "init failed: {stderr}");
    assert!(stdout.contains("initialized"));

    let (_, stderr, ok) = run_storemap(&config_path, &["init"]);
    assert!(ok, "second init failed: {stderr}");
}

#[test]
fn duplicate_names_get_distinct_slugs() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    let a = add_store(&config_path, "Test", &[]);
    let b = add_store(&config_path, "Test", &[]);
    assert_eq!(a["slug"], "test");
    assert_eq!(b["slug"], "test-2");
}

#[test]
fn search_ranks_matches_and_excludes_misses() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    add_store(
        &config_path,
        "Bean Cafe",
        &["--description", "bean roastery, bean tastings"],
    );
    add_store(&config_path, "Bean Bar", &[]);
    add_store(&config_path, "Pizza Place", &[]);

    let (stdout, stderr, ok) = run_storemap(&config_path, &["search", "bean"]);
    assert!(ok, "search failed: {stderr}");

    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(hits.len(), 2);
    let names: Vec<&str> = hits.iter().map(|h| h["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"Bean Cafe"));
    assert!(names.contains(&"Bean Bar"));
    // descending relevance
    assert!(hits[0]["score"].as_f64().unwrap() >= hits[1]["score"].as_f64().unwrap());
}

#[test]
fn search_tolerates_quotes_and_operator_keywords() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    add_store(&config_path, "Bean Cafe", &[]);

    // a stray quote must not surface as a query syntax failure
    let (stdout, stderr, ok) = run_storemap(&config_path, &["search", "bean\""]);
    assert!(ok, "quoted search failed: {stderr}");
    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["name"], "Bean Cafe");

    // trailing operator keyword is treated as a term, not syntax
    let (stdout, stderr, ok) = run_storemap(&config_path, &["search", "bean AND"]);
    assert!(ok, "operator search failed: {stderr}");
    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn empty_search_query_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    let (_, stderr, ok) = run_storemap(&config_path, &["search", "   "]);
    assert!(!ok);
    assert!(stderr.contains("invalid query"), "stderr: {stderr}");
}

#[test]
fn tag_browsing_filters_and_lists_all_tags() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    add_store(&config_path, "Wifi Spot", &["--tag", "wifi", "--tag", "coffee"]);
    add_store(&config_path, "Quiet Corner", &["--tag", "quiet"]);
    add_store(&config_path, "Untagged", &[]);

    let (stdout, _, ok) = run_storemap(&config_path, &["tags", "wifi"]);
    assert!(ok);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["tag"], "wifi");
    assert_eq!(page["stores"].as_array().unwrap().len(), 1);
    assert_eq!(page["stores"][0]["name"], "Wifi Spot");
    assert_eq!(
        page["all_tags"],
        serde_json::json!(["coffee", "quiet", "wifi"])
    );

    // without a tag filter: every store that has a tags field at all
    let (stdout, _, ok) = run_storemap(&config_path, &["tags"]);
    assert!(ok);
    let page: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(page["stores"].as_array().unwrap().len(), 2);
}

#[test]
fn near_returns_nearest_first_within_radius() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    // ~1 km, ~9 km, and ~15 km north of the origin
    for (name, lat) in [("Close", "0.009"), ("Edge", "0.081"), ("Far", "0.135")] {
        let (_, stderr, ok) = run_storemap(
            &config_path,
            &[
                "add", "--name", name, "--lng", "0.0", "--lat", lat, "--author", "alice",
            ],
        );
        assert!(ok, "add failed: {stderr}");
    }

    let (stdout, stderr, ok) = run_storemap(&config_path, &["near", "0.0", "0.0"]);
    assert!(ok, "near failed: {stderr}");
    let hits: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    let names: Vec<&str> = hits.iter().map(|h| h["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Close", "Edge"]);
    // map projection only
    assert!(hits[0].get("author").is_none());
}

#[test]
fn malformed_coordinates_fail_before_querying() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    let (_, stderr, ok) = run_storemap(&config_path, &["near", "abc", "0.0"]);
    assert!(!ok);
    assert!(stderr.contains("invalid coordinates"), "stderr: {stderr}");
}

#[test]
fn photo_is_ingested_rescaled_and_referenced() {
    let (tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    let photo_path = tmp.path().join("storefront.png");
    write_test_png(&photo_path, 1600, 400);

    let store = add_store(
        &config_path,
        "Bean Cafe",
        &["--photo", photo_path.to_str().unwrap()],
    );
    let token = store["photo"].as_str().unwrap();
    assert!(token.ends_with(".png"));
    assert_ne!(token, "store.png");

    let stored = image::open(tmp.path().join("uploads").join(token)).unwrap();
    assert_eq!((stored.width(), stored.height()), (800, 200));
}

#[test]
fn non_image_upload_is_rejected_and_no_record_created() {
    let (tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    let doc_path = tmp.path().join("menu.pdf");
    fs::write(&doc_path, b"%PDF-1.4 not an image").unwrap();

    let (_, stderr, ok) = run_storemap(
        &config_path,
        &[
            "add",
            "--name",
            "Bean Cafe",
            "--lng",
            "0.0",
            "--lat",
            "0.0",
            "--author",
            "alice",
            "--photo",
            doc_path.to_str().unwrap(),
        ],
    );
    assert!(!ok);
    assert!(stderr.contains("unsupported media type"), "stderr: {stderr}");

    let (stdout, _, ok) = run_storemap(&config_path, &["list"]);
    assert!(ok);
    let stores: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert!(stores.is_empty());
    assert!(!tmp.path().join("uploads").exists());
}

#[test]
fn update_requires_ownership() {
    let (_tmp, config_path) = setup_test_env();
    run_storemap(&config_path, &["init"]);

    let store = add_store(&config_path, "Bean Cafe", &[]);
    let id = store["id"].as_str().unwrap();

    let (_, stderr, ok) = run_storemap(
        &config_path,
        &[
            "update", id, "--author", "mallory", "--name", "Hijacked", "--lng", "0.0", "--lat",
            "0.0",
        ],
    );
    assert!(!ok);
    assert!(stderr.contains("does not own"), "stderr: {stderr}");

    let (stdout, _, _) = run_storemap(&config_path, &["get", "bean-cafe"]);
    let unchanged: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(unchanged["name"], "Bean Cafe");

    let (stdout, stderr, ok) = run_storemap(
        &config_path,
        &[
            "update", id, "--author", "alice", "--name", "Bean HQ", "--lng", "1.0", "--lat",
            "1.0",
        ],
    );
    assert!(ok, "owner update failed: {stderr}");
    let updated: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(updated["name"], "Bean HQ");
    assert_eq!(updated["location"]["type"], "Point");
    assert_eq!(updated["slug"], "bean-cafe");
}
