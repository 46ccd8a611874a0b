use std::process::{Child, Command};
use std::time::Duration;
use tempfile::TempDir;

/// Kills the service when the test ends, pass or fail.
struct Service {
    child: Child,
    base_url: String,
}

impl Drop for Service {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Helper to create a templates tree with known content
fn create_templates() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join("a")).unwrap();
    std::fs::create_dir_all(root.join("b")).unwrap();
    std::fs::create_dir_all(root.join("node_modules/x")).unwrap();

    std::fs::write(root.join("a/notify-slack.json"), r#"{"name":"slack"}"#).unwrap();
    std::fs::write(root.join("b/notify-email.json"), r#"{"name":"email"}"#).unwrap();
    std::fs::write(root.join("a/backup.json"), r#"{"name":"backup a"}"#).unwrap();
    std::fs::write(root.join("b/backup.json"), r#"{"name":"backup b"}"#).unwrap();
    std::fs::write(root.join("a/notes.txt"), "not a template").unwrap();
    std::fs::write(root.join("package.json"), "{}").unwrap();
    std::fs::write(root.join("node_modules/x/dep.json"), "{}").unwrap();

    dir
}

/// Helper to find a free port
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Helper to wait for the service to be ready
fn wait_for_service(base_url: &str, timeout: Duration) -> bool {
    let client = reqwest::blocking::Client::new();
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if client.get(format!("{}/health", base_url)).send().is_ok() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    false
}

fn start_service(root: &std::path::Path) -> Service {
    let port = free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_tmplshelf-service"))
        .args(["--bind", "127.0.0.1", "--port", &port.to_string()])
        .arg("--root")
        .arg(root)
        .spawn()
        .expect("Failed to start tmplshelf-service");

    let service = Service {
        child,
        base_url: format!("http://127.0.0.1:{}", port),
    };
    assert!(
        wait_for_service(&service.base_url, Duration::from_secs(10)),
        "Service failed to start"
    );
    service
}

fn get_json(
    client: &reqwest::blocking::Client,
    url: &str,
    query: &[(&str, &str)],
) -> (u16, serde_json::Value) {
    let resp = client.get(url).query(query).send().unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().unwrap())
}

fn item_paths(body: &serde_json::Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["relativePath"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_search_and_listing() {
    let templates = create_templates();
    let service = start_service(templates.path());
    let base = &service.base_url;
    let client = reqwest::blocking::Client::new();

    // 1. Health builds the index lazily
    let (status, health) = get_json(&client, &format!("{}/health", base), &[]);
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["templates"], 4);
    assert_eq!(health["generation"], 1);

    // 2. Empty query lists everything in path order
    let (_, all) = get_json(&client, &format!("{}/templates", base), &[]);
    assert_eq!(all["total"], 4);
    assert_eq!(
        item_paths(&all),
        vec![
            "a/backup.json",
            "a/notify-slack.json",
            "b/backup.json",
            "b/notify-email.json"
        ]
    );
    assert!(all.get("tokens").is_none());
    let first = &all["items"][0];
    assert!(first["id"].is_string());
    assert_eq!(first["size"], 19);
    assert!(first.get("absolutePath").is_none());

    // 3. Ranked query
    let (_, notify) = get_json(&client, &format!("{}/templates", base), &[("q", "notify")]);
    assert_eq!(
        item_paths(&notify),
        vec!["a/notify-slack.json", "b/notify-email.json"]
    );
    assert_eq!(notify["tokens"], serde_json::json!(["notify"]));

    let (_, in_b) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("q", "notify"), ("dir", "b")],
    );
    assert_eq!(item_paths(&in_b), vec!["b/notify-email.json"]);

    // 4. Fallback to the strongest token
    let (_, simplified) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("q", "slack zendesk"), ("q_mode", "all")],
    );
    assert_eq!(simplified["simplifiedTo"], "slack");
    assert_eq!(item_paths(&simplified), vec!["a/notify-slack.json"]);

    // 5. Pagination: page and offset agree
    let (_, by_page) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("limit", "1"), ("page", "2")],
    );
    let (_, by_offset) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("limit", "1"), ("offset", "1")],
    );
    assert_eq!(by_page["offset"], 1);
    assert_eq!(by_page["count"], 1);
    assert_eq!(by_page["items"], by_offset["items"]);

    // 6. Field projection and bare item view
    let (_, projected) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("fields", "name,category"), ("view", "items")],
    );
    let items = projected.as_array().expect("view=items returns a list");
    assert_eq!(items.len(), 4);
    for item in items {
        let obj = item.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("name") && obj.contains_key("category"));
    }

    // 7. Absolute URLs
    let (_, absolute) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("abs", "1"), ("fields", "rawUrl"), ("limit", "1")],
    );
    let raw_url = absolute["items"][0]["rawUrl"].as_str().unwrap();
    assert!(raw_url.starts_with(&format!("{}/raw?id=", base)), "{raw_url}");
}

#[test]
fn test_retrieval_and_errors() {
    let templates = create_templates();
    let service = start_service(templates.path());
    let base = &service.base_url;
    let client = reqwest::blocking::Client::new();

    let (_, listing) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("q", "slack"), ("fields", "id,rawUrl")],
    );
    let id = listing["items"][0]["id"].as_str().unwrap().to_string();

    // 1. Raw by id, via the listed URL and the path route
    let resp = client
        .get(format!("{}/raw", base))
        .query(&[("id", id.as_str())])
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(resp.text().unwrap(), r#"{"name":"slack"}"#);

    let resp = client
        .get(format!("{}/template/{}", base, id))
        .send()
        .unwrap();
    assert_eq!(resp.text().unwrap(), r#"{"name":"slack"}"#);

    // 2. Download forces an attachment
    let resp = client
        .get(format!("{}/download", base))
        .query(&[("file", "a/notify-slack.json")])
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"notify-slack.json\""));

    // 3. Ambiguous bare filename, then narrowed by dir
    let (status, body) = get_json(
        &client,
        &format!("{}/raw", base),
        &[("filename", "backup.json")],
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"], "ambiguous");
    assert_eq!(
        body["details"]["matches"],
        serde_json::json!(["a/backup.json", "b/backup.json"])
    );

    let resp = client
        .get(format!("{}/raw", base))
        .query(&[("filename", "backup.json"), ("dir", "b")])
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().unwrap(), r#"{"name":"backup b"}"#);

    // 4. Resolution errors
    let (status, body) = get_json(
        &client,
        &format!("{}/raw", base),
        &[("file", "../../etc/passwd")],
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_path");

    let (status, body) = get_json(&client, &format!("{}/raw", base), &[("id", "!!not-base64!!")]);
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = get_json(&client, &format!("{}/download", base), &[]);
    assert_eq!(status, 400);
    assert_eq!(body["error"], "missing_identifier");

    let (status, body) = get_json(
        &client,
        &format!("{}/raw", base),
        &[("filename", "nothing-here.json")],
    );
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");

    // Excluded files are not served even though they exist on disk
    let (status, _) = get_json(&client, &format!("{}/raw", base), &[("file", "package.json")]);
    assert_eq!(status, 404);

    // 5. Unknown route
    let (status, body) = get_json(&client, &format!("{}/nope", base), &[]);
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");
}

#[test]
fn test_framework_errors_use_json_envelope() {
    let templates = create_templates();
    let service = start_service(templates.path());
    let base = &service.base_url;
    let client = reqwest::blocking::Client::new();

    // Wrong verb on a known path
    let (status, body) = get_json(&client, &format!("{}/refresh", base), &[]);
    assert_eq!(status, 405);
    assert_eq!(body["error"], "method_not_allowed");
    assert!(body["message"].as_str().unwrap().contains("/refresh"));

    // Query string the extractor cannot deserialize
    let (status, body) = get_json(
        &client,
        &format!("{}/raw", base),
        &[("id", "YS5qc29u"), ("id", "YS5qc29u")],
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_request");
    assert!(body["message"].as_str().unwrap().contains("duplicate field"));

    let (status, body) = get_json(
        &client,
        &format!("{}/templates", base),
        &[("q", "a"), ("q", "b")],
    );
    assert_eq!(status, 400);
    assert_eq!(body["error"], "invalid_request");
}

#[test]
fn test_refresh_replaces_index() {
    let templates = create_templates();
    let service = start_service(templates.path());
    let base = &service.base_url;
    let client = reqwest::blocking::Client::new();

    let (_, before) = get_json(&client, &format!("{}/health", base), &[]);
    assert_eq!(before["templates"], 4);

    std::fs::write(templates.path().join("new.json"), "{}").unwrap();

    // Stale until refreshed
    let (_, stale) = get_json(&client, &format!("{}/health", base), &[]);
    assert_eq!(stale["templates"], 4);

    let resp: serde_json::Value = client
        .post(format!("{}/refresh", base))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(resp["status"], "refreshed");
    assert_eq!(resp["total"], 5);
    assert_eq!(resp["generation"], 2);

    let (_, listing) = get_json(&client, &format!("{}/templates", base), &[("q", "new")]);
    assert_eq!(item_paths(&listing), vec!["new.json"]);
}
