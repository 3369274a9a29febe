use resumax_tui::api::ApiClient;
use resumax_tui::client::Backend;
use resumax_tui::errors::CliError;
use resumax_tui::models::{Attachment, Submission, ThreadId};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, cookie: Option<&str>) -> ApiClient {
    ApiClient::new(server.uri(), cookie.map(str::to_string), 5_000, false).unwrap()
}

#[tokio::test]
async fn lists_threads_with_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/threads"))
        .and(header("cookie", "sessionid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "threads": [
                { "id": 5, "title": "Resume Review", "created_at": "2024-05-02T10:00:00Z", "updated_at": "2024-05-02T10:05:00Z" },
                { "id": 4, "title": "Cover letter", "created_at": "2024-04-01T10:00:00Z" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let threads = client(&server, Some("sessionid=abc")).list_threads().await.unwrap();
    let ids: Vec<_> = threads.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![ThreadId(5), ThreadId(4)]);
    assert_eq!(threads[0].title, "Resume Review");
}

#[tokio::test]
async fn fetches_conversation_turns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/thread/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                { "prompt": "Review my CV", "response": "**Looks good**", "attachedFiles": ["cv.pdf"] }
            ]
        })))
        .mount(&server)
        .await;

    let turns = client(&server, None).fetch_conversation(ThreadId(5)).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].attached_files, vec!["cv.pdf".to_string()]);
    assert_eq!(turns[0].response, "**Looks good**");
}

#[tokio::test]
async fn submit_posts_multipart_with_csrf_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/thread/0"))
        .and(header("X-CSRFToken", "tok123"))
        .and(body_string_contains("name=\"prompt-text\""))
        .and(body_string_contains("Hi"))
        .and(body_string_contains("name=\"prompt-file\"; filename=\"cv.pdf\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hello!" })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, Some("sessionid=abc; csrftoken=tok123"));
    let submission = Submission {
        prompt: "Hi".to_string(),
        files: vec![Attachment {
            name: "cv.pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        }],
    };
    let reply = api.submit(ThreadId::NEW, &submission).await.unwrap();
    assert_eq!(reply.text, "Hello!");
}

#[tokio::test]
async fn legacy_text_reply_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/thread/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "Old style" })))
        .mount(&server)
        .await;

    let api = client(&server, Some("csrftoken=t"));
    let submission = Submission {
        prompt: "Hi".to_string(),
        files: Vec::new(),
    };
    let reply = api.submit(ThreadId(3), &submission).await.unwrap();
    assert_eq!(reply.text, "Old style");
}

#[tokio::test]
async fn csrf_token_falls_back_to_page_meta_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta name="csrf-token" content="from-page"></head></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/thread/7/delete"))
        .and(header("X-CSRFToken", "from-page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "deleted" })))
        .expect(2)
        .mount(&server)
        .await;

    let api = client(&server, Some("sessionid=abc"));
    api.delete_thread(ThreadId(7)).await.unwrap();
    // Resolved once, then reused.
    api.delete_thread(ThreadId(7)).await.unwrap();
}

#[tokio::test]
async fn missing_thread_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/thread/42"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Thread not found" })))
        .mount(&server)
        .await;

    let err = client(&server, None).fetch_conversation(ThreadId(42)).await.unwrap_err();
    assert!(matches!(err, CliError::NotFound(ref m) if m.contains("Thread not found")));
    assert_eq!(err.exit_code(), 7);
}

#[tokio::test]
async fn login_redirect_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/threads"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login/?next=/api/threads"))
        .mount(&server)
        .await;

    let err = client(&server, None).list_threads().await.unwrap_err();
    assert!(matches!(err, CliError::Auth(_)));
}

#[tokio::test]
async fn server_error_maps_to_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/thread/3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let api = client(&server, Some("csrftoken=t"));
    let submission = Submission {
        prompt: "Hi".to_string(),
        files: Vec::new(),
    };
    let err = api.submit(ThreadId(3), &submission).await.unwrap_err();
    assert!(matches!(err, CliError::Server(_)));
}

#[tokio::test]
async fn missing_reply_field_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/thread/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let api = client(&server, Some("csrftoken=t"));
    let submission = Submission {
        prompt: "Hi".to_string(),
        files: Vec::new(),
    };
    let err = api.submit(ThreadId(3), &submission).await.unwrap_err();
    assert!(matches!(err, CliError::Parse(_)));
}
