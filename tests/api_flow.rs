use actix_web::{http::StatusCode, test, web, App, HttpServer};
use serde_json::{json, Value};

use devtrack::app_state::AppState;
use devtrack::auth::AuthResponse;
use devtrack::client::session::TimerOutcome;
use devtrack::client::state::SubmittedDraft;
use devtrack::client::{ApiClient, ClientError, LocalStore, Session};
use devtrack::config::Config;
use devtrack::models::{PublicUser, Task, TaskStatus};

fn state() -> AppState {
    AppState::in_memory(Config::local("integration-secret"))
}

#[actix_web::test]
async fn signup_create_complete_delete() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state()))
            .configure(devtrack::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({ "name": "Ana", "email": "ana@x.com", "password": "pw123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let auth: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(auth.user.name, "Ana");
    let bearer = format!("Bearer {}", auth.token);

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(("Authorization", bearer.as_str()))
        .set_json(json!({ "title": "Write spec" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Task = test::read_body_json(resp).await;
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority.as_str(), "medium");
    assert_eq!(task.user_id, auth.user.id);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(("Authorization", bearer.as_str()))
        .set_json(json!({ "status": "completed", "userId": "someone-else" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.user_id, auth.user.id);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task.id))
        .insert_header(("Authorization", bearer.as_str()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/tasks")
        .insert_header(("Authorization", bearer.as_str()))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed, json!([]));
}

#[actix_web::test]
async fn duplicate_signup_is_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state()))
            .configure(devtrack::configure),
    )
    .await;

    let signup = || {
        test::TestRequest::post()
            .uri("/api/auth/signup")
            .set_json(json!({ "name": "Ana", "email": "ana@x.com", "password": "pw123" }))
            .to_request()
    };
    assert_eq!(test::call_service(&app, signup()).await.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, signup()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Email is already registered");
}

fn spawn_server() -> (String, actix_web::dev::ServerHandle) {
    let state = state();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(devtrack::configure)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (format!("http://{}", addr), handle)
}

#[actix_web::test]
async fn client_runs_against_a_live_server() {
    let (base, handle) = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path().join("state.json")).unwrap();
    let mut session = Session::new(&base, store);

    let user = session.signup("Ana", "ana@x.com", "pw123", Some("pw123")).await.unwrap();
    assert_eq!(user.name, "Ana");
    assert_eq!(session.whoami().await.unwrap().email, "ana@x.com");

    let ui = session.store_mut().ui_mut();
    ui.begin_create().unwrap();
    ui.draft_mut().unwrap().title = "Write spec".into();
    let submitted = ui.submit_draft().unwrap();
    assert!(matches!(submitted, SubmittedDraft::Create(_)));
    let task = session.submit(submitted).await.unwrap();
    assert!(session.store().cached_tasks().is_none());

    let listing = session.fetch_tasks().await.unwrap();
    assert!(!listing.is_stale());
    assert_eq!(session.store().cached_tasks().unwrap().items.len(), 1);

    let now = chrono::Utc::now();
    let started = session.toggle_timer(&task.id, now).await.unwrap();
    assert!(matches!(started, TimerOutcome::Started { flushed: None, .. }));
    let stopped = session
        .toggle_timer(&task.id, now + chrono::Duration::seconds(125))
        .await
        .unwrap();
    let TimerOutcome::Stopped(merged) = stopped else {
        panic!("expected the timer to stop");
    };
    assert_eq!(merged.elapsed.seconds, 125);
    assert_eq!(merged.task.time_spent, 125);
    assert!(session.store().ui().active_timer().is_none());

    let now = chrono::Utc::now();
    session.toggle_timer(&task.id, now).await.unwrap();
    let merged = session
        .stop_timer(now + chrono::Duration::seconds(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged.task.time_spent, 130);

    let summary = session.summary().await.unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.total_time_spent, 130);

    let api = ApiClient::new(base.as_str()).with_token(session.store().token().map(String::from));
    let completed = api.list_tasks(Some(TaskStatus::Completed)).await.unwrap();
    assert!(completed.is_empty());

    let err = session.delete("000000000000000000000000").await.unwrap_err();
    assert!(err.to_string().contains("task not found"));

    handle.stop(true).await;
}

#[actix_web::test]
async fn rejected_token_clears_the_stored_session() {
    let (base, handle) = spawn_server();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut store = LocalStore::open(&path).unwrap();
    store.set_session(AuthResponse {
        user: PublicUser {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@x.com".into(),
        },
        token: "garbage".into(),
    });
    store.save().unwrap();

    let mut session = Session::new(&base, store);
    let err = session.fetch_tasks().await.unwrap_err();
    assert!(matches!(err, ClientError::SessionExpired));
    assert!(!session.is_logged_in());

    let reopened = LocalStore::open(&path).unwrap();
    assert!(reopened.token().is_none());
    assert!(reopened.user().is_none());

    handle.stop(true).await;
}
