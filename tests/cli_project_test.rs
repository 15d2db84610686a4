//! Project, task and user commands through the tf binary.

mod common;

use common::{TestEnv, admin_json, user_json};
use httptest::{Expectation, Server, all_of, matchers::*, responders::*};
use predicates::prelude::*;
use serde_json::json;

/// A mock API that already knows `tok-1` belongs to `user`.
fn server_for(user: serde_json::Value) -> Server {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/users/profile"),
            request::headers(contains(("authorization", "Bearer tok-1"))),
        ])
        .respond_with(json_encoded(user)),
    );
    server
}

fn project(id: u64, name: &str) -> serde_json::Value {
    json!({"id": id, "name": name, "createdAt": "2024-03-01T12:00:00Z"})
}

fn task(id: u64, title: &str, completed: bool) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "completed": completed,
        "projectId": 7,
        "project": {"id": 7, "name": "Garden"},
        "createdAt": "2024-03-02T08:00:00Z"
    })
}

#[test]
fn test_project_list_passes_query() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(user_json());
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/projects"),
            request::query(url_decoded(contains(("search", "gard")))),
            request::query(url_decoded(contains(("limit", "5")))),
        ])
        .respond_with(json_encoded(
            json!({"data": [project(7, "Garden")], "meta": {"total": 1}}),
        )),
    );

    env.tf_at(&server)
        .args(["-H", "project", "list", "--search", "gard", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 project(s)"))
        .stdout(predicate::str::contains("#7 Garden"));
}

#[test]
fn test_project_create_reports_notice() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(user_json());
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/projects"),
            request::body(json_decoded(eq(json!({"name": "Garden"})))),
        ])
        .respond_with(status_code(201).body(project(7, "Garden").to_string())),
    );

    env.tf_at(&server)
        .args(["project", "create", "Garden"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project created successfully"))
        .stdout(predicate::str::contains(r#""name":"Garden""#));
}

#[test]
fn test_validation_error_is_reported() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(user_json());
    server.expect(
        Expectation::matching(request::method_path("POST", "/projects")).respond_with(
            status_code(400).body(
                json!({
                    "statusCode": 400,
                    "message": ["name should not be empty"],
                    "error": "Bad Request"
                })
                .to_string(),
            ),
        ),
    );

    env.tf_at(&server)
        .args(["project", "create", ""])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            r#"{"error":"Failed to create project: name should not be empty"}"#,
        ));
}

#[test]
fn test_task_list_uses_admin_endpoint_for_admins() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(admin_json());
    server.expect(
        Expectation::matching(request::method_path("GET", "/tasks/admin/all")).respond_with(
            json_encoded(json!({
                "data": [task(1, "Dig", false), task(2, "Plant", true)],
                "meta": {"total": 2}
            })),
        ),
    );

    env.tf_at(&server)
        .args(["-H", "task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All tasks (2 total)"))
        .stdout(predicate::str::contains("[ ] #1 Dig [Garden]"))
        .stdout(predicate::str::contains("[x] #2 Plant [Garden]"));
}

#[test]
fn test_task_toggle() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(user_json());
    server.expect(
        Expectation::matching(request::method_path("POST", "/tasks/1/toggle-complete"))
            .respond_with(json_encoded(task(1, "Dig", true))),
    );

    env.tf_at(&server)
        .args(["-H", "task", "toggle", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Task marked as completed"));
}

#[test]
fn test_task_assign_path() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(user_json());
    server.expect(
        Expectation::matching(request::method_path("POST", "/tasks/1/assign/2"))
            .respond_with(json_encoded(task(1, "Dig", false))),
    );

    env.tf_at(&server)
        .args(["task", "assign", "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task assigned successfully"));
}

#[test]
fn test_user_list_denied_without_request() {
    let env = TestEnv::signed_in("tok-1");
    // Any request to /users would be unexpected and fail the server check.
    let server = server_for(user_json());

    env.tf_at(&server)
        .args(["user", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Access denied"));
}

#[test]
fn test_dashboard_stats() {
    let env = TestEnv::signed_in("tok-1");
    let server = server_for(user_json());
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/projects"),
            request::query(url_decoded(contains(("sortOrder", "desc")))),
        ])
        .respond_with(json_encoded(
            json!({"data": [project(7, "Garden")], "meta": {"total": 1}}),
        )),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/tasks")).respond_with(json_encoded(
            json!({
                "data": [task(1, "Dig", true), task(2, "Plant", false), task(3, "Water", false)],
                "meta": {"total": 3}
            }),
        )),
    );

    env.tf_at(&server)
        .args(["-H", "dashboard"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks:           3"))
        .stdout(predicate::str::contains("33% completion rate"))
        .stdout(predicate::str::contains("#7 Garden"));
}
