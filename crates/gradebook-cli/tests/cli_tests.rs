//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gradebook() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("gradebook").unwrap()
}

/// A command isolated from any user config, pointed at `server`.
fn against(server: &MockServer, dir: &TempDir) -> Command {
    let mut cmd = gradebook();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("GRADEBOOK_API_URL", server.uri())
        .env("GRADEBOOK_API_TOKEN", "cli-token")
        .env_remove("RUST_LOG");
    cmd
}

async fn mount_school(server: &MockServer, role: &str) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 50, "username": "helena", "email": "helena@escola.br",
            "role": role, "student_id": null, "school": {"id": 1, "name": "Escola Modelo"}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grading-config"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "Not found"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/classrooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": 1, "name": "6º Ano A", "grade": "6", "year": 2026}],
            "pagination": {"page": 1, "page_size": 100, "total": 1, "total_pages": 1}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/classrooms/1/allocations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": 1, "classroom_id": 1, "teacher_id": 50, "subject": "Matemática"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/classrooms/1/students"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": [1, 2]})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/students"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"id": 1, "first_name": "Ana", "last_name": "Lima", "status": "active"},
                {"id": 2, "first_name": "Bruno", "last_name": "Costa", "status": "active"},
                {"id": 3, "first_name": "Caio", "last_name": "Reis", "status": "active"}
            ],
            "pagination": {"page": 1, "page_size": 100, "total": 3, "total_pages": 1}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grades"))
        .and(query_param("classroom_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "id": 10, "student_id": 1, "classroom_id": 1, "subject": "Matemática",
                "term": "1", "date": "2026-02-01",
                "grade1": 6.0, "grade2": 8.0, "recovery_grade": null,
                "average": 99.0, "final_grade": 99.0,
                "created_at": "2026-02-01T12:00:00Z"
            }],
            "pagination": {"page": 1, "page_size": 100, "total": 1, "total_pages": 1}
        })))
        .mount(server)
        .await;
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created gradebook.toml"));

    assert!(dir.path().join("gradebook.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    gradebook()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    gradebook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("rosters, grade entry and pass/fail"));
}

#[test]
fn version_output() {
    gradebook()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gradebook"));
}

#[test]
fn grade_without_scores_is_rejected() {
    gradebook()
        .args(["grade", "--student", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
}

#[tokio::test(flavor = "multi_thread")]
async fn policy_defaults_when_not_configured() {
    let server = MockServer::start().await;
    mount_school(&server, "teacher").await;
    let dir = TempDir::new().unwrap();

    against(&server, &dir)
        .arg("policy")
        .assert()
        .success()
        .stdout(predicate::str::contains("bimestral (4 terms)"))
        .stdout(predicate::str::contains("Minimum to pass:    6.0"))
        .stdout(predicate::str::contains("replace"));
}

#[tokio::test(flavor = "multi_thread")]
async fn roster_renders_persisted_and_draft_rows() {
    let server = MockServer::start().await;
    mount_school(&server, "teacher").await;
    let dir = TempDir::new().unwrap();

    against(&server, &dir)
        .args(["roster", "--classroom", "1", "--subject", "Matemática", "--term", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6º Ano A · Matemática · term 1 of 4"))
        .stdout(predicate::str::contains("Ana Lima"))
        .stdout(predicate::str::contains("7.0"))
        .stdout(predicate::str::contains("draft-2"))
        .stdout(predicate::str::contains("99.0").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn roster_json_output() {
    let server = MockServer::start().await;
    mount_school(&server, "teacher").await;
    let dir = TempDir::new().unwrap();

    let output = against(&server, &dir)
        .args(["roster", "--term", "1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["average"], serde_json::json!(7.0));
    assert_eq!(rows[1]["id"], serde_json::json!("draft-2"));
    assert_eq!(rows[1]["average"], serde_json::Value::Null);
}

#[tokio::test(flavor = "multi_thread")]
async fn foreign_classroom_is_refused() {
    let server = MockServer::start().await;
    mount_school(&server, "teacher").await;
    let dir = TempDir::new().unwrap();

    against(&server, &dir)
        .args(["roster", "--classroom", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("classroom 9 is not available"));
}

#[tokio::test(flavor = "multi_thread")]
async fn grade_saves_every_row() {
    let server = MockServer::start().await;
    mount_school(&server, "teacher").await;
    Mock::given(method("POST"))
        .and(path("/grades"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "data": {
                "id": 77, "student_id": 2, "classroom_id": 1, "subject": "Matemática",
                "term": "1", "date": "2026-02-10",
                "grade1": 5.5, "grade2": null, "recovery_grade": null,
                "average": null, "final_grade": null,
                "created_at": "2026-02-10T12:00:00Z"
            }
        })))
        .expect(2)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    against(&server, &dir)
        .args([
            "grade", "--term", "1", "--student", "2", "--c1", "5,5", "--date", "2026-02-10",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 2 rows (1 new)"))
        .stdout(predicate::str::contains("Bruno Costa"))
        .stdout(predicate::str::contains("5.5"));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_token_fails_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "Invalid token"})),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    against(&server, &dir)
        .arg("roster")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("Invalid token"));
}
