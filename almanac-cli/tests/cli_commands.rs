use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn almanac(dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("almanac")?;
    cmd.current_dir(dir).env_remove("ALMANAC_PASSWORD");
    Ok(cmd)
}

#[test]
fn identify_json_outputs_meta() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let assert = almanac(dir.path())?
        .args([
            "identify",
            "2024-04-20_to_2024-04-15.md",
            "notes",
            "--json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: Value = serde_json::from_str(&stdout)?;
    let arr = value.as_array().expect("json array");
    assert_eq!(arr.len(), 2);

    assert_eq!(arr[0]["startDate"], "2024-04-15");
    assert_eq!(arr[0]["endDate"], "2024-04-20");
    assert_eq!(arr[0]["isRange"], true);
    assert_eq!(arr[0]["quarterKey"], "2024-Q2");

    // No date at all lands on the sentinel
    assert_eq!(arr[1]["rawId"], "notes");
    assert_eq!(arr[1]["startDate"], "1970-01-01");

    Ok(())
}

#[test]
fn protect_then_unlock_renders_post() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("post.md"),
        "---\ntitle: Secret\npassword: hunter2\n---\n# Plans\n\nMeet at *noon*.\n",
    )?;

    almanac(dir.path())?
        .args(["protect", "post.md", "--output", "payload.json"])
        .assert()
        .success();

    let payload: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("payload.json"))?)?;
    assert_eq!(payload["alg"], "AES-256-GCM");
    assert!(!payload["data"].as_str().unwrap_or_default().contains("noon"));

    almanac(dir.path())?
        .args(["unlock", "payload.json", "--password", "hunter2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<em>noon</em>"))
        .stdout(predicate::str::contains("Plans</h1>"));

    Ok(())
}

#[test]
fn unlock_with_wrong_password_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("post.md"), "Nothing to see.\n")?;

    almanac(dir.path())?
        .args([
            "protect",
            "post.md",
            "--password",
            "right",
            "--output",
            "payload.json",
        ])
        .assert()
        .success();

    almanac(dir.path())?
        .args(["unlock", "payload.json", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Incorrect password"));

    Ok(())
}

#[test]
fn protect_without_password_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("post.md"), "# Open post\n")?;

    almanac(dir.path())?
        .args(["protect", "post.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password"));

    Ok(())
}

#[test]
fn build_writes_pagination_api() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let diary = dir.path().join("diary");
    fs::create_dir_all(&diary)?;

    fs::write(
        dir.path().join("almanac.yml"),
        r#"
site:
  title: "Test"
paths:
  diary: "diary"
  blog: "blog"
  attachments: "attachment"
  output: "dist"
diary:
  entries_per_page: 1
"#,
    )?;
    fs::write(diary.join("2024-01-01.md"), "## 09:00\nNew year walk.\n")?;
    fs::write(diary.join("2024-01-02.md"), "## 10:00\nBack to work.\n")?;

    almanac(dir.path())?
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 pages"));

    let page: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("dist/api/diary/1.json"))?)?;
    assert_eq!(page["pagination"]["totalPages"], 2);
    assert_eq!(page["pagination"]["hasMore"], true);
    assert_eq!(page["entries"][0]["startDate"], "2024-01-02");
    assert!(dir.path().join("dist/api/diary/quarters.json").exists());

    Ok(())
}

#[test]
fn build_without_config_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    almanac(dir.path())?
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));

    Ok(())
}
