#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn quire_cmd(data_dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("quire"));
    cmd.env("QUIRE_DATA_DIR", data_dir.as_os_str())
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Creates a post without the editor and returns its id.
fn create(data_dir: &Path, args: &[&str]) -> String {
    let output = quire_cmd(data_dir)
        .args(["create", "--no-editor"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .last()
        .unwrap()
        .trim()
        .to_string()
}

#[test]
fn test_create_list_show() {
    let temp = TempDir::new().unwrap();
    let id = create(temp.path(), &["Hello", "world", "-c", "First body", "-t", "rust"]);

    assert!(temp.path().join("posts").join(format!("{}.json", id)).exists());

    quire_cmd(temp.path())
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello world"))
        .stdout(predicate::str::contains("#rust"));

    quire_cmd(temp.path())
        .args(["show", &id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("First body"));
}

#[test]
fn test_archive_hides_and_unarchive_restores_draft() {
    let temp = TempDir::new().unwrap();
    let id = create(temp.path(), &["Old news"]);

    quire_cmd(temp.path())
        .args(["publish", &id])
        .assert()
        .success();
    quire_cmd(temp.path())
        .args(["archive", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("archived"));

    quire_cmd(temp.path())
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Old news").not());

    quire_cmd(temp.path())
        .args(["unarchive", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("draft"));
}

#[test]
fn test_delete_twice_fails_second_time() {
    let temp = TempDir::new().unwrap();
    let id = create(temp.path(), &["Doomed"]);

    quire_cmd(temp.path())
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted post"));

    quire_cmd(temp.path())
        .args(["delete", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_edit_fields_directly() {
    let temp = TempDir::new().unwrap();
    let id = create(temp.path(), &["Draft"]);

    quire_cmd(temp.path())
        .args(["edit", &id, "--title", "Renamed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved post: Renamed"));
}

#[test]
fn test_attach_image_copies_file() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let id = create(&data, &["Pictures"]);

    let image = temp.path().join("cat.png");
    fs::write(&image, b"png bytes").unwrap();

    quire_cmd(&data)
        .args(["attach", &id, image.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Attached /images/"));

    let stored: Vec<_> = fs::read_dir(data.join("images")).unwrap().collect();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_paths_resolves_image_reference() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let id = create(&data, &["Pictures"]);

    let image = temp.path().join("shot (1).png");
    fs::write(&image, b"png bytes").unwrap();

    let output = quire_cmd(&data)
        .args(["attach", &id, image.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let reference = stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Attached "))
        .unwrap()
        .to_string();
    assert!(reference.ends_with("-shot (1).png"));

    let file_name = reference.trim_start_matches("/images/");
    quire_cmd(&data)
        .args(["paths", &reference])
        .assert()
        .success()
        .stdout(predicate::str::contains(file_name));

    quire_cmd(&data)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("![Image](<{}>)", reference)));
}

#[test]
fn test_tags_and_snippets() {
    let temp = TempDir::new().unwrap();
    let id = create(temp.path(), &["Tagged", "-t", "one"]);

    quire_cmd(temp.path())
        .args(["tag", &id, "--add", "two", "--remove", "one"])
        .assert()
        .success()
        .stdout(predicate::str::contains("two"));

    quire_cmd(temp.path())
        .args(["snippet-add", "Callout", "> **Note**"])
        .assert()
        .success();
    quire_cmd(temp.path())
        .args(["snippets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Callout"));
    quire_cmd(temp.path())
        .args(["snippet-rm", "callout"])
        .assert()
        .success();
}

#[test]
fn test_config_round_trip() {
    let temp = TempDir::new().unwrap();

    quire_cmd(temp.path())
        .args(["config", "defaultView", "split"])
        .assert()
        .success();
    quire_cmd(temp.path())
        .args(["config", "defaultView"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaultView = split"));

    quire_cmd(temp.path())
        .args(["config", "fontSize", "12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown setting"));
}

#[test]
fn test_export_then_import() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    create(&source, &["Portable", "-c", "Carry me", "-t", "travel"]);

    let out = temp.path().join("out");
    quire_cmd(&source)
        .args(["export", "--out", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 post(s)"));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 1);

    let md_dir = temp.path().join("md");
    fs::create_dir(&md_dir).unwrap();
    fs::write(md_dir.join("intro.md"), "# Intro\n\nHello").unwrap();

    let target = temp.path().join("target");
    quire_cmd(&target)
        .args(["import", md_dir.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total imported: 1"));
    quire_cmd(&target)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intro"));
}

#[test]
fn test_data_dir_flag_overrides_environment() {
    let temp = TempDir::new().unwrap();
    let env_dir = temp.path().join("env");
    let flag_dir = temp.path().join("flag");

    quire_cmd(&env_dir)
        .args(["--data-dir", flag_dir.to_str().unwrap()])
        .args(["create", "--no-editor", "Flagged"])
        .assert()
        .success();

    assert!(flag_dir.join("posts").is_dir());
    assert!(!env_dir.join("posts").exists());
}

#[test]
fn test_paths_lists_storage_locations() {
    let temp = TempDir::new().unwrap();
    quire_cmd(temp.path())
        .args(["paths"])
        .assert()
        .success()
        .stdout(predicate::str::contains("posts"))
        .stdout(predicate::str::contains("images"));
}
