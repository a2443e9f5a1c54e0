use std::fs;
use std::process::Command;
use std::sync::Once;
use tempfile::TempDir;

use serial_test::serial;

static INIT: Once = Once::new();

/// Build the binary once for all tests
fn build_autopost() {
    INIT.call_once(|| {
        let build_output = Command::new("cargo")
            .args(["build", "--bin", "autopost"])
            .output()
            .expect("Failed to build autopost");
        assert!(
            build_output.status.success(),
            "Failed to build autopost binary"
        );
    });
}

/// Test the queue -> mark-posted -> queue workflow
#[test]
#[serial]
fn test_queue_and_mark_posted_workflow() {
    build_autopost();
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    // Two content folders with dummy videos, one folder without any video
    let clip1 = temp_path.join("clip1");
    fs::create_dir(&clip1).unwrap();
    fs::write(clip1.join("video.mp4"), "").unwrap();
    fs::write(clip1.join("caption.txt"), "first clip").unwrap();

    let clip2 = temp_path.join("clip2");
    fs::create_dir(&clip2).unwrap();
    fs::write(clip2.join("video.mov"), "").unwrap();

    let notes = temp_path.join("notes");
    fs::create_dir(&notes).unwrap();
    fs::write(notes.join("readme.txt"), "not a content folder").unwrap();

    // Initial scan: both clips unposted, notes folder excluded
    let queue_output = Command::new("./target/debug/autopost")
        .args(["queue", temp_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute queue command");

    assert!(queue_output.status.success(), "Queue command failed");
    let stdout = String::from_utf8_lossy(&queue_output.stdout);
    assert!(stdout.contains("clip1"), "Expected clip1 in: {stdout}");
    assert!(stdout.contains("clip2"), "Expected clip2 in: {stdout}");
    assert!(!stdout.contains("notes"), "notes should be excluded: {stdout}");
    assert!(
        stdout.contains("2 item(s), 2 unposted"),
        "Expected 2 unposted items, got: {stdout}"
    );

    // Mark clip1 as posted
    let mark_output = Command::new("./target/debug/autopost")
        .args(["mark-posted", clip1.to_str().unwrap()])
        .output()
        .expect("Failed to execute mark-posted command");

    assert!(mark_output.status.success(), "Mark-posted command failed");
    assert!(clip1.join("Posted").join("status.json").exists());

    // Re-scan: clip1 now posted
    let queue_output = Command::new("./target/debug/autopost")
        .args(["queue", temp_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute queue command");

    assert!(queue_output.status.success(), "Queue command failed");
    let stdout = String::from_utf8_lossy(&queue_output.stdout);
    assert!(
        stdout.contains("2 item(s), 1 unposted"),
        "Expected 1 unposted item after marking, got: {stdout}"
    );
}

/// A post run against a missing worker executable must fail cleanly
/// without writing a posted marker
#[test]
#[serial]
fn test_post_with_missing_worker_fails() {
    build_autopost();
    let temp_dir = TempDir::new().unwrap();
    let folder = temp_dir.path().join("clip1");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("video.mp4"), "").unwrap();

    let post_output = Command::new("./target/debug/autopost")
        .env("AUTOPOST_WORKER_BIN", "/nonexistent/worker")
        .args(["post", folder.to_str().unwrap()])
        .output()
        .expect("Failed to execute post command");

    assert!(
        !post_output.status.success(),
        "Post should fail when the worker is missing"
    );
    assert!(
        !folder.join("Posted").join("status.json").exists(),
        "No marker should be written on failure"
    );
}

/// A stubbed worker that emits the event protocol and exits 0 drives the
/// full post flow, including the automatic posted marker
#[cfg(unix)]
#[test]
#[serial]
fn test_post_with_stub_worker_marks_posted() {
    build_autopost();
    let temp_dir = TempDir::new().unwrap();
    let folder = temp_dir.path().join("clip1");
    fs::create_dir(&folder).unwrap();
    fs::write(folder.join("video.mp4"), "").unwrap();

    // Stub controller: sh script ignoring its command/args
    let controller = temp_dir.path().join("controller.sh");
    fs::write(
        &controller,
        concat!(
            "#!/bin/sh\n",
            "echo '{\"type\":\"progress\",\"value\":100,\"step\":\"Publishing\"}'\n",
            "echo '{\"type\":\"success\",\"message\":\"Posted\"}'\n",
        ),
    )
    .unwrap();

    let post_output = Command::new("./target/debug/autopost")
        .env("AUTOPOST_WORKER_BIN", "sh")
        .env("AUTOPOST_CONTROLLER", controller.to_str().unwrap())
        .args(["post", folder.to_str().unwrap()])
        .output()
        .expect("Failed to execute post command");

    assert!(
        post_output.status.success(),
        "Post failed: {}",
        String::from_utf8_lossy(&post_output.stderr)
    );
    assert!(
        folder.join("Posted").join("status.json").exists(),
        "Successful post should write the marker"
    );
}

/// Test help commands work
#[test]
#[serial]
fn test_help_commands() {
    build_autopost();
    let help_output = Command::new("./target/debug/autopost")
        .arg("--help")
        .output()
        .expect("Failed to execute help command");

    assert!(help_output.status.success(), "Help command failed");

    let help_text = String::from_utf8_lossy(&help_output.stdout);
    assert!(help_text.contains("queue"));
    assert!(help_text.contains("post"));
    assert!(help_text.contains("mark-posted"));
}
