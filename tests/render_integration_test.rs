//! Integration tests for the render, snapshot and completions commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn get_binary_path() -> String {
    std::env::var("CARGO_BIN_EXE_erd-builder")
        .unwrap_or_else(|_| "target/debug/erd-builder".to_string())
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn run(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(get_binary_path())
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_emit_only_plantuml() {
    let dir = TempDir::new().unwrap();
    let snapshot = fixture("ooo_rubin.yaml");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--emit-only",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("@startuml"));
    assert_eq!(stdout.matches("class ").count(), 5);
    assert_eq!(stdout.matches(",bold] ").count(), 4);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("5 tables, 4 relationships"));
    // Nothing rendered, nothing left behind
    assert!(!dir.path().join("diagram_folder").exists());
}

#[test]
fn test_emit_only_all_engines() {
    let dir = TempDir::new().unwrap();
    let ddl = fixture("shop.sql");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--ddl",
            ddl.to_str().unwrap(),
            "--engine",
            "all",
            "--emit-only",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("@startuml"));
    assert!(stdout.contains("Table users {"));
    assert!(stdout.contains("digraph ERD {"));
    assert!(stdout.contains("categories:parent_id -> categories:id"));
}

#[test]
fn test_verbose_prints_layout_decisions() {
    let dir = TempDir::new().unwrap();
    let snapshot = fixture("ooo_rubin.yaml");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--emit-only",
            "--verbose",
            "--hub-threshold",
            "1",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Table degrees:"));
    assert!(stderr.contains("(hub)"));
    assert!(stderr.contains("4 edges:"));
}

#[test]
fn test_table_filters() {
    let dir = TempDir::new().unwrap();
    let ddl = fixture("shop.sql");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--ddl",
            ddl.to_str().unwrap(),
            "--engine",
            "dbml",
            "--emit-only",
            "--exclude",
            "order*",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Table orders"));
    assert!(stdout.contains("Table users"));
    assert!(stdout.contains("Ref: products.category_id > categories.id"));
}

#[test]
fn test_snapshot_command_writes_yaml() {
    let dir = TempDir::new().unwrap();
    let ddl = fixture("shop.sql");
    let out = dir.path().join("shop.yaml");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "snapshot",
            "--ddl",
            ddl.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let content = fs::read_to_string(&out).unwrap();
    assert!(content.contains("name: shop"));
    assert!(content.contains("primary_keys:"));

    // The snapshot is a valid render source
    let output = run(
        dir.path(),
        &[
            "render",
            "--snapshot",
            out.to_str().unwrap(),
            "--emit-only",
            "-c",
            config.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
}

#[test]
fn test_snapshot_command_stdout_json() {
    let dir = TempDir::new().unwrap();
    let snapshot = fixture("ooo_rubin.yaml");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "snapshot",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "ooo_rubin");
    assert_eq!(json["tables"]["User"][1], "user_name");
}

#[test]
fn test_empty_schema_fails() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.sql");
    fs::write(&empty, "-- nothing here\n").unwrap();
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--ddl",
            empty.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no tables found"));
}

#[test]
fn test_foreign_key_to_missing_table_fails() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("broken.yaml");
    fs::write(
        &snapshot,
        "tables:\n  A: [id, ghost_id]\nforeign_keys:\n  A:\n    - Ghost: [ghost_id, id]\n",
    )
    .unwrap();
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--emit-only",
            "--engine",
            "dot",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("'Ghost' which is not in the schema"));
}

#[test]
fn test_missing_source_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let output = run(dir.path(), &["render", "-c", config.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no schema source given"));
}

#[test]
fn test_invalid_engine_fails() {
    let dir = TempDir::new().unwrap();
    let snapshot = fixture("ooo_rubin.yaml");
    let config = write_config(dir.path(), "");

    let output = run(
        dir.path(),
        &[
            "render",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--engine",
            "mermaid",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown engine"));
}

#[test]
fn test_missing_renderer_reported() {
    let dir = TempDir::new().unwrap();
    let snapshot = fixture("ooo_rubin.yaml");
    let config = write_config(dir.path(), "render:\n  dot: erd-builder-no-such-dot\n");

    let output = run(
        dir.path(),
        &[
            "render",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--engine",
            "dot",
            "-c",
            config.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("renderer 'dot' failed"));
    assert!(stderr.contains("not found"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("erd-builder"));
}

#[cfg(unix)]
mod fake_renderer {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in for `dot -Tpng <in> -o <out>`
    fn fake_dot(dir: &Path) -> PathBuf {
        let script = dir.join("fake-dot");
        fs::write(&script, "#!/bin/sh\ncp \"$2\" \"$4\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn pngs(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".png"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_render_and_move_to_output_dir() {
        let dir = TempDir::new().unwrap();
        let snapshot = fixture("ooo_rubin.yaml");
        let dot = fake_dot(dir.path());
        let config = write_config(
            dir.path(),
            &format!("render:\n  dot: {}\n", dot.display()),
        );
        let dest = dir.path().join("images");
        fs::create_dir(&dest).unwrap();

        let output = run(
            dir.path(),
            &[
                "render",
                "--snapshot",
                snapshot.to_str().unwrap(),
                "--engine",
                "dot",
                "--output",
                dest.to_str().unwrap(),
                "-c",
                config.to_str().unwrap(),
            ],
        );

        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        let moved = pngs(&dest);
        assert_eq!(moved.len(), 1);
        assert!(moved[0].starts_with("ooo_rubin_"));

        // The fake renderer copied the markup, so the image holds the DOT source
        let content = fs::read_to_string(dest.join(&moved[0])).unwrap();
        assert!(content.contains("digraph ERD"));

        assert!(pngs(&dir.path().join("diagram_folder")).is_empty());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "dot").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_existing_destination_keeps_image_in_output_dir() {
        let dir = TempDir::new().unwrap();
        let snapshot = fixture("ooo_rubin.yaml");
        let dot = fake_dot(dir.path());
        let config = write_config(
            dir.path(),
            &format!("render:\n  dot: {}\n", dot.display()),
        );
        let dest = dir.path().join("taken.png");
        fs::write(&dest, "old").unwrap();

        let output = run(
            dir.path(),
            &[
                "render",
                "--snapshot",
                snapshot.to_str().unwrap(),
                "--engine",
                "dot",
                "--output",
                dest.to_str().unwrap(),
                "-c",
                config.to_str().unwrap(),
            ],
        );

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("target already exists"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
        assert_eq!(pngs(&dir.path().join("diagram_folder")).len(), 1);
    }

    #[test]
    fn test_all_engines_continue_after_failure() {
        let dir = TempDir::new().unwrap();
        let snapshot = fixture("ooo_rubin.yaml");
        let dot = fake_dot(dir.path());
        let config = write_config(
            dir.path(),
            &format!(
                "render:\n  dot: {}\n  plantuml_jar: {}\n  dbml_renderer: erd-builder-no-such-dbml\n  output_dir: out\n",
                dot.display(),
                dir.path().join("missing.jar").display()
            ),
        );

        let output = run(
            dir.path(),
            &[
                "render",
                "--snapshot",
                snapshot.to_str().unwrap(),
                "--engine",
                "all",
                "--keep-markup",
                "-c",
                config.to_str().unwrap(),
            ],
        );

        assert!(output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("renderer 'plantuml' failed"));
        assert!(stderr.contains("renderer 'dbml' failed"));

        let images = pngs(&dir.path().join("out"));
        assert_eq!(images.len(), 1);
        assert!(images[0].ends_with("_dot.png"));
        assert!(dir.path().join("out").join(images[0].replace(".png", ".dot")).exists());
    }
}
