use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    presets: PathBuf,
}

/// A project with one text file, one png, and a `node_modules` folder, plus a
/// presets file holding a single empty preset named "Plain".
fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("project");
    fs::create_dir_all(root.join("node_modules")).unwrap();
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("b.png"), [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();
    fs::write(root.join("node_modules").join("x.js"), "module.exports = 1;").unwrap();

    let presets = temp.path().join("presets.json");
    fs::write(
        &presets,
        r#"[{"name":"Plain","ignoredFolders":[],"ignoredFiles":[],"ignoredExtensions":[]}]"#,
    )
    .unwrap();

    Fixture {
        _temp: temp,
        root,
        presets,
    }
}

fn ctxbuild() -> Command {
    let mut cmd = Command::cargo_bin("ctxbuild").unwrap();
    cmd.env_remove("PROJECT_ROOT").env("NO_COLOR", "1");
    cmd
}

fn generate(root: &Path, presets: &Path) -> Command {
    let mut cmd = ctxbuild();
    cmd.arg("generate")
        .arg(root)
        .arg("--no-config")
        .arg("--presets-file")
        .arg(presets);
    cmd
}

#[test]
fn test_cli_help() {
    ctxbuild()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("presets"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn test_cli_version() {
    ctxbuild()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ctxbuild"));
}

#[test]
fn test_generate_writes_tree_and_contents_to_stdout() {
    let fx = fixture();
    let expected_tree = "# PROJECT STRUCTURE\n=================\nproject/\n├── a.txt\n└── b.png\n\n=================\n";

    generate(&fx.root, &fx.presets)
        .args(["--ignore-folder", "node_modules", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(expected_tree))
        .stdout(predicate::str::contains("# FILE: a.txt\nhello\n\n"))
        .stdout(predicate::str::contains("# FILE: b.png (binary file skipped)\n"))
        .stdout(predicate::str::contains("node_modules").not());
}

#[test]
fn test_generate_summary_goes_to_stderr() {
    let fx = fixture();

    generate(&fx.root, &fx.presets)
        .args(["--ignore-folder", "node_modules"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Files included:"))
        .stderr(predicate::str::contains("Plain"))
        .stdout(predicate::str::contains("Files included:").not());
}

#[test]
fn test_generate_to_output_file() {
    let fx = fixture();
    let out = fx.root.parent().unwrap().join("out").join("context.txt");

    generate(&fx.root, &fx.presets)
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("# FILE: a.txt\nhello"));
    assert!(written.contains("# FILE: node_modules/x.js\nmodule.exports = 1;"));
}

#[test]
fn test_tree_only_omits_file_sections() {
    let fx = fixture();

    generate(&fx.root, &fx.presets)
        .args(["--tree-only", "--ignore-ext", "png", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("├── a.txt"))
        .stdout(predicate::str::contains("└── node_modules"))
        .stdout(predicate::str::contains("b.png").not())
        .stdout(predicate::str::contains("# FILE:").not());
}

#[test]
fn test_tree_only_rejects_structured_format() {
    let fx = fixture();

    generate(&fx.root, &fx.presets)
        .args(["--tree-only", "-f", "json"])
        .assert()
        .failure()
        .code(5);
}

#[test]
fn test_json_format_reports_counts() {
    let fx = fixture();

    let assert = generate(&fx.root, &fx.presets)
        .args(["--ignore-folder", "node_modules", "-f", "json", "-q"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(report["preset"], "Plain");
    assert_eq!(report["fileCount"], 1);
    assert_eq!(report["totalBytes"], 5);
    let full_content = report["fullContent"].as_str().unwrap();
    assert_eq!(
        report["estimatedTokenCount"].as_u64().unwrap(),
        (full_content.chars().count() / 4) as u64
    );
    assert!(report["generatedAt"].is_string());
    assert_eq!(report["files"].as_array().unwrap().len(), 2);
}

#[test]
fn test_unknown_preset_exits_with_invalid_argument() {
    let fx = fixture();

    generate(&fx.root, &fx.presets)
        .args(["--preset", "Does Not Exist"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("Unknown preset 'Does Not Exist'"))
        .stderr(predicate::str::contains("Plain"));
}

#[test]
fn test_missing_root_fails() {
    let fx = fixture();

    generate(&fx.root.join("missing"), &fx.presets)
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_presets_list_seeds_defaults_when_missing() {
    let temp = TempDir::new().unwrap();
    let presets = temp.path().join("nested").join("presets.json");

    ctxbuild()
        .args(["presets", "list", "--presets-file"])
        .arg(&presets)
        .assert()
        .success()
        .stdout(predicate::str::contains("Default Web"))
        .stdout(predicate::str::contains("C# .NET"));

    assert!(presets.exists());
}

#[test]
fn test_presets_show_is_case_insensitive() {
    let fx = fixture();

    ctxbuild()
        .args(["presets", "show", "plain", "--presets-file"])
        .arg(&fx.presets)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"Plain\""))
        .stdout(predicate::str::contains("\"ignoredFolders\": []"));
}

#[test]
fn test_presets_reset_with_yes_restores_defaults() {
    let fx = fixture();

    ctxbuild()
        .args(["presets", "reset", "--yes", "-q", "--presets-file"])
        .arg(&fx.presets)
        .assert()
        .success();

    let stored = fs::read_to_string(&fx.presets).unwrap();
    assert!(stored.contains("Default Web"));
    assert!(!stored.contains("Plain"));
}

#[test]
fn test_presets_reset_quiet_without_yes_is_refused() {
    let fx = fixture();

    ctxbuild()
        .args(["presets", "reset", "-q", "--presets-file"])
        .arg(&fx.presets)
        .assert()
        .failure()
        .code(5);

    let stored = fs::read_to_string(&fx.presets).unwrap();
    assert!(stored.contains("Plain"));
}

#[test]
fn test_config_prints_default_toml() {
    let temp = TempDir::new().unwrap();

    ctxbuild()
        .arg("config")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[filters]"))
        .stdout(predicate::str::contains("[output]"));
}

#[test]
fn test_config_save_then_generate_uses_it() {
    let fx = fixture();

    ctxbuild()
        .arg("config")
        .arg(&fx.root)
        .args(["--save", "-q"])
        .assert()
        .success();
    let config_path = fx.root.join(".ctxbuild").join("ctxbuild.toml");
    assert!(config_path.exists());

    fs::write(
        &config_path,
        "[filters]\nignored_folders = [\"node_modules\"]\n",
    )
    .unwrap();

    ctxbuild()
        .arg("generate")
        .arg(&fx.root)
        .arg("--presets-file")
        .arg(&fx.presets)
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains("# FILE: a.txt"))
        .stdout(predicate::str::contains("x.js").not());
}

#[test]
fn test_repeated_generate_does_not_read_back_its_own_output() {
    let fx = fixture();
    let config_dir = fx.root.join(".ctxbuild");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("ctxbuild.toml"),
        "[filters]\nignored_folders = [\"node_modules\"]\n\n[output]\noutput_file = \"context.txt\"\n",
    )
    .unwrap();

    for _ in 0..2 {
        ctxbuild()
            .arg("generate")
            .arg(&fx.root)
            .arg("--presets-file")
            .arg(&fx.presets)
            .arg("-q")
            .assert()
            .success();
    }

    let document = fs::read_to_string(fx.root.join("context.txt")).unwrap();
    assert_eq!(document.matches("# PROJECT STRUCTURE").count(), 1);
    assert!(!document.contains("# FILE: context.txt"));
    assert!(!document.contains("── context.txt"));
    assert!(document.contains("# FILE: a.txt\nhello"));
}

fn presets_cmd(presets: &Path) -> Command {
    let mut cmd = ctxbuild();
    cmd.arg("presets").arg("--presets-file").arg(presets);
    cmd
}

fn stored_presets(presets: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(presets).unwrap()).unwrap()
}

#[test]
fn test_presets_create_copies_source_and_rejects_duplicates() {
    let fx = fixture();

    presets_cmd(&fx.presets)
        .args(["add", "Plain", "--folder", "dist", "--ext", "lock", "-q"])
        .assert()
        .success();
    presets_cmd(&fx.presets)
        .args(["create", "Copy", "--from", "plain", "-q"])
        .assert()
        .success();
    presets_cmd(&fx.presets)
        .args(["create", "COPY"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("already exists"));

    let stored = stored_presets(&fx.presets);
    let presets = stored.as_array().unwrap();
    assert_eq!(presets.len(), 2);
    assert_eq!(presets[1]["name"], "Copy");
    assert_eq!(presets[1]["ignoredFolders"][0], "dist");
    assert_eq!(presets[1]["ignoredExtensions"][0], ".lock");
}

#[test]
fn test_presets_add_skips_duplicates_and_remove_drops_patterns() {
    let fx = fixture();

    presets_cmd(&fx.presets)
        .args(["add", "Plain", "--ext", ".png", "--ext", "PNG", "--file", "yarn.lock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 2 pattern(s)"));

    let stored = stored_presets(&fx.presets);
    assert_eq!(stored[0]["ignoredExtensions"], serde_json::json!([".png"]));
    assert_eq!(stored[0]["ignoredFiles"], serde_json::json!(["yarn.lock"]));

    generate(&fx.root, &fx.presets)
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains("b.png").not());

    presets_cmd(&fx.presets)
        .args(["remove", "plain", "--ext", "png", "-q"])
        .assert()
        .success();
    let stored = stored_presets(&fx.presets);
    assert_eq!(stored[0]["ignoredExtensions"], serde_json::json!([]));
}

#[test]
fn test_presets_add_requires_a_pattern() {
    let fx = fixture();

    presets_cmd(&fx.presets)
        .args(["add", "Plain"])
        .assert()
        .failure();
}

#[test]
fn test_presets_delete_keeps_the_last_preset() {
    let fx = fixture();

    presets_cmd(&fx.presets)
        .args(["create", "Second", "-q"])
        .assert()
        .success();
    presets_cmd(&fx.presets)
        .args(["delete", "plain", "--yes", "-q"])
        .assert()
        .success();
    presets_cmd(&fx.presets)
        .args(["delete", "Second", "--yes"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("last remaining preset"));

    let stored = stored_presets(&fx.presets);
    assert_eq!(stored.as_array().unwrap().len(), 1);
    assert_eq!(stored[0]["name"], "Second");
}

#[test]
fn test_empty_extension_rule_skips_extensionless_files() {
    let fx = fixture();
    fs::write(fx.root.join("Makefile"), "all:").unwrap();

    generate(&fx.root, &fx.presets)
        .args(["--ignore-ext", "", "--ignore-folder", "node_modules", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Makefile").not())
        .stdout(predicate::str::contains("# FILE: a.txt"));
}
