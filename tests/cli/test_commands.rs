use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BRIDGE_ENV: &[&str] = &[
    "XMLBRIDGE_STYLESHEETS_DIR",
    "XMLBRIDGE_WORK_DIR",
    "XMLBRIDGE_ENGINE_PROGRAM",
    "XMLBRIDGE_ENGINE_TIMEOUT_SECS",
    "XMLBRIDGE_LOG_DIR",
    "RUST_LOG",
];

fn xmlbridge(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("xmlbridge").unwrap();
    cmd.current_dir(dir);
    for var in BRIDGE_ENV {
        cmd.env_remove(var);
    }
    cmd
}

/// Writes a config whose engine is `sh engine.sh SRC XSL OUT` and whose
/// stylesheets are sed scripts.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let xsl = dir.path().join("xsl");
    fs::create_dir(&xsl).unwrap();
    fs::write(xsl.join("rename.xsl"), "s|<doc>|<TEI>|\ns|</doc>|</TEI>|\n").unwrap();
    fs::write(dir.path().join("engine.sh"), "sed -f \"$2\" \"$1\" > \"$3\"\n").unwrap();
    fs::write(
        dir.path().join("xmlbridge.toml"),
        r#"
stylesheets_dir = "xsl"
work_dir = "work"

[engine]
program = "sh"
args = ["engine.sh"]
source_prefix = ""
stylesheet_prefix = ""
output_prefix = ""
timeout_secs = 30

[logging]
console_output = "none"

[transformation.docToTei]
label = "Generic document to TEI"
operation = "import"
files = ["rename.xsl"]

[transformation.teiToJats]
label = "TEI Commons to JATS Publishing"
operation = "export"
files = ["missing.xsl"]
"#,
    )
    .unwrap();
    fs::write(dir.path().join("doc.xml"), "<doc><p>hello</p></doc>").unwrap();
    dir
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let mut cmd = xmlbridge(dir.path());
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("transform"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_transform_command_help() {
    let dir = TempDir::new().unwrap();
    let mut cmd = xmlbridge(dir.path());
    cmd.arg("transform").arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--transformation"))
        .stdout(predicate::str::contains("--timeout"));
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    let mut cmd = xmlbridge(dir.path());
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("xmlbridge"));
}

#[test]
fn test_list_shows_none_first() {
    let dir = workspace();
    let output = xmlbridge(dir.path()).arg("list").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(names, vec!["none", "docToTei", "teiToJats"]);
}

#[test]
fn test_list_json_filters_by_operation() {
    let dir = workspace();
    let output = xmlbridge(dir.path())
        .args(["list", "--operation", "export", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "teiToJats");
    assert_eq!(entries[0]["operation"], "export");
    assert_eq!(entries[0]["stylesheets"][0], "missing.xsl");
}

#[test]
fn test_list_rejects_unknown_operation() {
    let dir = workspace();
    let mut cmd = xmlbridge(dir.path());
    cmd.args(["list", "--operation", "sideways"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid operation"));
}

#[test]
fn test_check_reports_missing_stylesheet() {
    let dir = workspace();
    let mut cmd = xmlbridge(dir.path());
    cmd.arg("check");
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("ok     docToTei"))
        .stdout(predicate::str::contains(
            "error  teiToJats [XB-RES-003] Stylesheet file 'missing.xsl' not found.",
        ))
        .stderr(predicate::str::contains("1 of 2 transformation(s)"));
}

#[test]
fn test_check_single_transformation() {
    let dir = workspace();
    let mut cmd = xmlbridge(dir.path());
    cmd.args(["check", "docToTei"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("configuration OK"));
}

#[test]
fn test_transform_none_with_output() {
    let dir = workspace();
    let mut cmd = xmlbridge(dir.path());
    cmd.args(["transform", "doc.xml", "--transformation", "none", "--output", "out/doc.xml"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("doc.xml"));

    assert_eq!(
        fs::read_to_string(dir.path().join("out/doc.xml")).unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<doc>\n  <p>hello</p>\n</doc>\n"
    );
    assert_eq!(fs::read_dir(dir.path().join("work")).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn test_transform_runs_engine() {
    let dir = workspace();
    let output = xmlbridge(dir.path())
        .args(["transform", "doc.xml", "-t", "docToTei"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let result = String::from_utf8(output.stdout).unwrap();
    let result = Path::new(result.trim());
    assert!(result.starts_with(dir.path().join("work")));
    assert_eq!(
        fs::read_to_string(result).unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<TEI>\n  <p>hello</p>\n</TEI>\n"
    );
}

#[cfg(unix)]
#[test]
fn test_sub_second_timeout_is_honoured() {
    let dir = workspace();
    fs::write(dir.path().join("engine.sh"), "sleep 2\nsed -f \"$2\" \"$1\" > \"$3\"\n").unwrap();

    let started = std::time::Instant::now();
    let mut cmd = xmlbridge(dir.path());
    cmd.args(["transform", "doc.xml", "-t", "docToTei", "--timeout", "300ms"]);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("exceeded 300ms"));

    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert_eq!(fs::read_dir(dir.path().join("work")).unwrap().count(), 0);
}

#[test]
fn test_list_json_stays_parseable_with_stdout_logging() {
    let dir = workspace();
    let config = dir.path().join("xmlbridge.toml");
    let content = fs::read_to_string(&config).unwrap().replace(
        "console_output = \"none\"",
        "console_output = \"stdout\"",
    );
    fs::write(&config, content).unwrap();

    let output = xmlbridge(dir.path())
        .args(["-v", "list", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("logging initialized"));
}

#[test]
fn test_unknown_transformation_exits_with_configuration_status() {
    let dir = workspace();
    let mut cmd = xmlbridge(dir.path());
    cmd.args(["transform", "doc.xml", "--transformation", "fooToBar"]);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Transformation type 'fooToBar' is not configured.",
        ));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let mut cmd = xmlbridge(dir.path());
    cmd.args(["--config", "nowhere.toml", "list"]);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere.toml"));
}
