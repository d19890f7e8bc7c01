#![cfg(unix)]
#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

const FAKE_ACCUREV: &str = r#"#!/bin/sh
DIR=$(dirname "$0")
echo "$1" >> "$DIR/calls.log"
case "$1" in
login)
  if [ "$3" = "secret" ]; then exit 0; fi
  echo "Failed authentication for $2"
  exit 1
  ;;
show)
  cat <<'EOF'
<streams>
  <stream name="widgets" depotName="widgets"/>
  <stream name="widgets_dev" basis="widgets" depotName="widgets"/>
</streams>
EOF
  ;;
files)
  case "$5" in
  '\.\')
    cat <<'EOF'
<AcResponse>
  <element location="\.\src" dir="yes"/>
  <element location="\.\README.md" size="42" modTime="1700000000"/>
</AcResponse>
EOF
    ;;
  '\.\src')
    echo '<AcResponse><element location="\.\src\main.c" size="9" modTime="1700000100"/></AcResponse>'
    ;;
  *)
    echo '<AcResponse/>'
    ;;
  esac
  ;;
pop)
  mkdir -p "$8/src"
  printf 'int main;' > "$8/src/main.c"
  printf 'readme' > "$8/README.md"
  ;;
getconfig)
  cat <<'EOF'
<template>
  <field name="issueNum" fid="1"/>
  <field name="status" type="Choose" fid="3"><value>Open</value><value>Closed</value></field>
  <field name="shortDescription" fid="4"/>
  <field name="description" fid="5"/>
  <field name="targetRelease" fid="12"/>
  <field name="component" type="Choose" label="Component" fid="20"><value>UI</value><value>Server</value></field>
</template>
EOF
  ;;
xml)
  cp "$3" "$DIR/last-query.xml"
  cat <<'EOF'
<acResponse>
  <issue><issueNum fid="1">17</issueNum><status fid="3">Open</status><shortDescription fid="4">Crash on save</shortDescription></issue>
  <issue><issueNum fid="1">18</issueNum><status fid="3">Closed</status><shortDescription fid="4">Typo in dialog</shortDescription></issue>
</acResponse>
EOF
  ;;
*)
  exit 2
  ;;
esac
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// A temp dir holding a fake accurev and a config pointing at it.
    fn new(category_field: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("accurev");
        std::fs::write(&exe, FAKE_ACCUREV).unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut yaml = format!(
            "executable: {}\nusername: build\npassword: secret\nissue_tracking:\n  depot: widgets\n",
            exe.display()
        );
        if let Some(field) = category_field {
            yaml.push_str(&format!("  category_field: {field}\n"));
        }
        std::fs::write(dir.path().join("accurev-bridge.yaml"), yaml).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("accurev-bridge").unwrap();
        cmd.current_dir(self.dir.path())
            .env("ACCUREV_BRIDGE_CONFIG", self.path("accurev-bridge.yaml"))
            .env_remove("RUST_LOG");
        cmd
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_init_writes_defaults_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfg/accurev-bridge.yaml");
    let run = || {
        let mut cmd = Command::cargo_bin("accurev-bridge").unwrap();
        cmd.current_dir(dir.path())
            .env("ACCUREV_BRIDGE_CONFIG", &path)
            .args(["config", "init", "--username", "build", "--depot", "widgets"]);
        cmd
    };

    run().assert().success().stdout(predicate::str::contains("Created"));
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("username: build"));
    assert!(written.contains("depot: widgets"));
    assert!(written.contains("issueNum"));

    run()
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn config_show_hides_password() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("username: build"))
        .stdout(predicate::str::contains("secret").not());
}

#[test]
fn config_validate_reports_errors() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No warnings"));

    std::fs::write(
        ws.path("accurev-bridge.yaml"),
        "executable: accurev\nissue_tracking:\n  depot: ''\n",
    )
    .unwrap();
    ws.cmd()
        .args(["--json", "config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"warnings\""))
        .stdout(predicate::str::contains("depot"));
}

#[test]
fn missing_config_suggests_init() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("accurev-bridge")
        .unwrap()
        .current_dir(dir.path())
        .env("ACCUREV_BRIDGE_CONFIG", dir.path().join("nope.yaml"))
        .arg("streams")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}

// ---------------------------------------------------------------------------
// source control
// ---------------------------------------------------------------------------

#[test]
fn check_reports_ok() {
    let ws = Workspace::new(None);
    ws.cmd()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("source control: ok"))
        .stdout(predicate::str::contains("issue tracking: ok"));
}

#[test]
fn check_fails_for_missing_executable() {
    let ws = Workspace::new(None);
    std::fs::write(
        ws.path("accurev-bridge.yaml"),
        format!("executable: {}\n", ws.path("missing").display()),
    )
    .unwrap();
    ws.cmd()
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn streams_prints_hierarchy() {
    let ws = Workspace::new(None);
    ws.cmd()
        .arg("streams")
        .assert()
        .success()
        .stdout(predicate::str::contains(":widgets/\n  :widgets_dev/"));
}

#[test]
fn ls_root_and_stream() {
    let ws = Workspace::new(None);
    ws.cmd()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains(":widgets/"));

    let output = ws
        .cmd()
        .args(["--json", "ls", "widgets/:widgets"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["directories"], serde_json::json!([":widgets_dev", "src"]));
    assert_eq!(listing["files"][0]["name"], "README.md");
    assert_eq!(listing["files"][0]["size"], 42);
}

#[test]
fn ls_rejects_path_without_stream() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["ls", "widgets/src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stream not specified"));
}

#[test]
fn ls_missing_directory_fails() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["ls", "widgets/:widgets/docs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn tree_expands_recursively() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["tree", "widgets/:widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  src/\n    main.c (9 bytes)"))
        .stdout(predicate::str::contains("README.md (42 bytes)"));
}

#[test]
fn tree_logs_in_before_listing_streams() {
    let ws = Workspace::new(None);
    ws.cmd().args(["tree", "widgets/:widgets"]).assert().success();

    let calls = std::fs::read_to_string(ws.path("calls.log")).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(calls[..2], ["login", "show"]);
}

#[test]
fn get_rejects_parent_segments() {
    let ws = Workspace::new(None);
    let target = ws.path("out");
    ws.cmd()
        .args(["get", "widgets/:widgets/../.."])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("'..'"));
    assert!(!target.exists());
    assert!(!ws.path("calls.log").exists());
}

#[test]
fn get_copies_into_target() {
    let ws = Workspace::new(None);
    let target = ws.path("out");
    ws.cmd()
        .args(["get", "widgets/:widgets/src"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 1 file(s)"));
    assert_eq!(
        std::fs::read_to_string(target.join("main.c")).unwrap(),
        "int main;"
    );
}

#[test]
fn wrong_password_fails_with_login_error() {
    let ws = Workspace::new(None);
    let config = std::fs::read_to_string(ws.path("accurev-bridge.yaml"))
        .unwrap()
        .replace("password: secret", "password: nope");
    std::fs::write(ws.path("accurev-bridge.yaml"), config).unwrap();
    ws.cmd()
        .arg("streams")
        .assert()
        .failure()
        .stderr(predicate::str::contains("login failed for user 'build'"));
}

// ---------------------------------------------------------------------------
// issue tracking
// ---------------------------------------------------------------------------

#[test]
fn issues_table_marks_closed() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["issues", "--release", "2.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Crash on save"))
        .stdout(predicate::str::contains("Closed  yes"));

    let query = std::fs::read_to_string(ws.path("last-query.xml")).unwrap();
    assert!(query.starts_with(r#"<queryIssue issueDB="widgets">12 == "#));
}

#[test]
fn issues_json_includes_closed_flag() {
    let ws = Workspace::new(Some("component"));
    let output = ws
        .cmd()
        .args(["--json", "issues", "--release", "2.1", "--category", "UI"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let issues: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(issues[0]["id"], "17");
    assert_eq!(issues[0]["release"], "2.1");
    assert_eq!(issues[0]["closed"], false);
    assert_eq!(issues[1]["closed"], true);

    let query = std::fs::read_to_string(ws.path("last-query.xml")).unwrap();
    assert!(query.contains(r#"useAltQuery="false""#));
    assert!(query.contains("<AND>"));
}

#[test]
fn category_filter_requires_category_field() {
    let ws = Workspace::new(None);
    ws.cmd()
        .args(["issues", "--category", "UI"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no category field is configured"));
}

#[test]
fn categories_lists_choose_values() {
    let ws = Workspace::new(Some("component"));
    ws.cmd()
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("Component:\n  UI\n  Server"));

    let ws = Workspace::new(None);
    ws.cmd()
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("No category field configured"));
}
