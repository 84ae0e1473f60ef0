use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn replay_prints_mutated_markup() {
    let dir = TempDir::new().unwrap();
    let document = write(&dir, "doc.html", "<div id=a><span>x</span></div>");
    let mutations = write(
        &dir,
        "mutations.json",
        r#"[{
            "kind": "childListChange",
            "target": { "kind": "element", "name": "div", "tagName": "div", "attributes": { "id": "a" }, "path": "/html/body/div" },
            "addedNodes": [{ "kind": "element", "name": "span", "tagName": "span", "attributes": {}, "path": "/html/body/div/span[2]", "innerMarkup": "y" }],
            "previousSibling": { "kind": "element", "name": "span", "tagName": "span", "attributes": {}, "path": "/html/body/div/span" }
        }]"#,
    );

    let output = Command::cargo_bin("dommirror")
        .unwrap()
        .args(["replay", "--document"])
        .arg(&document)
        .arg("--mutations")
        .arg(&mutations)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("<div id=\"a\"><span>x</span><span>y</span></div>"));
}

#[test]
fn replay_stops_at_malformed_record_unless_keep_going() {
    let dir = TempDir::new().unwrap();
    let document = write(&dir, "doc.html", "<p>a</p>");
    let mutations = write(
        &dir,
        "mutations.json",
        r#"[
            { "kind": "attributeChange", "target": { "kind": "element", "path": "/html/body/p", "attributes": {} } },
            { "kind": "textChange", "target": { "kind": "text", "path": "/html/body/p/text()", "value": "b" } }
        ]"#,
    );

    Command::cargo_bin("dommirror")
        .unwrap()
        .args(["replay", "-d"])
        .arg(&document)
        .arg("-m")
        .arg(&mutations)
        .assert()
        .failure();

    let output = Command::cargo_bin("dommirror")
        .unwrap()
        .args(["replay", "--keep-going", "-d"])
        .arg(&document)
        .arg("-m")
        .arg(&mutations)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("<p>b</p>"));
}

#[test]
fn path_lookup_prints_node_or_fails() {
    let dir = TempDir::new().unwrap();
    let document = write(&dir, "doc.html", "<ul><li>1</li><li>2</li></ul>");

    let output = Command::cargo_bin("dommirror")
        .unwrap()
        .args(["path", "--path", "/html/body/ul/li[2]", "--document"])
        .arg(&document)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "<li>2</li>");

    Command::cargo_bin("dommirror")
        .unwrap()
        .args(["path", "--path", "/html/body/ol", "--document"])
        .arg(&document)
        .assert()
        .failure();
}

#[test]
fn replay_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let document = write(&dir, "doc.html", "<div><em>x</em></div>");
    let mutations = write(
        &dir,
        "mutations.json",
        r#"[{
            "kind": "childListChange",
            "target": { "kind": "element", "path": "/html/body/div" },
            "addedNodes": [{ "kind": "element", "tagName": "em", "path": "/html/body/div/em", "innerMarkup": "x" }]
        }]"#,
    );
    let config = write(&dir, "mirror.toml", "[replay]\nreconcile_duplicates = false\n");

    let run = |extra: &[&std::path::Path]| {
        let mut cmd = Command::cargo_bin("dommirror").unwrap();
        cmd.args(["replay", "-d"]).arg(&document).arg("-m").arg(&mutations);
        for path in extra {
            cmd.arg("--config").arg(path);
        }
        let output = cmd.output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };

    assert!(run(&[]).contains("<div><em>x</em></div>"));
    assert!(run(&[config.as_path()]).contains("<div><em>x</em><em>x</em></div>"));

    let broken = write(&dir, "broken.toml", "[replay]\nreconcile = false\n");
    Command::cargo_bin("dommirror")
        .unwrap()
        .args(["replay", "-d"])
        .arg(&document)
        .arg("-m")
        .arg(&mutations)
        .arg("--config")
        .arg(&broken)
        .assert()
        .failure();
}
