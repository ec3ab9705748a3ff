use std::fs;
use std::path::Path;
use std::process::Command;
use std::process::Output;

use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn tplc(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tplc"))
        .arg("compile")
        .arg("--project")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn test_compile_writes_artifact() {
    let dir = project(&[("app/view/page.html", "Hi {{ name|safe }}")]);

    let output = tplc(dir.path(), &["page.html"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("page.html -> "));
    assert_eq!(
        fs::read_to_string(dir.path().join("cache/view/page.html.php")).unwrap(),
        "Hi <?php echo $this->vars->name; ?>"
    );
}

#[test]
fn test_quiet_prints_nothing() {
    let dir = project(&[("app/view/page.html", "plain")]);

    let output = tplc(dir.path(), &["-q", "page.html"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_compile_error_exits_with_code() {
    let dir = project(&[("app/view/page.html", "{% endif %}")]);

    let output = tplc(dir.path(), &["page.html"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error[C201]"), "{stderr}");
}

#[test]
fn test_missing_template_exits_with_code() {
    let dir = project(&[]);

    let output = tplc(dir.path(), &["nope.html"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error[C300]: template file nope.html could not be found anywhere"));
}

#[test]
fn test_compile_all() {
    let dir = project(&[
        ("app/view/a.html", "a"),
        ("app/view/shop/b.html", "b"),
    ]);

    let output = tplc(dir.path(), &["--all"]);
    assert!(output.status.success());
    assert!(dir.path().join("cache/view/a.html.php").exists());
    assert!(dir.path().join("cache/view/shop/b.html.php").exists());
}

#[test]
fn test_config_file_is_honored() {
    let dir = project(&[
        ("app/view/page.html", "{{ a }}"),
        ("tplc.toml", "escaping = false\ncache_dir = \"build\"\n"),
    ]);

    let output = tplc(dir.path(), &["page.html"]);
    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(dir.path().join("build/view/page.html.php")).unwrap(),
        "<?php echo $this->vars->a; ?>"
    );
}

#[test]
fn test_templates_or_all_required() {
    let dir = project(&[]);

    let output = tplc(dir.path(), &[]);
    assert!(!output.status.success());
}
