use indoc::indoc;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CSPROJ: &str = indoc! {r#"
    <Project Sdk="Microsoft.NET.Sdk">
      <PropertyGroup>
        <RootNamespace>Company.App</RootNamespace>
      </PropertyGroup>
    </Project>
"#};

const STRINGS: &str = indoc! {r#"
    <?xml version="1.0" encoding="utf-8"?>
    <root>
      <data name="Existing" xml:space="preserve">
        <value>Already here</value>
      </data>
    </root>
"#};

const WINDOW: &str = indoc! {r#"
    <Window x:Class="Company.App.MainWindow"
            xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation"
            xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml">
        <TextBlock Text="Welcome back" />
    </Window>
"#};

const FORM: &str = indoc! {r#"
    class Form
    {
        string title = "Order details";
    }
"#};

fn resxtract_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("resxtract"))
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("Properties")).unwrap();
    fs::create_dir_all(root.join("Views")).unwrap();
    fs::write(root.join("App.csproj"), CSPROJ).unwrap();
    fs::write(root.join("Properties/Strings.resx"), STRINGS).unwrap();
    fs::write(root.join("Properties/Strings.de.resx"), STRINGS).unwrap();
    fs::write(root.join("Views/MainWindow.xaml"), WINDOW).unwrap();
    fs::write(root.join("Form.cs"), FORM).unwrap();
    fs::write(root.join("notes.txt"), "Order details").unwrap();
    dir
}

fn run(root: &Path, args: &[&str]) -> Output {
    resxtract_cmd()
        .arg("--project")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_groups_json() {
    let dir = fixture();
    let output = run(dir.path(), &["groups", "--json"]);
    assert_success(&output);

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let groups = v.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["accessor"], "Strings");
    let cultures: Vec<&str> = groups[0]["stores"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["culture"].as_str().unwrap())
        .collect();
    assert_eq!(cultures, ["de", "neutral"]);
}

#[test]
fn test_externalize_csharp_literal() {
    let dir = fixture();
    let root = dir.path();
    let output = run(
        root,
        &[
            "externalize",
            root.join("Form.cs").to_str().unwrap(),
            "--find",
            "Order details",
            "--key",
            "OrderTitle",
            "--text",
            "de=Bestelldetails",
        ],
    );
    assert_success(&output);

    let form = fs::read_to_string(root.join("Form.cs")).unwrap();
    assert!(
        form.contains("string title = Company.App.Properties.Strings.OrderTitle;"),
        "{form}"
    );

    let neutral = fs::read_to_string(root.join("Properties/Strings.resx")).unwrap();
    assert!(neutral.contains("<data name=\"OrderTitle\" xml:space=\"preserve\">"));
    assert!(neutral.contains("<value>Order details</value>"));
    assert!(neutral.contains("<comment>Used in Form.cs document</comment>"));

    let german = fs::read_to_string(root.join("Properties/Strings.de.resx")).unwrap();
    assert!(german.contains("<value>Bestelldetails</value>"));
    assert!(!german.contains("<comment>"));
}

#[test]
fn test_externalize_xaml_with_suggested_key() {
    let dir = fixture();
    let root = dir.path();
    let start = WINDOW.find("Welcome back").unwrap();
    let span = format!("{}..{}", start, start + "Welcome back".len());
    let output = run(
        root,
        &[
            "externalize",
            root.join("Views/MainWindow.xaml").to_str().unwrap(),
            "--span",
            &span,
            "--json",
        ],
    );
    assert_success(&output);

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["status"], "success");

    let window = fs::read_to_string(root.join("Views/MainWindow.xaml")).unwrap();
    assert!(window.contains(
        "xmlns:x=\"http://schemas.microsoft.com/winfx/2006/xaml\" xmlns:strings=\"clr-namespace:Company.App.Properties\">"
    ));
    assert!(window.contains("<TextBlock Text=\"{x:Static strings:Strings.Welcome_back}\" />"));

    let neutral = fs::read_to_string(root.join("Properties/Strings.resx")).unwrap();
    assert!(neutral.contains("<comment>Used in Views/MainWindow.xaml document</comment>"));
}

#[test]
fn test_unsupported_file_kind() {
    let dir = fixture();
    let root = dir.path();
    let output = run(
        root,
        &[
            "externalize",
            root.join("notes.txt").to_str().unwrap(),
            "--find",
            "Order",
            "--key",
            "Order",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(".txt files are not supported"), "{stderr}");
    assert_eq!(
        fs::read_to_string(root.join("Properties/Strings.resx")).unwrap(),
        STRINGS
    );
}

#[test]
fn test_duplicate_key_leaves_files_alone() {
    let dir = fixture();
    let root = dir.path();
    let output = run(
        root,
        &[
            "externalize",
            root.join("Form.cs").to_str().unwrap(),
            "--find",
            "Order details",
            "--key",
            "Existing",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("key `Existing` already exists"), "{stderr}");
    assert_eq!(fs::read_to_string(root.join("Form.cs")).unwrap(), FORM);
    assert_eq!(
        fs::read_to_string(root.join("Properties/Strings.de.resx")).unwrap(),
        STRINGS
    );
}

#[test]
fn test_selection_outside_literal_fails() {
    let dir = fixture();
    let root = dir.path();
    let output = run(
        root,
        &[
            "externalize",
            root.join("Form.cs").to_str().unwrap(),
            "--find",
            "title",
            "--key",
            "Title",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a string literal"), "{stderr}");
    assert_eq!(
        fs::read_to_string(root.join("Properties/Strings.resx")).unwrap(),
        STRINGS
    );
}

#[test]
fn test_regeneration_failure_is_a_warning() {
    let dir = fixture();
    let root = dir.path();
    fs::write(
        root.join("resxtract.toml"),
        "regenerate = [\"resxtract-missing-generator\", \"{file}\"]\n",
    )
    .unwrap();
    let output = run(
        root,
        &[
            "externalize",
            root.join("Form.cs").to_str().unwrap(),
            "--find",
            "Order details",
            "--key",
            "OrderTitle",
        ],
    );
    assert_success(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Warning: accessor regeneration failed"), "{stderr}");
}

#[test]
fn test_namespace_and_keys() {
    let dir = fixture();
    let root = dir.path();

    let output = run(root, &["namespace", root.join("Views/MainWindow.xaml").to_str().unwrap()]);
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Company.App.Views");

    let output = run(root, &["suggest-key", "Save changes?"]);
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Save_changes");

    let output = run(root, &["check-key", "Existing"]);
    assert!(!output.status.success());

    let output = run(root, &["check-key", "1st"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid key"));

    let output = run(root, &["check-key", "Fresh"]);
    assert_success(&output);
}
