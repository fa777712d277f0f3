use indoc::indoc;
use resxtract::{
    Error, ExternalizeRequest, Externalizer, ExternalizerSettings, MemoryHost, NoRegeneration,
    PathCase, ProjectInfo, ProjectModel, ResourceStore, Span, discover_groups, neutral_comment,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NEUTRAL: &str = indoc! {r#"
    <?xml version="1.0" encoding="utf-8"?>
    <root>
      <resheader name="resmimetype">
        <value>text/microsoft-resx</value>
      </resheader>
      <data name="Existing" xml:space="preserve">
        <value>Already here</value>
      </data>
    </root>
"#};

const EMPTY: &str = "<root>\r\n</root>\r\n";

struct DirProject {
    info: ProjectInfo,
}

impl ProjectModel for DirProject {
    fn info(&self) -> ProjectInfo {
        self.info.clone()
    }

    fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>, Error> {
        let mut found = Vec::new();
        let mut pending = vec![self.info.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries: Vec<_> = fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
            entries.sort_by_key(|e| e.path());
            for entry in entries {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                    found.push(path);
                }
            }
        }
        Ok(found)
    }
}

fn project() -> (TempDir, DirProject) {
    let dir = tempfile::tempdir().unwrap();
    let properties = dir.path().join("Properties");
    let errors = dir.path().join("Resources").join("Errors");
    fs::create_dir_all(&properties).unwrap();
    fs::create_dir_all(&errors).unwrap();

    fs::write(properties.join("Strings.resx"), NEUTRAL).unwrap();
    let mut bom = vec![0xEF, 0xBB, 0xBF];
    bom.extend_from_slice(EMPTY.as_bytes());
    fs::write(properties.join("Strings.ru.resx"), bom).unwrap();
    fs::write(properties.join("Strings.Designer.resx"), EMPTY).unwrap();
    fs::write(errors.join("Messages.de.resx"), EMPTY).unwrap();

    let info = ProjectInfo::new(dir.path(), "Company.App.Core");
    (dir, DirProject { info })
}

fn settings() -> ExternalizerSettings {
    ExternalizerSettings {
        path_case: PathCase::Sensitive,
        ..ExternalizerSettings::default()
    }
}

#[test]
fn test_discovery_groups_by_folder() {
    let (dir, model) = project();
    let groups = discover_groups(&model).unwrap();
    assert_eq!(groups.len(), 2);

    let properties = groups
        .iter()
        .find(|g| g.folder() == dir.path().join("Properties"))
        .unwrap();
    assert_eq!(properties.stores().len(), 2);
    assert_eq!(properties.accessor_name().as_deref(), Some("Strings"));

    let errors = groups
        .iter()
        .find(|g| g.folder().ends_with("Errors"))
        .unwrap();
    assert!(errors.neutral().is_none());
    assert_eq!(errors.accessor_name().as_deref(), Some("Messages"));
    let resolver = Externalizer::new(settings()).resolver();
    assert_eq!(
        errors.resolve_namespace(&resolver).unwrap(),
        "Company.App.Resources.Errors"
    );
}

#[test]
fn test_externalize_into_every_store() {
    let (dir, model) = project();
    let groups = discover_groups(&model).unwrap();
    let group = groups
        .iter()
        .find(|g| g.folder().ends_with("Properties"))
        .unwrap();

    let document = dir.path().join("Views").join("MainForm.cs");
    let text = indoc! {r#"
        namespace Company.App.Views;

        class MainForm
        {
            void Init() => title.Text = @"Main window";
        }
    "#};
    let start = text.find("Main window").unwrap();
    let host = MemoryHost::new(&document, text, Span::new(start, start + 11)).with_interference(2);

    let request = ExternalizeRequest::new(&document, group, "MainTitle")
        .with_translation("ru", "Главное окно")
        .with_comment(Some(neutral_comment(&document, dir.path())));
    let outcome = Externalizer::new(settings()).externalize(&host, &NoRegeneration, &request);
    assert!(outcome.is_success(), "{}", outcome.message());

    assert!(host.text().ends_with(indoc! {r#"
        void Init() => title.Text = Company.App.Properties.Strings.MainTitle;
        }
    "#}));

    let neutral_path = dir.path().join("Properties").join("Strings.resx");
    let neutral = fs::read_to_string(&neutral_path).unwrap();
    assert!(neutral.starts_with(&NEUTRAL[..NEUTRAL.len() - "</root>\n".len()]));
    assert!(neutral.ends_with(indoc! {r#"
          <data name="MainTitle" xml:space="preserve">
            <value>Main window</value>
            <comment>Used in Views/MainForm.cs document</comment>
          </data>
        </root>
    "#}));

    let ru_path = dir.path().join("Properties").join("Strings.ru.resx");
    let ru_bytes = fs::read(&ru_path).unwrap();
    assert_eq!(&ru_bytes[..3], &[0xEF, 0xBB, 0xBF]);
    let ru = ResourceStore::open(&ru_path).unwrap().entries().unwrap();
    assert_eq!(ru.len(), 1);
    assert_eq!(ru[0].value, "Главное окно");
    assert_eq!(ru[0].comment, None);
    assert!(String::from_utf8(ru_bytes[3..].to_vec()).unwrap().contains("\r\n  <data"));

    let designer = fs::read_to_string(dir.path().join("Properties").join("Strings.Designer.resx")).unwrap();
    assert_eq!(designer, EMPTY);
}

#[test]
fn test_document_outside_project_still_uses_store_location() {
    let (dir, model) = project();
    let groups = discover_groups(&model).unwrap();
    let group = &groups[0];

    let document = Path::new("/elsewhere/Form.cs");
    let host = MemoryHost::new(document, "x(\"hi\");", Span::new(3, 5));
    let done = Externalizer::new(settings())
        .try_externalize(&host, &NoRegeneration, &ExternalizeRequest::new(document, group, "Hi"))
        .unwrap();
    assert!(done.namespace.starts_with("Company.App"));
    assert!(dir.path().exists());
}

#[test]
fn test_edit_conflict_is_reported() {
    let (dir, model) = project();
    let groups = discover_groups(&model).unwrap();
    let group = &groups[0];

    let document = dir.path().join("Form.cs");
    let host = MemoryHost::new(&document, "x(\"hi\");", Span::new(3, 5)).with_interference(50);
    let outcome = Externalizer::new(settings()).externalize(
        &host,
        &NoRegeneration,
        &ExternalizeRequest::new(&document, group, "Hi"),
    );
    assert!(!outcome.is_success());
    assert!(outcome.message().contains("gave up after 5 attempt(s)"), "{}", outcome.message());
    assert!(host.text().ends_with("x(\"hi\");"));
}
