mod common;

use archscope_core::headless::{AnalyzerHome, HeadlessError, HeadlessOptions, HeadlessRunner};
use archscope_core::project::ProjectStore;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn home_without_launcher_is_rejected() {
    let home = tempdir().unwrap();
    assert!(matches!(
        AnalyzerHome::at(home.path()),
        Err(HeadlessError::LauncherMissing(_))
    ));
    assert!(matches!(
        AnalyzerHome::at(&home.path().join("missing")),
        Err(HeadlessError::BadHome(_))
    ));
}

#[test]
fn explicit_home_is_used() {
    let home = tempdir().unwrap();
    let support = home.path().join("support");
    fs::create_dir(&support).unwrap();
    fs::write(support.join("analyzeHeadless"), "").unwrap();

    let resolved = AnalyzerHome::resolve(Some(home.path())).unwrap();
    assert_eq!(
        resolved.launcher,
        home.path()
            .canonicalize()
            .unwrap()
            .join("support")
            .join("analyzeHeadless")
    );
}

#[cfg(unix)]
fn fake_launcher(home: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let support = home.join("support");
    fs::create_dir(&support).unwrap();
    let launcher = support.join("analyzeHeadless");
    fs::write(
        &launcher,
        r#"#!/bin/sh
echo "args: $*"
echo "$*" >> "$(dirname "$0")/calls.log"
echo "analysis warning" >&2
if [ "$3" = "-import" ]; then
    name=$(basename "$4")
    mkdir -p "$1/$2.rep/idata"
    printf '<STATE NAME="NAME" TYPE="string" VALUE="%s" />\n' "$name" > "$1/$2.rep/idata/$name.prp"
fi
"#,
    )
    .unwrap();
    fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
fn launcher_calls(home: &Path) -> Vec<String> {
    fs::read_to_string(home.join("support").join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[cfg(unix)]
#[test]
fn run_script_imports_then_runs_post_script() {
    let home = tempdir().unwrap();
    fake_launcher(home.path());

    let root = tempdir().unwrap();
    let store = ProjectStore::open(root.path()).unwrap();

    let work = tempdir().unwrap();
    let binary = common::write(work.path(), "sample", &common::elf(true, false, 62));
    let script = common::write(work.path(), "PrintArch.java", b"");

    let runner = HeadlessRunner::new(
        AnalyzerHome::at(home.path()).unwrap(),
        HeadlessOptions {
            timeout_secs: Some(60),
        },
    );
    let output = runner
        .run_script(&store, "defproj", &binary, &script, &["extra".to_string()])
        .unwrap();

    assert!(output.status.success());
    assert!(store.project_exists("defproj").unwrap());
    assert_eq!(store.list_files("defproj").unwrap(), vec!["sample"]);
    assert!(output.stdout.contains("-noanalysis -process sample"));
    assert!(output
        .stdout
        .contains("-analysisTimeoutPerFile 60 -postScript PrintArch.java extra"));
    assert_eq!(output.stderr, "analysis warning\n");

    let calls = launcher_calls(home.path());
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("-import"));
    assert!(calls[1].contains("-postScript"));

    // Already imported: a second import is refused.
    assert!(matches!(
        runner.analyze_file(&store, "defproj", &binary),
        Err(HeadlessError::Project(_))
    ));
}

#[cfg(unix)]
#[test]
fn store_import_does_not_count_as_analyzed() {
    let home = tempdir().unwrap();
    fake_launcher(home.path());

    let root = tempdir().unwrap();
    let store = ProjectStore::open(root.path()).unwrap();
    store.create_project("defproj").unwrap();

    let work = tempdir().unwrap();
    let binary = common::write(work.path(), "sample", &common::elf(true, false, 62));
    let script = common::write(work.path(), "PrintArch.java", b"");

    store.import("defproj", &binary).unwrap();
    assert!(!store.contains_analyzed_file("defproj", "sample").unwrap());

    let runner = HeadlessRunner::new(
        AnalyzerHome::at(home.path()).unwrap(),
        HeadlessOptions::default(),
    );
    let output = runner
        .run_script(&store, "defproj", &binary, &script, &[])
        .unwrap();
    assert!(output.status.success());

    let calls = launcher_calls(home.path());
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains("-import"));
    assert!(calls[1].contains("-process sample"));

    assert!(store.contains_analyzed_file("defproj", "sample").unwrap());
    assert_eq!(store.list_files("defproj").unwrap(), vec!["sample"]);
    // The store's own entry still carries the language.
    assert!(store.load("defproj", "sample").unwrap().is_loaded());
}

#[cfg(unix)]
#[test]
fn analyze_file_only_imports() {
    let home = tempdir().unwrap();
    fake_launcher(home.path());

    let root = tempdir().unwrap();
    let store = ProjectStore::open(root.path()).unwrap();
    store.create_project("defproj").unwrap();

    let work = tempdir().unwrap();
    let binary = common::write(work.path(), "sample", &common::elf(true, false, 62));

    let runner = HeadlessRunner::new(
        AnalyzerHome::at(home.path()).unwrap(),
        HeadlessOptions::default(),
    );
    runner.analyze_file(&store, "defproj", &binary).unwrap();

    let calls = launcher_calls(home.path());
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("defproj -import"));
    assert!(!calls[0].contains("-analysisTimeoutPerFile"));
    assert!(store.contains_analyzed_file("defproj", "sample").unwrap());
}

#[test]
fn missing_script_is_reported() {
    let home = tempdir().unwrap();
    let support = home.path().join("support");
    fs::create_dir(&support).unwrap();
    fs::write(support.join("analyzeHeadless"), "").unwrap();

    let root = tempdir().unwrap();
    let store = ProjectStore::open(root.path()).unwrap();
    let runner = HeadlessRunner::new(
        AnalyzerHome::at(home.path()).unwrap(),
        HeadlessOptions::default(),
    );

    let err = runner
        .run_script(
            &store,
            "defproj",
            Path::new("/bin/true"),
            &root.path().join("NoSuchScript.java"),
            &[],
        )
        .unwrap_err();
    assert!(matches!(err, HeadlessError::ScriptNotFound(_)));
    assert!(!store.project_exists("defproj").unwrap());
}
