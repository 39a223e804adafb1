/*!
 * Tests for file utilities and the project layout
 */

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use srtran::file_utils::{is_translated_output, output_file_name, with_srt_extension, FileManager, JobPaths};
use crate::common;

#[test]
fn test_output_file_name_shouldAppendUppercaseTarget() {
    assert_eq!(output_file_name("lang/en/sermon.srt", "fr"), "sermon_FR.srt");
    assert_eq!(output_file_name("talk.v2.srt", "pt-br"), "talk.v2_PT-BR.srt");
}

#[test]
fn test_is_translated_output_shouldMatchSuffix() {
    assert!(is_translated_output("sermon_FR.srt", "fr"));
    assert!(!is_translated_output("sermon.srt", "fr"));
    assert!(!is_translated_output("sermon_ES.srt", "fr"));
}

#[test]
fn test_with_srt_extension_shouldAddOnlyWhenMissing() {
    assert_eq!(with_srt_extension("sermon"), "sermon.srt");
    assert_eq!(with_srt_extension("sermon.srt"), "sermon.srt");
    assert_eq!(with_srt_extension("SERMON.SRT"), "SERMON.SRT");
}

#[test]
fn test_job_paths_resolve_shouldFollowLangLayout() {
    let paths = JobPaths::resolve("/project", "sermon", "en", "fr");
    assert_eq!(paths.source, PathBuf::from("/project/lang/en/sermon.srt"));
    assert_eq!(paths.output, PathBuf::from("/project/lang/fr/sermon_FR.srt"));
    assert_eq!(paths.config, PathBuf::from("/project/lang/fr/config.yaml"));
}

#[test]
fn test_job_paths_overrides_shouldReplacePaths() {
    let paths = JobPaths::for_source(PathBuf::from("in/talk.srt"), Path::new("out"), "de")
        .with_config(PathBuf::from("custom.yaml"))
        .with_output(PathBuf::from("result.srt"));
    assert_eq!(paths.source, PathBuf::from("in/talk.srt"));
    assert_eq!(paths.config, PathBuf::from("custom.yaml"));
    assert_eq!(paths.output, PathBuf::from("result.srt"));
}

#[test]
fn test_job_paths_discover_shouldSkipExistingOutputs() {
    let temp_dir = common::create_temp_dir().unwrap();
    let root = temp_dir.path();
    common::create_test_file(root, "src/b.srt", "x").unwrap();
    common::create_test_file(root, "src/a.srt", "x").unwrap();
    common::create_test_file(root, "src/a_FR.srt", "x").unwrap();
    common::create_test_file(root, "src/notes.txt", "x").unwrap();

    let jobs = JobPaths::discover(root.join("src"), root.join("out"), "fr").unwrap();
    let names: Vec<String> = jobs
        .iter()
        .map(|j| j.source.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.srt", "b.srt"]);
    assert_eq!(jobs[0].output, root.join("out").join("a_FR.srt"));
}

#[test]
fn test_write_new_shouldCreateParentsAndRefuseExisting() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("lang/fr/out.srt");

    FileManager::write_new(&path, "first").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "first");

    let error = FileManager::write_new(&path, "second").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyExists);
    assert_eq!(fs::read_to_string(&path).unwrap(), "first");
}

#[test]
fn test_file_and_dir_exists_shouldDistinguish() {
    let temp_dir = common::create_temp_dir().unwrap();
    let file = common::create_test_file(temp_dir.path(), "a.srt", "x").unwrap();

    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::dir_exists(&file));
    assert!(FileManager::dir_exists(temp_dir.path()));
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.srt")));
}
