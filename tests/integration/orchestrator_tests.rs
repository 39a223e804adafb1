/*!
 * End-to-end translation runs through the controller with a mock provider
 */

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use srtran::app_config::{ProviderSettings, SettingsOverrides};
use srtran::app_controller::{run_folder, Controller, RunState, TranslationJob};
use srtran::errors::{AppError, ConfigError, TranslationError};
use srtran::file_utils::JobPaths;
use srtran::providers::mock::{MockProvider, TRANSLATED_MARKER};
use srtran::subtitle_processor::{count_blocks, SubtitleDocument};
use srtran::translation::TranslationService;
use crate::common;

fn mock_service(provider: &MockProvider) -> impl Fn(&ProviderSettings) -> Result<TranslationService<MockProvider>, AppError> + '_ {
    move |settings: &ProviderSettings| Ok(TranslationService::with_settings(provider.clone(), settings))
}

#[tokio::test]
async fn test_run_withWorkingProvider_shouldWriteTranslatedOutput() {
    common::init_logger();
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "sermon", &common::sample_srt(5), Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()).with_target_language("fr"));
    let report = controller.run(mock_service(&provider)).await.unwrap();

    assert_eq!(report.output_path, temp_dir.path().join("lang/fr/sermon_FR.srt"));
    assert_eq!(report.batches, 1);
    assert_eq!(report.source_blocks, 5);
    assert_eq!(report.translated_blocks, 5);

    let output = fs::read_to_string(&paths.output).unwrap();
    assert!(output.contains(&format!("{}Line number 3", TRANSLATED_MARKER)));
    assert!(output.ends_with('\n') && !output.ends_with("\n\n"));
    assert_eq!(SubtitleDocument::parse(&output).unwrap().len(), 5);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].system.contains("\"Lord\" \u{2192} \"Seigneur\""));
    assert!(requests[0].system.contains("Louis Segond"));
}

#[tokio::test]
async fn test_run_shouldWalkStatesInOrder() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(3), Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let job = TranslationJob::new(paths).with_overrides(SettingsOverrides {
        max_blocks_per_batch: Some(2),
        ..Default::default()
    });
    let mut controller = Controller::new(job);
    assert_eq!(controller.state(), RunState::Idle);

    controller.run(mock_service(&provider)).await.unwrap();

    assert_eq!(
        controller.history(),
        &[
            RunState::ReadingSource,
            RunState::Normalizing,
            RunState::Batching,
            RunState::Translating { batch: 1, total: 2 },
            RunState::Translating { batch: 2, total: 2 },
            RunState::Concatenating,
            RunState::Writing,
            RunState::Done,
        ]
    );
    assert!(controller.state().is_terminal());
}

/// 450 blocks go out as 200, 200 and 50 in document order
#[tokio::test]
async fn test_run_with450Blocks_shouldSendThreeBatchesInOrder() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "long", &common::sample_srt(450), Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let report = controller.run(mock_service(&provider)).await.unwrap();
    assert_eq!(report.batches, 3);

    let sizes: Vec<usize> = provider.requests().iter().map(|r| count_blocks(&r.user)).collect();
    assert_eq!(sizes, vec![200, 200, 50]);

    let output = fs::read_to_string(&paths.output).unwrap();
    let doc = SubtitleDocument::parse(&output).unwrap();
    let indexes: Vec<usize> = doc.iter().map(|b| b.index).collect();
    assert_eq!(indexes, (1..=450).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_run_withConcurrentRequests_shouldKeepBatchOrder() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "parallel", &common::sample_srt(95), Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let job = TranslationJob::new(paths.clone()).with_overrides(SettingsOverrides {
        max_blocks_per_batch: Some(10),
        concurrent_requests: Some(4),
        ..Default::default()
    });
    let mut controller = Controller::new(job);
    let report = controller.run(mock_service(&provider)).await.unwrap();
    assert_eq!(report.batches, 10);

    let doc = SubtitleDocument::parse(&fs::read_to_string(&paths.output).unwrap()).unwrap();
    let indexes: Vec<usize> = doc.iter().map(|b| b.index).collect();
    assert_eq!(indexes, (1..=95).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_run_withBrokenSpacingInSource_shouldNotRewriteSource() {
    let temp_dir = common::create_temp_dir().unwrap();
    let broken = "1\n00:00:01,000 --> 00:00:02,000\nOne\n2\n00:00:03,000 --> 00:00:04,000\nTwo\n";
    let paths = common::create_project(temp_dir.path(), "broken", broken, Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let report = controller.run(mock_service(&provider)).await.unwrap();

    assert_eq!(report.translated_blocks, 2);
    assert_eq!(fs::read_to_string(&paths.source).unwrap(), broken);
}

#[tokio::test]
async fn test_run_withMissingSource_shouldFailWithInputNotFound() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = JobPaths::resolve(temp_dir.path(), "absent", "en", "fr");
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths));
    let result = controller.run(mock_service(&provider)).await;

    assert!(matches!(result, Err(AppError::InputNotFound(_))));
    assert_eq!(controller.state(), RunState::Aborted);
    assert_eq!(provider.request_count(), 0);
}

/// An existing output is left byte-identical and nothing is sent
#[tokio::test]
async fn test_run_withExistingOutput_shouldFailWithOutputExists() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "done", &common::sample_srt(3), Some(common::FRENCH_CONFIG)).unwrap();
    let existing = "previous translation \u{00e9}\n\n\n";
    common::create_test_file(temp_dir.path(), "lang/fr/done_FR.srt", existing).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let result = controller.run(mock_service(&provider)).await;

    assert!(matches!(result, Err(AppError::OutputExists(p)) if p == paths.output));
    assert_eq!(fs::read(&paths.output).unwrap(), existing.as_bytes());
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_run_withExistingOutputAndNoConfig_shouldReportOutputFirst() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "done", &common::sample_srt(3), None).unwrap();
    common::create_test_file(temp_dir.path(), "lang/fr/done_FR.srt", "x").unwrap();

    let mut controller = Controller::new(TranslationJob::new(paths));
    let result = controller.run(mock_service(&MockProvider::working())).await;
    assert!(matches!(result, Err(AppError::OutputExists(_))));
}

#[tokio::test]
async fn test_run_withMissingConfig_shouldFailWithConfigMissing() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(3), None).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let result = controller.run(mock_service(&provider)).await;

    assert!(matches!(result, Err(AppError::Config(ConfigError::Missing(_)))));
    assert!(!paths.output.exists());
}

/// A missing required key fails before the client is even built
#[tokio::test]
async fn test_run_withMissingBibleKey_shouldFailBeforeAnyRequest() {
    let temp_dir = common::create_temp_dir().unwrap();
    let config = "language: French\ntranslation_mapping:\n  Lord: Seigneur\n";
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(3), Some(config)).unwrap();
    let provider = MockProvider::working();
    let connects = AtomicUsize::new(0);

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let result = controller
        .run(|settings: &ProviderSettings| {
            connects.fetch_add(1, Ordering::SeqCst);
            Ok(TranslationService::with_settings(provider.clone(), settings))
        })
        .await;

    assert!(matches!(
        result,
        Err(AppError::Config(ConfigError::KeyMissing(key))) if key == "bible_verse_translation"
    ));
    assert_eq!(connects.load(Ordering::SeqCst), 0);
    assert_eq!(provider.request_count(), 0);
    assert!(!paths.output.exists());
}

#[tokio::test]
async fn test_run_withoutCredential_shouldFailWithCredentialMissing() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(3), Some(common::FRENCH_CONFIG)).unwrap();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let result = controller
        .run(|settings: &ProviderSettings| TranslationService::anthropic(None, settings))
        .await;

    assert!(matches!(result, Err(AppError::CredentialMissing(_))));
    assert!(!paths.output.exists());
}

/// A batch that keeps failing aborts the run and nothing is written
#[tokio::test]
async fn test_run_withFailingBatch_shouldWriteNothing() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(30), Some(common::FAST_RETRY_CONFIG)).unwrap();
    let provider = MockProvider::failing();

    let job = TranslationJob::new(paths.clone())
        .with_preflight(false)
        .with_overrides(SettingsOverrides {
            max_blocks_per_batch: Some(10),
            ..Default::default()
        });
    let mut controller = Controller::new(job);
    let result = controller.run(mock_service(&provider)).await;

    assert!(matches!(
        result,
        Err(AppError::Translation(TranslationError::BatchFailed { batch: 1, total: 3, .. }))
    ));
    assert_eq!(provider.request_count(), 3);
    assert_eq!(controller.state(), RunState::Aborted);
    assert!(!paths.output.exists());
}

#[tokio::test]
async fn test_run_withTransientFailures_shouldRetryAndComplete() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(30), Some(common::FAST_RETRY_CONFIG)).unwrap();
    let provider = MockProvider::intermittent(2);

    let job = TranslationJob::new(paths.clone()).with_overrides(SettingsOverrides {
        max_blocks_per_batch: Some(10),
        ..Default::default()
    });
    let mut controller = Controller::new(job);
    let report = controller.run(mock_service(&provider)).await.unwrap();

    assert_eq!(report.translated_blocks, 30);
    assert!(provider.request_count() > 3);
    assert!(paths.output.exists());
}

#[tokio::test]
async fn test_run_withRejectedKey_shouldFailBeforeTranslating() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "talk", &common::sample_srt(3), Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::auth_failing();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let result = controller.run(mock_service(&provider)).await;

    assert!(matches!(result, Err(AppError::Translation(ref e)) if e.is_authentication()));
    assert_eq!(provider.request_count(), 0);
    assert!(!controller.history().iter().any(|s| matches!(s, RunState::Translating { .. })));
}

/// Blocks with backwards timings or no text are still translated and counted
#[tokio::test]
async fn test_run_withMalformedBlocks_shouldKeepEveryBlock() {
    let source = "1\n00:00:01,000 --> 00:00:02,000\nOne\n\n\
                  2\n00:00:05,000 --> 00:00:03,000\nTwo\n\n\
                  3\n00:00:06,000 --> 00:00:07,000\n\n\
                  4\n00:00:08,000 --> 00:00:09,000 X1:10 X2:20\nFour\n";
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "rough", source, Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let report = controller.run(mock_service(&provider)).await.unwrap();

    assert_eq!(report.source_blocks, 4);
    assert_eq!(report.translated_blocks, 4);

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user.contains("2\n00:00:05,000 --> 00:00:03,000\nTwo"));
    assert!(requests[0].user.contains("3\n00:00:06,000 --> 00:00:07,000\n"));
    assert!(requests[0].user.contains("00:00:08,000 --> 00:00:09,000 X1:10 X2:20"));

    let output = fs::read_to_string(&paths.output).unwrap();
    assert_eq!(count_blocks(&output), 4);
    assert!(output.contains(&format!("{}Two", TRANSLATED_MARKER)));
    assert!(output.contains(&format!("{}Four", TRANSLATED_MARKER)));
}

#[tokio::test]
async fn test_run_withInvalidSource_shouldFailWithSubtitleError() {
    let temp_dir = common::create_temp_dir().unwrap();
    let paths = common::create_project(temp_dir.path(), "junk", "this is not a subtitle file\n", Some(common::FRENCH_CONFIG)).unwrap();
    let provider = MockProvider::working();

    let mut controller = Controller::new(TranslationJob::new(paths.clone()));
    let result = controller.run(mock_service(&provider)).await;

    assert!(matches!(result, Err(AppError::Subtitle(_))));
    assert_eq!(provider.request_count(), 0);
    assert!(!paths.output.exists());
}

#[tokio::test]
async fn test_run_folder_shouldTranslateSkipAndCount() {
    let temp_dir = common::create_temp_dir().unwrap();
    let root = temp_dir.path();
    common::create_test_file(root, "lang/en/a.srt", &common::sample_srt(2)).unwrap();
    common::create_test_file(root, "lang/en/b.srt", &common::sample_srt(2)).unwrap();
    common::create_test_file(root, "lang/en/c.srt", "not subtitles\n").unwrap();
    common::create_test_file(root, "lang/fr/config.yaml", common::FRENCH_CONFIG).unwrap();
    common::create_test_file(root, "lang/fr/b_FR.srt", "already here\n").unwrap();

    let jobs: Vec<TranslationJob> = JobPaths::discover(root.join("lang/en"), root.join("lang/fr"), "fr")
        .unwrap()
        .into_iter()
        .map(TranslationJob::new)
        .collect();
    assert_eq!(jobs.len(), 3);

    let provider = MockProvider::working();
    let summary = run_folder(jobs, mock_service(&provider)).await.unwrap();

    assert_eq!(summary.translated, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_success());
    assert!(root.join("lang/fr/a_FR.srt").exists());
    assert_eq!(fs::read_to_string(root.join("lang/fr/b_FR.srt")).unwrap(), "already here\n");
}

#[tokio::test]
async fn test_run_folder_withoutCredential_shouldStopAtFirstFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    let root = temp_dir.path();
    common::create_test_file(root, "lang/en/a.srt", &common::sample_srt(2)).unwrap();
    common::create_test_file(root, "lang/en/b.srt", &common::sample_srt(2)).unwrap();
    common::create_test_file(root, "lang/fr/config.yaml", common::FRENCH_CONFIG).unwrap();

    let jobs: Vec<TranslationJob> = JobPaths::discover(root.join("lang/en"), root.join("lang/fr"), "fr")
        .unwrap()
        .into_iter()
        .map(TranslationJob::new)
        .collect();

    let result = run_folder(jobs, |settings: &ProviderSettings| TranslationService::anthropic(None, settings)).await;
    assert!(matches!(result, Err(AppError::CredentialMissing(_))));
}
