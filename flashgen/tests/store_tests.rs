//! Session store persistence tests
//!
//! The store's whole purpose is surviving a process restart: these tests
//! close the database pool and reopen the same file to simulate one.

use flashgen::SessionStore;
use flashgen_common::models::{
    ExportFormat, FlashcardFile, GenerationRequest, Language, Mode, TaskId, WorkflowStep,
};

#[tokio::test]
async fn step_and_request_survive_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");

    let request = GenerationRequest {
        lang: Some(Language::English),
        mode: Some(Mode::MultipleChoice),
        export_format: Some(ExportFormat::Csv),
        input_text: "lecture notes".to_string(),
    };

    {
        let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
        let store = SessionStore::new(pool.clone());
        store.set_step(WorkflowStep::Configure).await.unwrap();
        store.set_request(&request).await.unwrap();
        pool.close().await;
    }

    // Fresh pool over the same file: the "reloaded" session
    let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
    let store = SessionStore::new(pool);

    assert_eq!(
        store.get_step().await.unwrap(),
        Some(WorkflowStep::Configure)
    );
    assert_eq!(store.get_request().await.unwrap(), Some(request));
}

#[tokio::test]
async fn last_write_wins_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");

    {
        let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
        let store = SessionStore::new(pool.clone());
        store.set_step(WorkflowStep::UploadText).await.unwrap();
        store.set_step(WorkflowStep::Configure).await.unwrap();
        store.set_step(WorkflowStep::UploadText).await.unwrap();
        pool.close().await;
    }

    let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
    let store = SessionStore::new(pool);
    assert_eq!(
        store.get_step().await.unwrap(),
        Some(WorkflowStep::UploadText)
    );
}

#[tokio::test]
async fn cached_download_survives_a_reload() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");
    let task = TaskId::new("task-9");
    let file = FlashcardFile {
        filename: "flashcards.apkg".to_string(),
        bytes: vec![0u8, 159, 146, 150],
    };

    {
        let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
        let store = SessionStore::new(pool.clone());
        store
            .put_cached_file(ExportFormat::Apkg, &task, &file)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
    let store = SessionStore::new(pool);
    assert_eq!(
        store
            .get_cached_file(ExportFormat::Apkg, &task)
            .await
            .unwrap(),
        Some(file)
    );
}

#[tokio::test]
async fn empty_database_restores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");

    let pool = flashgen::db::init_database_pool(&db_path).await.unwrap();
    let store = SessionStore::new(pool);

    assert_eq!(store.get_step().await.unwrap(), None);
    assert_eq!(store.get_request().await.unwrap(), None);
}
