//! End-to-end indexing and retrieval scenarios

use std::sync::Arc;

use campus_kb::crawler::{ContentStore, Document};
use campus_kb::index::{IndexConfig, IndexError, IndexStatus, Indexer};
use campus_kb::model::HashingEmbeddingModel;
use campus_kb::pdf::{PdfConfig, PdfPipeline};
use campus_kb::search::SearchSystem;
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use tempfile::{TempDir, tempdir};

fn indexer(temp_dir: &TempDir) -> Indexer<HashingEmbeddingModel> {
    let config = IndexConfig::builder()
        .index_dir(temp_dir.path().join("index"))
        .index_name("campus_index")
        .build();
    Indexer::new(
        HashingEmbeddingModel::default(),
        config,
        ContentStore::new(temp_dir.path().join("content")),
    )
}

#[tokio::test]
async fn test_stats_before_any_index() {
    let temp_dir = tempdir().unwrap();
    assert_eq!(indexer(&temp_dir).stats().await.unwrap(), IndexStatus::NotFound);
}

#[tokio::test]
async fn test_two_short_documents_then_search() {
    let temp_dir = tempdir().unwrap();
    let store = ContentStore::new(temp_dir.path().join("content"));
    store
        .write_text("a", "Tuition fees are due before the semester starts.")
        .await
        .unwrap();
    store
        .write_text("b", "The campus shuttle runs every fifteen minutes.")
        .await
        .unwrap();

    let indexer = Arc::new(indexer(&temp_dir));
    let snapshot = indexer.build_or_load(false).await.unwrap();
    assert_eq!(snapshot.len(), 2);

    let search = SearchSystem::new(indexer.clone());
    let results = search.retrieve("query", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].0.is_empty());
    assert!(results[0].1 == "a.txt" || results[0].1 == "b.txt");

    let IndexStatus::Ready(stats) = indexer.stats().await.unwrap() else {
        panic!("index should exist after a build");
    };
    assert_eq!(stats.total_vectors, 2);
    assert_eq!(stats.index_name, "campus_index");
    assert!(stats.storage_location.ends_with("index"));
}

#[tokio::test]
async fn test_index_survives_restart_and_grows_with_add() {
    let temp_dir = tempdir().unwrap();
    let store = ContentStore::new(temp_dir.path().join("content"));
    store
        .write_text("library", "Library hours change during exam weeks.")
        .await
        .unwrap();

    let first = indexer(&temp_dir);
    first.build_or_load(false).await.unwrap();
    first
        .add(vec![Document {
            source: "notice.txt".to_string(),
            text: "The library is closed on public holidays.".to_string(),
        }])
        .await
        .unwrap();
    drop(first);

    let second = indexer(&temp_dir);
    let IndexStatus::Ready(stats) = second.stats().await.unwrap() else {
        panic!("index should be loaded from disk");
    };
    assert_eq!(stats.total_vectors, 2);

    let hits = second.search("public holidays", 1).await.unwrap();
    assert_eq!(hits[0].source, "notice.txt");
}

#[tokio::test]
async fn test_empty_content_area() {
    let temp_dir = tempdir().unwrap();
    assert!(matches!(
        indexer(&temp_dir).build_or_load(true).await,
        Err(IndexError::NoDocuments(_))
    ));
}

#[tokio::test]
async fn test_half_written_index_is_rebuilt() {
    let temp_dir = tempdir().unwrap();
    let store = ContentStore::new(temp_dir.path().join("content"));
    store
        .write_text("housing", "Housing applications open in March.")
        .await
        .unwrap();

    let first = indexer(&temp_dir);
    first.build_or_load(false).await.unwrap();
    let index_path = first.storage().index_path();
    drop(first);

    let bytes = std::fs::read(&index_path).unwrap();
    std::fs::write(&index_path, &bytes[..bytes.len() / 2]).unwrap();

    let second = indexer(&temp_dir);
    assert_eq!(second.stats().await.unwrap(), IndexStatus::NotFound);

    let third = indexer(&temp_dir);
    let snapshot = third.build_or_load(false).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(third.search("housing", 1).await.unwrap().len(), 1);
}

fn one_page_pdf(text: &str) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[tokio::test]
async fn test_local_pdfs_are_extracted_once_and_indexed() {
    let temp_dir = tempdir().unwrap();
    let pdf_dir = temp_dir.path().join("content/pdfs");
    std::fs::create_dir_all(&pdf_dir).unwrap();
    std::fs::write(pdf_dir.join("handbook.pdf"), one_page_pdf("Student handbook")).unwrap();
    std::fs::write(pdf_dir.join("calendar.pdf"), one_page_pdf("Academic calendar")).unwrap();

    let pipeline = PdfPipeline::new(PdfConfig::builder().output_dir(&pdf_dir).build()).unwrap();
    let first = pipeline.process_local_dir().await.unwrap();
    assert_eq!(first.total, 2);
    assert_eq!(first.extracted, 2);

    let artifact = std::fs::read_to_string(pdf_dir.join("handbook.txt")).unwrap();
    let second = pipeline.process_local_dir().await.unwrap();
    assert_eq!(second.extracted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(std::fs::read_to_string(pdf_dir.join("handbook.txt")).unwrap(), artifact);

    let indexer = indexer(&temp_dir);
    let snapshot = indexer.build_or_load(false).await.unwrap();
    assert_eq!(snapshot.len(), 2);
    let hits = indexer.search("academic calendar", 1).await.unwrap();
    assert_eq!(hits[0].source, "pdfs/calendar.txt");
}
