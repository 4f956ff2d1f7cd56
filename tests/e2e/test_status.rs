use crate::e2e::helpers;

use helpers::fake_backend::{FakeSpeechBackend, FAIL_MARKER};
use helpers::fixtures::{corrupt_pdf, docx_with_paragraphs};
use helpers::TestContext;
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use test_context::test_context;
use voicedoc_backend::domain::tts::LanguageCode;

async fn submit(ctx: &TestContext, file_name: &str, document: &[u8], lang: Option<&str>) -> String {
    let response = ctx.client.upload(file_name, document, lang).await.unwrap();
    response.assert_status(StatusCode::ACCEPTED);
    response
        .field("task_id")
        .and_then(|v| v.as_str())
        .unwrap()
        .to_string()
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_complete_a_conversion_and_serve_the_audio(ctx: &TestContext) {
    let document = docx_with_paragraphs(&["Hola mundo."]);
    let task_id = submit(ctx, "hola.docx", &document, Some("es")).await;

    let status = ctx.wait_for_completion(&task_id).await.unwrap();

    assert_eq!(status["status"], "completed");
    assert_eq!(status["progress"], 100);
    assert_eq!(status["text"], "Hola mundo.");
    assert!(status.get("remaining_time").is_none());
    let audio_url = status["audio_url"].as_str().unwrap().to_string();
    assert_eq!(audio_url, format!("/audio/{}.mp3", task_id));

    let audio = ctx.client.get(&audio_url).await.unwrap();
    audio.assert_status(StatusCode::OK);
    assert_eq!(
        audio.body_bytes,
        FakeSpeechBackend::audio_for("Hola mundo.", LanguageCode::Spanish)
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_serving_text_after_the_first_completed_read(ctx: &TestContext) {
    let document = docx_with_paragraphs(&["Primer párrafo.", "Segundo párrafo."]);
    let task_id = submit(ctx, "dos.docx", &document, None).await;
    ctx.wait_for_completion(&task_id).await.unwrap();

    let path = format!("/status/{}", task_id);
    let second = ctx.client.get(&path).await.unwrap();
    let third = ctx.client.get(&path).await.unwrap();

    let expected = "Primer párrafo.\nSegundo párrafo.";
    assert_eq!(second.field("text").and_then(|v| v.as_str()), Some(expected));
    assert_eq!(third.field("text").and_then(|v| v.as_str()), Some(expected));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_synthesize_identical_chunks_once(ctx: &TestContext) {
    let paragraph = "Same paragraph repeated here.";
    let document = docx_with_paragraphs(&[paragraph, paragraph]);
    let task_id = submit(ctx, "repeat.docx", &document, Some("en")).await;

    let status = ctx.wait_for_completion(&task_id).await.unwrap();

    assert_eq!(status["status"], "completed");
    assert_eq!(status["chunks"], 2);
    assert_eq!(ctx.backend.calls(), 1);

    let audio = ctx.client.get(&format!("/audio/{}.mp3", task_id)).await.unwrap();
    let single = FakeSpeechBackend::audio_for(paragraph, LanguageCode::English);
    assert_eq!(audio.body_bytes, [single.clone(), single].concat());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_reuse_audio_across_languages(ctx: &TestContext) {
    let paragraph = "Hotel taxi radio.";
    let document = docx_with_paragraphs(&[paragraph]);

    let english = submit(ctx, "en.docx", &document, Some("en")).await;
    ctx.wait_for_completion(&english).await.unwrap();
    let german = submit(ctx, "de.docx", &document, Some("de")).await;
    ctx.wait_for_completion(&german).await.unwrap();

    assert_eq!(ctx.backend.calls(), 2);
    let audio = ctx.client.get(&format!("/audio/{}.mp3", german)).await.unwrap();
    assert_eq!(
        audio.body_bytes,
        FakeSpeechBackend::audio_for(paragraph, LanguageCode::German)
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_complete_when_one_chunk_fails(ctx: &TestContext) {
    let failing = format!("This one breaks {}", FAIL_MARKER);
    let document = docx_with_paragraphs(&["First chunk is fine.", &failing, "Third chunk is fine."]);
    let task_id = submit(ctx, "partial.docx", &document, Some("en")).await;

    let status = ctx.wait_for_completion(&task_id).await.unwrap();

    assert_eq!(status["status"], "completed");
    assert_eq!(status["chunks"], 3);
    let audio = ctx.client.get(&format!("/audio/{}.mp3", task_id)).await.unwrap();
    let expected = [
        FakeSpeechBackend::audio_for("First chunk is fine.", LanguageCode::English),
        FakeSpeechBackend::audio_for("Third chunk is fine.", LanguageCode::English),
    ]
    .concat();
    assert_eq!(audio.body_bytes, expected);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_detect_the_language_when_asked(ctx: &TestContext) {
    let document = docx_with_paragraphs(&["Le chat dort sur le canapé pendant que nous préparons le dîner."]);
    let task_id = submit(ctx, "chat.docx", &document, Some("auto")).await;

    let status = ctx.wait_for_completion(&task_id).await.unwrap();

    assert_eq!(status["status"], "completed");
    assert_eq!(status["language"], "fr");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_documents_without_text(ctx: &TestContext) {
    let document = docx_with_paragraphs(&["", "   "]);
    let task_id = submit(ctx, "blank.docx", &document, None).await;

    let status = ctx.wait_for_completion(&task_id).await.unwrap();

    assert_eq!(status["status"], "error");
    assert!(status["error"]
        .as_str()
        .unwrap()
        .contains("no text could be extracted"));
    assert!(status.get("text").is_none());
    assert!(status.get("audio_url").is_none());
    assert_eq!(ctx.backend.calls(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_unreadable_documents(ctx: &TestContext) {
    let task_id = submit(ctx, "broken.pdf", &corrupt_pdf(), None).await;

    let status = ctx.wait_for_completion(&task_id).await.unwrap();

    assert_eq!(status["status"], "error");
    assert!(status["error"].as_str().unwrap().contains("text extraction failed"));
    assert!(std::fs::read_dir(ctx.storage.temp_dir()).unwrap().next().is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_not_found_for_unknown_tasks(ctx: &TestContext) {
    let response = ctx
        .client
        .get(&format!("/status/{}", uuid::Uuid::new_v4()))
        .await
        .unwrap();

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.body.as_ref().unwrap();
    assert!(body.get("message").is_some());
    assert!(body.get("status").is_none());
    assert!(body.get("progress").is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_not_found_for_malformed_task_ids(ctx: &TestContext) {
    let response = ctx.client.get("/status/definitely-not-a-uuid").await.unwrap();

    response.assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_track_concurrent_conversions_independently(ctx: &TestContext) {
    let first = docx_with_paragraphs(&["Document one."]);
    let second = docx_with_paragraphs(&["Document two."]);

    let (a, b) = tokio::join!(
        submit(ctx, "one.docx", &first, None),
        submit(ctx, "two.docx", &second, None)
    );
    let (status_a, status_b) = tokio::join!(ctx.wait_for_completion(&a), ctx.wait_for_completion(&b));

    assert_eq!(status_a.unwrap()["text"], "Document one.");
    assert_eq!(status_b.unwrap()["text"], "Document two.");
}
