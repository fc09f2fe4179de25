//! Mock API tests for the HTTP transcription and translation clients
//!
//! Every client is pointed at a local wiremock server; nothing leaves the
//! machine.

use legenda::transcribe::{Segment, Transcriber, Transcript, WhisperClient};
use legenda::translate::{translate_transcript, GeminiTranslator, GoogleTranslator, Translator};
use legenda::LegendaError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn google_reply(text: &str) -> serde_json::Value {
    json!([[[text, "source", null, null, 10]], null, "en"])
}

// ============================================================================
// Google Translate Mock Tests
// ============================================================================

mod google_tests {
    use super::*;

    #[tokio::test]
    async fn test_google_translates_to_portuguese() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "en"))
            .and(query_param("tl", "pt"))
            .and(query_param("q", "Good morning"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_reply("Bom dia")))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new("en", "pt-BR").with_base_url(server.uri());
        let translated = translator.translate("Good morning").await.unwrap();

        assert_eq!(translated, "Bom dia");
    }

    #[tokio::test]
    async fn test_google_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new("en", "pt-BR").with_base_url(server.uri());
        let result = translator.translate("Hello").await;

        assert!(matches!(result, Err(LegendaError::Api(_))));
    }

    #[tokio::test]
    async fn test_google_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new("en", "pt-BR").with_base_url(server.uri());
        assert!(translator.translate("Hello").await.is_err());
    }

    #[tokio::test]
    async fn test_transcript_falls_back_on_failed_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("q", "second line"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("q", "first line"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_reply("primeira linha")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("q", "third line"))
            .respond_with(ResponseTemplate::new(200).set_body_json(google_reply("terceira linha")))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new("en", "pt-BR").with_base_url(server.uri());
        let source = Transcript::new(
            "en",
            vec![
                Segment::new(Duration::ZERO, Duration::from_secs(1), "first line"),
                Segment::new(Duration::from_secs(1), Duration::from_secs(2), "second line"),
                Segment::new(Duration::from_secs(2), Duration::from_secs(3), "third line"),
            ],
        );

        let (target, stats) = translate_transcript(&translator, &source, 1, false).await;

        let texts: Vec<&str> = target.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["primeira linha", "second line", "terceira linha"]);
        assert_eq!(stats.fallbacks, 1);
        for (a, b) in source.segments.iter().zip(&target.segments) {
            assert_eq!((a.start, a.end), (b.start, b.end));
        }
    }
}

// ============================================================================
// Gemini Translation Mock Tests
// ============================================================================

mod gemini_tests {
    use super::*;

    #[tokio::test]
    async fn test_gemini_translation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": " Boa noite \n"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-api-key".to_string(), "en", "pt-BR")
            .with_base_url(server.uri());

        assert_eq!(translator.translate("Good night").await.unwrap(), "Boa noite");
    }

    #[tokio::test]
    async fn test_gemini_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"message": "quota exceeded"}
            })))
            .mount(&server)
            .await;

        let translator = GeminiTranslator::new("test-api-key".to_string(), "en", "pt-BR")
            .with_base_url(server.uri());

        match translator.translate("Good night").await {
            Err(LegendaError::Api(message)) => assert!(message.contains("quota exceeded")),
            other => panic!("expected API error, got {other:?}"),
        }
    }
}

// ============================================================================
// Whisper API Mock Tests
// ============================================================================

mod whisper_tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn audio_file() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        file.write_all(b"ID3 fake mp3 payload").unwrap();
        file
    }

    fn verbose_json() -> serde_json::Value {
        json!({
            "text": "Hello there. General Kenobi.",
            "language": "english",
            "duration": 3725.9,
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.2, "text": " Hello there."},
                {"id": 1, "start": 3725.4, "end": 3725.9, "text": " General Kenobi."}
            ]
        })
    }

    #[tokio::test]
    async fn test_whisper_transcribes_segments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .and(header("authorization", "Bearer test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verbose_json()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let client = WhisperClient::new("test-api-key".to_string())
            .with_language("en".to_string())
            .with_base_url(server.uri());

        let transcript = client.transcribe(audio.path()).await.unwrap();

        assert_eq!(transcript.language, "en");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.segments[1].start, Duration::from_millis(3_725_400));
        assert_eq!(transcript.segments[1].end, Duration::from_millis(3_725_900));
        assert_eq!(transcript.segments[0].text, " Hello there.");
    }

    #[tokio::test]
    async fn test_whisper_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let audio = audio_file();
        let client = WhisperClient::new("bad-key".to_string())
            .with_base_url(server.uri())
            .with_retry_delay(Duration::from_millis(1));

        match client.transcribe(audio.path()).await {
            Err(LegendaError::Api(message)) => {
                assert!(message.contains("Incorrect API key provided"))
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_whisper_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(verbose_json()))
            .mount(&server)
            .await;

        let audio = audio_file();
        let client = WhisperClient::new("test-api-key".to_string())
            .with_base_url(server.uri())
            .with_retry_delay(Duration::from_millis(1));

        let transcript = client.transcribe(audio.path()).await.unwrap();
        assert_eq!(transcript.language, "english");
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_whisper_handles_missing_file() {
        let client = WhisperClient::new("test-api-key".to_string());
        let result = client
            .transcribe(std::path::Path::new("/tmp/nonexistent_legenda_test.mp3"))
            .await;
        assert!(matches!(result, Err(LegendaError::Io(_))));
    }

    #[test]
    fn test_whisper_client_name() {
        let client = WhisperClient::new("test-api-key".to_string());
        assert_eq!(client.name(), "OpenAI Whisper");
    }
}
