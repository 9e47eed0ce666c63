//! The process-wide diagnostic sink can only be installed once, so this
//! lives in its own test binary.

use easy_gemini::{
    ai::gemini::types::{FinishReason, GenerateContentResponse},
    codec::{self, DiagnosticSink},
    models::AiModel,
};
use std::sync::{Arc, Mutex};

struct RecordingSink(Arc<Mutex<Vec<String>>>);

impl DiagnosticSink for RecordingSink {
    fn unknown_tag(&self, type_name: &'static str, tag: &str) {
        self.0.lock().unwrap().push(format!("{}:{}", type_name, tag));
    }
}

struct SecondSink;

impl DiagnosticSink for SecondSink {
    fn unknown_tag(&self, _type_name: &'static str, _tag: &str) {
        panic!("a second sink must never be installed");
    }
}

#[test]
fn test_installed_sink_receives_serde_fallbacks() {
    let events = Arc::new(Mutex::new(Vec::new()));
    assert!(codec::install_diagnostic_sink(Box::new(RecordingSink(
        events.clone()
    ))));

    let response: GenerateContentResponse = serde_json::from_str(
        r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]},"finishReason":"NEWNEW"}]}"#,
    )
    .unwrap();

    assert_eq!(
        response.candidates[0].finish_reason,
        Some(FinishReason::Unknown)
    );
    assert_eq!(response.text().as_deref(), Some("hi"));
    assert_eq!(*events.lock().unwrap(), vec!["FinishReason:NEWNEW".to_string()]);

    // Known tags report nothing.
    let _: FinishReason = serde_json::from_str("\"STOP\"").unwrap();
    assert_eq!(events.lock().unwrap().len(), 1);

    assert!(!codec::install_diagnostic_sink(Box::new(SecondSink)));

    // The first sink stays in place.
    assert_eq!(AiModel::from_model_name("gemini-next"), AiModel::GeminiPro);
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "FinishReason:NEWNEW".to_string(),
            "AiModel:gemini-next".to_string()
        ]
    );
}
