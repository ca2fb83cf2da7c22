mod common;

use brewline::pipeline::{definition, hover};
use brewline::Config;
use common::{doc_uri, Harness};
use tower_lsp::lsp_types::{
    GotoDefinitionResponse, Hover, HoverContents, Location, MarkedString, Position, Range,
};

#[tokio::test]
async fn test_definition_forwards_the_raw_buffer() {
    let h = Harness::new(Config::default());
    let target = Location::new(
        doc_uri(),
        Range::new(Position::new(0, 0), Position::new(0, 5)),
    );
    h.host.define_as(GotoDefinitionResponse::Scalar(target.clone()));

    let text = "greet = (who) -> who\ngreet 'x'".to_string();
    let found = definition(&h.engine, &doc_uri(), text.clone(), Position::new(1, 2)).await;

    assert_eq!(found, Some(GotoDefinitionResponse::Scalar(target)));
    let lookups = h.host.lookups();
    assert_eq!(lookups.len(), 1);
    let (method, request) = &lookups[0];
    assert_eq!(*method, "definition");
    assert_eq!(request.uri, doc_uri());
    assert_eq!(request.text, text);
    assert_eq!(request.position, Position::new(1, 2));
    // no virtual document is involved
    assert!(h.documents.get(&doc_uri()).is_none());
}

#[tokio::test]
async fn test_hover_passes_the_answer_through() {
    let h = Harness::new(Config::default());
    let answer = Hover {
        contents: HoverContents::Scalar(MarkedString::String("var count: number".to_string())),
        range: Some(Range::new(Position::new(0, 0), Position::new(0, 5))),
    };
    h.host.hover_with(answer.clone());

    let found = hover(&h.engine, &doc_uri(), "count = 1".to_string(), Position::new(0, 3)).await;

    assert_eq!(found, Some(answer));
    assert_eq!(h.host.lookups()[0].0, "hover");
}

#[tokio::test]
async fn test_navigation_survives_host_outage() {
    let h = Harness::new(Config::default());
    h.host.go_down();

    let text = "a = 1".to_string();
    assert!(definition(&h.engine, &doc_uri(), text.clone(), Position::new(0, 0))
        .await
        .is_none());
    assert!(hover(&h.engine, &doc_uri(), text, Position::new(0, 0))
        .await
        .is_none());
    assert_eq!(h.host.lookups().len(), 2);
}
