//! Browser-side checks of the JSON crossing the JS bridge
#![cfg(target_arch = "wasm32")]

use pageturn::{BookConfig, BookEvent, Direction, PagingMethod};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn config_json_fills_defaults() {
    let config = BookConfig::from_json(r#"{"pagingMethod": "vertical", "minMediaHeight": 120}"#).unwrap();
    assert_eq!(config.paging_method, PagingMethod::Vertical);
    assert_eq!(config.min_media_height, 120.0);
    assert_eq!(config.filler_class, "filler");
}

#[wasm_bindgen_test]
fn config_json_rejects_garbage() {
    assert!(BookConfig::from_json("{not json").is_err());
}

#[wasm_bindgen_test]
fn event_json_is_tagged() {
    let event = BookEvent::PageChange {
        from: 1,
        to: 2,
        direction: Direction::Next,
    };
    let json = event.to_json();
    assert!(json.contains(r#""type":"page-change""#));
    assert!(json.contains(r#""to":2"#));
}
