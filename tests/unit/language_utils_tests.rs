/*!
 * Tests for the language catalog
 */

use std::time::Duration;

use resumeflow::language_utils::{get_language_name, LanguageCatalog};
use resumeflow::transport::HttpTransport;

#[test]
fn test_defaultCatalog_shouldListOriginalLanguages() {
    let catalog = LanguageCatalog::default();
    for code in ["zh", "en", "ja", "ko", "he", "hi", "id", "ms", "no"] {
        assert!(catalog.contains(code), "missing {}", code);
    }
    assert_eq!(catalog.len(), 27);
}

#[test]
fn test_getLanguageName_withIsoCodes_shouldResolveEnglishName() {
    assert!(get_language_name("de").starts_with("German"));
    assert!(get_language_name("fra").starts_with("French"));
}

#[test]
fn test_iter_shouldBeOrderedByCode() {
    let catalog = LanguageCatalog::from_entries(vec![
        ("ko".to_string(), "Korean".to_string()),
        ("ar".to_string(), "Arabic".to_string()),
    ]);
    let codes: Vec<&str> = catalog.iter().map(|(code, _)| code).collect();
    assert_eq!(codes, vec!["ar", "ko"]);
}

#[tokio::test]
async fn test_fetch_withUnreachableService_shouldFallBackToDefault() {
    // Port 9 (discard) is never served in the test environment
    let transport = HttpTransport::new(
        "http://127.0.0.1:9",
        "/api/modify_resume",
        "/api/modify_resume/stream/{session_id}",
        Duration::from_millis(500),
    );
    let catalog = LanguageCatalog::fetch(&transport, "/api/language").await;
    assert_eq!(catalog, LanguageCatalog::default());
}
