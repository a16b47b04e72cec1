use ragcmp_core::types::{Chunk, SourceSpan};
use ragcmp_text::{KeywordMatcher, KeywordRule};

fn chunk(index: usize, text: &str) -> Chunk {
    Chunk { text: text.to_string(), span: SourceSpan { source: "t".into(), index, start: 0, end: text.len() } }
}

fn vocab() -> Vec<String> {
    ["メンテナンス", "定期", "保守", "点検", "交換", "清掃"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn error_code_selects_only_chunks_with_the_code() {
    let chunks = vec![chunk(0, "製品概要"), chunk(1, "E-404: センサー未検出"), chunk(2, "E-500: 過熱")];
    let m = KeywordMatcher::new(vocab()).unwrap();
    let hits = m.find("エラーコードE-404の対処法は？", &chunks);
    let codes: Vec<usize> = hits.iter().filter(|h| h.rule == KeywordRule::ErrorCode).map(|h| h.chunk.span.index).collect();
    assert_eq!(codes, vec![1]);
}

#[test]
fn code_extraction_ignores_word_boundaries() {
    let m = KeywordMatcher::new(vocab()).unwrap();
    assert_eq!(m.extract_codes("コードE-404とW-12"), vec!["E-404", "W-12"]);
    assert!(m.extract_codes("no codes here").is_empty());
}

#[test]
fn maintenance_vocabulary_pulls_every_maintenance_chunk() {
    let chunks = vec![chunk(0, "ノズルの清掃"), chunk(1, "仕様"), chunk(2, "部品の交換周期")];
    let m = KeywordMatcher::new(vocab()).unwrap();
    let hits = m.find("定期メンテナンスの方法", &chunks);
    let idx: Vec<usize> = hits.iter().filter(|h| h.rule == KeywordRule::Category).map(|h| h.chunk.span.index).collect();
    assert_eq!(idx, vec![0, 2]);
}

#[test]
fn general_terms_need_more_than_two_chars() {
    let chunks = vec![chunk(0, "the welder arc"), chunk(1, "an ok tip")];
    let m = KeywordMatcher::new(vec![]).unwrap();
    let hits = m.find("ok welder", &chunks);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.span.index, 0);
    assert_eq!(hits[0].rule, KeywordRule::GeneralTerm);
}

#[test]
fn duplicates_across_rules_are_kept_in_rule_order() {
    let chunks = vec![chunk(0, "E-404 の点検手順")];
    let m = KeywordMatcher::new(vocab()).unwrap();
    let hits = m.find("E-404 点検", &chunks);
    let rules: Vec<KeywordRule> = hits.iter().map(|h| h.rule).collect();
    assert_eq!(rules, vec![KeywordRule::ErrorCode, KeywordRule::Category, KeywordRule::GeneralTerm]);
}
