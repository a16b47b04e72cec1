use std::path::Path;

use ragcmp_core::config::ModelSettings;
use ragcmp_embed::{get_default_cross_encoder, get_default_embedder, HashingEmbedder, OverlapScorer};
use ragcmp_core::traits::{CrossEncoder, Embedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = ModelSettings { use_fake: true, ..Default::default() };
    let embedder = get_default_embedder(&settings, Path::new(".")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), embedder.dim());

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn hashing_embedder_prefers_shared_japanese_text() {
    let e = HashingEmbedder::new(512);
    let q = e.embed_one("E-404 エラーの対処法");
    let near = e.embed_one("E-404: センサー未検出エラーの対処法");
    let far = e.embed_one("定期メンテナンスの手順");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let v = HashingEmbedder::new(16).embed_one("");
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn overlap_scorer_ranks_relevant_passage_higher() {
    let s = OverlapScorer::new();
    let scores = s
        .score_batch("ノズルの清掃", &["ノズルの清掃方法".to_string(), "電源の仕様".to_string()])
        .unwrap();
    assert_eq!(scores.len(), 2);
    assert!(scores[0] > scores[1]);
    assert!((scores[0] - 1.0).abs() < 1e-6);
}

#[test]
fn fake_mode_provides_a_cross_encoder() {
    let settings = ModelSettings { use_fake: true, ..Default::default() };
    assert!(get_default_cross_encoder(&settings, Path::new(".")).unwrap().is_some());
    let none = ModelSettings { use_fake: false, reranker_dir: None, ..Default::default() };
    assert!(get_default_cross_encoder(&none, Path::new(".")).unwrap().is_none());
}
