// ============================================================
// Application - Triplet training from an article collection
// ============================================================
// Builds (anchor, positive, negative) texts from articles:
//
//   headline_emb = true   anchor = body,  positive = title,
//                         negative = titles in reverse order
//   headline_emb = false  anchor = title, positive = body,
//                         negative = bodies in reverse order
//
// An odd collection drops its last article, so reversing never
// pairs an article with itself.

use anyhow::{ensure, Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::domain::article::Article;
use crate::ml::{
    pooling::PostOp,
    triplet::{TripletHistory, TripletSettings},
    tuner::EncoderTuner,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripletTexts {
    pub anchors:   Vec<String>,
    pub positives: Vec<String>,
    pub negatives: Vec<String>,
}

pub fn build_triplets(articles: &[Article], headline_emb: bool) -> TripletTexts {
    let even = articles.len() - articles.len() % 2;
    let articles = &articles[..even];

    let titles: Vec<String> = articles.iter().map(|a| a.title.clone()).collect();
    let bodies: Vec<String> = articles.iter().map(|a| a.text().to_string()).collect();

    let (anchors, positives) = if headline_emb {
        (bodies, titles)
    } else {
        (titles, bodies)
    };
    let negatives = positives.iter().rev().cloned().collect();

    TripletTexts { anchors, positives, negatives }
}

/// Settings for collection training: pooling defaults to the
/// encoder's pooled summary.
pub fn collection_settings(epochs: usize, lr: f64) -> TripletSettings {
    TripletSettings::new(epochs, lr).with_post_op(PostOp::Default)
}

pub fn triplet_train_collection<B: AutodiffBackend>(
    tuner:        &mut EncoderTuner<B>,
    articles:     &[Article],
    batch_size:   usize,
    headline_emb: bool,
    settings:     &TripletSettings,
) -> Result<TripletHistory> {
    let triplets = build_triplets(articles, headline_emb);
    ensure!(
        !triplets.anchors.is_empty(),
        "Triplet training needs at least two articles, got {}",
        articles.len()
    );
    tracing::info!(
        "Built {} triplets (headline_emb={})",
        triplets.anchors.len(),
        headline_emb
    );

    let anchor = tuner
        .preprocess(&triplets.anchors, None, batch_size)
        .context("Failed to preprocess anchors")?;
    let positive = tuner
        .preprocess(&triplets.positives, None, batch_size)
        .context("Failed to preprocess positives")?;
    let negative = tuner
        .preprocess(&triplets.negatives, None, batch_size)
        .context("Failed to preprocess negatives")?;

    let history = tuner
        .triplet_train(&anchor, &positive, &negative, settings)
        .context("Triplet training failed")?;
    Ok(history)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::TunerConfig;
    use crate::testing::{tiny_encoder_config, TestAutodiffBackend, WordTokenizer};

    fn articles(n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| Article::new(format!("title {i}"), format!("body text {i}")))
            .collect()
    }

    #[test]
    fn test_odd_collection_drops_last() {
        let t = build_triplets(&articles(3), true);
        assert_eq!(t.anchors, vec!["body text 0", "body text 1"]);
        assert_eq!(t.positives, vec!["title 0", "title 1"]);
        assert_eq!(t.negatives, vec!["title 1", "title 0"]);
    }

    #[test]
    fn test_title_anchors_without_headline_emb() {
        let t = build_triplets(&articles(4), false);
        assert_eq!(t.anchors[0], "title 0");
        assert_eq!(t.positives[0], "body text 0");
        assert_eq!(t.negatives[0], "body text 3");
    }

    #[test]
    fn test_trains_on_collection() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TunerConfig {
            max_len: 8,
            log_file: dir.path().join("log.txt").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let mut tuner = EncoderTuner::<TestAutodiffBackend>::new(
            tiny_encoder_config(), Arc::new(WordTokenizer::new(50)), &cfg, Default::default(),
        ).unwrap();

        let history = triplet_train_collection(
            &mut tuner, &articles(5), 2, true, &collection_settings(1, 1e-3),
        ).unwrap();
        assert_eq!(history.steps_per_epoch, 2);
        assert_eq!(history.epoch_losses.len(), 1);
    }

    #[test]
    fn test_single_article_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TunerConfig {
            max_len: 8,
            log_file: dir.path().join("log.txt").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let mut tuner = EncoderTuner::<TestAutodiffBackend>::new(
            tiny_encoder_config(), Arc::new(WordTokenizer::new(50)), &cfg, Default::default(),
        ).unwrap();
        let result = triplet_train_collection(
            &mut tuner, &articles(1), 2, true, &collection_settings(1, 1e-3),
        );
        assert!(result.is_err());
    }
}
