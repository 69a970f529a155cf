// Shared fixtures for integration tests.
//
// VocabEmbedder is a deterministic stand-in for the ONNX model: a
// bag-of-words vector where every distinct lowercase word gets its own
// dimension the first time it is seen. Texts sharing words point in similar
// directions, which is enough to exercise ranking without a model download.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use creator_match::embedding::TextEmbedder;
use creator_match::scoring::QUERY_INSTRUCTION;

pub const DIM: usize = 512;

#[derive(Default)]
pub struct VocabEmbedder {
    vocab: Mutex<HashMap<String, usize>>,
    batches: AtomicUsize,
}

impl VocabEmbedder {
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        // The real model reads the instruction; for bag-of-words it would only
        // add the same words to every query.
        let text = text.strip_prefix(QUERY_INSTRUCTION).unwrap_or(text);
        let mut vocab = self.vocab.lock().unwrap();
        let mut v = vec![0.0_f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let next = vocab.len();
            let index = *vocab.entry(word.to_lowercase()).or_insert(next);
            v[index % DIM] += 1.0;
        }
        v
    }
}

#[async_trait]
impl TextEmbedder for VocabEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// A small creator dataset with an extra column and a quoted bio.
pub const CREATORS_CSV: &str = "\
handle,name,bio,niche,location,audience_size,verified
@ana,Ana Ruiz,\"Slow fashion, vintage thrifting and sustainable fashion hauls\",fashion,India,120000,true
@ben,Ben Cole,Unboxing smartphones and reviewing laptops and gadgets,tech,USA,56000,false
@chi,Chioma Obi,Eco-friendly fashion brand collabs and modern lifestyle vlogs,fashion,Nigeria,8300,true
@dev,Dev Patel,Coding tutorials for web developers,tech,India,23000,false
@eli,Eli Moss,Plant-based recipes and weeknight cooking,food,USA,4100,false
";

pub const REQUIRED_HEADER: &str = "name,bio,niche,location,audience_size";
