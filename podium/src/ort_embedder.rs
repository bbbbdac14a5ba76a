//! ONNX sentence-embedding [`Embedder`] (SPEC_FULL.md §4.8), used when a
//! model path is configured. Grounded on `des256-deli`'s onnx backend
//! (`OnnxSession`: build a session, run it, pull f32 arrays back out) and
//! on the `tokenizers` crate's standard `encode_batch` usage.

use ndarray::Array2;
use ort::session::Session;
use ort::value::TensorRef;
use podium_core::embed::{l2_normalize, Embedder};
use podium_core::error::EngineError;
use tokenizers::Tokenizer;

pub struct OrtEmbedder {
    session: Session,
    tokenizer: Tokenizer,
}

impl OrtEmbedder {
    pub fn new(model_path: &str, tokenizer_path: &str) -> Result<Self, EngineError> {
        let session = Session::builder()
            .map_err(|e| EngineError::new(format!("failed to create ort session builder: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| EngineError::new(format!("failed to load onnx model: {e}")))?;
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EngineError::new(format!("failed to load tokenizer: {e}")))?;
        Ok(OrtEmbedder { session, tokenizer })
    }

    fn mean_pool(hidden: &Array2<f32>, mask: &[u32]) -> Vec<f32> {
        let (seq_len, dims) = hidden.dim();
        let mut out = vec![0.0f32; dims];
        let mut count = 0.0f32;
        for t in 0..seq_len {
            if mask.get(t).copied().unwrap_or(0) == 0 {
                continue;
            }
            count += 1.0;
            for d in 0..dims {
                out[d] += hidden[(t, d)];
            }
        }
        if count > 0.0 {
            for v in &mut out {
                *v /= count;
            }
        }
        out
    }
}

impl Embedder for OrtEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EngineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EngineError::new(format!("tokenization failed: {e}")))?;

        let max_len = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
        let batch = encodings.len();

        let mut input_ids = Array2::<i64>::zeros((batch, max_len));
        let mut attention_mask = Array2::<i64>::zeros((batch, max_len));
        let mut token_type_ids = Array2::<i64>::zeros((batch, max_len));

        for (row, enc) in encodings.iter().enumerate() {
            for (col, &id) in enc.get_ids().iter().enumerate() {
                input_ids[(row, col)] = id as i64;
            }
            for (col, &m) in enc.get_attention_mask().iter().enumerate() {
                attention_mask[(row, col)] = m as i64;
            }
            for (col, &t) in enc.get_type_ids().iter().enumerate() {
                token_type_ids[(row, col)] = t as i64;
            }
        }

        let ids_ref = TensorRef::from_array_view(input_ids.view())
            .map_err(|e| EngineError::new(format!("failed to build input_ids tensor: {e}")))?;
        let mask_ref = TensorRef::from_array_view(attention_mask.view())
            .map_err(|e| EngineError::new(format!("failed to build attention_mask tensor: {e}")))?;
        let type_ref = TensorRef::from_array_view(token_type_ids.view())
            .map_err(|e| EngineError::new(format!("failed to build token_type_ids tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![
                "input_ids" => ids_ref,
                "attention_mask" => mask_ref,
                "token_type_ids" => type_ref,
            ])
            .map_err(|e| EngineError::new(format!("onnx inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_raw_tensor::<f32>()
            .map_err(|e| EngineError::new(format!("failed to read onnx output: {e}")))?;
        // [batch, seq_len, hidden] last_hidden_state.
        let dims = *shape.last().unwrap_or(&0) as usize;
        let seq_len = if dims > 0 { shape[1] as usize } else { 0 };

        let mut result = Vec::with_capacity(batch);
        for (row, enc) in encodings.iter().enumerate() {
            let start = row * seq_len * dims;
            let end = start + seq_len * dims;
            let hidden = Array2::from_shape_vec((seq_len, dims), data[start..end].to_vec())
                .map_err(|e| EngineError::new(format!("failed to reshape hidden state: {e}")))?;
            let mut pooled = Self::mean_pool(&hidden, enc.get_attention_mask());
            l2_normalize(&mut pooled);
            result.push(pooled);
        }
        Ok(result)
    }
}
