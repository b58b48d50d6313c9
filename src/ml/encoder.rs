// ============================================================
// ML - Contextual Encoder (BERT-style)
// ============================================================
// The pretrained encoder collaborator. It maps token ids and an
// attention mask to:
//   hidden_states [batch, seq_len, hidden]  (one vector per token)
//   pooled        [batch, hidden]           (tanh(W·h_cls + b))
//
// Architecture config is read from a HuggingFace-style
// config.json; pretrained weights, when present, from a burn
// named record next to it.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::params::{embedding_params, layer_norm_params, linear_params, NamedParam};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size:         usize,
    #[config(default = 0.1)]
    pub hidden_dropout_prob:     f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let embeddings = Embeddings {
            word:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm: self.layer_norm(device),
            dropout:    DropoutConfig::new(self.hidden_dropout_prob).init(),
        };
        let layers: Vec<EncoderBlock<B>> = (0..self.num_hidden_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        BertEncoder {
            embeddings, layers, pooler,
            hidden_size: self.hidden_size,
            max_positions: self.max_position_embeddings,
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn = MultiHeadAttentionConfig::new(self.hidden_size, self.num_attention_heads)
            .with_dropout(self.hidden_dropout_prob)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let ffn_linear2 = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let norm1   = self.layer_norm(device);
        let norm2   = self.layer_norm(device);
        let dropout = DropoutConfig::new(self.hidden_dropout_prob).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Embeddings ───────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    pub word:       Embedding<B>,
    pub position:   Embedding<B>,
    pub token_type: Embedding<B>,
    pub layer_norm: LayerNorm<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> Embeddings<B> {
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        // Single-segment inputs: every token has type 0
        let token_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let x = self.word.forward(input_ids)
            + self.position.forward(positions)
            + self.token_type.forward(token_types);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

// ─── Encoder block ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `mask_pad` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(mask_pad))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub embeddings:    Embeddings<B>,
    pub layers:        Vec<EncoderBlock<B>>,
    pub pooler:        Linear<B>,
    pub hidden_size:   usize,
    pub max_positions: usize,
}

pub struct EncoderOutput<B: Backend> {
    /// [batch, seq_len, hidden]
    pub hidden_states: Tensor<B, 3>,
    /// [batch, hidden]
    pub pooled:        Tensor<B, 2>,
}

impl<B: Backend> BertEncoder<B> {
    /// input_ids, attention_mask: [batch, seq_len]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> EncoderOutput<B> {
        let mask_pad = attention_mask.equal_elem(0);

        let mut x = self.embeddings.forward(input_ids);
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
        }

        let [batch_size, _, hidden] = x.dims();
        let first_token = x
            .clone()
            .slice([0..batch_size, 0..1, 0..hidden])
            .reshape([batch_size, hidden]);
        let pooled = self.pooler.forward(first_token).tanh();

        EncoderOutput { hidden_states: x, pooled }
    }

    /// Flat parameter names, e.g. `layers.0.self_attn.query.bias`.
    pub fn named_params(&self, prefix: &str, out: &mut Vec<NamedParam>) {
        let emb = format!("{prefix}embeddings");
        embedding_params(&format!("{emb}.word"), &self.embeddings.word, out);
        embedding_params(&format!("{emb}.position"), &self.embeddings.position, out);
        embedding_params(&format!("{emb}.token_type"), &self.embeddings.token_type, out);
        layer_norm_params(&format!("{emb}.layer_norm"), &self.embeddings.layer_norm, out);

        for (i, layer) in self.layers.iter().enumerate() {
            let p = format!("{prefix}layers.{i}");
            let attn = &layer.self_attn;
            linear_params(&format!("{p}.self_attn.query"), &attn.query, out);
            linear_params(&format!("{p}.self_attn.key"), &attn.key, out);
            linear_params(&format!("{p}.self_attn.value"), &attn.value, out);
            linear_params(&format!("{p}.self_attn.output"), &attn.output, out);
            linear_params(&format!("{p}.ffn_linear1"), &layer.ffn_linear1, out);
            linear_params(&format!("{p}.ffn_linear2"), &layer.ffn_linear2, out);
            layer_norm_params(&format!("{p}.norm1"), &layer.norm1, out);
            layer_norm_params(&format!("{p}.norm2"), &layer.norm2, out);
        }

        linear_params(&format!("{prefix}pooler"), &self.pooler, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tiny_encoder_config, TestBackend};

    #[test]
    fn test_output_shapes() {
        let device = Default::default();
        let encoder = tiny_encoder_config().init::<TestBackend>(&device);
        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[1, 5, 6, 2], [1, 7, 2, 0]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 1], [1, 1, 1, 0]], &device);
        let out = encoder.forward(ids, mask);
        assert_eq!(out.hidden_states.dims(), [2, 4, 8]);
        assert_eq!(out.pooled.dims(), [2, 8]);
    }

    #[test]
    fn test_named_params_cover_every_block() {
        let encoder = tiny_encoder_config().init::<TestBackend>(&Default::default());
        let mut params = Vec::new();
        encoder.named_params("", &mut params);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"embeddings.word.weight"));
        assert!(names.contains(&"layers.0.self_attn.query.bias"));
        assert!(names.contains(&"layers.0.norm2.gamma"));
        assert!(names.contains(&"pooler.weight"));
    }

    #[test]
    fn test_config_reads_huggingface_fields() {
        let json = r#"{
            "architectures": ["BertModel"],
            "vocab_size": 30,
            "hidden_size": 8,
            "num_hidden_layers": 1,
            "num_attention_heads": 2,
            "intermediate_size": 16,
            "max_position_embeddings": 32,
            "type_vocab_size": 2,
            "hidden_dropout_prob": 0.1,
            "layer_norm_eps": 1e-12
        }"#;
        let config: EncoderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.hidden_size, 8);
        assert_eq!(config.max_position_embeddings, 32);
    }
}
