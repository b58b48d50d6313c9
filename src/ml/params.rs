// ============================================================
// ML - Named parameters
// ============================================================
// Flat "path.to.param" → ParamId listing of the model, used to
// split parameters into weight-decay groups.
//
// Naming follows the module field names, so a layer norm
// contributes `<path>.gamma` (scale) and `<path>.beta` (bias).

use burn::{
    module::ParamId,
    nn::{Embedding, LayerNorm, Linear},
    prelude::*,
};

#[derive(Debug, Clone)]
pub struct NamedParam {
    pub name: String,
    pub id:   ParamId,
    pub rank: usize,
}

impl NamedParam {
    fn new(name: String, id: ParamId, rank: usize) -> Self {
        Self { name, id, rank }
    }

    /// Last path segment: `weight`, `bias`, `gamma`, `beta`.
    pub fn leaf(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

pub fn linear_params<B: Backend>(prefix: &str, linear: &Linear<B>, out: &mut Vec<NamedParam>) {
    out.push(NamedParam::new(format!("{prefix}.weight"), linear.weight.id, 2));
    if let Some(bias) = &linear.bias {
        out.push(NamedParam::new(format!("{prefix}.bias"), bias.id, 1));
    }
}

pub fn layer_norm_params<B: Backend>(prefix: &str, norm: &LayerNorm<B>, out: &mut Vec<NamedParam>) {
    out.push(NamedParam::new(format!("{prefix}.gamma"), norm.gamma.id, 1));
    out.push(NamedParam::new(format!("{prefix}.beta"), norm.beta.id, 1));
}

pub fn embedding_params<B: Backend>(prefix: &str, embedding: &Embedding<B>, out: &mut Vec<NamedParam>) {
    out.push(NamedParam::new(format!("{prefix}.weight"), embedding.weight.id, 2));
}
