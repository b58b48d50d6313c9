// ============================================================
// ML - Optimizer / Schedule Setup
// ============================================================
// Two parameter groups, each driven by its own AdamW:
//   no-decay → biases and layer-norm gamma/beta, weight decay 0.0
//   decay    → everything else,                  weight decay 0.01
//
// With warmup, the learning rate ramps linearly from 0 over
// the first warmup_fraction of all steps, then decays linearly
// back to 0 at the last step.
//
// Every training call builds a fresh OptimizerSetup and owns it;
// nothing is attached to the model wrapper.

use std::marker::PhantomData;

use burn::{
    module::ParamId,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
};

use crate::error::{HarnessError, Result};
use crate::ml::model::TextEncoderModel;
use crate::ml::params::NamedParam;

pub const WEIGHT_DECAY: f32 = 0.01;
pub const DEFAULT_WARMUP_FRACTION: f64 = 0.1;
const ADAM_EPSILON: f32 = 1e-6;

/// Leaf names that are excluded from weight decay.
const NO_DECAY: [&str; 3] = ["bias", "beta", "gamma"];

#[derive(Debug, Clone)]
pub struct OptimizerSpec {
    pub lr:              f64,
    pub warmup:          bool,
    pub epochs:          Option<usize>,
    pub batch_count:     Option<usize>,
    pub warmup_fraction: f64,
}

impl OptimizerSpec {
    pub fn new(lr: f64) -> Self {
        Self {
            lr,
            warmup: false,
            epochs: None,
            batch_count: None,
            warmup_fraction: DEFAULT_WARMUP_FRACTION,
        }
    }

    pub fn with_warmup(mut self, epochs: usize, batch_count: usize) -> Self {
        self.warmup = true;
        self.epochs = Some(epochs);
        self.batch_count = Some(batch_count);
        self
    }

    pub fn with_warmup_fraction(mut self, fraction: f64) -> Self {
        self.warmup_fraction = fraction;
        self
    }
}

// ─── Parameter groups ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct ParamGroups {
    pub decay:    Vec<ParamId>,
    /// All rank-1 tensors
    pub no_decay: Vec<ParamId>,
}

pub fn param_groups(params: &[NamedParam]) -> ParamGroups {
    let mut groups = ParamGroups::default();
    for param in params {
        if NO_DECAY.contains(&param.leaf()) {
            groups.no_decay.push(param.id);
        } else {
            groups.decay.push(param.id);
        }
    }
    groups
}

// ─── Warmup schedule ──────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct WarmupLinearSchedule {
    warmup_steps: f64,
    total_steps:  f64,
    step:         usize,
}

impl WarmupLinearSchedule {
    pub fn new(total_steps: usize, warmup_fraction: f64) -> Self {
        let total_steps = total_steps as f64;
        Self {
            warmup_steps: total_steps * warmup_fraction,
            total_steps,
            step: 0,
        }
    }

    /// LR multiplier at `step`.
    pub fn factor(&self, step: usize) -> f64 {
        let step = step as f64;
        if step < self.warmup_steps {
            step / self.warmup_steps.max(1.0)
        } else {
            ((self.total_steps - step) / (self.total_steps - self.warmup_steps).max(1.0)).max(0.0)
        }
    }

    pub fn current_factor(&self) -> f64 {
        self.factor(self.step)
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }

    pub fn steps_taken(&self) -> usize {
        self.step
    }

    pub fn warmup_steps(&self) -> f64 {
        self.warmup_steps
    }
}

// ─── OptimizerSetup ───────────────────────────────────────────────────────────
pub struct OptimizerSetup<B: AutodiffBackend, O> {
    decayed:   O,
    undecayed: O,
    no_decay:  Vec<ParamId>,
    lr:        f64,
    schedule:  Option<WarmupLinearSchedule>,
    _backend:  PhantomData<B>,
}

impl<B, O> OptimizerSetup<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TextEncoderModel<B>, B>,
{
    /// Learning rate applied by the next step.
    pub fn current_lr(&self) -> f64 {
        match &self.schedule {
            Some(schedule) => self.lr * schedule.current_factor(),
            None => self.lr,
        }
    }

    pub fn schedule(&self) -> Option<&WarmupLinearSchedule> {
        self.schedule.as_ref()
    }

    /// Apply one update to both groups, then advance the schedule.
    pub fn step(
        &mut self,
        model:     TextEncoderModel<B>,
        mut grads: GradientsParams,
    ) -> TextEncoderModel<B> {
        let lr = self.current_lr();

        let mut undecayed_grads = GradientsParams::new();
        for &id in &self.no_decay {
            if let Some(grad) = grads.remove::<B::InnerBackend, 1>(id) {
                undecayed_grads.register::<B::InnerBackend, 1>(id, grad);
            }
        }

        let model = self.decayed.step(lr, model, grads);
        let model = self.undecayed.step(lr, model, undecayed_grads);

        if let Some(schedule) = self.schedule.as_mut() {
            schedule.advance();
        }
        model
    }
}

fn adamw<B: AutodiffBackend>(weight_decay: f32) -> impl Optimizer<TextEncoderModel<B>, B> {
    AdamWConfig::new()
        .with_weight_decay(weight_decay)
        .with_epsilon(ADAM_EPSILON)
        .init::<B, TextEncoderModel<B>>()
}

/// Build the grouped AdamW and, when warmup is requested, the schedule.
pub fn setup_optimizer<B: AutodiffBackend>(
    model: &TextEncoderModel<B>,
    spec:  &OptimizerSpec,
) -> Result<OptimizerSetup<B, impl Optimizer<TextEncoderModel<B>, B>>> {
    if !(spec.lr.is_finite() && spec.lr > 0.0) {
        return Err(HarnessError::config(format!("learning rate must be positive, got {}", spec.lr)));
    }

    let schedule = if spec.warmup {
        let (epochs, batch_count) = spec.epochs.zip(spec.batch_count).ok_or_else(|| {
            HarnessError::config("warmup requires both the epoch count and the batch count")
        })?;
        if !(0.0..=1.0).contains(&spec.warmup_fraction) {
            return Err(HarnessError::config(format!(
                "warmup_fraction must be in [0, 1], got {}",
                spec.warmup_fraction
            )));
        }
        Some(WarmupLinearSchedule::new(batch_count * epochs, spec.warmup_fraction))
    } else {
        None
    };

    let groups = param_groups(&model.named_params());
    tracing::debug!(
        "Optimizer groups: {} decayed, {} without decay, warmup={}",
        groups.decay.len(),
        groups.no_decay.len(),
        spec.warmup
    );

    Ok(OptimizerSetup {
        decayed:   adamw::<B>(WEIGHT_DECAY),
        undecayed: adamw::<B>(0.0),
        no_decay:  groups.no_decay,
        lr:        spec.lr,
        schedule,
        _backend:  PhantomData,
    })
}
