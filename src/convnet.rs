use std::collections::BTreeMap;

use candle_core::{DType, Tensor, backprop::GradStore};
use candle_nn::{Conv2d, Conv2dConfig, Linear, Module, Optimizer, VarBuilder, VarMap, conv2d, linear};
use candle_optimisers::rmsprop::{ParamsRMSprop, RMSprop};

use crate::{
    device::DEVICE,
    error::{AgentError, Result},
};

/// Spatial size the network accepts; four stride-2 convolutions take it to 3x3.
pub const INPUT_SIZE: usize = 42;
const FILTERS: usize = 32;
const FEATURE_SIZE: usize = 3;

/// Q-network: four strided 3x3 convolutions with ELU activations, then a
/// linear head producing one value per action.
pub struct ConvNet {
    convs: Vec<Conv2d>,
    fc: Linear,
    num_channels: usize,
    num_actions: usize,
    pub var_map: VarMap,
    pub optimiser: RMSprop,
}

impl ConvNet {
    pub fn new(num_channels: usize, num_actions: usize, learning_rate: f64) -> Result<Self> {
        let vm = VarMap::new();
        let vb = VarBuilder::from_varmap(&vm, DType::F32, &DEVICE);
        let cfg = Conv2dConfig {
            padding: 1,
            stride: 2,
            ..Default::default()
        };

        let mut convs = Vec::with_capacity(4);
        let mut in_channels = num_channels;
        for i in 1..=4 {
            convs.push(conv2d(in_channels, FILTERS, 3, cfg, vb.pp(format!("conv{i}")))?);
            in_channels = FILTERS;
        }
        let fc = linear(FILTERS * FEATURE_SIZE * FEATURE_SIZE, num_actions, vb.pp("fc"))?;

        let optimiser = RMSprop::new(
            vm.all_vars(),
            ParamsRMSprop {
                lr: learning_rate,
                ..Default::default()
            },
        )?;

        Ok(Self {
            convs,
            fc,
            num_channels,
            num_actions,
            var_map: vm,
            optimiser,
        })
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Maps a `(batch, channels, 42, 42)` batch to `(batch, num_actions)`.
    /// Any other input shape is rejected before touching the weights.
    pub fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let dims = inputs.dims();
        if dims.len() != 4
            || dims[1] != self.num_channels
            || dims[2] != INPUT_SIZE
            || dims[3] != INPUT_SIZE
        {
            return Err(AgentError::ShapeMismatch {
                expected: vec![dims.first().copied().unwrap_or(0), self.num_channels, INPUT_SIZE, INPUT_SIZE],
                actual: dims.to_vec(),
            });
        }

        let mut x = inputs.clone();
        for conv in &self.convs {
            x = conv.forward(&x)?.elu(1.0)?;
        }
        let x = x.flatten_from(1)?;
        Ok(self.fc.forward(&x)?)
    }

    /// Copies every parameter out by name.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        let vars = self
            .var_map
            .data()
            .lock()
            .map_err(|_| AgentError::PoisonedParameters)?;
        let mut out = BTreeMap::new();
        for (name, var) in vars.iter() {
            out.insert(name.clone(), var.as_tensor().flatten_all()?.to_vec1::<f32>()?);
        }
        Ok(out)
    }
}

/// Returns the global L2 norm of the gradients in `grad_store`. When
/// `max_norm` is set and exceeded, every gradient is rescaled in place so the
/// global norm equals `max_norm`.
pub fn clip_gradients(
    grad_store: &mut GradStore,
    var_map: &VarMap,
    max_norm: Option<f32>,
) -> Result<f32> {
    let mut total_norm_sq: f32 = 0.0;
    let mut grads = vec![];

    for var in var_map.all_vars() {
        if let Some(grad) = grad_store.get(var.as_tensor()) {
            total_norm_sq += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            grads.push((var, grad.clone()));
        }
    }

    let total_norm = total_norm_sq.sqrt();
    if let Some(max_norm) = max_norm {
        if total_norm > max_norm {
            let scale = f64::from(max_norm / total_norm);
            for (var, grad) in grads {
                grad_store.insert(var.as_tensor(), grad.affine(scale, 0.0)?);
            }
        }
    }

    Ok(total_norm)
}
