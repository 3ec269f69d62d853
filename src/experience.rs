use candle_core::Tensor;

/// One recorded environment step. Tensors are reference counted, so cloning a
/// transition never copies pixel data.
#[derive(Debug, Clone)]
pub struct Transition {
    pub observation: Tensor,
    pub action: usize,
    pub reward: f32,
    pub next_observation: Tensor,
    pub done: bool,
}
