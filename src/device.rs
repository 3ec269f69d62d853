use candle_core::Device;
use once_cell::sync::Lazy;
use tracing::{info, warn};

/// Device every tensor in the crate lives on. CUDA device 0 when the build
/// and the machine support it, otherwise the CPU.
pub static DEVICE: Lazy<Device> = Lazy::new(|| match Device::new_cuda(0) {
    Ok(device) => {
        info!("initialized CUDA device");
        device
    }
    Err(err) => {
        warn!(error = %err, "failed to initialize CUDA device, falling back to CPU");
        Device::Cpu
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_is_usable() {
        let t = candle_core::Tensor::new(&[1f32, 2.0], &DEVICE).unwrap();
        assert_eq!(t.to_vec1::<f32>().unwrap(), vec![1.0, 2.0]);
    }
}
