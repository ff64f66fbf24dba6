// ============================================================
// Layer 5 — Training Objectives
// ============================================================
// Differentiable losses over the decoder's probability tensor
// [batch, steps, K]:
//
//   pointer_nll_loss   warm-start phase: mean negative log-likelihood
//                      of the pointer labels (SENTINEL positions ignored)
//
//   reinforce_loss     policy-gradient phase:
//                      loss = -mean_b( Σ_t log p(a_bt) · reward_b )
//                      for actions sampled by Policy::select_action
//
// Actions and rewards come from the host; the log-probabilities are
// re-gathered from the tensor so gradients flow back into the decoder.

use burn::prelude::*;

use crate::domain::error::BindingError;

/// Floor applied before taking logs.
const MIN_PROB: f64 = 1e-12;

pub fn reinforce_loss<B: Backend>(
    probs:   Tensor<B, 3>,
    actions: &[Vec<i64>],
    rewards: &[f32],
) -> Result<Tensor<B, 1>, BindingError> {
    let [batch, steps, classes] = probs.dims();
    if actions.len() != batch || rewards.len() != batch || actions.iter().any(|r| r.len() != steps) {
        return Err(BindingError::ShapeMismatch(format!(
            "probs {:?} with {} action rows and {} rewards",
            [batch, steps, classes],
            actions.len(),
            rewards.len()
        )));
    }

    let mut index = Vec::with_capacity(batch * steps);
    let mut mask  = Vec::with_capacity(batch * steps);
    for &a in actions.iter().flatten() {
        if a < 0 {
            index.push(0i32);
            mask.push(0.0f32);
        } else if (a as usize) < classes {
            index.push(a as i32);
            mask.push(1.0);
        } else {
            return Err(BindingError::ConfigMismatch(format!(
                "action {a} outside {classes} classes"
            )));
        }
    }

    let device = probs.device();
    let index  = Tensor::<B, 1, Int>::from_ints(index.as_slice(), &device).reshape([batch, steps, 1]);
    let mask   = Tensor::<B, 1>::from_floats(mask.as_slice(), &device).reshape([batch, steps]);

    let chosen    = probs.gather(2, index).reshape([batch, steps]);
    let log_probs = (chosen.clamp_min(MIN_PROB).log() * mask).sum_dim(1).reshape([batch]);
    let rewards   = Tensor::<B, 1>::from_floats(rewards, &device);

    Ok((log_probs * rewards).mean().neg())
}

pub fn pointer_nll_loss<B: Backend>(
    probs:          Tensor<B, 3>,
    pointer_labels: Tensor<B, 2, Int>,
) -> Result<Tensor<B, 1>, BindingError> {
    let [batch, steps, _] = probs.dims();
    if pointer_labels.dims() != [batch, steps] {
        return Err(BindingError::ShapeMismatch(format!(
            "labels {:?} for probs {:?}",
            pointer_labels.dims(),
            probs.dims()
        )));
    }

    let mask  = pointer_labels.clone().greater_equal_elem(0).float();
    let index = pointer_labels.clamp_min(0).reshape([batch, steps, 1]);

    let chosen = probs.gather(2, index).reshape([batch, steps]);
    let nll    = (chosen.clamp_min(MIN_PROB).log() * mask.clone()).sum().neg();
    Ok(nll / mask.sum().clamp_min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index_space::SENTINEL;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::TensorData;

    type TestBackend = NdArray;
    type TestAutodiff = Autodiff<NdArray>;

    fn probs<B: Backend>() -> Tensor<B, 3> {
        let values = vec![0.5f32, 0.25, 0.25, 0.2, 0.2, 0.6];
        Tensor::from_data(TensorData::new(values, [1, 2, 3]), &Default::default())
    }

    fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    #[test]
    fn test_reinforce_loss_value() {
        let loss = reinforce_loss(probs::<TestBackend>(), &[vec![0, 2]], &[1.0]).unwrap();
        let expected = -(0.5f32.ln() + 0.6f32.ln());
        assert!((scalar(loss) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_reinforce_loss_ignores_masked_positions() {
        let loss = reinforce_loss(probs::<TestBackend>(), &[vec![0, SENTINEL]], &[1.0]).unwrap();
        assert!((scalar(loss) + 0.5f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_negative_reward_flips_sign() {
        let pos = scalar(reinforce_loss(probs::<TestBackend>(), &[vec![1, 1]], &[1.0]).unwrap());
        let neg = scalar(reinforce_loss(probs::<TestBackend>(), &[vec![1, 1]], &[-1.0]).unwrap());
        assert!((pos + neg).abs() < 1e-5);
        assert!(pos > 0.0);
    }

    #[test]
    fn test_reinforce_loss_shape_and_range_checks() {
        assert!(matches!(
            reinforce_loss(probs::<TestBackend>(), &[vec![0]], &[1.0]),
            Err(BindingError::ShapeMismatch(_))
        ));
        assert!(matches!(
            reinforce_loss(probs::<TestBackend>(), &[vec![0, 3]], &[1.0]),
            Err(BindingError::ConfigMismatch(_))
        ));
    }

    #[test]
    fn test_reinforce_gradient_reaches_probabilities() {
        let p = probs::<TestAutodiff>().require_grad();
        let loss  = reinforce_loss(p.clone(), &[vec![0, SENTINEL]], &[1.0]).unwrap();
        let grads = loss.backward();
        let grad: Vec<f32> = p.grad(&grads).unwrap().into_data().convert::<f32>().to_vec().unwrap();
        // d(-ln p)/dp = -1/p at the chosen entry, zero elsewhere
        assert!((grad[0] + 2.0).abs() < 1e-4);
        assert!(grad[1..].iter().all(|g| g.abs() < 1e-6));
    }

    #[test]
    fn test_pointer_nll_ignores_sentinel_labels() {
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, SENTINEL as i32].as_slice(), &Default::default())
            .reshape([1, 2]);
        let loss = pointer_nll_loss(probs::<TestBackend>(), labels).unwrap();
        assert!((scalar(loss) + 0.5f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_pointer_nll_all_padding_is_zero() {
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([SENTINEL as i32; 2].as_slice(), &Default::default())
            .reshape([1, 2]);
        let loss = pointer_nll_loss(probs::<TestBackend>(), labels).unwrap();
        assert!(scalar(loss).abs() < 1e-6);
    }
}
