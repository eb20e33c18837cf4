// Dense feed-forward network for the optimization predictor (spec.md §4.5).
// No direct teacher analogue — `jounce` has no learned component — so this
// is built fresh in the teacher's module style: explicit `struct`+`impl`,
// `Result`-returning fallible constructors, a `Default`-free but
// preset-style constructor set, plain `Vec<Vec<f64>>` matrices (the network
// is tiny, 50x128x64x32x7, so no linear-algebra crate is warranted — the
// same call `wasm_optimizer.rs` makes hand-rolling its own layout math
// instead of reaching for a crate).

use serde::{Deserialize, Serialize};

/// Minimal deterministic PRNG (xorshift64*) so Xavier initialization and
/// epoch shuffling are reproducible from a seed without pulling in a `rand`
/// dependency the teacher's stack doesn't carry.
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform float in `[-limit, limit]`.
    pub fn uniform(&mut self, limit: f64) -> f64 {
        (self.next_f64() * 2.0 - 1.0) * limit
    }

    /// Fisher-Yates shuffle, in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_f64() * (i as f64 + 1.0)) as usize;
            items.swap(i, j.min(i));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    ReLU,
    Linear,
}

impl Activation {
    fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Linear => x,
        }
    }

    /// Derivative with respect to the pre-activation value (spec.md §4.5):
    /// ReLU is 1 where the pre-activation was positive, else 0; Linear is
    /// always 1.
    fn derivative(&self, pre_activation: f64) -> f64 {
        match self {
            Activation::ReLU => {
                if pre_activation > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Linear => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// `weights[out][in]`.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
    pub activation: Activation,
}

impl Layer {
    fn new(in_dim: usize, out_dim: usize, activation: Activation, rng: &mut Rng) -> Self {
        let limit = (6.0 / (in_dim + out_dim) as f64).sqrt();
        let weights = (0..out_dim).map(|_| (0..in_dim).map(|_| rng.uniform(limit)).collect()).collect();
        let biases = vec![0.0; out_dim];
        Layer { weights, biases, activation }
    }

    fn in_dim(&self) -> usize {
        self.weights.first().map(|row| row.len()).unwrap_or(0)
    }

    fn out_dim(&self) -> usize {
        self.weights.len()
    }

    /// Returns `(pre_activations, activations)` for this layer given `input`.
    fn forward(&self, input: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let pre: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect();
        let post: Vec<f64> = pre.iter().map(|&p| self.activation.apply(p)).collect();
        (pre, post)
    }
}

/// A sequence of dense layers mapping a fixed-length input to a fixed-length
/// output (spec.md §3). Default shape `[50, 128, 64, 32, 7]`: hidden layers
/// use `ReLU`, the output layer uses `Linear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNetwork {
    pub layers: Vec<Layer>,
    pub learning_rate: f64,
}

impl NeuralNetwork {
    /// Builds a network for `shape` (e.g. `[50, 128, 64, 32, 7]`), seeding
    /// Xavier-initialized weights deterministically from `seed`. Every
    /// hidden layer is `ReLU`; the final layer is `Linear`.
    pub fn new(shape: &[usize], learning_rate: f64, seed: u64) -> Self {
        assert!(shape.len() >= 2, "network needs at least an input and output layer");
        let mut rng = Rng::new(seed);
        let last = shape.len() - 2;
        let layers = shape
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let activation = if i == last { Activation::Linear } else { Activation::ReLU };
                Layer::new(pair[0], pair[1], activation, &mut rng)
            })
            .collect();
        NeuralNetwork { layers, learning_rate }
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.in_dim()).unwrap_or(0)
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim()).unwrap_or(0)
    }

    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.forward_cache(input).1.last().cloned().unwrap_or_default()
    }

    /// Returns `(pre_activations per layer, activations per layer including
    /// the input as activations[0])`.
    fn forward_cache(&self, input: &[f64]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        let mut current = input.to_vec();
        for layer in &self.layers {
            let (pre, post) = layer.forward(&current);
            pre_activations.push(pre);
            activations.push(post.clone());
            current = post;
        }
        (pre_activations, activations)
    }

    /// One SGD step over `(input, target)`: forward pass, backward pass with
    /// the chain rule and elementwise gradient clamping to `[-1, 1]`
    /// (non-finite gradients become 0), weight/bias updates accumulated and
    /// applied only after every layer's gradient is computed — so each
    /// layer's backward pass reads pre-update weights (spec.md §4.5).
    /// Returns the mean squared error before the update.
    pub fn train_step(&mut self, input: &[f64], target: &[f64]) -> f64 {
        let (pre_activations, activations) = self.forward_cache(input);
        let output = activations.last().unwrap();

        let mse = output.iter().zip(target).map(|(o, t)| (o - t).powi(2)).sum::<f64>() / output.len().max(1) as f64;

        let n = output.len().max(1) as f64;
        let mut delta: Vec<f64> = output
            .iter()
            .zip(target)
            .zip(&pre_activations[self.layers.len() - 1])
            .map(|((o, t), pre)| clamp_grad((2.0 / n) * (o - t) * self.layers[self.layers.len() - 1].activation.derivative(*pre)))
            .collect();

        let mut weight_grads: Vec<Vec<Vec<f64>>> = Vec::with_capacity(self.layers.len());
        let mut bias_grads: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());

        for layer_idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[layer_idx];
            let layer_input = &activations[layer_idx];

            let w_grad: Vec<Vec<f64>> = delta
                .iter()
                .map(|d| layer_input.iter().map(|x| clamp_grad(d * x)).collect())
                .collect();
            let b_grad: Vec<f64> = delta.clone();

            if layer_idx > 0 {
                let prev_layer = &self.layers[layer_idx - 1];
                let prev_pre = &pre_activations[layer_idx - 1];
                let mut next_delta = vec![0.0; layer.in_dim()];
                for (out_idx, d) in delta.iter().enumerate() {
                    for (in_idx, w) in layer.weights[out_idx].iter().enumerate() {
                        next_delta[in_idx] += w * d;
                    }
                }
                delta = next_delta
                    .iter()
                    .zip(prev_pre)
                    .map(|(d, pre)| clamp_grad(d * prev_layer.activation.derivative(*pre)))
                    .collect();
            }

            weight_grads.push(w_grad);
            bias_grads.push(b_grad);
        }

        weight_grads.reverse();
        bias_grads.reverse();

        let lr = self.learning_rate;
        for (layer, (w_grad, b_grad)) in self.layers.iter_mut().zip(weight_grads.into_iter().zip(bias_grads)) {
            for (row, grad_row) in layer.weights.iter_mut().zip(&w_grad) {
                for (w, g) in row.iter_mut().zip(grad_row) {
                    *w -= lr * g;
                }
            }
            for (b, g) in layer.biases.iter_mut().zip(&b_grad) {
                *b -= lr * g;
            }
        }

        mse
    }

    /// Trains for `epochs` passes over `dataset`, reshuffling each epoch
    /// using `seed` (deterministic: identical seed and dataset always
    /// produce identical final weights). Returns the mean squared error
    /// observed over each epoch, averaged across its examples.
    pub fn train_batch(&mut self, dataset: &[(Vec<f64>, Vec<f64>)], epochs: usize, seed: u64) -> Vec<f64> {
        let mut rng = Rng::new(seed);
        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        let mut epoch_mse = Vec::with_capacity(epochs);

        for _ in 0..epochs {
            rng.shuffle(&mut indices);
            let mut total = 0.0;
            for &i in &indices {
                let (input, target) = &dataset[i];
                total += self.train_step(input, target);
            }
            epoch_mse.push(if indices.is_empty() { 0.0 } else { total / indices.len() as f64 });
        }

        epoch_mse
    }
}

fn clamp_grad(g: f64) -> f64 {
    if !g.is_finite() {
        0.0
    } else {
        g.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_output_matches_configured_dimension() {
        let net = NeuralNetwork::new(&[50, 128, 64, 32, 7], 1e-3, 42);
        let input = vec![0.5; 50];
        let output = net.forward(&input);
        assert_eq!(output.len(), 7);
        assert!(output.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn xavier_weights_are_finite_and_bounded() {
        let net = NeuralNetwork::new(&[4, 3, 2], 1e-3, 7);
        for layer in &net.layers {
            for row in &layer.weights {
                for &w in row {
                    assert!(w.is_finite());
                    assert!(w.abs() <= 2.0);
                }
            }
        }
    }

    #[test]
    fn same_seed_gives_bit_identical_weights() {
        let a = NeuralNetwork::new(&[10, 8, 3], 1e-3, 99);
        let b = NeuralNetwork::new(&[10, 8, 3], 1e-3, 99);
        for (la, lb) in a.layers.iter().zip(&b.layers) {
            assert_eq!(la.weights, lb.weights);
        }
    }

    #[test]
    fn training_reduces_mse_over_epochs() {
        let mut net = NeuralNetwork::new(&[3, 6, 2], 0.05, 1);
        let dataset = vec![
            (vec![1.0, 0.0, 0.0], vec![1.0, 0.0]),
            (vec![0.0, 1.0, 0.0], vec![0.0, 1.0]),
            (vec![0.0, 0.0, 1.0], vec![1.0, 1.0]),
        ];
        let mse = net.train_batch(&dataset, 100, 42);
        assert!(mse.last().unwrap() < &mse.first().unwrap());
    }

    #[test]
    fn same_seed_and_dataset_reproduce_identical_weights() {
        let dataset = vec![(vec![1.0, 0.0, 0.0], vec![1.0, 0.0]), (vec![0.0, 1.0, 0.0], vec![0.0, 1.0])];
        let mut a = NeuralNetwork::new(&[3, 5, 2], 0.01, 5);
        let mut b = NeuralNetwork::new(&[3, 5, 2], 0.01, 5);
        a.train_batch(&dataset, 10, 123);
        b.train_batch(&dataset, 10, 123);
        for (la, lb) in a.layers.iter().zip(&b.layers) {
            assert_eq!(la.weights, lb.weights);
            assert_eq!(la.biases, lb.biases);
        }
    }

    #[test]
    fn non_finite_gradients_are_clamped_to_zero() {
        assert_eq!(clamp_grad(f64::NAN), 0.0);
        assert_eq!(clamp_grad(f64::INFINITY), 0.0);
        assert_eq!(clamp_grad(5.0), 1.0);
        assert_eq!(clamp_grad(-5.0), -1.0);
    }
}
