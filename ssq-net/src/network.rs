use ndarray::{Array1, Array2, Axis};
use rand::{Rng, RngExt};

/// Fully connected feed-forward network, sigmoid on every layer.
#[derive(Debug, Clone)]
pub struct Network {
    /// weights[l]: [size(l+1), size(l)]
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    /// Previous weight update of each layer, for momentum.
    changes: Vec<Array2<f64>>,
}

impl Network {
    /// `sizes` lists every layer, input and output included.
    /// Weights and biases start uniform in [-0.2, 0.2).
    pub fn new(sizes: &[usize], rng: &mut impl Rng) -> Self {
        let mut weights = Vec::with_capacity(sizes.len().saturating_sub(1));
        let mut biases = Vec::with_capacity(sizes.len().saturating_sub(1));
        let mut changes = Vec::with_capacity(sizes.len().saturating_sub(1));

        for pair in sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            weights.push(Array2::from_shape_fn((n_out, n_in), |_| {
                rng.random_range(-0.2..0.2)
            }));
            biases.push(Array1::from_shape_fn(n_out, |_| rng.random_range(-0.2..0.2)));
            changes.push(Array2::zeros((n_out, n_in)));
        }

        Network {
            weights,
            biases,
            changes,
        }
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.weights.iter().map(|w| w.nrows()).collect();
        if let Some(first) = self.weights.first() {
            sizes.insert(0, first.ncols());
        }
        sizes
    }

    pub fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        let mut out = input.clone();
        for (w, b) in self.weights.iter().zip(&self.biases) {
            out = (w.dot(&out) + b).mapv(sigmoid);
        }
        out
    }

    /// Outputs of every layer, the input included.
    fn activations(&self, input: &Array1<f64>) -> Vec<Array1<f64>> {
        let mut outs = Vec::with_capacity(self.weights.len() + 1);
        outs.push(input.clone());
        for (w, b) in self.weights.iter().zip(&self.biases) {
            let next = (w.dot(&outs[outs.len() - 1]) + b).mapv(sigmoid);
            outs.push(next);
        }
        outs
    }

    /// One back-propagation step on a single example. Returns the mean squared
    /// error of the output before the update.
    pub fn train_example(
        &mut self,
        input: &Array1<f64>,
        target: &Array1<f64>,
        learning_rate: f64,
        momentum: f64,
    ) -> f64 {
        let outs = self.activations(input);
        let n_layers = self.weights.len();
        let Some(output) = outs.last() else {
            return 0.0;
        };

        let error = target - output;
        let mse = error.mapv(|e| e * e).mean().unwrap_or(0.0);

        // Deltas are computed for every layer before any weight moves.
        let mut deltas: Vec<Array1<f64>> = vec![Array1::zeros(0); n_layers];
        let mut layer_error = error;
        for l in (0..n_layers).rev() {
            let out = &outs[l + 1];
            let delta = &layer_error * &out.mapv(|o| o * (1.0 - o));
            layer_error = self.weights[l].t().dot(&delta);
            deltas[l] = delta;
        }

        for l in 0..n_layers {
            let delta = &deltas[l];
            let grad = delta
                .view()
                .insert_axis(Axis(1))
                .dot(&outs[l].view().insert_axis(Axis(0)));
            let change = grad * learning_rate + &self.changes[l] * momentum;
            self.weights[l] += &change;
            self.changes[l] = change;
            self.biases[l].scaled_add(learning_rate, delta);
        }

        mse
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
