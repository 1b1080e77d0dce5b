//! Fixed-topology two-layer perceptron.

use ndarray::{Array1, Array2};

use super::{Activation, NeuralGenomeData, Topology};
use crate::simulation::error::ValidationError;

/// Decoded two-layer network: input → hidden (configurable activation) →
/// output (tanh).
#[derive(Debug, Clone, PartialEq)]
pub struct FixedNetwork {
    /// Layer sizes.
    pub topology: Topology,
    /// Hidden activation.
    pub activation: Activation,
    /// Input→hidden weights (`input_size` × `hidden_size`).
    pub w_ih: Array2<f32>,
    /// Hidden biases.
    pub b_h: Array1<f32>,
    /// Hidden→output weights (`hidden_size` × `output_size`).
    pub w_ho: Array2<f32>,
    /// Output biases.
    pub b_o: Array1<f32>,
}

impl FixedNetwork {
    /// Rebuilds the layer matrices from a flat weight vector.
    pub fn from_genome(data: &NeuralGenomeData) -> Result<Self, ValidationError> {
        data.validate()?;
        let Topology {
            input_size,
            hidden_size,
            output_size,
        } = data.topology;
        let shape_error = || ValidationError::WeightCount {
            expected: data.topology.weight_count(),
            actual: data.weights.len(),
        };

        let mut offset = 0;
        let mut take = |len: usize| {
            let slice = &data.weights[offset..offset + len];
            offset += len;
            slice.to_vec()
        };

        let w_ih = Array2::from_shape_vec((input_size, hidden_size), take(input_size * hidden_size))
            .map_err(|_| shape_error())?;
        let b_h = Array1::from_vec(take(hidden_size));
        let w_ho =
            Array2::from_shape_vec((hidden_size, output_size), take(hidden_size * output_size))
                .map_err(|_| shape_error())?;
        let b_o = Array1::from_vec(take(output_size));

        Ok(Self {
            topology: data.topology,
            activation: data.activation,
            w_ih,
            b_h,
            w_ho,
            b_o,
        })
    }

    /// Flattens the network back into canonical order.
    pub fn to_genome(&self) -> NeuralGenomeData {
        let mut weights = Vec::with_capacity(self.topology.weight_count());
        weights.extend(self.w_ih.iter().copied());
        weights.extend(self.b_h.iter().copied());
        weights.extend(self.w_ho.iter().copied());
        weights.extend(self.b_o.iter().copied());
        NeuralGenomeData {
            topology: self.topology,
            weights,
            activation: self.activation,
        }
    }

    /// Forward pass.
    #[inline]
    pub fn forward(&self, inputs: &Array1<f32>) -> Array1<f32> {
        self.forward_traced(inputs).1
    }

    /// Forward pass returning `(hidden, output)` activations.
    pub fn forward_traced(&self, inputs: &Array1<f32>) -> (Array1<f32>, Array1<f32>) {
        debug_assert_eq!(inputs.len(), self.topology.input_size);

        let mut hidden = inputs.dot(&self.w_ih);
        hidden += &self.b_h;
        let activation = self.activation;
        hidden.mapv_inplace(|h| activation.apply(h));

        let mut output = hidden.dot(&self.w_ho);
        output += &self.b_o;
        output.mapv_inplace(f32::tanh);
        (hidden, output)
    }
}
