use serde::{Deserialize, Serialize};

/// Rule turning a node's accumulated input into its output value.
///
/// Held as data on the network, so every node in a network reacts the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Activation {
    /// `(sum + bias) / received`, the mean of everything the node received this pass.
    /// A node that received nothing yields its bias alone.
    #[default]
    Mean,
    /// `sum + bias`
    Identity,
    /// `tanh(sum + bias)`
    Tanh,
    /// `1 / (1 + exp(-(sum + bias)))`
    Sigmoid,
}

impl Activation {
    /// Apply the rule to one node's pass state
    pub fn activate(&self, sum: f32, received: u32, bias: f32) -> f32 {
        match self {
            Self::Mean => {
                if received == 0 {
                    bias
                } else {
                    (sum + bias) / received as f32
                }
            }
            Self::Identity => sum + bias,
            Self::Tanh => (sum + bias).tanh(),
            Self::Sigmoid => 1.0 / (1.0 + (-(sum + bias)).exp()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_divides_by_received_count() {
        assert_eq!(Activation::Mean.activate(3.0, 2, 0.0), 1.5);
        assert_eq!(Activation::Mean.activate(3.0, 2, 1.0), 2.0);
        assert_eq!(Activation::Mean.activate(-4.0, 4, 0.0), -1.0);
    }

    #[test]
    fn test_mean_with_no_inputs_is_bias_only() {
        assert_eq!(Activation::Mean.activate(0.0, 0, 0.0), 0.0);
        assert_eq!(Activation::Mean.activate(0.0, 0, 0.25), 0.25);
        assert!(Activation::Mean.activate(0.0, 0, -0.5).is_finite());
    }

    #[test]
    fn test_other_activations() {
        assert_eq!(Activation::Identity.activate(2.0, 5, 1.0), 3.0);
        assert!(Activation::Tanh.activate(0.0, 0, 0.0).abs() < 0.001);
        assert!((Activation::Tanh.activate(2.0, 1, 0.0) - 0.9640).abs() < 0.001);
        assert!((Activation::Sigmoid.activate(0.0, 3, 0.0) - 0.5).abs() < 0.001);
        assert!((Activation::Sigmoid.activate(4.0, 1, 0.0) - 0.9820).abs() < 0.001);
    }

    #[test]
    fn test_default_is_mean() {
        assert_eq!(Activation::default(), Activation::Mean);
    }
}
