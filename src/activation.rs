//! The catalog of activation functions a neuron can carry.
//!
//! Every function is a unit variant of [`ActivationFunction`]. Behaviour is selected by a single
//! `match` per operation, so adding a variant forces every operation to handle it.
//!
//! Functions come in two families:
//! - *integrating* functions transform the neuron's pre-activation value (weighted sum plus bias)
//!   via [`ActivationFunction::apply`],
//! - *non-integrating* functions (`and`, `or`, `xor`, `multiply`, `divide`, `power`) consume the raw
//!   per-connection signals via [`ActivationFunction::apply_vector`].
//!
//! Outputs never leave `[min_value, max_value]` for finite input.
use std::fmt;

const F32_MAX: f64 = f32::MAX as f64;
const STEEP_SLOPE: f64 = 4.9;
const BIPOLAR_SLOPE: f64 = 2.0;
const GAUSSIAN_SLOPE: f64 = 1.0;
const ELU_ALPHA: f64 = 1.0;
// widened from single precision
const EVSAIL_SEPARATION: f64 = 0.3_f32 as f64;
const EVSAIL_DENOMINATOR: f64 = 2. * EVSAIL_SEPARATION * EVSAIL_SEPARATION;
const INVERSE_ABS_SLOPE: f64 = 0.3_f32 as f64;
const RECIPROCAL_MAX: f64 = f64::MAX * 0.1;

/// A named, stateless transfer function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationFunction {
    Linear,
    NegatedLinear,
    ClampedLinear,
    SignedClampedLinear,
    /// Clamps to `[0, 1]` and stretches the result onto `[-1, 1]`.
    ConvertToSigned,
    Sigmoid,
    SteepSigmoid,
    BipolarSigmoid,
    /// Piecewise quadratic approximation of the sigmoid.
    EvSailSigmoid,
    Tanh,
    TanhCubic,
    Absolute,
    ClampedAbsolute,
    InverseAbs,
    Gaussian,
    Sine,
    Cosine,
    Step,
    SignedStep,
    /// Signed square root: `sign(x) * sqrt(|x|)`.
    Sqrt,
    /// Identity on `[-1, 1]`, signed square root outside.
    SqrtAndLinear,
    Reciprocal,
    ExponentialLinear,
    Rectifier,
    And,
    Or,
    Xor,
    Multiply,
    Divide,
    Power,
}

use self::ActivationFunction::*;

impl ActivationFunction {
    /// Every function of the catalog.
    pub const ALL: [ActivationFunction; 30] = [
        Linear,
        NegatedLinear,
        ClampedLinear,
        SignedClampedLinear,
        ConvertToSigned,
        Sigmoid,
        SteepSigmoid,
        BipolarSigmoid,
        EvSailSigmoid,
        Tanh,
        TanhCubic,
        Absolute,
        ClampedAbsolute,
        InverseAbs,
        Gaussian,
        Sine,
        Cosine,
        Step,
        SignedStep,
        Sqrt,
        SqrtAndLinear,
        Reciprocal,
        ExponentialLinear,
        Rectifier,
        And,
        Or,
        Xor,
        Multiply,
        Divide,
        Power,
    ];

    /// The identifier stored in genotypes. Never rename an existing entry.
    pub fn name(self) -> &'static str {
        match self {
            Linear => "linear",
            NegatedLinear => "negated-linear",
            ClampedLinear => "clamped-linear",
            SignedClampedLinear => "signed-clamped-linear",
            ConvertToSigned => "sign",
            Sigmoid => "sigmoid",
            SteepSigmoid => "sigmoid-steep",
            BipolarSigmoid => "sigmoid-bipolar",
            EvSailSigmoid => "evsail-sigmoid",
            Tanh => "tanh",
            TanhCubic => "tanh-cubic",
            Absolute => "absolute",
            ClampedAbsolute => "clamped-absolute",
            InverseAbs => "inverse-abs",
            Gaussian => "gaussian",
            Sine => "sine",
            Cosine => "cosine",
            Step => "step",
            SignedStep => "signed-step",
            Sqrt => "sqrt",
            SqrtAndLinear => "sqrt-linear",
            Reciprocal => "reciprocal",
            ExponentialLinear => "elu",
            Rectifier => "relu",
            And => "and",
            Or => "or",
            Xor => "xor",
            Multiply => "multiply",
            Divide => "divide",
            Power => "power",
        }
    }

    /// The long-form identifier older genotypes were written with.
    ///
    /// Spelling mistakes are part of the persisted format and kept as is.
    pub fn legacy_name(self) -> &'static str {
        match self {
            Linear => "LinearActivationFunction",
            NegatedLinear => "NegatedLinearActivationFunction",
            ClampedLinear => "ClampedLinearActivationFunction",
            SignedClampedLinear => "SignedClampedLinearActivationFunction",
            ConvertToSigned => "ConvertToSignedActivationFunction",
            Sigmoid => "SigmoidActivationFunction",
            SteepSigmoid => "SteepSigmoidActivationFunction",
            BipolarSigmoid => "BipolarSigmoidActivationFunction",
            EvSailSigmoid => "EvSailSigmoidActivationFunction",
            Tanh => "TanhActivationFunction",
            TanhCubic => "TanhCubicActivationFunction",
            Absolute => "AbsoluteActivationFunction",
            ClampedAbsolute => "ClampedAbsoluteActivationFunction",
            InverseAbs => "InverseAbsActivationFunction",
            Gaussian => "GaussianActivationFunction",
            Sine => "SineActivationFunction",
            Cosine => "CosineActivationFunction",
            Step => "StepActivationFunction",
            SignedStep => "SignedStepActivationFunction",
            Sqrt => "SqrtActivationFunction",
            SqrtAndLinear => "SqrtAndLinearActivationFunction",
            Reciprocal => "RecipriocalActivationFunction",
            ExponentialLinear => "ExponentialLinearFunction",
            Rectifier => "RectifierActivationFunction",
            And => "LogicAndActivationFunction",
            Or => "LogicOrActivationFunction",
            Xor => "LogicXORActivationFunction",
            Multiply => "MultiplyActivationFunction",
            Divide => "DivideActivationFunction",
            Power => "PowerActivationFunction",
        }
    }

    /// Whether the function works on the summed input (`apply`) rather than on the raw signals.
    pub fn is_integrating(self) -> bool {
        !matches!(self, And | Or | Xor | Multiply | Divide | Power)
    }

    /// Whether [`derivative`](Self::derivative) returns a value.
    pub fn is_differentiable(self) -> bool {
        self.is_integrating()
    }

    /// Upper bound of every value the function produces.
    pub fn max_value(self) -> f64 {
        match self {
            Linear | NegatedLinear | Absolute | Rectifier | Divide => F32_MAX,
            Sqrt | SqrtAndLinear | ExponentialLinear | Multiply | Power => f64::MAX,
            Reciprocal => RECIPROCAL_MAX,
            _ => 1.,
        }
    }

    /// Lower bound of every value the function produces.
    pub fn min_value(self) -> f64 {
        match self {
            Linear | NegatedLinear | Divide => -F32_MAX,
            Sqrt | SqrtAndLinear | Multiply | Power => -f64::MAX,
            Reciprocal => -RECIPROCAL_MAX,
            ExponentialLinear => -ELU_ALPHA,
            SignedClampedLinear | ConvertToSigned | BipolarSigmoid | Tanh | TanhCubic | Sine
            | Cosine | SignedStep => -1.,
            _ => 0.,
        }
    }

    /// Relative evaluation cost, used by callers as a resource budget signal.
    pub fn cost(self) -> u64 {
        match self {
            Sigmoid | SteepSigmoid | BipolarSigmoid => 497,
            Tanh => 385,
            TanhCubic => 1231,
            EvSailSigmoid => 166,
            InverseAbs | Sqrt | SqrtAndLinear | Reciprocal | Power => 75,
            Step | SignedStep => 40,
            _ => 42,
        }
    }

    /// Transform a pre-activation value.
    ///
    /// Non-integrating functions return 0, they are only meaningful through
    /// [`apply_vector`](Self::apply_vector).
    pub fn apply(self, x: f64) -> f64 {
        let y = match self {
            Linear => x,
            NegatedLinear => -x,
            ClampedLinear => {
                if x <= 0. {
                    0.
                } else if x >= 1. {
                    1.
                } else {
                    x
                }
            }
            SignedClampedLinear => {
                if x <= -1. {
                    -1.
                } else if x >= 1. {
                    1.
                } else {
                    x
                }
            }
            ConvertToSigned => ClampedLinear.apply(x) * 2. - 1.,
            Sigmoid => logistic(x),
            SteepSigmoid => logistic(STEEP_SLOPE * x),
            BipolarSigmoid => 2. * logistic(BIPOLAR_SLOPE * x) - 1.,
            EvSailSigmoid => {
                if x <= -EVSAIL_SEPARATION {
                    0.
                } else if x <= 0. {
                    let t = x + EVSAIL_SEPARATION;
                    t * t / EVSAIL_DENOMINATOR
                } else if x < EVSAIL_SEPARATION {
                    let t = x - EVSAIL_SEPARATION;
                    1. - t * t / EVSAIL_DENOMINATOR
                } else {
                    1.
                }
            }
            Tanh => x.tanh(),
            // 2 / (1 + e^(-x³)) - 1
            TanhCubic => (x.powi(3) / 2.).tanh(),
            Absolute => x.abs(),
            ClampedAbsolute => x.abs().min(1.),
            InverseAbs => 1. / (INVERSE_ABS_SLOPE * x.abs() + 1.),
            Gaussian => (-(x * x * GAUSSIAN_SLOPE)).exp(),
            Sine => x.sin(),
            Cosine => x.cos(),
            Step => {
                if x <= 0. {
                    0.
                } else {
                    1.
                }
            }
            SignedStep => {
                if x <= 0. {
                    -1.
                } else {
                    1.
                }
            }
            Sqrt => signed_sqrt(x),
            SqrtAndLinear => {
                if (-1. ..=1.).contains(&x) {
                    x
                } else {
                    signed_sqrt(x)
                }
            }
            Reciprocal => {
                let y = 1. / x;
                if y.is_nan() {
                    if x < 0. {
                        -RECIPROCAL_MAX
                    } else {
                        RECIPROCAL_MAX
                    }
                } else {
                    // ±0 divides to ±∞ and lands on the matching bound below
                    y
                }
            }
            ExponentialLinear => {
                if x < 0. {
                    ELU_ALPHA * (x.exp() - 1.)
                } else {
                    x
                }
            }
            Rectifier => x.max(0.),
            And | Or | Xor | Multiply | Divide | Power => 0.,
        };
        self.clamp(y)
    }

    /// Transform the raw incoming signals of a neuron.
    ///
    /// Integrating functions sum the signals and the bias and defer to [`apply`](Self::apply).
    /// The non-integrating family ignores the bias.
    pub fn apply_vector(self, inputs: &[f64], bias: f64) -> f64 {
        let y = match self {
            And => logic(!inputs.is_empty() && inputs.iter().all(|&v| v >= 0.5)),
            Or => logic(inputs.iter().any(|&v| v >= 0.5)),
            Xor => logic(inputs.iter().fold(false, |acc, &v| acc ^ (v >= 0.5))),
            Multiply => match inputs.split_first() {
                None => 0.,
                Some((first, rest)) => {
                    let product = rest.iter().fold(*first, |acc, v| acc * v);
                    if product.is_nan() {
                        0.
                    } else {
                        product
                    }
                }
            },
            Divide => match inputs {
                [] => 0.,
                [only] => *only,
                [dividend, divisor, ..] => {
                    let v = dividend / divisor;
                    if v.is_finite() {
                        v
                    } else if dividend.signum() == divisor.signum() {
                        F32_MAX
                    } else {
                        -F32_MAX
                    }
                }
            },
            Power => match inputs {
                [] => 0.,
                [only] => *only,
                [base, exponent, ..] => {
                    let v = base.powf(exponent.abs());
                    if v.is_nan() {
                        0.
                    } else if v.is_infinite() {
                        if v < 0. {
                            -f64::MAX / 2.
                        } else {
                            f64::MAX / 2.
                        }
                    } else {
                        v
                    }
                }
            },
            integrating => integrating.apply(inputs.iter().sum::<f64>() + bias),
        };
        self.clamp(y)
    }

    /// Derivative with respect to the pre-activation value `x`.
    ///
    /// `None` for the non-integrating family. Flat segments of clamped and staircase functions
    /// report 0; isolated kinks report a finite one-sided value.
    pub fn derivative(self, x: f64) -> Option<f64> {
        let d = match self {
            Linear => 1.,
            NegatedLinear => -1.,
            ClampedLinear => {
                if x <= 0. || x >= 1. {
                    0.
                } else {
                    1.
                }
            }
            SignedClampedLinear => {
                if x <= -1. || x >= 1. {
                    0.
                } else {
                    1.
                }
            }
            ConvertToSigned => {
                if x <= 0. || x >= 1. {
                    0.
                } else {
                    2.
                }
            }
            Sigmoid => {
                let s = logistic(x);
                s * (1. - s)
            }
            SteepSigmoid => {
                let s = logistic(STEEP_SLOPE * x);
                STEEP_SLOPE * s * (1. - s)
            }
            BipolarSigmoid => {
                let s = logistic(BIPOLAR_SLOPE * x);
                2. * BIPOLAR_SLOPE * s * (1. - s)
            }
            EvSailSigmoid => {
                if x <= -EVSAIL_SEPARATION {
                    0.
                } else if x <= 0. {
                    2. * (EVSAIL_SEPARATION + x) / EVSAIL_DENOMINATOR
                } else if x < EVSAIL_SEPARATION {
                    -2. * (x - EVSAIL_SEPARATION) / EVSAIL_DENOMINATOR
                } else {
                    0.
                }
            }
            Tanh => {
                let t = x.tanh();
                1. - t * t
            }
            TanhCubic => {
                let t = (x.powi(3) / 2.).tanh();
                if t.abs() >= 1. {
                    0.
                } else {
                    1.5 * x * x * (1. - t * t)
                }
            }
            Absolute => {
                if x < 0. {
                    -1.
                } else {
                    1.
                }
            }
            ClampedAbsolute => {
                if x <= -1. || x >= 1. {
                    0.
                } else if x < 0. {
                    -1.
                } else {
                    1.
                }
            }
            InverseAbs => {
                if x == 0. {
                    0.
                } else {
                    let denominator = 1. + INVERSE_ABS_SLOPE * x.abs();
                    -INVERSE_ABS_SLOPE * x.signum() / (denominator * denominator)
                }
            }
            Gaussian => -2. * GAUSSIAN_SLOPE * x * (-(x * x * GAUSSIAN_SLOPE)).exp(),
            Sine => x.cos(),
            Cosine => -x.sin(),
            Step | SignedStep => 0.,
            Sqrt => sqrt_slope(x),
            SqrtAndLinear => {
                if (-1. ..=1.).contains(&x) {
                    1.
                } else {
                    sqrt_slope(x)
                }
            }
            Reciprocal => {
                let d = -1. / (x * x);
                if d.is_finite() {
                    d
                } else {
                    -RECIPROCAL_MAX
                }
            }
            ExponentialLinear => {
                if x < 0. {
                    ELU_ALPHA * x.exp()
                } else {
                    1.
                }
            }
            Rectifier => {
                if x < 0. {
                    0.
                } else {
                    1.
                }
            }
            And | Or | Xor | Multiply | Divide | Power => return None,
        };
        Some(d)
    }

    fn clamp(self, y: f64) -> f64 {
        y.clamp(self.min_value(), self.max_value())
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn logistic(x: f64) -> f64 {
    1. / (1. + (-x).exp())
}

fn signed_sqrt(x: f64) -> f64 {
    if x > 0. {
        x.sqrt()
    } else if x < 0. {
        -(-x).sqrt()
    } else {
        0.
    }
}

/// Slope of the signed square root, 0 at the origin where it is unbounded.
fn sqrt_slope(x: f64) -> f64 {
    if x == 0. {
        0.
    } else {
        0.5 / x.abs().sqrt()
    }
}

fn logic(value: bool) -> f64 {
    if value {
        1.
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const STEP: f64 = 1e-6;
    const SAMPLES: [f64; 12] = [-4.3, -2.7, -1.3, -0.71, -0.45, -0.2, 0.15, 0.45, 0.8, 1.6, 3.1, 5.2];

    /// Points where the derivative jumps. Finite differences are meaningless close to them.
    fn breakpoints(f: ActivationFunction) -> &'static [f64] {
        match f {
            ClampedLinear | ConvertToSigned => &[0., 1.],
            SignedClampedLinear | SqrtAndLinear => &[-1., 1.],
            EvSailSigmoid => &[-0.3, 0., 0.3],
            ClampedAbsolute => &[-1., 0., 1.],
            Absolute | InverseAbs | Step | SignedStep | Sqrt | Reciprocal | ExponentialLinear
            | Rectifier => &[0.],
            _ => &[],
        }
    }

    #[test]
    fn derivatives_should_match_finite_differences() {
        for f in ActivationFunction::ALL.iter().copied().filter(|f| f.is_differentiable()) {
            for &x in SAMPLES.iter() {
                if breakpoints(f).iter().any(|b| (b - x).abs() < 1e-3) {
                    continue;
                }
                let numeric = (f.apply(x + STEP) - f.apply(x - STEP)) / (2. * STEP);
                let analytic = f.derivative(x).unwrap();
                let tolerance = 1e-5 * analytic.abs().max(1.);
                assert!(
                    (numeric - analytic).abs() < tolerance,
                    "{} at {}: analytic {} vs numeric {}",
                    f, x, analytic, numeric
                );
            }
        }
    }

    #[test]
    fn non_integrating_functions_have_no_derivative() {
        for f in [And, Or, Xor, Multiply, Divide, Power] {
            assert!(!f.is_integrating());
            assert_eq!(f.derivative(0.3), None);
            assert_eq!(f.apply(0.3), 0.);
        }
    }

    #[test]
    fn sigmoid_should_match_reference_values() {
        assert_abs_diff_eq!(Sigmoid.apply(0.5), 0.622_459_331_201_854_6, epsilon = 1e-12);
        assert_abs_diff_eq!(Sigmoid.derivative(0.5).unwrap(), 0.235_003_712_201_594_5, epsilon = 1e-12);
        assert_abs_diff_eq!(SteepSigmoid.apply(0.), 0.5);
        assert_abs_diff_eq!(BipolarSigmoid.apply(0.), 0.);
    }

    #[test]
    fn tanh_derivative_is_evaluated_at_the_pre_activation_value() {
        assert_abs_diff_eq!(Tanh.derivative(0.).unwrap(), 1.);
        assert_abs_diff_eq!(Tanh.derivative(1.).unwrap(), 1. - 1f64.tanh().powi(2), epsilon = 1e-12);
    }

    #[test]
    fn clamped_functions_report_flat_segments() {
        assert_eq!(ClampedLinear.derivative(-0.5), Some(0.));
        assert_eq!(ClampedLinear.derivative(0.5), Some(1.));
        assert_eq!(SignedClampedLinear.derivative(0.5), Some(1.));
        assert_eq!(SignedClampedLinear.derivative(1.5), Some(0.));
        assert_eq!(ClampedAbsolute.derivative(-0.5), Some(-1.));
        assert_eq!(ClampedAbsolute.derivative(0.5), Some(1.));
        assert_eq!(ClampedAbsolute.derivative(2.), Some(0.));
        assert_eq!(Step.derivative(3.), Some(0.));
    }

    #[test]
    fn reciprocal_of_zero_resolves_to_a_bound() {
        assert_eq!(Reciprocal.apply(0.), Reciprocal.max_value());
        assert_eq!(Reciprocal.apply(-0.), Reciprocal.min_value());
        assert_eq!(Reciprocal.apply(1e-320), Reciprocal.max_value());
        assert_eq!(Reciprocal.apply(-1e-320), Reciprocal.min_value());
        assert_abs_diff_eq!(Reciprocal.apply(4.), 0.25);
        assert!(Reciprocal.derivative(0.).unwrap().is_finite());
    }

    #[test]
    fn divide_by_zero_resolves_to_a_signed_bound() {
        assert_eq!(Divide.apply_vector(&[3., 0.], 0.), F32_MAX);
        assert_eq!(Divide.apply_vector(&[-3., 0.], 0.), -F32_MAX);
        assert_eq!(Divide.apply_vector(&[-3., -0.], 0.), F32_MAX);
        assert_eq!(Divide.apply_vector(&[6., 3.], 0.), 2.);
        assert_eq!(Divide.apply_vector(&[6.], 0.), 6.);
        assert_eq!(Divide.apply_vector(&[], 0.), 0.);
    }

    #[test]
    fn power_stays_real_valued() {
        assert_eq!(Power.apply_vector(&[2., -3.], 0.), 8.);
        assert_eq!(Power.apply_vector(&[-2., 2.], 0.), 4.);
        // negative base with fractional exponent has no real value
        assert_eq!(Power.apply_vector(&[-2., 0.5], 0.), 0.);
        assert_eq!(Power.apply_vector(&[10., 1e6], 0.), f64::MAX / 2.);
        assert_eq!(Power.apply_vector(&[-10., 1e6 + 1.], 0.), -f64::MAX / 2.);
    }

    #[test]
    fn logic_functions_threshold_their_inputs() {
        assert_eq!(And.apply_vector(&[0.9, 0.5], 0.), 1.);
        assert_eq!(And.apply_vector(&[0.9, 0.4], 0.), 0.);
        assert_eq!(And.apply_vector(&[], 0.), 0.);
        assert_eq!(Or.apply_vector(&[0.1, 0.6], 0.), 1.);
        assert_eq!(Or.apply_vector(&[0.1, 0.2], 0.), 0.);
        assert_eq!(Xor.apply_vector(&[0.9, 0.9], 0.), 0.);
        assert_eq!(Xor.apply_vector(&[0.9, 0.1], 0.), 1.);
    }

    #[test]
    fn multiply_never_yields_nan() {
        assert_eq!(Multiply.apply_vector(&[2., 3., 4.], 0.), 24.);
        assert_eq!(Multiply.apply_vector(&[], 0.), 0.);
        assert_eq!(Multiply.apply_vector(&[1e300, 1e300, 0.], 0.), 0.);
        assert_eq!(Multiply.apply_vector(&[1e300, 1e300], 0.), f64::MAX);
    }

    #[test]
    fn integrating_functions_sum_the_vector_with_the_bias() {
        assert_abs_diff_eq!(Linear.apply_vector(&[0.25, 0.5], 1.), 1.75);
        assert_abs_diff_eq!(Sigmoid.apply_vector(&[0.25, 0.25], 0.), Sigmoid.apply(0.5));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = ActivationFunction::ALL.iter().map(|f| f.name()).collect();
        names.extend(ActivationFunction::ALL.iter().map(|f| f.legacy_name()));
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }
}
