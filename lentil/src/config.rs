//! Model and guide configuration.
//!
//! Coefficient groups are kept in one ordered list. The order is part of the
//! contract: group coefficients are concatenated in list order, so it must
//! follow the column order of the design matrix.

use std::fmt;
use std::str::FromStr;

use candle_core::Tensor;
use candle_util::ppl::shape::broadcast_shapes;
use candle_util::ppl::{PplError, PplResult};

pub const DEFAULT_COEF_LABEL: &str = "w";
pub const DEFAULT_RESPONSE_LABEL: &str = "y";

/// Unconstrained initial value of every softplus-constrained guide parameter
pub const DEFAULT_GUIDE_INIT: f64 = 3.0;

/// Emission distribution of the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Response {
    /// y ~ N(xw, σ²)
    #[default]
    Normal,
    /// y ~ Bernoulli(logits = xw)
    Bernoulli,
}

impl FromStr for Response {
    type Err = PplError;

    fn from_str(s: &str) -> PplResult<Self> {
        match s {
            "normal" => Ok(Self::Normal),
            "bernoulli" => Ok(Self::Bernoulli),
            other => Err(PplError::invalid(format!(
                "unknown response distribution: '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Bernoulli => write!(f, "bernoulli"),
        }
    }
}

/// Gamma(α, β) hyperparameters (rate parameterization)
#[derive(Debug, Clone)]
pub struct GammaPrior {
    pub alpha: Tensor,
    pub beta: Tensor,
}

/// w ~ N(mean, σ / sqrt_lambda)
#[derive(Debug, Clone)]
pub struct FixedEffect {
    pub label: String,
    pub mean: Tensor,
    pub sqrt_lambda: Tensor,
}

impl FixedEffect {
    /// Number of coefficients, the trailing dim of `mean ⊗ sqrt_lambda`
    pub fn width(&self) -> PplResult<usize> {
        let dims = broadcast_shapes(self.mean.dims(), self.sqrt_lambda.dims())?;
        Ok(dims.last().copied().unwrap_or(1))
    }
}

/// G ~ 1/sqrt(Gamma(alpha, beta)) per sub-group, u ~ N(0, G) with G tiled
/// `group_size` times
#[derive(Debug, Clone)]
pub struct RandomEffect {
    pub label: String,
    pub group_size: usize,
    pub alpha: Tensor,
    pub beta: Tensor,
}

impl RandomEffect {
    /// Number of standard deviations drawn for this group
    pub fn group_width(&self) -> PplResult<usize> {
        let dims = broadcast_shapes(self.alpha.dims(), self.beta.dims())?;
        Ok(dims.last().copied().unwrap_or(1))
    }

    /// Number of coefficients, `group_width * group_size`
    pub fn width(&self) -> PplResult<usize> {
        Ok(self.group_width()? * self.group_size)
    }

    /// Name of the sample site holding the group's precisions
    pub fn precision_label(&self) -> String {
        format!("G_{}", self.label)
    }
}

#[derive(Debug, Clone)]
pub enum CoefficientGroup {
    Fixed(FixedEffect),
    Random(RandomEffect),
}

impl CoefficientGroup {
    pub fn label(&self) -> &str {
        match self {
            Self::Fixed(fe) => &fe.label,
            Self::Random(re) => &re.label,
        }
    }

    pub fn width(&self) -> PplResult<usize> {
        match self {
            Self::Fixed(fe) => fe.width(),
            Self::Random(re) => re.width(),
        }
    }
}

/// Configuration of [`crate::model::bayesian_linear_model`]
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub groups: Vec<CoefficientGroup>,
    /// Known observation standard deviation; if absent, the precision τ is
    /// sampled from `noise_prior`
    pub known_noise_sd: Option<Tensor>,
    pub noise_prior: Option<GammaPrior>,
    pub response: Response,
    pub response_label: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            groups: vec![],
            known_noise_sd: None,
            noise_prior: None,
            response: Response::Normal,
            response_label: DEFAULT_RESPONSE_LABEL.to_string(),
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_effect(mut self, label: &str, mean: Tensor, sqrt_lambda: Tensor) -> Self {
        self.groups.push(CoefficientGroup::Fixed(FixedEffect {
            label: label.to_string(),
            mean,
            sqrt_lambda,
        }));
        self
    }

    pub fn with_random_effect(
        mut self,
        label: &str,
        group_size: usize,
        alpha: Tensor,
        beta: Tensor,
    ) -> Self {
        self.groups.push(CoefficientGroup::Random(RandomEffect {
            label: label.to_string(),
            group_size,
            alpha,
            beta,
        }));
        self
    }

    pub fn with_known_noise(mut self, sd: Tensor) -> Self {
        self.known_noise_sd = Some(sd);
        self
    }

    pub fn with_noise_prior(mut self, alpha: Tensor, beta: Tensor) -> Self {
        self.noise_prior = Some(GammaPrior { alpha, beta });
        self
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.response = response;
        self
    }

    pub fn with_response_label(mut self, label: &str) -> Self {
        self.response_label = label.to_string();
        self
    }

    /// Total number of coefficients, which must equal the design's `p`
    pub fn num_features(&self) -> PplResult<usize> {
        self.groups.iter().map(|g| g.width()).sum()
    }
}

/// Configuration of [`crate::guide::normal_inv_gamma_family_guide`]
#[derive(Debug, Clone)]
pub struct GuideConfig {
    pub known_noise_sd: Option<Tensor>,
    /// Coefficient sites and their per-design shapes, excluding batch dims
    pub coefficient_shapes: Vec<(String, Vec<usize>)>,
    /// Random-effect precision sites (`G_<label>`) and their shapes
    pub precision_shapes: Vec<(String, Vec<usize>)>,
    /// Unconstrained initial value of the softplus parameters
    pub init: f64,
}

impl GuideConfig {
    pub fn new(known_noise_sd: Option<Tensor>) -> Self {
        Self {
            known_noise_sd,
            coefficient_shapes: vec![],
            precision_shapes: vec![],
            init: DEFAULT_GUIDE_INIT,
        }
    }

    pub fn with_coefficients(mut self, label: &str, shape: &[usize]) -> Self {
        self.coefficient_shapes
            .push((label.to_string(), shape.to_vec()));
        self
    }

    pub fn with_precision(mut self, site: &str, shape: &[usize]) -> Self {
        self.precision_shapes.push((site.to_string(), shape.to_vec()));
        self
    }

    pub fn with_init(mut self, init: f64) -> Self {
        self.init = init;
        self
    }

    /// The guide whose latent sites mirror those of `model`
    pub fn matching(model: &ModelConfig) -> PplResult<Self> {
        let mut guide = Self::new(model.known_noise_sd.clone());
        for group in &model.groups {
            if let CoefficientGroup::Random(re) = group {
                guide = guide.with_precision(&re.precision_label(), &[re.group_width()?]);
            }
            guide = guide.with_coefficients(group.label(), &[group.width()?]);
        }
        Ok(guide)
    }
}
