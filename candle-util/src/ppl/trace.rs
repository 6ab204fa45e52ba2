//! Execution trace: the sampling context every model and guide draws
//! through.
//!
//! A [`Trace`] records one evaluation. Each `sample` call registers a named
//! site with its value and log density. Values come from, in order of
//! priority: observations given to [`Trace::condition`], values replayed
//! from another trace with [`Trace::replay`], or a fresh draw.

use std::collections::HashMap;

use candle_core::Tensor;
use log::{debug, warn};

use super::distributions::Distribution;
use super::error::{ConfigWarning, PplError, PplResult};

/// One named random variable in a trace.
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub value: Tensor,
    /// log density reduced over the event dims, batch-shaped
    pub log_prob: Tensor,
    pub event_dims: usize,
    pub observed: bool,
}

#[derive(Debug, Default)]
pub struct Trace {
    sites: Vec<Site>,
    index: HashMap<String, usize>,
    observations: HashMap<String, Tensor>,
    replayed: HashMap<String, Tensor>,
    warnings: Vec<ConfigWarning>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the value of site `name`; it is scored but never drawn.
    pub fn condition(mut self, name: &str, value: Tensor) -> Self {
        self.observations.insert(name.to_string(), value);
        self
    }

    /// Reuse the latent values of `other` for sites with the same name.
    /// Replayed values keep their autodiff graph.
    pub fn replay(mut self, other: &Trace) -> Self {
        for site in other.sites.iter().filter(|s| !s.observed) {
            self.replayed.insert(site.name.clone(), site.value.clone());
        }
        self
    }

    /// Register a draw from `dist` under `name` and return its value.
    pub fn sample<D>(&mut self, name: &str, dist: &D) -> PplResult<Tensor>
    where
        D: Distribution + ?Sized,
    {
        if self.index.contains_key(name) {
            return Err(PplError::invalid(format!(
                "sample site '{}' is registered twice in one evaluation",
                name
            )));
        }

        let (value, observed) = if let Some(obs) = self.observations.get(name) {
            (obs.clone(), true)
        } else if let Some(v) = self.replayed.get(name) {
            (v.clone(), false)
        } else {
            (dist.sample()?, false)
        };

        if value.dims() != dist.shape() {
            return Err(PplError::invalid(format!(
                "site '{}' expects shape {:?}, got {:?}",
                name,
                dist.shape(),
                value.dims()
            )));
        }

        let log_prob = dist.log_prob(&value)?;
        debug!(
            "site {}: shape {:?}, event dims {}{}",
            name,
            value.dims(),
            dist.event_dims(),
            if observed { " (observed)" } else { "" }
        );

        self.index.insert(name.to_string(), self.sites.len());
        self.sites.push(Site {
            name: name.to_string(),
            value: value.clone(),
            log_prob,
            event_dims: dist.event_dims(),
            observed,
        });
        Ok(value)
    }

    /// Record a non-fatal configuration warning.
    pub fn warn(&mut self, w: ConfigWarning) {
        warn!("{}", w);
        self.warnings.push(w);
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn site(&self, name: &str) -> Option<&Site> {
        self.index.get(name).map(|&i| &self.sites[i])
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names and shapes of the unobserved sites, in registration order
    pub fn latent_shapes(&self) -> Vec<(String, Vec<usize>)> {
        self.sites
            .iter()
            .filter(|s| !s.observed)
            .map(|s| (s.name.clone(), s.value.dims().to_vec()))
            .collect()
    }

    /// Σ over all sites and batch elements of log p, a scalar
    pub fn log_prob_sum(&self) -> PplResult<Tensor> {
        let mut iter = self.sites.iter();
        let first = iter
            .next()
            .ok_or_else(|| PplError::invalid("log density of an empty trace"))?;
        let mut total = first.log_prob.sum_all()?;
        for site in iter {
            total = (total + site.log_prob.sum_all()?)?;
        }
        Ok(total)
    }
}
