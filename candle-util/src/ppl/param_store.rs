use std::collections::HashMap;
use std::sync::Mutex;

use candle_core::{Tensor, Var};
use candle_nn::VarMap;
use log::debug;

use super::error::{PplError, PplResult};
use super::transform::Transform;

/// Named learnable parameters shared by guide evaluations and an optimizer.
///
/// Values are stored unconstrained in a [`VarMap`], so
/// `candle_nn::AdamW::new_lr(store.all_vars(), lr)` optimizes them directly;
/// each name remembers the [`Transform`] that maps it into its domain.
pub struct ParamStore {
    varmap: VarMap,
    transforms: Mutex<HashMap<String, Transform>>,
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamStore {
    pub fn new() -> Self {
        Self {
            varmap: VarMap::new(),
            transforms: Mutex::new(HashMap::new()),
        }
    }

    /// Look up `name`, creating it from `init` (unconstrained) on first use.
    ///
    /// Later calls ignore `init` except for its shape, which must agree with
    /// the stored value. Returns the constrained value
    /// `transform.forward(var)`, attached to the variable for backprop.
    pub fn param(&self, name: &str, init: &Tensor, transform: Transform) -> PplResult<Tensor> {
        let var = {
            let mut data = self
                .varmap
                .data()
                .lock()
                .map_err(|_| PplError::invalid("parameter store lock poisoned"))?;

            match data.get(name) {
                Some(var) => {
                    if var.dims() != init.dims() {
                        return Err(PplError::ParameterStoreConflict {
                            name: name.to_string(),
                            stored: var.dims().to_vec(),
                            requested: init.dims().to_vec(),
                        });
                    }
                    var.clone()
                }
                None => {
                    debug!("new parameter {} {:?}", name, init.dims());
                    let var = Var::from_tensor(&init.contiguous()?)?;
                    data.insert(name.to_string(), var.clone());
                    var
                }
            }
        };

        let transform = *self
            .transforms
            .lock()
            .map_err(|_| PplError::invalid("parameter store lock poisoned"))?
            .entry(name.to_string())
            .or_insert(transform);

        Ok(transform.forward(var.as_tensor())?)
    }

    /// Current constrained value of `name`
    pub fn get(&self, name: &str) -> PplResult<Option<Tensor>> {
        let var = match self.unconstrained(name)? {
            Some(var) => var,
            None => return Ok(None),
        };
        let transform = self
            .transforms
            .lock()
            .map_err(|_| PplError::invalid("parameter store lock poisoned"))?
            .get(name)
            .copied()
            .unwrap_or_default();
        Ok(Some(transform.forward(var.as_tensor())?))
    }

    /// The stored unconstrained variable
    pub fn unconstrained(&self, name: &str) -> PplResult<Option<Var>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| PplError::invalid("parameter store lock poisoned"))?;
        Ok(data.get(name).cloned())
    }

    /// Sorted parameter names
    pub fn names(&self) -> PplResult<Vec<String>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| PplError::invalid("parameter store lock poisoned"))?;
        let mut names: Vec<String> = data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn all_vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }
}
