//! Resource utilization models of cloudlets.

use std::cell::RefCell;
use std::collections::HashMap;

use dyn_clone::{clone_trait_object, DynClone};
use rand::prelude::*;

use crate::core::config::options::{parse_config_value, parse_options};

/// A utilization model is a function, which defines the fraction of requested resource
/// actually used by cloudlet at the moment.
pub trait UtilizationModel: DynClone {
    fn utilization(&self, time: f64) -> f64;
}

clone_trait_object!(UtilizationModel);

/// Cloudlet uses all of the requested resource.
#[derive(Clone)]
pub struct FullUtilization;

impl UtilizationModel for FullUtilization {
    fn utilization(&self, _time: f64) -> f64 {
        1.
    }
}

/// Cloudlet uses a constant fraction of the requested resource.
#[derive(Clone)]
pub struct ConstantUtilization {
    utilization: f64,
}

impl ConstantUtilization {
    pub fn new(utilization: f64) -> Self {
        Self {
            utilization: utilization.clamp(0., 1.),
        }
    }
}

impl UtilizationModel for ConstantUtilization {
    fn utilization(&self, _time: f64) -> f64 {
        self.utilization
    }
}

/// Uniformly random utilization, which is fixed once sampled for a given time.
#[derive(Clone)]
pub struct StochasticUtilization {
    rng: RefCell<StdRng>,
    history: RefCell<HashMap<u64, f64>>,
}

impl StochasticUtilization {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
            history: RefCell::new(HashMap::new()),
        }
    }
}

impl UtilizationModel for StochasticUtilization {
    fn utilization(&self, time: f64) -> f64 {
        *self
            .history
            .borrow_mut()
            .entry(time.to_bits())
            .or_insert_with(|| self.rng.borrow_mut().gen_range(0.0..=1.0))
    }
}

/// Creates utilization model from config string such as `Constant[utilization=0.5]`.
pub fn utilization_model_resolver(config_str: &str) -> Box<dyn UtilizationModel> {
    let (model_name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    let option = |name: &str| {
        options.get(name).map(|value| {
            value
                .parse::<f64>()
                .unwrap_or_else(|_| panic!("Can't parse option {} in {}", name, config_str))
        })
    };
    match model_name.as_str() {
        "Full" => Box::new(FullUtilization),
        "Constant" => Box::new(ConstantUtilization::new(option("utilization").unwrap_or(1.))),
        "Stochastic" => Box::new(StochasticUtilization::new(option("seed").unwrap_or(0.) as u64)),
        _ => panic!("Can't resolve: {}", config_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver() {
        assert_eq!(utilization_model_resolver("Full").utilization(3.), 1.);
        assert_eq!(
            utilization_model_resolver("Constant[utilization=0.25]").utilization(0.),
            0.25
        );
        let model = utilization_model_resolver("Stochastic[seed=7]");
        let value = model.utilization(10.);
        assert!((0. ..=1.).contains(&value));
        assert_eq!(model.utilization(10.), value);
    }

    #[test]
    #[should_panic(expected = "Can't resolve")]
    fn test_unknown_model() {
        utilization_model_resolver("Sine[period=2]");
    }
}
