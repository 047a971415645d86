//! Policy model ownership
//!
//! Owns the `VarStore` holding every parameter of the policy network together
//! with the network itself, and handles seeding, persistence and optimizers.

use std::path::Path;

use tch::nn::OptimizerConfig;
use tch::{nn, Device, Tensor};

use crate::neural::policy_net::{initialize_weights, PolicyNet};
use crate::Result;

pub struct PolicyModel {
    vs: nn::VarStore,
    net: PolicyNet,
}

impl PolicyModel {
    /// Fresh network with Xavier-initialized weights on `device`
    pub fn new(device: Device) -> Result<Self> {
        log::info!("🧠 Building policy network on {:?}", device);
        let vs = nn::VarStore::new(device);
        let net = PolicyNet::new(&vs.root())?;
        initialize_weights(&vs);

        log::debug!("Policy network has {} tensors", vs.variables().len());
        Ok(Self { vs, net })
    }

    /// Same as [`PolicyModel::new`] but with reproducible weights
    pub fn seeded(device: Device, seed: i64) -> Result<Self> {
        tch::manual_seed(seed);
        Self::new(device)
    }

    /// Build the architecture and restore weights saved with [`PolicyModel::save`]
    pub fn load(device: Device, path: impl AsRef<Path>) -> Result<Self> {
        let mut model = Self::new(device)?;
        log::info!("📂 Loading policy weights from {}", path.as_ref().display());
        model.vs.load(path.as_ref())?;
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        log::info!("💾 Saving policy weights to {}", path.display());
        self.vs.save(path)?;
        Ok(())
    }

    pub fn net(&self) -> &PolicyNet {
        &self.net
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Device of the first parameter, falling back to the store's device
    pub fn device(&self) -> Device {
        self.vs
            .trainable_variables()
            .first()
            .map(|t| t.device())
            .unwrap_or_else(|| self.vs.device())
    }

    pub fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        self.net.forward_checked(xs, train)
    }

    pub fn adam(&self, learning_rate: f64, weight_decay: f64) -> Result<nn::Optimizer> {
        let optimizer = nn::Adam {
            wd: weight_decay,
            ..Default::default()
        }
        .build(&self.vs, learning_rate)?;
        Ok(optimizer)
    }
}
