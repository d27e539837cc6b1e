//! Generation of initial configurations.

use std::collections::BTreeSet;

use log::{debug, warn};
use thiserror::Error;

use crate::core::common::NodeId;
use crate::core::configuration::{Configuration, ConfigurationError};
use crate::core::element_store::ElementStore;
use crate::core::planner::{PlanError, PlanRequest, Planner};
use crate::core::vjob::VJob;

#[derive(Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("planner failed: {0}")]
    Planner(#[from] PlanError),
    #[error("nodes {0:?} are overloaded once virtual machines reach their demand")]
    FutureOverloaded(Vec<NodeId>),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Generates a configuration where every VM of the vjobs is running and every placement constraint holds.
///
/// The configuration is made of the given online and offline nodes, all the VMs start waiting and the planner decides
/// where they run. The result is rejected if some node would be overloaded by the VM demands.
pub fn try_generate(
    planner: &dyn Planner,
    store: &ElementStore,
    onlines: impl IntoIterator<Item = NodeId>,
    offlines: impl IntoIterator<Item = NodeId>,
    vjobs: &[VJob],
) -> Result<Configuration, GenerationError> {
    let mut cfg = Configuration::new();
    for node in onlines {
        cfg.add_online(node);
    }
    for node in offlines {
        cfg.add_offline(node)?;
    }

    let mut to_run = BTreeSet::new();
    for v in vjobs {
        for vm in v.vms() {
            if !cfg.is_waiting(vm) {
                cfg.add_waiting(vm);
                to_run.insert(vm);
            }
        }
    }
    debug!(
        "generating configuration: {} vms, {} online nodes, {} offline nodes",
        to_run.len(),
        cfg.onlines().len(),
        cfg.offlines().len()
    );

    let mut request = PlanRequest::new(&cfg, vjobs);
    request.to_run = to_run;
    let dst = planner.compute(store, &request)?.into_destination();

    let overloaded = dst.future_overloaded_nodes(store);
    if !overloaded.is_empty() {
        return Err(GenerationError::FutureOverloaded(overloaded));
    }
    Ok(dst)
}

/// Same as [`try_generate`], but any failure yields `None`.
pub fn generate(
    planner: &dyn Planner,
    store: &ElementStore,
    onlines: impl IntoIterator<Item = NodeId>,
    offlines: impl IntoIterator<Item = NodeId>,
    vjobs: &[VJob],
) -> Option<Configuration> {
    match try_generate(planner, store, onlines, offlines, vjobs) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!("cannot generate configuration: {}", e);
            None
        }
    }
}
