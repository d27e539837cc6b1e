//! Instance built from a YAML description.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::config::{ConfigError, InstanceConfig, VJobGroupConfig};
use crate::core::common::{seeded_rng, InstanceRng, NodeId, VmId};
use crate::core::configuration::Configuration;
use crate::core::constraint::PlacementConstraint;
use crate::core::element_store::ElementStore;
use crate::core::generator::try_generate;
use crate::core::metrics::LoadReport;
use crate::core::mutator::{apply_node_failure_ratio, shuffle};
use crate::core::planners::greedy::GreedyPlanner;
use crate::core::scaler::set_cpu_demand_ratio;
use crate::core::vjob::VJob;

/// Holds the elements of an instance and drives its generation and mutation.
///
/// VMs of a vjob are named after the vjob: `<vjob>.VM<i>`, starting from 1.
pub struct InstanceMaker {
    store: ElementStore,
    vjobs: Vec<VJob>,
    onlines: Vec<NodeId>,
    offlines: Vec<NodeId>,
    planner: GreedyPlanner,
    rng: InstanceRng,
    failure_ratio: f64,
    shuffle_moves: usize,
    configuration: Option<Configuration>,
}

impl InstanceMaker {
    /// Creates the nodes, VMs and vjobs described by the config. No configuration is generated yet.
    pub fn from_config(config: &InstanceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let planner = GreedyPlanner::from_config_str(&config.planner)?.with_sort_by_demand(config.sort_by_demand);

        let mut store = ElementStore::new();
        let mut onlines = Vec::new();
        let mut offlines = Vec::new();
        for group in &config.nodes {
            for name in group.names()? {
                let node = store.add_node(&name, group.nb_cpus, group.cpu_capacity, group.memory_capacity)?;
                if group.is_online() {
                    onlines.push(node);
                } else {
                    offlines.push(node);
                }
            }
        }

        let mut vjobs = Vec::new();
        for group in &config.vjobs {
            for name in group.names()? {
                vjobs.push(build_vjob(&mut store, &name, group)?);
            }
        }
        info!(
            "instance with {} nodes ({} online), {} vjobs and {} vms",
            store.node_count(),
            onlines.len(),
            vjobs.len(),
            store.vm_count()
        );

        Ok(Self {
            store,
            vjobs,
            onlines,
            offlines,
            planner,
            rng: seeded_rng(config.seed),
            failure_ratio: config.failure_ratio,
            shuffle_moves: config.shuffle_moves,
            configuration: None,
        })
    }

    /// Reads the config from YAML file and creates the instance.
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        Self::from_config(&InstanceConfig::from_file(file_name)?)
    }

    /// Generates a configuration running every VM of the vjobs, replacing the current one.
    pub fn generate(&mut self) -> Result<&Configuration, ConfigError> {
        let cfg = self.compute_configuration()?;
        Ok(&*self.configuration.insert(cfg))
    }

    /// Turns offline the configured share of online nodes and returns the VMs lost with them.
    ///
    /// The configuration is generated first if needed.
    pub fn inject_failures(&mut self) -> Result<BTreeSet<VmId>, ConfigError> {
        self.ensure_generated()?;
        Ok(match self.configuration.as_mut() {
            Some(cfg) => apply_node_failure_ratio(cfg, self.failure_ratio, &mut self.rng),
            None => BTreeSet::new(),
        })
    }

    /// Attempts the configured number of random relocations and returns the number of VMs moved.
    ///
    /// The configuration is generated first if needed.
    pub fn shuffle(&mut self) -> Result<usize, ConfigError> {
        self.ensure_generated()?;
        Ok(match self.configuration.as_mut() {
            Some(cfg) => shuffle(cfg, &self.store, &self.vjobs, self.shuffle_moves, &mut self.rng),
            None => 0,
        })
    }

    /// Returns the load summary of the current configuration, if any.
    pub fn report(&self) -> Option<LoadReport> {
        self.configuration.as_ref().map(|cfg| LoadReport::compute(cfg, &self.store))
    }

    /// Generates the configuration, injects failures, shuffles and reports the resulting load.
    pub fn make(&mut self) -> Result<LoadReport, ConfigError> {
        let mut cfg = self.compute_configuration()?;
        apply_node_failure_ratio(&mut cfg, self.failure_ratio, &mut self.rng);
        shuffle(&mut cfg, &self.store, &self.vjobs, self.shuffle_moves, &mut self.rng);
        let report = LoadReport::compute(&cfg, &self.store);
        self.configuration = Some(cfg);
        Ok(report)
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn vjobs(&self) -> &[VJob] {
        &self.vjobs
    }

    pub fn onlines(&self) -> &[NodeId] {
        &self.onlines
    }

    pub fn offlines(&self) -> &[NodeId] {
        &self.offlines
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.configuration.as_ref()
    }

    fn compute_configuration(&self) -> Result<Configuration, ConfigError> {
        let cfg = try_generate(
            &self.planner,
            &self.store,
            self.onlines.iter().copied(),
            self.offlines.iter().copied(),
            &self.vjobs,
        )?;
        debug!("generated configuration with {} running vms", cfg.running_count());
        Ok(cfg)
    }

    fn ensure_generated(&mut self) -> Result<(), ConfigError> {
        if self.configuration.is_none() {
            self.generate()?;
        }
        Ok(())
    }
}

fn build_vjob(store: &mut ElementStore, name: &str, group: &VJobGroupConfig) -> Result<VJob, ConfigError> {
    let profile = &group.vm;
    let mut vjob = VJob::new(name);
    for i in 1..=group.vm_count {
        let vm = store.add_vm(
            &format!("{}.VM{}", name, i),
            profile.nb_cpus.unwrap_or(1),
            profile.cpu_consumption,
            profile.memory_consumption,
        )?;
        let machine = store.vm_mut(vm);
        if let Some(cpu_demand) = profile.cpu_demand {
            machine.cpu_demand = cpu_demand;
        }
        if let Some(memory_demand) = profile.memory_demand {
            machine.memory_demand = memory_demand;
        }
        if let Some(cpu_max) = profile.cpu_max {
            machine.cpu_max = cpu_max;
        }
        vjob.add_vm(vm);
    }
    if group.spread.unwrap_or(false) && group.vm_count > 1 {
        let spread = PlacementConstraint::spread(vjob.direct_vms().iter().copied());
        vjob.add_constraint(spread);
    }
    if let Some(ratio) = group.cpu_demand_ratio {
        set_cpu_demand_ratio(store, &vjob, ratio);
    }
    Ok(vjob)
}
