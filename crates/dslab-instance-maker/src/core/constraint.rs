//! Placement constraints.

use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::common::{NodeId, VmId};
use crate::core::configuration::Configuration;

/// Trait for placement constraints unknown to this crate.
///
/// Such constraints are only consulted through [`CustomConstraint::is_satisfied`], the sets of involved elements are
/// used for the relevance checks.
pub trait CustomConstraint: DynClone + Debug {
    fn name(&self) -> &str;

    fn involved_vms(&self) -> BTreeSet<VmId>;

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        BTreeSet::new()
    }

    fn is_satisfied(&self, cfg: &Configuration) -> bool;
}

clone_trait_object!(CustomConstraint);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Spread,
    Fence,
    Lonely,
    Ban,
    Gather,
    Custom,
}

impl Display for ConstraintKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ConstraintKind::Spread => write!(f, "spread"),
            ConstraintKind::Fence => write!(f, "fence"),
            ConstraintKind::Lonely => write!(f, "lonely"),
            ConstraintKind::Ban => write!(f, "ban"),
            ConstraintKind::Gather => write!(f, "gather"),
            ConstraintKind::Custom => write!(f, "custom"),
        }
    }
}

/// Placement constraint over a configuration. Only running VMs are taken into account.
#[derive(Clone, Debug)]
pub enum PlacementConstraint {
    /// No two VMs of the set run on the same node.
    Spread { vms: BTreeSet<VmId> },
    /// VMs of the set run only on the given nodes.
    Fence { vms: BTreeSet<VmId>, nodes: BTreeSet<NodeId> },
    /// Nodes hosting VMs of the set host no other running VM.
    Lonely { vms: BTreeSet<VmId> },
    /// VMs of the set never run on the given nodes.
    Ban { vms: BTreeSet<VmId>, nodes: BTreeSet<NodeId> },
    /// VMs of the set run on a single node.
    Gather { vms: BTreeSet<VmId> },
    Custom(Box<dyn CustomConstraint>),
}

impl PlacementConstraint {
    pub fn spread(vms: impl IntoIterator<Item = VmId>) -> Self {
        Self::Spread {
            vms: vms.into_iter().collect(),
        }
    }

    pub fn fence(vms: impl IntoIterator<Item = VmId>, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self::Fence {
            vms: vms.into_iter().collect(),
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn lonely(vms: impl IntoIterator<Item = VmId>) -> Self {
        Self::Lonely {
            vms: vms.into_iter().collect(),
        }
    }

    pub fn ban(vms: impl IntoIterator<Item = VmId>, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self::Ban {
            vms: vms.into_iter().collect(),
            nodes: nodes.into_iter().collect(),
        }
    }

    pub fn gather(vms: impl IntoIterator<Item = VmId>) -> Self {
        Self::Gather {
            vms: vms.into_iter().collect(),
        }
    }

    pub fn custom(constraint: impl CustomConstraint + 'static) -> Self {
        Self::Custom(Box::new(constraint))
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Spread { .. } => ConstraintKind::Spread,
            Self::Fence { .. } => ConstraintKind::Fence,
            Self::Lonely { .. } => ConstraintKind::Lonely,
            Self::Ban { .. } => ConstraintKind::Ban,
            Self::Gather { .. } => ConstraintKind::Gather,
            Self::Custom(_) => ConstraintKind::Custom,
        }
    }

    /// Returns the VMs the constraint reasons about.
    pub fn involved_vms(&self) -> BTreeSet<VmId> {
        match self {
            Self::Spread { vms }
            | Self::Fence { vms, .. }
            | Self::Lonely { vms }
            | Self::Ban { vms, .. }
            | Self::Gather { vms } => vms.clone(),
            Self::Custom(c) => c.involved_vms(),
        }
    }

    /// Returns the nodes the constraint reasons about.
    pub fn involved_nodes(&self) -> BTreeSet<NodeId> {
        match self {
            Self::Fence { nodes, .. } | Self::Ban { nodes, .. } => nodes.clone(),
            Self::Spread { .. } | Self::Lonely { .. } | Self::Gather { .. } => BTreeSet::new(),
            Self::Custom(c) => c.involved_nodes(),
        }
    }

    pub fn involves_vm(&self, vm: VmId) -> bool {
        match self {
            Self::Spread { vms }
            | Self::Fence { vms, .. }
            | Self::Lonely { vms }
            | Self::Ban { vms, .. }
            | Self::Gather { vms } => vms.contains(&vm),
            Self::Custom(c) => c.involved_vms().contains(&vm),
        }
    }

    pub fn is_satisfied(&self, cfg: &Configuration) -> bool {
        match self {
            Self::Spread { vms } => {
                let mut used = BTreeSet::new();
                running_hosts(cfg, vms).all(|node| used.insert(node))
            }
            Self::Fence { vms, nodes } => running_hosts(cfg, vms).all(|node| nodes.contains(&node)),
            Self::Lonely { vms } => running_hosts(cfg, vms)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .all(|node| cfg.runnings_on(node).all(|other| vms.contains(&other))),
            Self::Ban { vms, nodes } => running_hosts(cfg, vms).all(|node| !nodes.contains(&node)),
            Self::Gather { vms } => running_hosts(cfg, vms).collect::<BTreeSet<_>>().len() <= 1,
            Self::Custom(c) => c.is_satisfied(cfg),
        }
    }

    /// Returns a copy of the constraint with every VM reference rewritten by `f`.
    ///
    /// Custom constraints cannot be rewritten, `None` is returned for them.
    pub fn map_vms(&self, mut f: impl FnMut(VmId) -> VmId) -> Option<Self> {
        let mut map = |vms: &BTreeSet<VmId>| vms.iter().map(|&vm| f(vm)).collect::<BTreeSet<_>>();
        match self {
            Self::Spread { vms } => Some(Self::Spread { vms: map(vms) }),
            Self::Fence { vms, nodes } => Some(Self::Fence {
                vms: map(vms),
                nodes: nodes.clone(),
            }),
            Self::Lonely { vms } => Some(Self::Lonely { vms: map(vms) }),
            Self::Ban { vms, nodes } => Some(Self::Ban {
                vms: map(vms),
                nodes: nodes.clone(),
            }),
            Self::Gather { vms } => Some(Self::Gather { vms: map(vms) }),
            Self::Custom(_) => None,
        }
    }
}

fn running_hosts<'a>(cfg: &'a Configuration, vms: &'a BTreeSet<VmId>) -> impl Iterator<Item = NodeId> + 'a {
    vms.iter().filter_map(|&vm| cfg.running_host(vm))
}
