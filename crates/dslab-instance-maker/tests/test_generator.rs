use std::collections::BTreeSet;

use rstest::rstest;

use dslab_instance_maker::core::common::{NodeId, VmId};
use dslab_instance_maker::core::configuration::Configuration;
use dslab_instance_maker::core::constraint::PlacementConstraint;
use dslab_instance_maker::core::element_store::ElementStore;
use dslab_instance_maker::core::generator::{generate, try_generate, GenerationError};
use dslab_instance_maker::core::planner::{Plan, PlanAction, PlanError, PlanRequest, Planner};
use dslab_instance_maker::core::planners::greedy::GreedyPlanner;
use dslab_instance_maker::core::vjob::VJob;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn add_nodes(store: &mut ElementStore, count: usize, capacity: u32) -> Vec<NodeId> {
    (1..=count)
        .map(|i| store.add_node(&format!("N{}", i), capacity, capacity, capacity as u64).unwrap())
        .collect()
}

fn add_vjob(store: &mut ElementStore, id: &str, count: usize, cpu: u32, memory: u64) -> VJob {
    let mut vjob = VJob::new(id);
    for i in 1..=count {
        vjob.add_vm(store.add_vm(&format!("{}-{}", id, i), 1, cpu, memory).unwrap());
    }
    vjob
}

/// Puts every VM to run on the first online node, ignoring capacities.
struct StackingPlanner;

impl Planner for StackingPlanner {
    fn compute(&self, _store: &ElementStore, request: &PlanRequest) -> Result<Plan, PlanError> {
        let mut dst = request.source.clone();
        let node = *dst
            .onlines()
            .iter()
            .next()
            .ok_or_else(|| PlanError::InvalidRequest("no online node".to_string()))?;
        for &vm in request.to_run.iter() {
            dst.set_run_on(vm, node)?;
        }
        Ok(Plan::new(request.source, dst))
    }
}

#[test]
fn test_basic_generation() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 30, 5);
    let mut vjob = VJob::new("vjob");
    for i in 1..=50 {
        let vm = if i % 2 == 1 {
            store.add_vm(&format!("VM{}", i), 1, 2, 1).unwrap()
        } else {
            store.add_vm(&format!("VM{}", i), 1, 1, 2).unwrap()
        };
        vjob.add_vm(vm);
    }
    let vjobs = vec![vjob];
    let planner = GreedyPlanner::default();

    let cfg = generate(&planner, &store, nodes[..20].to_vec(), nodes[20..].to_vec(), &vjobs).unwrap();

    assert_eq!(cfg.running_count(), 50);
    assert_eq!(cfg.onlines().len(), 20);
    assert_eq!(cfg.offlines().len(), 10);
    assert!(cfg.waitings().is_empty());
    assert!(vjobs[0].vms().iter().all(|&vm| cfg.is_running(vm)));
    assert!(cfg.future_overloaded_nodes(&store).is_empty());
}

#[test]
fn test_not_enough_nodes() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 2, 4);
    let vjobs = vec![add_vjob(&mut store, "big", 3, 3, 1)];
    let planner = GreedyPlanner::default();

    let result = try_generate(&planner, &store, nodes.clone(), Vec::new(), &vjobs);
    assert!(matches!(
        result,
        Err(GenerationError::Planner(PlanError::NoFeasibleNode { .. }))
    ));
    assert!(generate(&planner, &store, nodes, Vec::new(), &vjobs).is_none());
}

#[test]
fn test_future_overload_rejected() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 2, 4);
    let vjobs = vec![add_vjob(&mut store, "stacked", 3, 2, 1)];

    let result = try_generate(&StackingPlanner, &store, nodes.clone(), Vec::new(), &vjobs);
    assert_eq!(result, Err(GenerationError::FutureOverloaded(vec![nodes[0]])));
    assert!(generate(&StackingPlanner, &store, nodes, Vec::new(), &vjobs).is_none());
}

#[test]
fn test_demand_drives_placement() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 2, 4);
    let vjob = add_vjob(&mut store, "grow", 2, 1, 1);
    for &vm in vjob.direct_vms() {
        store.vm_mut(vm).cpu_demand = 3;
    }
    let vjobs = vec![vjob];

    let cfg = generate(&GreedyPlanner::default(), &store, nodes, Vec::new(), &vjobs).unwrap();

    let hosts: BTreeSet<NodeId> = vjobs[0].vms().iter().filter_map(|&vm| cfg.running_host(vm)).collect();
    assert_eq!(hosts.len(), 2);
}

#[test]
fn test_spread_is_respected() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 6, 100);
    let mut vjob = add_vjob(&mut store, "spread", 5, 1, 1);
    let vms: Vec<VmId> = vjob.direct_vms().iter().copied().collect();
    vjob.add_constraint(PlacementConstraint::spread(vms.iter().copied()));
    let vjobs = vec![vjob];

    let cfg = generate(&GreedyPlanner::default(), &store, nodes, Vec::new(), &vjobs).unwrap();

    let hosts: BTreeSet<NodeId> = vms.iter().filter_map(|&vm| cfg.running_host(vm)).collect();
    assert_eq!(hosts.len(), 5);
}

#[test]
fn test_fence_and_ban_are_respected() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 6, 100);
    let mut fenced = add_vjob(&mut store, "fenced", 4, 1, 1);
    fenced.add_constraint(PlacementConstraint::fence(
        fenced.direct_vms().iter().copied().collect::<Vec<_>>(),
        [nodes[3], nodes[4]],
    ));
    let mut banned = add_vjob(&mut store, "banned", 4, 1, 1);
    banned.add_constraint(PlacementConstraint::ban(
        banned.direct_vms().iter().copied().collect::<Vec<_>>(),
        [nodes[0], nodes[1]],
    ));
    let vjobs = vec![fenced, banned];

    let cfg = generate(&GreedyPlanner::default(), &store, nodes.clone(), Vec::new(), &vjobs).unwrap();

    for &vm in vjobs[0].direct_vms() {
        assert!([nodes[3], nodes[4]].contains(&cfg.running_host(vm).unwrap()));
    }
    for &vm in vjobs[1].direct_vms() {
        assert!(![nodes[0], nodes[1]].contains(&cfg.running_host(vm).unwrap()));
    }
    assert!(vjobs.iter().flat_map(|v| v.constraints()).all(|c| c.is_satisfied(&cfg)));
}

#[test]
fn test_unsatisfiable_constraint() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 2, 100);
    let mut vjob = add_vjob(&mut store, "spread", 3, 1, 1);
    let spread = PlacementConstraint::spread(vjob.direct_vms().iter().copied().collect::<Vec<_>>());
    vjob.add_constraint(spread);

    assert!(generate(&GreedyPlanner::default(), &store, nodes, Vec::new(), &[vjob]).is_none());
}

#[rstest]
#[case("FirstFit", 1)]
#[case("BestFit", 1)]
#[case("WorstFit", 3)]
#[case("BestFitThreshold[threshold=0.5]", 2)]
fn test_placement_algorithms(#[case] algorithm: &str, #[case] used_nodes: usize) {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 3, 10);
    let vjobs = vec![add_vjob(&mut store, "small", 3, 2, 2)];
    let planner = GreedyPlanner::from_config_str(algorithm).unwrap();

    let cfg = generate(&planner, &store, nodes, Vec::new(), &vjobs).unwrap();

    let hosts: BTreeSet<NodeId> = vjobs[0].vms().iter().filter_map(|&vm| cfg.running_host(vm)).collect();
    assert_eq!(hosts.len(), used_nodes);
}

#[test]
fn test_unknown_algorithm() {
    init_logger();
    assert!(GreedyPlanner::from_config_str("RoundRobin").is_err());
    assert!(GreedyPlanner::from_config_str("BestFitThreshold").is_err());
    assert!(GreedyPlanner::from_config_str("BestFitThreshold[threshold=high]").is_err());
}

#[test]
fn test_plan_of_generation() {
    init_logger();
    let mut store = ElementStore::new();
    let nodes = add_nodes(&mut store, 2, 10);
    let vjobs = vec![add_vjob(&mut store, "job", 2, 1, 1)];
    let mut source = Configuration::new();
    for &node in &nodes {
        source.add_online(node);
    }
    let mut request = PlanRequest::new(&source, &vjobs);
    request.to_run = vjobs[0].vms();

    let plan = GreedyPlanner::default().compute(&store, &request).unwrap();

    assert_eq!(plan.destination().running_count(), 2);
    assert!(plan
        .actions()
        .iter()
        .all(|action| matches!(action, PlanAction::Run { .. })));
}
