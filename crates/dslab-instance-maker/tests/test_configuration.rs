use dslab_instance_maker::core::configuration::{Configuration, ConfigurationError};
use dslab_instance_maker::core::element_store::{ElementStore, StoreError};
use dslab_instance_maker::core::vm::VmState;

fn store_with_nodes(count: usize, cpu: u32, memory: u64) -> ElementStore {
    let mut store = ElementStore::new();
    for i in 0..count {
        store.add_node(&format!("N{}", i + 1), 1, cpu, memory).unwrap();
    }
    store
}

#[test]
fn test_vm_states_are_exclusive() {
    let mut store = store_with_nodes(2, 10, 10);
    let vm = store.add_vm("VM1", 1, 1, 1).unwrap();
    let mut cfg = Configuration::new();
    cfg.add_online(0);
    cfg.add_online(1);

    cfg.add_waiting(vm);
    assert!(cfg.is_waiting(vm));
    assert_eq!(cfg.location(vm), None);

    cfg.set_run_on(vm, 0).unwrap();
    assert!(cfg.is_running(vm) && !cfg.is_waiting(vm));
    assert_eq!(cfg.location(vm), Some(0));

    cfg.set_sleep_on(vm, 1).unwrap();
    assert!(cfg.is_sleeping(vm) && !cfg.is_running(vm));
    assert_eq!(cfg.state(vm), Some(VmState::Sleeping));
    assert_eq!(cfg.runnings_on(0).count(), 0);
    assert_eq!(cfg.all_vms().len(), 1);

    assert!(cfg.remove_vm(vm));
    assert!(!cfg.contains_vm(vm));
    assert!(!cfg.remove_vm(vm));
}

#[test]
fn test_placement_requires_online_node() {
    let mut cfg = Configuration::new();
    cfg.add_offline(0).unwrap();
    assert_eq!(cfg.set_run_on(3, 0), Err(ConfigurationError::NodeNotOnline(0)));
    assert_eq!(cfg.set_sleep_on(3, 5), Err(ConfigurationError::NodeNotOnline(5)));
    assert!(!cfg.contains_vm(3));
}

#[test]
fn test_hosting_node_cannot_leave() {
    let mut cfg = Configuration::new();
    cfg.add_online(0);
    cfg.set_sleep_on(1, 0).unwrap();
    assert_eq!(cfg.add_offline(0), Err(ConfigurationError::NodeHostsVms(0)));
    assert_eq!(cfg.remove_node(0), Err(ConfigurationError::NodeHostsVms(0)));

    cfg.remove_vm(1);
    cfg.add_offline(0).unwrap();
    assert!(cfg.is_offline(0) && !cfg.is_online(0));
    cfg.remove_node(0).unwrap();
    assert!(cfg.offlines().is_empty());
    assert_eq!(cfg.remove_node(0), Err(ConfigurationError::UnknownNode(0)));
}

#[test]
fn test_offline_node_switched_online() {
    let mut cfg = Configuration::new();
    cfg.add_offline(2).unwrap();
    cfg.add_online(2);
    assert!(cfg.is_online(2));
    assert!(cfg.offlines().is_empty());
}

#[test]
fn test_overload_checks() {
    let mut store = store_with_nodes(2, 10, 10);
    let small = store.add_vm("VM1", 1, 4, 4).unwrap();
    let big = store.add_vm("VM2", 1, 6, 6).unwrap();
    store.vm_mut(big).cpu_demand = 8;
    let sleeper = store.add_vm("VM3", 1, 100, 100).unwrap();

    let mut cfg = Configuration::new();
    cfg.add_online(0);
    cfg.add_online(1);
    cfg.set_run_on(small, 0).unwrap();
    cfg.set_run_on(big, 0).unwrap();
    cfg.set_sleep_on(sleeper, 1).unwrap();

    // 4 + 6 fits, 4 + 8 does not
    assert!(!cfg.is_currently_overloaded(&store, 0));
    assert!(cfg.is_future_overloaded(&store, 0));
    assert!(cfg.currently_overloaded_nodes(&store).is_empty());
    assert_eq!(cfg.future_overloaded_nodes(&store), vec![0]);
    assert!(!cfg.is_currently_overloaded(&store, 1));
}

#[test]
fn test_memory_overload() {
    let mut store = store_with_nodes(1, 100, 5);
    let vm = store.add_vm("VM1", 1, 1, 6).unwrap();
    let mut cfg = Configuration::new();
    cfg.add_online(0);
    cfg.set_run_on(vm, 0).unwrap();
    assert!(cfg.is_currently_overloaded(&store, 0));
}

#[test]
fn test_store_names_are_unique() {
    let mut store = ElementStore::new();
    let vm = store.add_vm("VM1", 1, 1, 1).unwrap();
    assert_eq!(store.add_vm("VM1", 2, 2, 2), Err(StoreError::DuplicateVmName("VM1".to_string())));
    assert_eq!(store.duplicate_vm(vm, "VM1"), Err(StoreError::DuplicateVmName("VM1".to_string())));
    store.add_node("N1", 1, 1, 1).unwrap();
    assert_eq!(store.add_node("N1", 1, 1, 1), Err(StoreError::DuplicateNodeName("N1".to_string())));

    let copy = store.duplicate_vm(vm, "VM2").unwrap();
    assert_ne!(copy, vm);
    assert_eq!(store.vm_by_name("VM2"), Some(copy));
    assert_eq!(store.vm(copy).cpu_consumption, 1);
    assert_eq!(store.vm_count(), 2);
}

#[test]
fn test_iteration_is_ordered() {
    let mut cfg = Configuration::new();
    for node in [3, 1, 2] {
        cfg.add_online(node);
    }
    for vm in [9, 4, 7] {
        cfg.set_run_on(vm, 1).unwrap();
    }
    assert_eq!(cfg.onlines().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(cfg.runnings().collect::<Vec<_>>(), vec![4, 7, 9]);
}
