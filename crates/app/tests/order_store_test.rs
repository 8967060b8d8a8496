use bayan_app::order_store::{OrderMap, PlanOrderStore, apply_overrides};
use bayan_core::models::{Plan, PlanOrder};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn plan(id: &str, order: Option<i64>) -> Plan {
    Plan {
        mongo_id: Some(id.to_string()),
        name: id.to_uppercase(),
        order,
        ..Plan::default()
    }
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = tempdir().unwrap();
    let store = PlanOrderStore::new(dir.path().join("plan-order.json"));

    assert_eq!(store.load().unwrap(), OrderMap::new());
}

#[test]
fn test_save_creates_parent_and_loads_back() {
    let dir = tempdir().unwrap();
    let store = PlanOrderStore::new(dir.path().join("nested/dir/plan-order.json"));

    store
        .save(&[
            PlanOrder { plan_id: "b".to_string(), order: 0 },
            PlanOrder { plan_id: "a".to_string(), order: 1 },
        ])
        .unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.get("b"), Some(&0));
    assert_eq!(loaded.get("a"), Some(&1));
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan-order.json");
    std::fs::write(&path, "not json").unwrap();

    let err = PlanOrderStore::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("Corrupt plan order file"));
}

#[test]
fn test_clear_removes_file() {
    let dir = tempdir().unwrap();
    let store = PlanOrderStore::new(dir.path().join("plan-order.json"));
    store.save(&[PlanOrder { plan_id: "a".to_string(), order: 0 }]).unwrap();

    store.clear().unwrap();
    store.clear().unwrap();
    assert!(!store.path().exists());
}

#[test]
fn test_apply_overrides() {
    let mut plans = vec![plan("a", Some(0)), plan("b", Some(1)), plan("c", None)];
    let overrides: OrderMap = [("b".to_string(), 0), ("a".to_string(), 1)].into_iter().collect();

    apply_overrides(&mut plans, &overrides);

    let orders: Vec<Option<i64>> = plans.iter().map(|p| p.order).collect();
    assert_eq!(orders, vec![Some(1), Some(0), Some(999)]);
}

#[test]
fn test_apply_without_overrides_keeps_plans() {
    let mut plans = vec![plan("a", None)];
    apply_overrides(&mut plans, &OrderMap::new());
    assert_eq!(plans[0].order, None);
}
