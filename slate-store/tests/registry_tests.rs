use slate_store::RegistryStore;
use slate_types::DeviceId;

#[test]
fn load_is_none_before_first_registration() {
    let registry = RegistryStore::open_in_memory().unwrap();
    assert_eq!(registry.load().unwrap(), None);
}

#[test]
fn ensure_device_creates_unconfirmed_record() {
    let registry = RegistryStore::open_in_memory().unwrap();
    let registration = registry.ensure_device("user-1").unwrap();

    assert!(!registration.confirmed);
    assert_eq!(registration.user_id, "user-1");
    assert!(registration.registered_at > 0);
    assert_eq!(registry.load().unwrap(), Some(registration));
}

#[test]
fn ensure_device_is_stable_across_calls() {
    let registry = RegistryStore::open_in_memory().unwrap();
    let first = registry.ensure_device("user-1").unwrap();
    let second = registry.ensure_device("user-1").unwrap();
    assert_eq!(first, second);
}

#[test]
fn mark_confirmed_persists() {
    let registry = RegistryStore::open_in_memory().unwrap();
    let registration = registry.ensure_device("user-1").unwrap();

    registry.mark_confirmed(&registration.device_id).unwrap();
    let loaded = registry.load().unwrap().unwrap();
    assert!(loaded.confirmed);
    assert_eq!(loaded.device_id, registration.device_id);
}

#[test]
fn mark_confirmed_for_other_device_is_a_noop() {
    let registry = RegistryStore::open_in_memory().unwrap();
    registry.ensure_device("user-1").unwrap();

    registry.mark_confirmed(&DeviceId::new("someone-else")).unwrap();
    assert!(!registry.load().unwrap().unwrap().confirmed);
}

#[test]
fn device_id_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    let original = {
        let registry = RegistryStore::new(&path).unwrap();
        registry.ensure_device("user-1").unwrap()
    };

    let registry = RegistryStore::new(&path).unwrap();
    assert_eq!(registry.ensure_device("user-1").unwrap(), original);
}
