use super::*;
use crate::store::MemoryStore;

fn stored() -> StoredCredential {
    StoredCredential::new(Arc::new(MemoryStore::new()))
}

#[test]
fn empty_store_is_absent() {
    assert_eq!(stored().check(), CredentialStatus::Absent);
}

#[test]
fn set_then_check_is_present() {
    let gate = stored();
    gate.set("sk-test").unwrap();
    let CredentialStatus::Present(credential) = gate.check() else {
        panic!("expected credential");
    };
    assert_eq!(credential.expose(), "sk-test");
}

#[test]
fn blank_set_clears() {
    let gate = stored();
    gate.set("sk-test").unwrap();
    assert_eq!(gate.set("   ").unwrap(), CredentialStatus::Absent);
    assert!(!gate.check().is_present());
}

#[test]
fn clear_is_idempotent() {
    let gate = stored();
    gate.clear().unwrap();
    gate.clear().unwrap();
    assert!(!gate.check().is_present());
}

#[test]
fn debug_redacts_secret() {
    let credential = Credential::new("sk-secret").unwrap();
    assert!(!format!("{credential:?}").contains("sk-secret"));
}

#[test]
fn static_credential_trims_and_rejects_blank() {
    assert!(!StaticCredential::new(Some("  ".into())).check().is_present());
    assert!(!StaticCredential::new(None).check().is_present());
    assert!(StaticCredential::new(Some(" key ".into())).check().is_present());
}

#[test]
fn failed_persist_leaves_gate_absent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join(crate::store::STATE_FILE_NAME)).unwrap();
    let gate = StoredCredential::new(Arc::new(crate::store::FileStore::open(dir.path())));

    assert!(gate.set("sk-test").is_err());
    assert_eq!(gate.check(), CredentialStatus::Absent);
}
