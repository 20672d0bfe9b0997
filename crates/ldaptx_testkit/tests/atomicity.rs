//! Rollback restores the pre-transaction state of every touched entry.

use ldaptx_codec::{Dn, Rdn};
use ldaptx_conn::{ConnError, OperationKind};
use ldaptx_core::{CoreError, CoreResult, Directory};
use ldaptx_testkit::prelude::*;
use proptest::prelude::*;

fn uid_dn(uid: &str) -> Dn {
    dn(&format!("uid={uid},{PEOPLE}"))
}

fn run(dir: &mut Directory, op: &DirectoryOperation) -> CoreResult<()> {
    match op {
        DirectoryOperation::Add { uid, attributes } => dir.add(&uid_dn(uid), attributes.clone()),
        DirectoryOperation::Modify { uid, changes } => dir.modify(&uid_dn(uid), changes),
        DirectoryOperation::Delete { uid } => dir.delete(&uid_dn(uid)),
        DirectoryOperation::Rename { uid, new_uid } => {
            dir.rename(&uid_dn(uid), &Rdn::new("uid", new_uid.as_str()), None)
        }
    }
}

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn rollback_restores_everything(ops in operation_sequence_strategy(1, 12)) {
        let mut test_dir = TestDirectory::new();
        let before = Snapshot::capture(test_dir.server());

        test_dir.begin_transaction().unwrap();
        for op in &ops {
            // failed statements leave the transaction open and record nothing
            let _ = run(&mut test_dir, op);
        }
        test_dir.rollback().unwrap();

        prop_assert!(test_dir.cache().is_empty());
        prop_assert!(!test_dir.is_transaction_open());
        prop_assert_eq!(Snapshot::capture(test_dir.server()), before);
    }

    #[test]
    fn forced_failure_then_rollback(ops in operation_sequence_strategy(1, 8)) {
        let mut test_dir = TestDirectory::new();
        let before = Snapshot::capture(test_dir.server());

        test_dir.begin_transaction().unwrap();
        for op in &ops {
            let _ = run(&mut test_dir, op);
        }
        test_dir
            .server()
            .fail_next(OperationKind::Add, ConnError::Transport("link down".into()));
        let err = test_dir
            .add(&uid_dn("forced"), person("forced", "Failure"))
            .unwrap_err();
        prop_assert!(matches!(err, CoreError::Transport(_)));
        prop_assert!(test_dir.is_transaction_open());
        test_dir.rollback().unwrap();

        prop_assert_eq!(Snapshot::capture(test_dir.server()), before);
    }

    #[test]
    fn commit_keeps_what_autocommit_would(ops in operation_sequence_strategy(1, 10)) {
        let mut in_txn = TestDirectory::new();
        let mut autocommit = TestDirectory::new();

        in_txn.begin_transaction().unwrap();
        for op in &ops {
            let a = run(&mut in_txn, op).is_ok();
            let b = run(&mut autocommit, op).is_ok();
            prop_assert_eq!(a, b, "outcome differs for {:?}", op);
        }
        in_txn.commit().unwrap();

        prop_assert_eq!(
            Snapshot::capture(in_txn.server()),
            Snapshot::capture(autocommit.server())
        );
    }
}

#[test]
fn rollback_after_reconnect() {
    let mut test_dir = TestDirectory::new();
    let before = Snapshot::capture(test_dir.server());

    test_dir.begin_transaction().unwrap();
    test_dir
        .modify(&dn(TUX), &[ldaptx_codec::Modification::add("mail", ["linus@example.org"])])
        .unwrap();
    test_dir.server().terminate_sessions();
    test_dir.delete(&dn(TUX)).unwrap();
    test_dir.server().terminate_sessions();
    test_dir.rollback().unwrap();

    before.assert_matches(test_dir.server());
    assert_eq!(test_dir.connection().reconnects(), 2);
}

#[test]
fn failed_undo_is_unrecoverable() {
    let mut test_dir = TestDirectory::new();
    test_dir.begin_transaction().unwrap();
    test_dir
        .add(&uid_dn("meow"), person("meow", "Cat"))
        .unwrap();
    test_dir.delete(&dn(TUX)).unwrap();

    // the undo of the delete is an add
    test_dir
        .server()
        .fail_next(OperationKind::Add, ConnError::Transport("link down".into()));
    let err = test_dir.rollback().unwrap_err();
    assert!(matches!(err, CoreError::UnrecoverableRollback { .. }));
    assert!(err.to_string().contains("manual intervention"));
    assert!(!test_dir.is_transaction_open());
    assert!(test_dir.cache().is_empty());
    // the older undo entry was not attempted
    assert!(test_dir.server().contains(&uid_dn("meow")));
    assert!(!test_dir.server().contains(&dn(TUX)));
}
