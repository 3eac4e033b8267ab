//! End-to-end purchase flow across the content store and the escrow ledger:
//! publish a dataset, open a purchase, settle it, and gate the download on
//! `is_purchased`.

use std::sync::Arc;

use agora_ledger::{
    FsLedger, FsLedgerConfig, LedgerError, LedgerReader, LedgerWriter, MockPaymentVerifier,
};
use agora_store::{ContentStore, FsContentStore, FsStoreConfig, Metadata};
use agora_types::TxStatus;
use serde_json::Value;

struct Market {
    store: FsContentStore,
    ledger: FsLedger,
}

fn open_market(root: &std::path::Path) -> Market {
    let store = FsContentStore::open(&FsStoreConfig {
        root: root.join("objects"),
    })
    .unwrap();
    let ledger = FsLedger::open(
        &FsLedgerConfig {
            root: root.join("ledger"),
        },
        Arc::new(MockPaymentVerifier),
    )
    .unwrap();
    Market { store, ledger }
}

fn listing(title: &str, price: f64) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("title".to_string(), Value::String(title.into()));
    metadata.insert("category".to_string(), Value::String("Finance".into()));
    metadata.insert("price".to_string(), Value::from(price));
    metadata
}

#[test]
fn publish_purchase_download() {
    let dir = tempfile::tempdir().unwrap();
    let market = open_market(dir.path());

    // Seller publishes a dataset.
    let blob = b"a,b\n1,2\n";
    let cid = market.store.store(blob, listing("quotes", 10.0)).unwrap();
    assert!(market.store.verify_integrity(&cid).unwrap());

    // Buyer is not authorized before settling.
    assert!(!market.ledger.is_purchased(&cid, "bob").unwrap());

    // Purchase with escrow, then settle.
    let tx = market
        .ledger
        .create_transaction(&cid, "bob", "alice", 10.0)
        .unwrap();
    assert_eq!(tx.status, TxStatus::Pending);
    assert!(market.ledger.complete_transaction(&tx.tx_id, 10.0).unwrap());

    // The download path checks the sole authorization primitive, then
    // retrieves the exact bytes.
    assert!(market.ledger.is_purchased(&cid, "bob").unwrap());
    let downloaded = market.store.retrieve_required(&cid).unwrap();
    assert_eq!(downloaded, blob);

    // The authorization is durable and exclusive to the buyer.
    assert!(!market.ledger.is_purchased(&cid, "mallory").unwrap());
}

#[test]
fn settled_purchase_blocks_repeat_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let cid = {
        let market = open_market(dir.path());
        let cid = market.store.store(b"image bytes", listing("scan", 3.0)).unwrap();
        let tx = market
            .ledger
            .create_transaction(&cid, "bob", "alice", 3.0)
            .unwrap();
        assert!(market.ledger.complete_transaction(&tx.tx_id, 3.0).unwrap());
        cid
    };

    // Everything reloads from disk.
    let market = open_market(dir.path());
    assert!(market.ledger.is_purchased(&cid, "bob").unwrap());
    assert_eq!(market.store.retrieve(&cid).unwrap().unwrap(), b"image bytes");

    assert!(matches!(
        market.ledger.create_transaction(&cid, "bob", "alice", 3.0),
        Err(LedgerError::AlreadyPurchased { .. })
    ));
}

#[test]
fn failed_payment_keeps_download_locked() {
    let dir = tempfile::tempdir().unwrap();
    let market = open_market(dir.path());

    let cid = market.store.store(b"premium data", listing("premium", 50.0)).unwrap();
    let tx = market
        .ledger
        .create_transaction(&cid, "bob", "alice", 50.0)
        .unwrap();

    // Non-positive payment is refused; the purchase then fails outright.
    assert!(!market.ledger.complete_transaction(&tx.tx_id, 0.0).unwrap());
    assert!(market
        .ledger
        .fail_transaction(&tx.tx_id, "payment failed")
        .unwrap());

    assert!(!market.ledger.is_purchased(&cid, "bob").unwrap());
    // The failed transaction stays terminal even if payment later "works".
    assert!(!market.ledger.complete_transaction(&tx.tx_id, 50.0).unwrap());
}

#[test]
fn ledger_references_survive_object_delete() {
    // Deleting an object leaves completed transactions in place: the
    // ledger holds plain back-references and is never cascaded.
    let dir = tempfile::tempdir().unwrap();
    let market = open_market(dir.path());

    let cid = market.store.store(b"ephemeral", listing("temp", 1.0)).unwrap();
    let tx = market
        .ledger
        .create_transaction(&cid, "bob", "alice", 1.0)
        .unwrap();
    assert!(market.ledger.complete_transaction(&tx.tx_id, 1.0).unwrap());

    assert!(market.store.delete(&cid).unwrap());
    assert!(market.store.retrieve(&cid).unwrap().is_none());

    // The purchase record is still auditable.
    assert!(market.ledger.is_purchased(&cid, "bob").unwrap());
    assert_eq!(market.ledger.object_transactions(&cid).unwrap().len(), 1);
}
