use agora_types::TxId;

/// External payment verification collaborator.
///
/// The ledger only needs the boolean outcome. A real integration replaces
/// the body of [`verify`](PaymentVerifier::verify) with a call to an
/// actual payment processor; timeout and retry policy belong to that
/// integration, not to the ledger.
pub trait PaymentVerifier: Send + Sync {
    /// Returns `true` if the payment for `tx_id` is accepted.
    fn verify(&self, tx_id: &TxId, amount: f64) -> bool;
}

/// Demo verification policy: any positive amount is accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockPaymentVerifier;

impl PaymentVerifier for MockPaymentVerifier {
    fn verify(&self, _tx_id: &TxId, amount: f64) -> bool {
        amount > 0.0
    }
}
