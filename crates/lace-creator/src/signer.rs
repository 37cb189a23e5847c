//! Signing and transaction collaborators of the event creator

use ed25519_dalek::{Signature as Ed25519Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use lace_core::event::{Signature, Transaction};
use parking_lot::Mutex;
use rand::{CryptoRng, RngCore};
use std::collections::VecDeque;

use crate::error::{CreationError, CreationResult};

/// Signs the hash of every self-created event
pub trait Signer: Send + Sync {
    fn sign(&self, message: &[u8]) -> CreationResult<Signature>;
}

/// Ed25519 signer holding the node's key in memory
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(rng),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Check a signature produced by this signer
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(bytes) = <[u8; 64]>::try_from(signature.as_bytes()) else {
            return false;
        };
        self.verifying_key()
            .verify(message, &Ed25519Signature::from_bytes(&bytes))
            .is_ok()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> CreationResult<Signature> {
        let signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| CreationError::Signing(e.to_string()))?;
        Ok(Signature::new(signature.to_bytes().to_vec()))
    }
}

/// Source of the transactions packed into new events
pub trait TransactionSupplier: Send + Sync {
    /// Take the transactions for the next event
    fn get_transactions_for_event(&self) -> Vec<Transaction>;

    /// True if state-signature transactions are waiting to be included
    fn has_buffered_signature_transactions(&self) -> bool;
}

/// In-memory FIFO of pending transactions
///
/// State signatures are kept apart and always go out first, so a freezing
/// network can still gather the signatures it is waiting for.
pub struct TransactionQueue {
    max_per_event: usize,
    pending: Mutex<PendingTransactions>,
}

#[derive(Default)]
struct PendingTransactions {
    signatures: VecDeque<Transaction>,
    application: VecDeque<Transaction>,
}

impl TransactionQueue {
    pub fn new(max_per_event: usize) -> Self {
        Self {
            max_per_event: max_per_event.max(1),
            pending: Mutex::new(PendingTransactions::default()),
        }
    }

    pub fn submit(&self, transaction: Transaction) {
        let mut pending = self.pending.lock();
        if transaction.is_state_signature() {
            pending.signatures.push_back(transaction);
        } else {
            pending.application.push_back(transaction);
        }
    }

    pub fn len(&self) -> usize {
        let pending = self.pending.lock();
        pending.signatures.len() + pending.application.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut pending = self.pending.lock();
        pending.signatures.clear();
        pending.application.clear();
    }
}

impl TransactionSupplier for TransactionQueue {
    fn get_transactions_for_event(&self) -> Vec<Transaction> {
        let mut pending = self.pending.lock();
        let mut batch = Vec::new();
        while batch.len() < self.max_per_event {
            let next = match pending.signatures.pop_front() {
                Some(signature) => signature,
                None => match pending.application.pop_front() {
                    Some(transaction) => transaction,
                    None => break,
                },
            };
            batch.push(next);
        }
        batch
    }

    fn has_buffered_signature_transactions(&self) -> bool {
        !self.pending.lock().signatures.is_empty()
    }
}
