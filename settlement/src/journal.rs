//! Journal-backed settlement client.
//!
//! The coordinator itself never signs chain transactions; it appends
//! settlement and refund instructions to an append-only JSON-lines journal
//! that the external relayer consumes and submits. The receipt carries the
//! journal sequence number, which the relayer echoes back on-chain.

use crate::client::{ClientError, SettlementClient, SettlementInstruction, SettlementReceipt};
use arena_types::{ChallengeId, PlayerAddress};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

/// One journal line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    Settle {
        seq: u64,
        instruction: SettlementInstruction,
    },
    Refund {
        seq: u64,
        challenge_id: ChallengeId,
        recipient: PlayerAddress,
    },
}

/// Appends instructions to the relayer journal.
pub struct JournalSettlementClient {
    file: Mutex<File>,
    sequence: AtomicU64,
}

impl JournalSettlementClient {
    /// Open (or create) the journal at the given path.
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        // Resume the sequence from the existing line count; the relayer
        // only requires monotonicity per journal file.
        let lines = std::fs::read_to_string(path)?.lines().count() as u64;
        info!(path = %path.display(), resume_seq = lines, "settlement journal opened");
        Ok(Self {
            file: Mutex::new(file),
            sequence: AtomicU64::new(lines),
        })
    }

    fn append(&self, entry: &JournalEntry) -> Result<(), ClientError> {
        let line = serde_json::to_string(entry)
            .map_err(|e| ClientError::Rejected(format!("encode: {e}")))?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| ClientError::Transport("journal lock poisoned".to_string()))?;
        writeln!(file, "{line}").map_err(|e| ClientError::Transport(e.to_string()))?;
        file.flush().map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(())
    }

    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }
}

impl SettlementClient for JournalSettlementClient {
    fn settle(
        &self,
        instruction: SettlementInstruction,
    ) -> BoxFuture<'_, Result<SettlementReceipt, ClientError>> {
        Box::pin(async move {
            let seq = self.next_seq();
            self.append(&JournalEntry::Settle { seq, instruction })?;
            Ok(SettlementReceipt {
                txn: format!("journal-{seq}"),
            })
        })
    }

    fn refund(
        &self,
        challenge_id: ChallengeId,
        recipient: PlayerAddress,
    ) -> BoxFuture<'_, Result<SettlementReceipt, ClientError>> {
        Box::pin(async move {
            let seq = self.next_seq();
            self.append(&JournalEntry::Refund {
                seq,
                challenge_id,
                recipient,
            })?;
            Ok(SettlementReceipt {
                txn: format!("journal-{seq}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::{EscrowRef, StakeAmount};

    fn instruction(id: &str) -> SettlementInstruction {
        SettlementInstruction {
            challenge_id: ChallengeId::new(id),
            escrow_ref: EscrowRef::new("escrow1"),
            winner: PlayerAddress::new("alice"),
            amount: StakeAmount::new(1_900),
        }
    }

    #[tokio::test]
    async fn appends_entries_with_monotonic_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settlement.journal");
        let client = JournalSettlementClient::open(&path).unwrap();

        let r1 = client.settle(instruction("c1")).await.unwrap();
        let r2 = client
            .refund(ChallengeId::new("c2"), PlayerAddress::new("bob"))
            .await
            .unwrap();
        assert_eq!(r1.txn, "journal-0");
        assert_eq!(r2.txn, "journal-1");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<JournalEntry> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(matches!(lines[0], JournalEntry::Settle { seq: 0, .. }));
        assert!(matches!(lines[1], JournalEntry::Refund { seq: 1, .. }));
    }

    #[tokio::test]
    async fn reopen_resumes_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settlement.journal");
        {
            let client = JournalSettlementClient::open(&path).unwrap();
            client.settle(instruction("c1")).await.unwrap();
        }
        let client = JournalSettlementClient::open(&path).unwrap();
        let receipt = client.settle(instruction("c2")).await.unwrap();
        assert_eq!(receipt.txn, "journal-1");
    }
}
