//! Ledger snapshot persistence between CLI runs.

use std::fs;
use std::path::Path;

use anyhow::Context;
use coupon_ledger::{InMemoryLedger, LedgerSnapshot};
use tracing::debug;

/// Open the ledger stored at `path`. A missing file yields an empty ledger.
pub fn load(path: &Path) -> anyhow::Result<InMemoryLedger> {
    if !path.exists() {
        debug!(path = %path.display(), "no state file; starting empty");
        return Ok(InMemoryLedger::new());
    }
    let bytes = fs::read(path).with_context(|| format!("reading state {}", path.display()))?;
    let snapshot: LedgerSnapshot = bincode::deserialize(&bytes)
        .with_context(|| format!("decoding state {}", path.display()))?;
    debug!(path = %path.display(), height = snapshot.height(), entries = snapshot.len(), "state loaded");
    Ok(InMemoryLedger::from_snapshot(snapshot))
}

/// Write the committed state of `ledger` to `path`, replacing it atomically.
pub fn save(path: &Path, ledger: &InMemoryLedger) -> anyhow::Result<()> {
    let snapshot = ledger.snapshot()?;
    let bytes = bincode::serialize(&snapshot).context("encoding state")?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    debug!(path = %path.display(), height = snapshot.height(), "state saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use coupon_contract::{Contract, ContractConfig};

    use super::*;

    #[test]
    fn missing_file_is_an_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = load(&dir.path().join("absent.state")).unwrap();
        assert_eq!(ledger.height().unwrap(), 0);
    }

    #[test]
    fn committed_state_survives_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.state");

        let contract = Contract::new(ContractConfig::default());
        let ledger = InMemoryLedger::new();
        contract.init(&ledger).unwrap();
        save(&path, &ledger).unwrap();

        let reopened = load(&path).unwrap();
        assert_eq!(reopened.height().unwrap(), ledger.height().unwrap());
        assert_eq!(
            reopened.get("customer:0000000103").unwrap(),
            ledger.get("customer:0000000103").unwrap()
        );
        let history = reopened.snapshot().unwrap();
        assert_eq!(history.history_for("customer:0000000103").len(), 1);
        assert!(!dir.path().join("ledger.tmp").exists());
    }

    #[test]
    fn garbage_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.state");
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(load(&path).is_err());
    }
}
