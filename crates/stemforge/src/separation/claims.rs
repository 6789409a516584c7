//! Output path claims
//!
//! Two concurrent jobs for inputs with the same file stem would write into
//! the same directories. A run claims `{output_root}/{base_name}` before
//! pass 1 and keeps the claim until it is dropped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::{Result, SeparationError};

#[derive(Default)]
pub struct ClaimSet {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the output of `base_name` under `output_root`
    ///
    /// Fails with [`SeparationError::OutputBusy`] while another live claim
    /// holds the same key.
    pub fn claim(self: &Arc<Self>, output_root: &Path, base_name: &str) -> Result<OutputClaim> {
        let key = output_root.join(base_name);
        let mut claimed = match self.claimed.lock() {
            Ok(claimed) => claimed,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !claimed.insert(key.clone()) {
            log::warn!("[JOBS] Output {:?} already claimed", key);
            return Err(SeparationError::OutputBusy(key));
        }
        Ok(OutputClaim {
            owner: Arc::clone(self),
            key,
        })
    }

    pub fn is_claimed(&self, output_root: &Path, base_name: &str) -> bool {
        let key = output_root.join(base_name);
        match self.claimed.lock() {
            Ok(claimed) => claimed.contains(&key),
            Err(poisoned) => poisoned.into_inner().contains(&key),
        }
    }
}

/// Held for the lifetime of a run; releases its key on drop
pub struct OutputClaim {
    owner: Arc<ClaimSet>,
    key: PathBuf,
}

impl OutputClaim {
    pub fn path(&self) -> &Path {
        &self.key
    }
}

impl Drop for OutputClaim {
    fn drop(&mut self) {
        let mut claimed = match self.owner.claimed.lock() {
            Ok(claimed) => claimed,
            Err(poisoned) => poisoned.into_inner(),
        };
        claimed.remove(&self.key);
    }
}

impl std::fmt::Debug for OutputClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OutputClaim").field(&self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_busy_until_release() {
        let claims = Arc::new(ClaimSet::new());
        let root = Path::new("/out");

        let first = claims.claim(root, "track").unwrap();
        assert!(matches!(
            claims.claim(root, "track"),
            Err(SeparationError::OutputBusy(_))
        ));
        assert!(claims.claim(root, "other_track").is_ok());

        drop(first);
        assert!(!claims.is_claimed(root, "track"));
        assert!(claims.claim(root, "track").is_ok());
    }
}
