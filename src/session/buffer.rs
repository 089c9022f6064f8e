use log::warn;

/// Latest full snapshot of the transformed output
///
/// Snapshots are whole candidate outputs: each one replaces the previous
/// value outright. Once frozen the value is the final artifact and later
/// replacements are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultBuffer {
    snapshot: String,
    frozen: bool,
}

impl ResultBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Overwrite the snapshot; a no-op once frozen
    pub fn replace(&mut self, snapshot: impl Into<String>) -> bool {
        if self.frozen {
            return false;
        }
        self.snapshot = snapshot.into();
        true
    }

    /// Drop the current snapshot; a no-op once frozen
    pub fn clear(&mut self) {
        if !self.frozen {
            self.snapshot.clear();
        }
    }

    /// Mark the current snapshot as the final artifact
    pub fn freeze(&mut self) -> &str {
        if self.frozen {
            warn!("Result buffer frozen twice");
        }
        self.frozen = true;
        &self.snapshot
    }
}
