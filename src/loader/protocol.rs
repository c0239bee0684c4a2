//! Messages exchanged between the parse coordinator and the parse worker.

use crate::error::TableError;
use crate::parser::ParseProgress;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Identifier attached to parse requests so responses can be correlated.
pub type RequestId = u64;

/// Commands sent to the parse worker.
#[derive(Debug, Clone)]
pub enum ParseCommand {
    /// Parse `text` into rows. The worker only reads `cancel`.
    Parse {
        request_id: RequestId,
        text: Arc<str>,
        delimiter: String,
        cancel: Arc<AtomicBool>,
    },
    Shutdown,
}

/// Responses emitted by the parse worker.
///
/// Each `Parse` command yields any number of `Progress` messages followed by
/// exactly one of `Completed`, `Cancelled` or `Failed`.
#[derive(Debug)]
pub enum ParseResponse {
    Progress {
        request_id: RequestId,
        progress: ParseProgress,
    },
    Completed {
        request_id: RequestId,
        rows: Vec<Vec<String>>,
    },
    Cancelled {
        request_id: RequestId,
    },
    Failed {
        request_id: RequestId,
        error: TableError,
    },
}

impl ParseResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Progress { request_id, .. }
            | Self::Completed { request_id, .. }
            | Self::Cancelled { request_id }
            | Self::Failed { request_id, .. } => *request_id,
        }
    }

    /// Whether this message ends its request
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}
