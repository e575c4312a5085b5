// ── Domain model ──
//
// Local channels and profile on one side, the server's inputs, feeds and
// process methods on the other.

pub mod channel;
pub mod local;
pub mod profile;
pub mod remote;

// ── Re-exports ──────────────────────────────────────────────────────

pub use channel::{Channel, INPUT_CLASSES, InputClass, ProcessStep, Unit, split_phase};
pub use local::{ClientSection, LocalConfig};
pub use profile::{Profile, ProfileMeta};
pub use remote::{ProcessCatalogue, ProcessInfo, RemoteFeed, RemoteInput};
