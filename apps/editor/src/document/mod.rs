// Hybrid document core: section model, legacy schema bridge, reorder engine.
// Everything here is synchronous and side-effect free apart from the model itself.

pub mod legacy;
pub mod model;
pub mod reorder;

pub use legacy::LegacyFields;
pub use model::{ContentDigest, DocumentModel, GeneralData, GeneralField, Section, SectionPatch};
pub use reorder::{Direction, Reorder};
