//! Rendering technique entry.

use crate::output::Technique;
use crate::settings::{TechniqueKind, TechniqueSettings};

pub fn export_technique(settings: &TechniqueSettings) -> Technique {
    let max_depth = settings.max_depth;
    let clamp = settings.clamp;
    match settings.kind {
        TechniqueKind::Path => Technique::Path { max_depth, clamp },
        TechniqueKind::Volpath => Technique::Volpath { max_depth, clamp },
        TechniqueKind::Ppm => Technique::Ppm {
            max_depth,
            clamp,
            photons: settings.photons,
        },
        TechniqueKind::Ao => Technique::Ao,
    }
}
