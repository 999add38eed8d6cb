//! Erreurs fatales d'une exécution
//!
//! Elles sont détectées avant toute écriture : aucune sortie partielle n'est
//! produite. Les échecs propres à un fichier passent par le rapport.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input directory not found: {}", .0.display())]
    InputDirMissing(PathBuf),

    /// `extensions` : extensions acceptées, déjà formatées (`.jsonl, .ndjson`)
    #[error("no input files ({extensions}) found in {}", .dir.display())]
    NoInputFiles { dir: PathBuf, extensions: String },

    #[error("output directory not writable: {}", .path.display())]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
