//! Types d'erreurs pour le crate esri-json

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture de features Esri JSON
#[derive(Debug, Error)]
pub enum EsriError {
    /// Erreur d'I/O lors de la lecture du flux
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ligne qui n'est pas du JSON valide
    #[error("invalid JSON at line {line}: {source}")]
    Json {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Ligne qui n'est pas de l'UTF-8 valide
    #[error("invalid UTF-8 at line {line}")]
    InvalidUtf8 { line: u64 },

    /// Ligne JSON valide mais qui n'est pas un objet
    #[error("line {line} is not a JSON object")]
    NotAnObject { line: u64 },
}

impl EsriError {
    /// Numéro de ligne concerné (1-based), si l'erreur en porte un
    pub fn line(&self) -> Option<u64> {
        match self {
            Self::Io(_) => None,
            Self::Json { line, .. } | Self::InvalidUtf8 { line } | Self::NotAnObject { line } => {
                Some(*line)
            }
        }
    }

    /// Vrai si l'erreur ne concerne qu'une ligne (le flux reste lisible)
    pub fn is_malformed_line(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

pub type Result<T, E = EsriError> = std::result::Result<T, E>;
