//! Descripteurs de couches pour l'interface de consultation
//!
//! Le manifeste décrit ce qui a été préparé ; le descripteur de couche ajoute
//! ce dont une interface a besoin : libellé, colonnes de recherche, colonne de
//! zonage, de surface, de géométrie et disposition des colonnes par défaut.
//! Les descripteurs déclarés dans la configuration l'emportent table par table.

mod resolver;

pub use resolver::{
    find_column, map_column_names, ColumnRole, ExplicitRoles, FallbackResolver, PatternRoles,
    ResolvedRoles, RoleResolver, MAX_SEARCH_COLUMNS,
};

use std::path::Path;

use anyhow::{Context, Result};
use esri_json::{read_geometry, PortableGeometry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::manifest::ManifestEntry;

/// Descripteur d'une couche (sérialisé en camelCase, champs absents omis)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default)]
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoning_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acres_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_order: Option<Vec<String>>,
}

fn first_non_empty<'a>(candidates: [&'a str; 3]) -> &'a str {
    candidates.into_iter().find(|s| !s.is_empty()).unwrap_or("")
}

impl LayerDescriptor {
    /// Complète `id` (table, puis libellé) et `label` (table, puis id)
    pub fn normalize(&mut self) {
        let (id, table, label) = (self.id.as_str(), self.table.as_str(), self.label.as_str());
        let new_id = first_non_empty([id, table, label]).to_string();
        let new_label = first_non_empty([label, table, id]).to_string();
        self.id = new_id;
        self.label = new_label;
    }

    /// Descripteur par défaut d'une table du manifeste
    ///
    /// Colonnes : attributs canoniques puis `geom_geojson`, `geom_esri`, `geom`.
    pub fn from_manifest_entry(entry: &ManifestEntry) -> Self {
        let mut columns: Vec<String> = entry.columns.iter().map(|c| c.name.clone()).collect();
        columns.extend(["geom_geojson", "geom_esri", "geom"].map(String::from));

        let mut layer = Self {
            table: entry.table.clone(),
            geometry_column: Some("geom_geojson".to_string()),
            columns: Some(columns),
            ..Default::default()
        };
        layer.normalize();
        layer
    }

    /// Remplace les rôles par ceux du résolveur (noms déclarés ramenés à la casse réelle)
    pub fn apply_roles(&mut self, resolver: &dyn RoleResolver) {
        let Some(columns) = self.columns.as_deref() else {
            return;
        };
        let roles = resolver.resolve(columns, self);

        self.search_columns = Some(roles.search).filter(|s| !s.is_empty());
        self.zoning_column = roles.zoning;
        self.acres_column = roles.acres;
        self.geometry_column = roles.geometry;
    }
}

/// Vrai pour une colonne qui porte probablement une géométrie
pub fn is_geometry_column(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("geom") || lower.contains("shape")
}

/// Disposition par défaut des colonnes d'une couche
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub order: Vec<String>,
    pub hidden: Vec<String>,
}

fn geometry_last(columns: Vec<String>) -> Vec<String> {
    let (plain, geometry): (Vec<_>, Vec<_>) =
        columns.into_iter().partition(|c| !is_geometry_column(c));
    plain.into_iter().chain(geometry).collect()
}

/// Ordre et colonnes masquées à l'ouverture d'une couche
///
/// L'ordre part de `columnOrder` (ou à défaut `defaultColumns`), complété par
/// les autres colonnes ; les colonnes géométriques passent en fin. Sont
/// masquées les `hiddenColumns` et, si `defaultColumns` est donné, tout ce qui
/// n'en fait pas partie.
pub fn default_layout(columns: &[String], layer: &LayerDescriptor) -> ColumnLayout {
    let declared = |names: &Option<Vec<String>>| {
        names
            .as_deref()
            .map(|n| map_column_names(columns, n))
            .unwrap_or_default()
    };
    let defaults = declared(&layer.default_columns);
    let hidden_declared = declared(&layer.hidden_columns);
    let explicit_order = declared(&layer.column_order);

    let base = if explicit_order.is_empty() {
        defaults.clone()
    } else {
        explicit_order
    };

    let mut order: Vec<String> = Vec::with_capacity(columns.len());
    for c in base.iter().chain(columns.iter()) {
        if !order.contains(c) {
            order.push(c.clone());
        }
    }
    let order = geometry_last(order);

    let mut hidden: Vec<String> = Vec::new();
    for c in &hidden_declared {
        if !hidden.contains(c) {
            hidden.push(c.clone());
        }
    }
    if !defaults.is_empty() {
        for c in columns {
            if !defaults.contains(c) && !hidden.contains(c) {
                hidden.push(c.clone());
            }
        }
    }

    ColumnLayout { order, hidden }
}

/// Géométrie affichable d'une ligne renvoyée par la base
///
/// Colonnes candidates : la colonne géométrique résolue, puis les colonnes
/// `geom_geojson`, puis tout nom d'allure géométrique. La première valeur
/// décodable l'emporte, ramenée en longitude/latitude si besoin.
pub fn extract_geometry(
    row: &Map<String, Value>,
    layer: &LayerDescriptor,
    resolver: &dyn RoleResolver,
) -> Option<PortableGeometry> {
    let columns: Vec<String> = row.keys().cloned().collect();

    let mut candidates: Vec<&String> = Vec::new();
    let preferred = resolver
        .resolve_role(ColumnRole::Geometry, &columns, layer)
        .into_iter()
        .next();
    if let Some(name) = preferred.as_ref().and_then(|p| columns.iter().find(|c| *c == p)) {
        candidates.push(name);
    }
    for c in &columns {
        if !candidates.contains(&c) && c.to_ascii_lowercase().contains("geom_geojson") {
            candidates.push(c);
        }
    }
    for c in &columns {
        if !candidates.contains(&c) && is_geometry_column(c) {
            candidates.push(c);
        }
    }

    candidates
        .into_iter()
        .filter_map(|c| row.get(c.as_str()))
        .find_map(read_geometry)
}

/// Construit les descripteurs de toutes les tables du manifeste
///
/// Un descripteur déclaré pour la même table remplace celui par défaut (ses
/// colonnes manquantes sont reprises du manifeste). Les descripteurs déclarés
/// pour des tables absentes du manifeste sont ajoutés à la suite.
pub fn build_layers(
    manifest: &[ManifestEntry],
    explicit: &[LayerDescriptor],
    resolver: &dyn RoleResolver,
) -> Vec<LayerDescriptor> {
    let mut layers = Vec::with_capacity(manifest.len());

    for entry in manifest {
        let generated = LayerDescriptor::from_manifest_entry(entry);
        let mut layer = match explicit.iter().find(|l| l.table == entry.table) {
            Some(declared) => {
                let mut layer = declared.clone();
                if layer.columns.is_none() {
                    layer.columns = generated.columns;
                }
                layer
            }
            None => generated,
        };
        layer.normalize();
        layer.apply_roles(resolver);
        layers.push(layer);
    }

    for declared in explicit {
        if declared.table.is_empty() || manifest.iter().any(|e| e.table == declared.table) {
            continue;
        }
        let mut layer = declared.clone();
        layer.normalize();
        layer.apply_roles(resolver);
        layers.push(layer);
    }

    layers
}

/// Écrit `layers.json`
pub fn save_layers(layers: &[LayerDescriptor], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(layers)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
