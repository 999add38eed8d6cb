//! Résolution des rôles de colonnes (recherche, zonage, surface, géométrie)
//!
//! Deux stratégies : les noms déclarés sur la couche, puis des motifs sur les
//! noms de colonnes. [`FallbackResolver`] les enchaîne rôle par rôle.

use regex::{Regex, RegexBuilder};

use super::LayerDescriptor;

/// Nombre maximal de colonnes de recherche
pub const MAX_SEARCH_COLUMNS: usize = 3;

/// Rôle d'une colonne dans l'interface de consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Search,
    Zoning,
    Acres,
    Geometry,
}

/// Rôles résolus pour une couche
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRoles {
    pub search: Vec<String>,
    pub zoning: Option<String>,
    pub acres: Option<String>,
    pub geometry: Option<String>,
}

/// Stratégie de résolution des rôles
///
/// `resolve_role` rend une liste vide quand la stratégie n'a pas de réponse ;
/// pour les rôles à colonne unique seul le premier élément compte.
pub trait RoleResolver {
    fn resolve_role(&self, role: ColumnRole, columns: &[String], layer: &LayerDescriptor)
        -> Vec<String>;

    fn resolve(&self, columns: &[String], layer: &LayerDescriptor) -> ResolvedRoles {
        let first = |role: ColumnRole| self.resolve_role(role, columns, layer).into_iter().next();
        ResolvedRoles {
            search: self.resolve_role(ColumnRole::Search, columns, layer),
            zoning: first(ColumnRole::Zoning),
            acres: first(ColumnRole::Acres),
            geometry: first(ColumnRole::Geometry),
        }
    }
}

/// Retrouve une colonne sans tenir compte de la casse
pub fn find_column<'a>(columns: &'a [String], name: &str) -> Option<&'a String> {
    columns.iter().find(|c| c.eq_ignore_ascii_case(name))
}

/// Ramène une liste de noms déclarés aux colonnes existantes (inconnus ignorés)
pub fn map_column_names(columns: &[String], names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| find_column(columns, name).cloned())
        .collect()
}

/// Rôles déclarés explicitement sur la couche
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitRoles;

impl RoleResolver for ExplicitRoles {
    fn resolve_role(
        &self,
        role: ColumnRole,
        columns: &[String],
        layer: &LayerDescriptor,
    ) -> Vec<String> {
        let declared = match role {
            ColumnRole::Search => {
                return layer
                    .search_columns
                    .as_deref()
                    .map(|names| map_column_names(columns, names))
                    .unwrap_or_default();
            }
            ColumnRole::Zoning => layer.zoning_column.as_deref(),
            ColumnRole::Acres => layer.acres_column.as_deref(),
            ColumnRole::Geometry => layer.geometry_column.as_deref(),
        };
        declared
            .and_then(|name| find_column(columns, name))
            .cloned()
            .into_iter()
            .collect()
    }
}

/// Rôles devinés d'après les noms de colonnes
#[derive(Debug, Clone)]
pub struct PatternRoles {
    address: Regex,
    owner: Regex,
    parcel: Regex,
    zoning: Regex,
    acres: Regex,
    acres_exclude: Regex,
    geometry: Regex,
}

fn pattern(re: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(re).case_insensitive(true).build()
}

impl PatternRoles {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            address: pattern("addr|address|situs")?,
            owner: pattern("owner|name")?,
            parcel: pattern("parcel|pin|pid|map")?,
            zoning: pattern("zone|zoning|district")?,
            acres: pattern("acre|acres|area")?,
            acres_exclude: pattern("shape")?,
            geometry: pattern("geom|geometry|shape")?,
        })
    }

    /// Adresse d'abord, puis propriétaire, puis identifiant parcellaire
    fn search(&self, columns: &[String]) -> Vec<String> {
        let mut preferred: Vec<&String> = columns.iter().filter(|c| self.address.is_match(c)).collect();
        for re in [&self.owner, &self.parcel] {
            for c in columns {
                if preferred.len() < MAX_SEARCH_COLUMNS && re.is_match(c) {
                    preferred.push(c);
                }
            }
        }

        let mut unique: Vec<String> = Vec::new();
        for c in preferred {
            if !unique.contains(c) {
                unique.push(c.clone());
            }
        }
        if unique.is_empty() {
            return columns.iter().take(MAX_SEARCH_COLUMNS).cloned().collect();
        }
        unique.truncate(MAX_SEARCH_COLUMNS);
        unique
    }

    fn first_match(&self, columns: &[String], keep: impl Fn(&str) -> bool) -> Vec<String> {
        columns
            .iter()
            .find(|c| keep(c.as_str()))
            .cloned()
            .into_iter()
            .collect()
    }
}

impl RoleResolver for PatternRoles {
    fn resolve_role(
        &self,
        role: ColumnRole,
        columns: &[String],
        _layer: &LayerDescriptor,
    ) -> Vec<String> {
        match role {
            ColumnRole::Search => self.search(columns),
            ColumnRole::Zoning => self.first_match(columns, |c| self.zoning.is_match(c)),
            ColumnRole::Acres => self.first_match(columns, |c| {
                self.acres.is_match(c) && !self.acres_exclude.is_match(c)
            }),
            ColumnRole::Geometry => self.first_match(columns, |c| self.geometry.is_match(c)),
        }
    }
}

/// Enchaîne deux stratégies : la seconde répond quand la première est vide
#[derive(Debug, Clone)]
pub struct FallbackResolver<P, S> {
    primary: P,
    secondary: S,
}

impl<P: RoleResolver, S: RoleResolver> FallbackResolver<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl FallbackResolver<ExplicitRoles, PatternRoles> {
    /// Noms déclarés d'abord, motifs ensuite
    pub fn standard() -> Result<Self, regex::Error> {
        Ok(Self::new(ExplicitRoles, PatternRoles::new()?))
    }
}

impl<P: RoleResolver, S: RoleResolver> RoleResolver for FallbackResolver<P, S> {
    fn resolve_role(
        &self,
        role: ColumnRole,
        columns: &[String],
        layer: &LayerDescriptor,
    ) -> Vec<String> {
        let found = self.primary.resolve_role(role, columns, layer);
        if found.is_empty() {
            self.secondary.resolve_role(role, columns, layer)
        } else {
            found
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn layer() -> LayerDescriptor {
        LayerDescriptor {
            table: "parcels".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pattern_search_priority() {
        let columns = cols(&["objectid", "owner_name", "parcel_id", "situs_address", "mailing_addr"]);
        let roles = PatternRoles::new().unwrap();
        assert_eq!(
            roles.resolve_role(ColumnRole::Search, &columns, &layer()),
            cols(&["situs_address", "mailing_addr", "owner_name"])
        );
    }

    #[test]
    fn test_pattern_search_dedup_and_fallback() {
        let roles = PatternRoles::new().unwrap();

        // "owner_name_map" correspond à deux motifs mais n'apparaît qu'une fois
        let columns = cols(&["owner_name_map", "pin"]);
        assert_eq!(
            roles.resolve_role(ColumnRole::Search, &columns, &layer()),
            cols(&["owner_name_map", "pin"])
        );

        let columns = cols(&["a", "b", "c", "d"]);
        assert_eq!(
            roles.resolve_role(ColumnRole::Search, &columns, &layer()),
            cols(&["a", "b", "c"])
        );
    }

    #[test]
    fn test_pattern_single_roles() {
        let columns = cols(&["shape_area", "gis_acres", "zoning_district", "geom_geojson", "geom"]);
        let resolved = PatternRoles::new().unwrap().resolve(&columns, &layer());
        assert_eq!(resolved.zoning.as_deref(), Some("zoning_district"));
        assert_eq!(resolved.acres.as_deref(), Some("gis_acres"));
        assert_eq!(resolved.geometry.as_deref(), Some("shape_area"));
    }

    #[test]
    fn test_explicit_roles_case_insensitive() {
        let columns = cols(&["owner_name", "zone_code", "geom_geojson"]);
        let layer = LayerDescriptor {
            search_columns: Some(cols(&["OWNER_NAME", "missing"])),
            zoning_column: Some("Zone_Code".into()),
            ..layer()
        };
        let resolved = ExplicitRoles.resolve(&columns, &layer);
        assert_eq!(resolved.search, cols(&["owner_name"]));
        assert_eq!(resolved.zoning.as_deref(), Some("zone_code"));
        assert_eq!(resolved.acres, None);
    }

    #[test]
    fn test_fallback_resolver() {
        let columns = cols(&["owner_name", "zone_code", "district", "geom_geojson"]);
        let layer = LayerDescriptor {
            zoning_column: Some("district".into()),
            geometry_column: Some("does_not_exist".into()),
            ..layer()
        };
        let resolved = FallbackResolver::standard().unwrap().resolve(&columns, &layer);
        assert_eq!(resolved.zoning.as_deref(), Some("district"));
        assert_eq!(resolved.geometry.as_deref(), Some("geom_geojson"));
        assert_eq!(resolved.search, cols(&["owner_name"]));
    }
}
