//! Génération des scripts SQL (schéma PostGIS et chargement `\copy`)
//!
//! Les identifiants sont déjà normalisés (lower-snake, hors mots réservés) :
//! ils sont écrits sans guillemets.

use std::fmt::Write as _;

use crate::schema::TableSpec;

/// Paramètres communs aux scripts générés
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlOptions {
    /// Schéma PostgreSQL cible
    pub schema: String,
    /// SRID appliqué par `safe_geom_from_geojson`
    pub srid: u32,
    /// Recréer les tables (drop ... cascade avant create)
    pub drop_tables: bool,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            srid: 4326,
            drop_tables: false,
        }
    }
}

/// En-tête du script de schéma : extension PostGIS et constructeur tolérant
///
/// `safe_geom_from_geojson` rend null au lieu d'échouer sur une géométrie
/// refusée par PostGIS, pour que la colonne générée n'interrompe pas le chargement.
pub fn bootstrap_sql(opts: &SqlOptions) -> String {
    format!(
        r#"create extension if not exists postgis;

create schema if not exists {schema};

create or replace function {schema}.safe_geom_from_geojson(j jsonb)
returns geometry
language plpgsql
immutable
as $$
begin
  if j is null then return null; end if;
  begin
    return ST_SetSRID(ST_GeomFromGeoJSON(j::text), {srid});
  exception when others then
    return null;
  end;
end;
$$;

"#,
        schema = opts.schema,
        srid = opts.srid,
    )
}

/// DDL d'une table : création, index spatial et vue
pub fn table_ddl(spec: &TableSpec, opts: &SqlOptions) -> String {
    let schema = &opts.schema;
    let table = &spec.name;
    let mut sql = String::new();

    if opts.drop_tables {
        let _ = writeln!(sql, "drop table if exists {schema}.{table} cascade;\n");
    }

    let _ = writeln!(sql, "create table if not exists {schema}.{table} (");
    sql.push_str("  id bigserial primary key,\n");
    for column in &spec.columns {
        let _ = writeln!(sql, "  {} {},", column.name, column.column_type.as_sql());
    }
    sql.push_str("  geom_geojson jsonb,\n");
    sql.push_str("  geom_esri jsonb,\n");
    let _ = writeln!(
        sql,
        "  geom geometry generated always as ({schema}.safe_geom_from_geojson(geom_geojson)) stored"
    );
    sql.push_str(");\n\n");

    let _ = writeln!(
        sql,
        "create index if not exists {table}_geom_gix on {schema}.{table} using gist (geom);\n"
    );

    let _ = writeln!(sql, "drop view if exists {schema}.{table}_view;");
    let _ = writeln!(
        sql,
        "create view {schema}.{table}_view as select * from {schema}.{table};"
    );
    sql
}

/// Instruction `\copy` (psql) chargeant le CSV d'une table
pub fn load_statement(spec: &TableSpec, csv_path: &str, opts: &SqlOptions) -> String {
    format!(
        "\\copy {}.{} ({}) from '{}' with (format csv, header true);\n",
        opts.schema,
        spec.name,
        spec.copy_columns().join(", "),
        csv_path.replace('\'', "''"),
    )
}

/// Script de schéma complet pour un ensemble de tables
pub fn schema_script<'a>(tables: impl IntoIterator<Item = &'a TableSpec>, opts: &SqlOptions) -> String {
    let mut sql = bootstrap_sql(opts);
    for spec in tables {
        sql.push_str(&table_ddl(spec, opts));
        sql.push('\n');
    }
    sql
}

/// Script de chargement : une instruction `\copy` par (table, chemin CSV)
pub fn load_script<'a>(
    tables: impl IntoIterator<Item = (&'a TableSpec, &'a str)>,
    opts: &SqlOptions,
) -> String {
    tables
        .into_iter()
        .map(|(spec, path)| load_statement(spec, path, opts))
        .collect()
}
