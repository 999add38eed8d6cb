//! Normalisation des identifiants SQL (colonnes et tables)
//!
//! Les clés d'attributs arrivent telles quelles depuis les exports ArcGIS
//! (`Owner Name`, `GIS_Acres`, `2019 Value`...). Elles sont ramenées en
//! lower-snake-case, protégées contre les mots réservés PostgreSQL et les
//! colonnes système de la table cible, puis dédoublonnées fichier par fichier.

use std::collections::{HashMap, HashSet};

/// Colonnes ajoutées par la table cible, jamais utilisables comme attribut
pub const RESERVED_COLUMNS: [&str; 4] = ["id", "geom", "geom_geojson", "geom_esri"];

/// Mots réservés PostgreSQL refusés comme nom de colonne nu
pub const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "between", "bigint", "binary", "bit", "boolean", "both", "case",
    "cast", "char", "character", "check", "collate", "column", "constraint", "create",
    "cross", "current_date", "current_role", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "float", "for", "foreign", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "insert", "int", "integer",
    "intersect", "into", "is", "isnull", "join", "leading", "left", "like", "limit",
    "localtime", "localtimestamp", "natural", "not", "notnull", "null", "numeric", "offset",
    "on", "only", "or", "order", "outer", "overlaps", "placing", "primary", "real",
    "references", "returning", "right", "select", "session_user", "similar", "smallint",
    "table", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "verbose", "when", "where",
];

pub fn is_reserved_column(name: &str) -> bool {
    RESERVED_COLUMNS.contains(&name)
}

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(&name)
}

/// Minuscules ASCII, séquences hors `[a-z0-9]` remplacées par un seul `_`,
/// sans `_` en tête ni en queue
fn sanitize(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    lower
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn starts_with_digit(s: &str) -> bool {
    s.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Nom de base canonique d'une clé d'attribut (avant dédoublonnage)
///
/// ```
/// use layer_prep::naming::normalize_key;
///
/// assert_eq!(normalize_key("Owner Name"), "owner_name");
/// assert_eq!(normalize_key("order"), "c_order");
/// assert_eq!(normalize_key("ID"), "attr_id");
/// assert_eq!(normalize_key("2019 Value"), "c_2019_value");
/// ```
pub fn normalize_key(key: &str) -> String {
    let mut s = sanitize(key);
    if s.is_empty() {
        s = "col".to_string();
    }
    if is_reserved_column(&s) {
        s = format!("attr_{}", s);
    }
    if starts_with_digit(&s) {
        s = format!("c_{}", s);
    }
    if is_reserved_keyword(&s) {
        s = format!("c_{}", s);
    }
    s
}

/// Nom de table dérivé d'un nom de fichier d'export
///
/// L'extension `.jsonl` / `.ndjson` et un préfixe numérique `NN_` sont
/// retirés. Pas de contrôle des mots réservés.
pub fn normalize_table_name(file_name: &str) -> String {
    let base = strip_extension(file_name);
    let base = strip_numeric_prefix(base);

    let mut s = sanitize(base);
    if s.is_empty() {
        s = "dataset".to_string();
    }
    if starts_with_digit(&s) {
        s = format!("d_{}", s);
    }
    s
}

fn strip_extension(file_name: &str) -> &str {
    for ext in [".jsonl", ".ndjson"] {
        if file_name.len() >= ext.len() {
            let split = file_name.len() - ext.len();
            if file_name.is_char_boundary(split) && file_name[split..].eq_ignore_ascii_case(ext) {
                return &file_name[..split];
            }
        }
    }
    file_name
}

fn strip_numeric_prefix(base: &str) -> &str {
    let digits = base.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 && base.as_bytes().get(digits) == Some(&b'_') {
        &base[digits + 1..]
    } else {
        base
    }
}

/// Longueur maximale d'un identifiant PostgreSQL (au-delà, il est tronqué)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Relations créées à côté de chaque table : vue et index géométrique
pub const TABLE_COMPANION_SUFFIXES: [&str; 2] = ["_view", "_geom_gix"];

/// Tronque à `max` octets sur une frontière de caractère
fn truncate(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Attribution de noms uniques dans un espace de noms (une table, ou un run)
///
/// Le premier arrivé garde le nom de base ; les suivants reçoivent `_1`,
/// `_2`... en partant du compteur propre à la base. Chaque candidat est
/// revérifié contre les noms déjà attribués et les noms réservés. Les noms
/// sont tronqués avant dédoublonnage pour que PostgreSQL les voie distincts.
#[derive(Debug)]
pub struct NameAllocator {
    used: HashSet<String>,
    next_suffix: HashMap<String, usize>,
    check_reserved: bool,
    /// Suffixes des relations dérivées de chaque nom attribué
    companions: &'static [&'static str],
    max_len: usize,
}

impl NameAllocator {
    /// Allocateur pour des noms de colonnes (réservés interdits)
    pub fn for_columns() -> Self {
        Self {
            used: HashSet::new(),
            next_suffix: HashMap::new(),
            check_reserved: true,
            companions: &[],
            max_len: MAX_IDENTIFIER_LEN,
        }
    }

    /// Allocateur pour des noms de tables
    ///
    /// La vue et l'index de chaque table occupent aussi l'espace des relations :
    /// un candidat est refusé s'il heurte l'un d'eux, ou si les siens sont pris.
    pub fn for_tables() -> Self {
        let longest = TABLE_COMPANION_SUFFIXES.iter().map(|s| s.len()).max().unwrap_or(0);
        Self {
            used: HashSet::new(),
            next_suffix: HashMap::new(),
            check_reserved: false,
            companions: &TABLE_COMPANION_SUFFIXES,
            max_len: MAX_IDENTIFIER_LEN - longest,
        }
    }

    fn is_taken(&self, name: &str) -> bool {
        self.used.contains(name)
            || self
                .companions
                .iter()
                .any(|suffix| self.used.contains(&format!("{}{}", name, suffix)))
            || (self.check_reserved && (is_reserved_column(name) || is_reserved_keyword(name)))
    }

    fn reserve(&mut self, name: &str) {
        for suffix in self.companions {
            self.used.insert(format!("{}{}", name, suffix));
        }
        self.used.insert(name.to_string());
    }

    /// Réserve un nom unique dérivé de `base`
    pub fn allocate(&mut self, base: &str) -> String {
        let base = truncate(base, self.max_len);
        if !self.is_taken(base) {
            self.reserve(base);
            self.next_suffix.insert(base.to_string(), 1);
            return base.to_string();
        }

        let mut i = self.next_suffix.get(base).copied().unwrap_or(1);
        loop {
            let suffix = format!("_{}", i);
            let name = format!("{}{}", truncate(base, self.max_len - suffix.len()), suffix);
            if !self.is_taken(&name) {
                self.reserve(&name);
                self.next_suffix.insert(base.to_string(), i + 1);
                return name;
            }
            i += 1;
        }
    }
}
