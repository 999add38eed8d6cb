//! Classification des valeurs et inférence de type monotone

use serde::Serialize;
use serde_json::Value;

use super::ColumnType;

/// Nature d'une valeur d'attribut observée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// null ou chaîne blanche : aucune information de type
    Empty,
    Text,
    Number,
    Bool,
}

/// Classe une valeur d'attribut
///
/// Les chaînes `"true"`/`"false"` et les chaînes numériques simples comptent
/// comme booléen / nombre : les exports ArcGIS stockent souvent les surfaces
/// en texte. Les valeurs structurées sont du texte.
pub fn classify(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Empty,
        Value::Bool(_) => ValueKind::Bool,
        Value::Number(_) => ValueKind::Number,
        Value::String(s) => {
            let s = trim_ascii_whitespace(s);
            if s.is_empty() {
                ValueKind::Empty
            } else if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
                ValueKind::Bool
            } else if is_plain_number(s) {
                ValueKind::Number
            } else {
                ValueKind::Text
            }
        }
        Value::Array(_) | Value::Object(_) => ValueKind::Text,
    }
}

/// Retire les blancs ASCII en tête et en queue
///
/// PostgreSQL n'ignore que ces blancs-là en entrée numeric/boolean : un
/// espace insécable laisse la valeur en texte.
pub fn trim_ascii_whitespace(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii_whitespace())
}

/// Nombre décimal simple : signe optionnel, chiffres, partie décimale et
/// exposant optionnels. Refuse `inf`, `NaN`, l'hexadécimal et les séparateurs.
fn is_plain_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len() && s.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Indices de type accumulés pour une colonne
///
/// Monotone : un indice observé n'est jamais retiré.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeEvidence {
    pub has_text: bool,
    pub has_number: bool,
    pub has_bool: bool,
}

impl TypeEvidence {
    pub fn record(&mut self, kind: ValueKind) {
        match kind {
            ValueKind::Empty => {}
            ValueKind::Text => self.has_text = true,
            ValueKind::Number => self.has_number = true,
            ValueKind::Bool => self.has_bool = true,
        }
    }

    /// Type final : numeric ou boolean seulement si l'indice est exclusif
    pub fn resolve(&self) -> ColumnType {
        match (self.has_text, self.has_number, self.has_bool) {
            (false, true, false) => ColumnType::Numeric,
            (false, false, true) => ColumnType::Boolean,
            _ => ColumnType::Text,
        }
    }

    /// Nombres et booléens mélangés sans texte (résolu en text)
    pub fn is_mixed_scalar(&self) -> bool {
        !self.has_text && self.has_number && self.has_bool
    }
}
