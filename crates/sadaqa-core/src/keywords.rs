//! Multilingual keyword tables (French, English, Arabic).
//!
//! All matching against these tables is case-insensitive substring
//! containment on lower-cased input, so every entry here is lower case.
//! New synonyms or languages are added here without touching control flow.

/// Classifier signals. Each pair is `(text keywords, filename keywords)`.
pub const FAMILY_LIST_SIGNALS: (&[&str], &[&str]) =
    (&["famille", "family", "أسرة"], &["famille", "family"]);
pub const INVENTORY_SIGNALS: (&[&str], &[&str]) =
    (&["inventaire", "inventory", "stock"], &["inventaire"]);
pub const ZAKAT_GUIDE_SIGNALS: (&[&str], &[&str]) = (&["zakat", "زكاة", "guide"], &["zakat"]);

/// Spreadsheet header synonyms per family field.
pub const NAME_HEADERS: &[&str] = &["nom", "name", "famille", "family", "أسرة"];
pub const DISTRICT_HEADERS: &[&str] = &["quartier", "district", "zone", "حي", "region"];
pub const MEMBERS_HEADERS: &[&str] = &["membres", "members", "personnes", "أفراد", "nombre"];
pub const NEEDS_HEADERS: &[&str] = &["besoins", "needs", "besoin", "احتياجات"];
pub const PRIORITY_HEADERS: &[&str] = &["priorité", "priority", "urgence", "أولوية"];

/// Priority values in a spreadsheet priority cell.
pub const CELL_HIGH_PRIORITY: &[&str] = &["haute", "high", "urgent"];
pub const CELL_LOW_PRIORITY: &[&str] = &["basse", "low", "faible"];

/// Priority cues in free text around a match. Negated urgency is checked
/// before [`CONTEXT_HIGH_PRIORITY`] since "non urgent" contains "urgent".
pub const CONTEXT_NEGATED_URGENCY: &[&str] = &["non urgent", "peu urgent", "not urgent"];
pub const CONTEXT_HIGH_PRIORITY: &[&str] = &[
    "urgent",
    "priorité haute",
    "priorite haute",
    "haute priorité",
    "high priority",
    "critique",
    "immédiat",
];
pub const CONTEXT_LOW_PRIORITY: &[&str] = &["faible", "basse", "low priority"];

/// Need cues in free text and the label each one maps to. Order is the
/// order labels appear in a record.
pub const NEED_LABELS: &[(&str, &str)] = &[
    ("quffat", "Quffat Ramadan"),
    ("ramadan", "Quffat Ramadan"),
    ("iftar", "Iftar collectif"),
    ("médicaments", "Médicaments"),
    ("medicaments", "Médicaments"),
    ("medicine", "Médicaments"),
    ("vêtements", "Vêtements"),
    ("vetements", "Vêtements"),
    ("clothing", "Vêtements"),
    ("éducation", "Éducation"),
    ("education", "Éducation"),
    ("logement", "Logement"),
    ("housing", "Logement"),
    ("nourriture", "Nourriture"),
    ("food", "Nourriture"),
    ("argent", "Aide financière"),
    ("financier", "Aide financière"),
    ("scolaire", "Fournitures scolaires"),
    ("santé", "Soins de santé"),
    ("sante", "Soins de santé"),
];

/// True if `haystack` (already lower-cased) contains any of `keywords`.
pub fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_lower_case() {
        let all = [
            NAME_HEADERS,
            DISTRICT_HEADERS,
            MEMBERS_HEADERS,
            NEEDS_HEADERS,
            PRIORITY_HEADERS,
            CELL_HIGH_PRIORITY,
            CELL_LOW_PRIORITY,
            CONTEXT_NEGATED_URGENCY,
            CONTEXT_HIGH_PRIORITY,
            CONTEXT_LOW_PRIORITY,
        ];
        for table in all {
            for k in table {
                assert_eq!(*k, k.to_lowercase(), "keyword not lower case: {}", k);
            }
        }
        for (k, _) in NEED_LABELS {
            assert_eq!(*k, k.to_lowercase());
        }
    }
}
