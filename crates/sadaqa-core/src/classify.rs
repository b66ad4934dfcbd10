//! Document classifier.
//!
//! Labels a document from keyword signals in its text and filename. The
//! first matching category wins; there is no scoring.

use crate::keywords::{contains_any, FAMILY_LIST_SIGNALS, INVENTORY_SIGNALS, ZAKAT_GUIDE_SIGNALS};
use crate::models::DocumentType;

/// Classify a document. Pure function of `text` and `filename`.
pub fn classify(text: &str, filename: &str) -> DocumentType {
    let text = text.to_lowercase();
    let filename = filename.to_lowercase();

    let rules = [
        (FAMILY_LIST_SIGNALS, DocumentType::FamilyList),
        (INVENTORY_SIGNALS, DocumentType::Inventory),
        (ZAKAT_GUIDE_SIGNALS, DocumentType::ZakatGuide),
    ];

    rules
        .into_iter()
        .find(|((text_kw, file_kw), _)| {
            contains_any(&text, text_kw) || contains_any(&filename, file_kw)
        })
        .map(|(_, ty)| ty)
        .unwrap_or(DocumentType::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zakat_guide_from_text() {
        assert_eq!(
            classify("Ceci est le guide de zakat 2026", "guide.pdf"),
            DocumentType::ZakatGuide
        );
    }

    #[test]
    fn inventory_from_text() {
        assert_eq!(
            classify("Inventaire des stocks de la semaine", "semaine.txt"),
            DocumentType::Inventory
        );
    }

    #[test]
    fn family_wins_over_inventory() {
        assert_eq!(
            classify("inventaire pour chaque famille", "x.txt"),
            DocumentType::FamilyList
        );
    }

    #[test]
    fn family_from_filename_only() {
        assert_eq!(classify("Ben Ali | Maarif", "Liste_FAMILLES.xlsx"), DocumentType::FamilyList);
    }

    #[test]
    fn arabic_family_token() {
        assert_eq!(classify("قائمة أسرة محتاجة", "list.txt"), DocumentType::FamilyList);
    }

    #[test]
    fn other_when_no_signal() {
        assert_eq!(classify("Horaires d'ouverture", "notes.txt"), DocumentType::Other);
    }
}
