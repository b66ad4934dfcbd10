//! Family record extraction.
//!
//! Extraction is an ordered list of [`Strategy`] values. Each strategy is a
//! pure function of its input; the runner stops at the first strategy that
//! applies. Spreadsheet strategies apply as soon as their precondition holds
//! (a header with a name column), even when no row yields a record. Text
//! strategies apply only when they produce at least one record.

pub mod freeform;
pub mod tabular;

use crate::models::{FamilyRecord, Sheet};

/// What a strategy reads.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Rows(&'a [Vec<String>]),
    Text(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// First row names the columns.
    HeaderRow,
    /// No usable header; classify cells by shape.
    CellShapes,
    /// "Famille X - district - N membres".
    LabelledFamily,
    /// "Name, district, N personnes".
    NameDistrictCount,
    /// Bare capitalised name lines.
    NameLines,
}

/// Result of running one strategy.
#[derive(Debug, Default)]
pub struct Outcome {
    pub applied: bool,
    pub families: Vec<FamilyRecord>,
}

impl Outcome {
    fn not_applied() -> Self {
        Self::default()
    }

    fn from_text(families: Vec<FamilyRecord>) -> Self {
        Self {
            applied: !families.is_empty(),
            families,
        }
    }
}

pub const SHEET_STRATEGIES: &[Strategy] = &[Strategy::HeaderRow, Strategy::CellShapes];
pub const TEXT_STRATEGIES: &[Strategy] = &[
    Strategy::LabelledFamily,
    Strategy::NameDistrictCount,
    Strategy::NameLines,
];

impl Strategy {
    pub fn run(self, source: Source<'_>) -> Outcome {
        match (self, source) {
            (Strategy::HeaderRow, Source::Rows(rows)) => {
                let Some(header) = rows.first() else {
                    return Outcome::not_applied();
                };
                let columns = tabular::detect_header(header);
                if columns.name.is_none() {
                    return Outcome::not_applied();
                }
                Outcome {
                    applied: true,
                    families: tabular::extract_with_header(rows, columns),
                }
            }
            (Strategy::CellShapes, Source::Rows(rows)) => Outcome {
                applied: true,
                families: tabular::scan_rows_without_headers(rows),
            },
            (Strategy::LabelledFamily, Source::Text(text)) => {
                Outcome::from_text(freeform::labelled_family(text))
            }
            (Strategy::NameDistrictCount, Source::Text(text)) => {
                Outcome::from_text(freeform::name_district_count(text))
            }
            (Strategy::NameLines, Source::Text(text)) => {
                Outcome::from_text(freeform::name_lines(text))
            }
            _ => Outcome::not_applied(),
        }
    }
}

/// Run `strategies` in order and return the families of the first that applies.
pub fn run_strategies(strategies: &[Strategy], source: Source<'_>) -> Vec<FamilyRecord> {
    for strategy in strategies {
        let outcome = strategy.run(source);
        if outcome.applied {
            tracing::debug!(
                ?strategy,
                families = outcome.families.len(),
                "family extraction strategy applied"
            );
            return outcome.families;
        }
    }
    Vec::new()
}

/// Families from one sheet's rows. Fewer than two rows yield nothing.
pub fn extract_from_table(rows: &[Vec<String>]) -> Vec<FamilyRecord> {
    if rows.len() < 2 {
        return Vec::new();
    }
    run_strategies(SHEET_STRATEGIES, Source::Rows(rows))
}

/// Families from every sheet of a workbook, in sheet order.
pub fn extract_from_workbook(sheets: &[Sheet]) -> Vec<FamilyRecord> {
    sheets
        .iter()
        .flat_map(|sheet| extract_from_table(&sheet.rows))
        .collect()
}

/// Families found in free text. Empty when no strategy finds any.
pub fn extract_from_text(text: &str) -> Vec<FamilyRecord> {
    run_strategies(TEXT_STRATEGIES, Source::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, data: &[&[&str]]) -> Sheet {
        Sheet {
            name: name.into(),
            rows: data
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn header_with_name_column_wins_even_without_rows() {
        // Header found but the only data row has a one-letter name.
        let s = sheet("s", &[&["Nom", "Quartier"], &["A", "Karim Alaoui"]]);
        assert!(extract_from_workbook(&[s]).is_empty());
    }

    #[test]
    fn falls_back_to_cell_shapes_without_header() {
        let s = sheet(
            "s",
            &[&["Karim Alaoui", "Sidi Moumen", "4"], &["Said Idrissi", "Anfa", "2"]],
        );
        let families = extract_from_workbook(&[s]);
        assert_eq!(families.len(), 2);
        assert_eq!(families[1].name, "Said Idrissi");
    }

    #[test]
    fn single_row_sheets_skipped() {
        let s1 = sheet("empty", &[&["Nom"]]);
        let s2 = sheet("ok", &[&["Nom"], &["Bennani"]]);
        let families = extract_from_workbook(&[s1, s2]);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Bennani");
    }

    #[test]
    fn table_extraction_is_idempotent() {
        let s = sheet(
            "s",
            &[
                &["Nom", "Membres", "Besoins"],
                &["Amrani", "4 personnes", "Loyer; Lait"],
            ],
        );
        let first = extract_from_table(&s.rows);
        assert_eq!(first, extract_from_table(&s.rows));
        assert_eq!(first[0].members, 4);
        assert_eq!(first[0].needs, vec!["Loyer", "Lait"]);
    }

    #[test]
    fn text_strategies_stop_at_first_success() {
        let text = "Famille Tazi - Maarif - 2 membres\nKarim Alaoui, Anfa, 3 personnes";
        let families = extract_from_text(text);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Tazi");
    }

    #[test]
    fn text_strategy_ignores_rows() {
        let rows = vec![vec!["Famille Tazi - Maarif - 2 membres".to_string()]];
        assert!(!Strategy::LabelledFamily.run(Source::Rows(&rows)).applied);
    }

    #[test]
    fn nothing_found() {
        assert!(extract_from_text("rien à signaler").is_empty());
    }
}
