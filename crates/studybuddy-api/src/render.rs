//! Row-to-wire conversion, including nesting items under variants and
//! variants under quizzes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use studybuddy_db::{ItemRow, QuizRow, VariantRow};
use studybuddy_types::api::{ItemResponse, QuizResponse, VariantResponse};

pub fn item(row: ItemRow) -> ItemResponse {
    ItemResponse {
        id: row.id,
        name: row.name,
        variant: row.variant_id,
        variant_name: row.variant_name,
    }
}

pub fn items(rows: Vec<ItemRow>) -> Vec<ItemResponse> {
    rows.into_iter().map(item).collect()
}

/// Attaches `items` to their variants. Items whose variant is not in
/// `variants` are dropped.
pub fn variants(variants: Vec<VariantRow>, items: Vec<ItemRow>) -> Vec<VariantResponse> {
    let mut by_variant: HashMap<i64, Vec<ItemResponse>> = HashMap::new();
    for row in items {
        by_variant.entry(row.variant_id).or_default().push(item(row));
    }

    variants
        .into_iter()
        .map(|row| {
            let items = by_variant.remove(&row.id).unwrap_or_default();
            variant_with(row, items)
        })
        .collect()
}

/// Renders one variant; `items` must belong to it.
pub fn variant(row: VariantRow, items: Vec<ItemRow>) -> VariantResponse {
    variant_with(row, self::items(items))
}

fn variant_with(row: VariantRow, items: Vec<ItemResponse>) -> VariantResponse {
    VariantResponse {
        id: row.id,
        name: row.name,
        quiz: row.quiz_id,
        items_count: items.len(),
        items,
    }
}

pub fn quizzes(quizzes: Vec<QuizRow>, variant_rows: Vec<VariantRow>, items: Vec<ItemRow>) -> Vec<QuizResponse> {
    let mut by_quiz: HashMap<i64, Vec<VariantResponse>> = HashMap::new();
    for v in variants(variant_rows, items) {
        by_quiz.entry(v.quiz).or_default().push(v);
    }

    quizzes
        .into_iter()
        .map(|row| {
            let variants = by_quiz.remove(&row.id).unwrap_or_default();
            quiz_with(row, variants)
        })
        .collect()
}

/// Renders one quiz; `variant_rows` and `items` must belong to it.
pub fn quiz(row: QuizRow, variant_rows: Vec<VariantRow>, items: Vec<ItemRow>) -> QuizResponse {
    quiz_with(row, variants(variant_rows, items))
}

fn quiz_with(row: QuizRow, variants: Vec<VariantResponse>) -> QuizResponse {
    QuizResponse {
        id: row.id,
        created_at: parse_timestamp(&row.created_at, row.id),
        title: row.title,
        user: row.owner_username,
        variants_count: variants.len(),
        variants,
    }
}

fn parse_timestamp(raw: &str, quiz_id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') default is "YYYY-MM-DD HH:MM:SS" without timezone.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on quiz {}: {}", raw, quiz_id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_row(id: i64) -> QuizRow {
        QuizRow {
            id,
            title: format!("Quiz {id}"),
            owner_id: "owner".into(),
            owner_username: "alice".into(),
            created_at: "2025-03-01 12:30:00".into(),
        }
    }

    fn variant_row(id: i64, quiz_id: i64) -> VariantRow {
        VariantRow {
            id,
            quiz_id,
            name: format!("V{id}"),
        }
    }

    fn item_row(id: i64, variant_id: i64) -> ItemRow {
        ItemRow {
            id,
            variant_id,
            variant_name: format!("V{variant_id}"),
            name: format!("I{id}"),
        }
    }

    #[test]
    fn nests_and_counts() {
        let out = quizzes(
            vec![quiz_row(1), quiz_row(2)],
            vec![variant_row(10, 1), variant_row(11, 1)],
            vec![item_row(100, 10), item_row(101, 10), item_row(102, 11)],
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].variants_count, 2);
        assert_eq!(out[0].variants[0].items_count, 2);
        assert_eq!(out[0].variants[0].items[1].name, "I101");
        assert_eq!(out[0].variants[1].items[0].variant_name, "V11");
        assert_eq!(out[1].variants_count, 0);
        assert!(out[1].variants.is_empty());
    }

    #[test]
    fn parses_both_timestamp_formats() {
        let sqlite = parse_timestamp("2025-03-01 12:30:00", 1);
        let rfc = parse_timestamp("2025-03-01T12:30:00.000000Z", 1);
        assert_eq!(sqlite, rfc);
        assert_eq!(parse_timestamp("garbage", 1), DateTime::<Utc>::default());
    }
}
