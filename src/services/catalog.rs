use std::collections::HashMap;

use serde::Serialize;

use crate::services::db_models::MenuItem;

/// Customer-facing menu card: one per (base name, size), aggregating the
/// proteins still selectable and the price range across them.
#[derive(Debug, Serialize)]
pub struct MenuCard {
    pub base_name: String,
    pub size_code: String,
    pub proteins: Vec<String>,
    pub min_price: i32,
    pub max_price: i32,
    pub is_available: bool,
}

/// Splits a display name into (base name, size code) by suffix convention:
/// `"<Base> Regular"` → `R`, `"<Base> Large"` → `L`, anything else → no code.
pub fn split_display_name(name: &str) -> (String, String) {
    if let Some(base) = name.strip_suffix(" Regular") {
        (base.to_owned(), "R".to_owned())
    } else if let Some(base) = name.strip_suffix(" Large") {
        (base.to_owned(), "L".to_owned())
    } else {
        (name.to_owned(), String::new())
    }
}

/// Groups raw (base, size, protein) rows into cards keyed by (base, size),
/// preserving the order in which a key first appears. Unavailable rows keep
/// their card visible but do not contribute a selectable protein.
pub fn group_menu(rows: Vec<MenuItem>) -> Vec<MenuCard> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut cards: Vec<MenuCard> = Vec::new();

    for row in rows {
        let key = (row.base_name.clone(), row.size_code.clone());
        let pos = match index.get(&key) {
            Some(pos) => *pos,
            None => {
                index.insert(key, cards.len());
                cards.push(MenuCard {
                    base_name: row.base_name.clone(),
                    size_code: row.size_code.clone(),
                    proteins: Vec::new(),
                    min_price: row.price,
                    max_price: row.price,
                    is_available: false,
                });
                cards.len() - 1
            }
        };

        let card = &mut cards[pos];
        card.min_price = card.min_price.min(row.price);
        card.max_price = card.max_price.max(row.price);
        if row.is_available {
            card.is_available = true;
            if !card.proteins.contains(&row.protein) {
                card.proteins.push(row.protein);
            }
        }
    }

    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(base: &str, size: &str, protein: &str, price: i32, available: bool) -> MenuItem {
        MenuItem {
            id: 0,
            base_name: base.to_owned(),
            size_code: size.to_owned(),
            protein: protein.to_owned(),
            price,
            is_available: available,
            stock_quantity: None,
        }
    }

    #[test]
    fn splits_size_suffixes() {
        assert_eq!(
            split_display_name("Montana BBQ Hamburger Regular"),
            ("Montana BBQ Hamburger".to_owned(), "R".to_owned())
        );
        assert_eq!(
            split_display_name("Montana BBQ Hamburger Large"),
            ("Montana BBQ Hamburger".to_owned(), "L".to_owned())
        );
        assert_eq!(split_display_name("Fries"), ("Fries".to_owned(), String::new()));
    }

    #[test]
    fn groups_by_base_and_size_with_price_range() {
        let cards = group_menu(vec![
            row("Burger", "R", "Beef", 280, true),
            row("Burger", "R", "Paneer", 260, true),
            row("Burger", "L", "Beef", 340, true),
        ]);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].proteins, vec!["Beef", "Paneer"]);
        assert_eq!((cards[0].min_price, cards[0].max_price), (260, 280));
        assert_eq!(cards[1].size_code, "L");
    }

    #[test]
    fn unavailable_rows_do_not_offer_proteins() {
        let cards = group_menu(vec![
            row("Burger", "R", "Beef", 280, false),
            row("Burger", "R", "Paneer", 260, true),
        ]);

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].proteins, vec!["Paneer"]);
        assert!(cards[0].is_available);

        let dark = group_menu(vec![row("Burger", "R", "Beef", 280, false)]);
        assert!(!dark[0].is_available);
        assert!(dark[0].proteins.is_empty());
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let cards = group_menu(vec![
            row("Wrap", "R", "Chicken", 200, true),
            row("Burger", "R", "Beef", 280, true),
            row("Wrap", "R", "Paneer", 190, true),
        ]);

        assert_eq!(cards[0].base_name, "Wrap");
        assert_eq!(cards[1].base_name, "Burger");
    }
}
