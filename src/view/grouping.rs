use crate::models::{Category, Item, ShoppingList};
use crate::view::{Row, Section};

/// Case-insensitive substring match; the empty query matches everything.
fn matches(haystack: &str, query_lower: &str) -> bool {
    query_lower.is_empty() || haystack.to_lowercase().contains(query_lower)
}

/// Filter for the lists screen: matches against the list title.
pub fn filter_lists(lists: &[ShoppingList], query: &str) -> Vec<ShoppingList> {
    let query_lower = query.to_lowercase();
    lists
        .iter()
        .filter(|l| matches(&l.title, &query_lower))
        .cloned()
        .collect()
}

/// Builds the row sequence for the detail screen: items matching the query,
/// grouped by category with one header per non-empty group, groups ordered by
/// category name, items ordered by name (stable, so equal names keep their
/// insertion order). Purchased items are pulled out of their categories into
/// a single trailing section.
pub fn build_rows(items: &[Item], query: &str) -> Vec<Row> {
    let query_lower = query.to_lowercase();
    let (purchased, not_purchased): (Vec<&Item>, Vec<&Item>) = items
        .iter()
        .filter(|i| matches(&i.name, &query_lower))
        .partition(|i| i.purchased);

    let mut groups: Vec<(Category, Vec<&Item>)> = Vec::new();
    for item in not_purchased {
        match groups.iter_mut().find(|(c, _)| *c == item.category) {
            Some((_, bucket)) => bucket.push(item),
            None => groups.push((item.category, vec![item])),
        }
    }
    groups.sort_by(|a, b| a.0.label().cmp(b.0.label()));

    let mut rows = Vec::new();
    for (category, mut bucket) in groups {
        bucket.sort_by(|a, b| a.name.cmp(&b.name));
        rows.push(Row::Header(Section::Category(category)));
        rows.extend(bucket.into_iter().map(|i| Row::Item(i.clone())));
    }

    if !purchased.is_empty() {
        let mut purchased = purchased;
        purchased.sort_by(|a, b| a.name.cmp(&b.name));
        rows.push(Row::Header(Section::Purchased));
        rows.extend(purchased.into_iter().map(|i| Row::Item(i.clone())));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, category: Category, purchased: bool) -> Item {
        let mut item = Item::new(name, 1.0, "", category);
        item.purchased = purchased;
        item
    }

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|row| match row {
                Row::Header(section) => format!("#{}", section.label()),
                Row::Item(item) => item.name.clone(),
            })
            .collect()
    }

    #[test]
    fn groups_are_ordered_by_category_name_with_purchased_last() {
        let items = vec![
            item("Rice", Category::Food, false),
            item("Soap", Category::Hygiene, false),
            item("Beer", Category::Beverages, true),
        ];
        assert_eq!(
            names(&build_rows(&items, "")),
            vec!["#Food", "Rice", "#Hygiene", "Soap", "#Purchased", "Beer"]
        );
    }

    #[test]
    fn items_sort_by_name_within_their_group() {
        let items = vec![
            item("Pasta", Category::Food, false),
            item("Apples", Category::Food, false),
            item("Milk", Category::Food, false),
        ];
        assert_eq!(
            names(&build_rows(&items, "")),
            vec!["#Food", "Apples", "Milk", "Pasta"]
        );
    }

    #[test]
    fn equal_names_keep_insertion_order() {
        let first = item("Rice", Category::Food, false);
        let second = item("Rice", Category::Food, false);
        let rows = build_rows(&[first.clone(), second.clone()], "");
        let Row::Item(a) = &rows[1] else { panic!("expected item") };
        let Row::Item(b) = &rows[2] else { panic!("expected item") };
        assert_eq!(a.id, first.id);
        assert_eq!(b.id, second.id);
    }

    #[test]
    fn no_header_is_emitted_for_an_empty_group() {
        let items = vec![item("Rice", Category::Food, false)];
        let rows = build_rows(&items, "");
        assert_eq!(names(&rows), vec!["#Food", "Rice"]);

        // All items purchased: only the purchased section remains.
        let items = vec![item("Rice", Category::Food, true)];
        assert_eq!(names(&build_rows(&items, "")), vec!["#Purchased", "Rice"]);
    }

    #[test]
    fn purchased_section_is_omitted_when_empty() {
        let items = vec![item("Rice", Category::Food, false)];
        assert!(!build_rows(&items, "")
            .iter()
            .any(|r| matches!(r, Row::Header(Section::Purchased))));
    }

    #[test]
    fn query_filters_case_insensitively() {
        let items = vec![
            item("Rice", Category::Food, false),
            item("Soap", Category::Hygiene, false),
        ];
        assert_eq!(names(&build_rows(&items, "rIcE")), vec!["#Food", "Rice"]);
        assert!(build_rows(&items, "zzz").is_empty());
    }

    #[test]
    fn empty_query_is_identity_and_filtering_is_idempotent() {
        let items = vec![
            item("Rice", Category::Food, false),
            item("Beer", Category::Beverages, true),
        ];
        let all = build_rows(&items, "");
        assert_eq!(all.len(), 4); // two headers, two items

        let once = build_rows(&items, "beer");
        let matching: Vec<Item> = once
            .iter()
            .filter_map(|r| match r {
                Row::Item(i) => Some(i.clone()),
                Row::Header(_) => None,
            })
            .collect();
        let twice = build_rows(&matching, "beer");
        assert_eq!(once, twice);
    }

    #[test]
    fn setting_purchased_moves_an_item_between_sections() {
        let mut rice = item("Rice", Category::Food, false);
        assert_eq!(names(&build_rows(&[rice.clone()], "")), vec!["#Food", "Rice"]);

        rice.purchased = true;
        assert_eq!(
            names(&build_rows(&[rice], "")),
            vec!["#Purchased", "Rice"]
        );
    }

    #[test]
    fn filter_lists_matches_titles() {
        let lists = vec![
            ShoppingList::new("Groceries", None),
            ShoppingList::new("Hardware", None),
        ];
        assert_eq!(filter_lists(&lists, "").len(), 2);
        let hits = filter_lists(&lists, "GROC");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Groceries");
    }
}
