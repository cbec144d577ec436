//! Layout scenarios and property-based tests.

use crate::*;
use proptest::prelude::*;

fn tree() -> Tree {
    Tree::with_id_generator(Box::new(SequentialIds::new()))
}

fn md(width: u32, relocate: bool) -> Item {
    Item::markdown(MarkdownMeta::new("block").with_size(width, 50), relocate).unwrap()
}

fn parent_id(tree: &Tree, id: &ItemId) -> ItemId {
    tree.parent_of(id.as_str())
        .unwrap()
        .map(|n| n.id().clone())
        .unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_markdown_rows_fill_then_overflow() {
    let mut tree = tree();

    let first = tree.insert(md(4, true), GRID_ID).unwrap();
    let row_a = parent_id(&tree, &first);
    assert_eq!(tree.find_by_id(row_a.as_str()).unwrap().item_type(), ItemType::Row);
    assert_eq!(tree.parent_of(row_a.as_str()).unwrap().unwrap().id(), GRID_ID);

    let second = tree.insert(md(8, true), row_a.as_str()).unwrap();
    assert_eq!(parent_id(&tree, &second), row_a);
    assert_eq!(tree.used_width(row_a.as_str()).unwrap(), 12);

    let third = tree.insert(md(4, true), row_a.as_str()).unwrap();
    let row_b = parent_id(&tree, &third);
    assert_ne!(row_b, row_a);
    assert_eq!(tree.parent_of(row_b.as_str()).unwrap().unwrap().id(), GRID_ID);

    let grid_children: Vec<_> = tree
        .children_of(GRID_ID)
        .unwrap()
        .iter()
        .map(|n| n.id().clone())
        .collect();
    assert_eq!(grid_children, vec![row_a, row_b]);
}

#[test]
fn test_hard_stop_without_relocate() {
    let mut tree = tree();
    let six = tree.insert(md(6, true), GRID_ID).unwrap();
    let row = parent_id(&tree, &six);
    let before = tree.node_count();

    let err = tree.insert(md(8, false), row.as_str()).unwrap_err();
    assert!(err.is_capacity());
    assert!(matches!(
        err,
        LayoutError::Capacity {
            width: 8,
            total: 14,
            max: MAX_WIDTH
        }
    ));
    assert!(err.to_string().contains("14"));
    assert_eq!(tree.node_count(), before);

    let moved = tree.insert(md(8, true), row.as_str()).unwrap();
    assert_ne!(parent_id(&tree, &moved), row);
    assert_eq!(tree.node_count(), before + 2);
}

#[test]
fn test_first_fit_over_best_fit() {
    let mut tree = tree();
    let full = tree.insert(md(12, true), GRID_ID).unwrap();
    let full_row = parent_id(&tree, &full);

    let nine = tree.insert(md(9, true), GRID_ID).unwrap();
    let three_free = parent_id(&tree, &nine);
    let seven = tree.insert(md(7, true), GRID_ID).unwrap();
    let five_free = parent_id(&tree, &seven);

    let item = tree.insert(md(3, true), full_row.as_str()).unwrap();
    assert_eq!(parent_id(&tree, &item), three_free);

    let item = tree.insert(md(4, true), full_row.as_str()).unwrap();
    assert_eq!(parent_id(&tree, &item), five_free);
}

#[test]
fn test_leaves_reject_children() {
    let mut tree = tree();
    let chart = Item::chart(ChartMeta::new(5, "Users"), true).unwrap();
    let chart_id = tree.insert(chart, GRID_ID).unwrap();
    let block = tree.insert(md(2, true), GRID_ID).unwrap();

    for leaf in [&chart_id, &block] {
        let attempts = [
            Item::row(),
            Item::column(),
            Item::tabs(),
            Item::tab("t"),
            Item::divider(),
            md(1, true),
            Item::chart(ChartMeta::new(6, "Other"), true).unwrap(),
        ];
        for item in attempts {
            let err = tree.insert(item, leaf.as_str()).unwrap_err();
            assert!(err.is_structural(), "{err}");
        }
    }
}

#[test]
fn test_tabs_with_rows_and_charts() {
    let mut tree = tree();
    let overview = tree.insert(Item::tab("Overview"), GRID_ID).unwrap();
    let details = tree.insert(Item::tab("Details"), GRID_ID).unwrap();

    let a = tree
        .insert(Item::chart(ChartMeta::new(1, "A").with_size(6, 40), true).unwrap(), overview.as_str())
        .unwrap();
    let b = tree
        .insert(Item::chart(ChartMeta::new(2, "B").with_size(6, 40), true).unwrap(), overview.as_str())
        .unwrap();
    let c = tree
        .insert(Item::chart(ChartMeta::new(3, "C").with_size(6, 40), true).unwrap(), overview.as_str())
        .unwrap();
    let d = tree
        .insert(Item::chart(ChartMeta::new(4, "D"), true).unwrap(), details.as_str())
        .unwrap();

    assert_eq!(parent_id(&tree, &a), parent_id(&tree, &b));
    assert_ne!(parent_id(&tree, &a), parent_id(&tree, &c));
    assert_eq!(tree.path_of(c.as_str()).unwrap()[..4], [
        ItemId::root(),
        ItemId::grid(),
        parent_id(&tree, &overview),
        overview.clone(),
    ]);
    assert_eq!(tree.path_of(d.as_str()).unwrap()[3], details);
    tree.check_row_budgets().unwrap();
}

#[test]
fn test_load_edit_save_keeps_foreign_entries() {
    let position = serde_json::json!({
        "DASHBOARD_VERSION_KEY": "v2",
        "ROOT_ID": {"id": "ROOT_ID", "type": "ROOT", "children": ["GRID_ID"]},
        "GRID_ID": {"id": "GRID_ID", "type": "GRID", "children": ["ROW-N-1"], "parents": ["ROOT_ID"]},
        "HEADER_ID": {"id": "HEADER_ID", "type": "HEADER", "meta": {"text": "Sales"}},
        "ROW-N-1": {
            "id": "ROW-N-1", "type": "ROW", "children": ["CHART-x"],
            "parents": ["ROOT_ID", "GRID_ID"],
            "meta": {"background": "BACKGROUND_TRANSPARENT"}
        },
        "CHART-x": {
            "id": "CHART-x", "type": "CHART", "children": [],
            "parents": ["ROOT_ID", "GRID_ID", "ROW-N-1"],
            "meta": {"chartId": 10, "sliceName": "Orders", "width": 4, "height": 50,
                     "uuid": "5e1d1b1e-0000-0000-0000-000000000000"}
        }
    });

    let mut tree = Tree::from_value_with(&position, Box::new(SequentialIds::new())).unwrap();
    let added = tree
        .insert(Item::chart(ChartMeta::new(11, "Returns").with_size(8, 50), false).unwrap(), "ROW-N-1")
        .unwrap();
    assert_eq!(parent_id(&tree, &added), "ROW-N-1");

    let saved = tree.to_value().unwrap();
    assert_eq!(saved["HEADER_ID"], position["HEADER_ID"]);
    assert_eq!(saved["CHART-x"], position["CHART-x"]);
    assert_eq!(saved["ROW-N-1"]["children"], serde_json::json!(["CHART-x", added.as_str()]));
    assert_eq!(saved[added.as_str()]["meta"]["chartId"], serde_json::json!(11));
}

// =============================================================================
// Property-based tests
// =============================================================================

/// One random edit: what to insert and where.
#[derive(Debug, Clone)]
enum Op {
    Markdown { width: u32, relocate: bool },
    Chart { width: u32, relocate: bool },
    Row,
    Column,
    Tab,
    Divider,
}

impl Op {
    fn item(&self, seq: i64) -> Option<Item> {
        match *self {
            Self::Markdown { width, relocate } => Item::markdown(
                MarkdownMeta::new(format!("block {seq}")).with_size(width, 50),
                relocate,
            )
            .ok(),
            Self::Chart { width, relocate } => Item::chart(
                ChartMeta::new(seq + 1, format!("chart {seq}")).with_size(width, 40),
                relocate,
            )
            .ok(),
            Self::Row => Some(Item::row()),
            Self::Column => Some(Item::column()),
            Self::Tab => Some(Item::tab(format!("tab {seq}"))),
            Self::Divider => Some(Item::divider()),
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u32..=14, any::<bool>()).prop_map(|(width, relocate)| Op::Markdown { width, relocate }),
        4 => (1u32..=14, any::<bool>()).prop_map(|(width, relocate)| Op::Chart { width, relocate }),
        2 => Just(Op::Row),
        1 => Just(Op::Column),
        1 => Just(Op::Tab),
        1 => Just(Op::Divider),
    ]
}

/// Apply `ops`, each anchored at a node picked from the current tree.
fn build(ops: &[(Op, usize)]) -> Tree {
    let mut tree = tree();
    for (seq, (op, pick)) in ops.iter().enumerate() {
        let anchors: Vec<ItemId> = tree.iter().map(|n| n.id().clone()).collect();
        let anchor = &anchors[pick % anchors.len()];
        if let Some(item) = op.item(i64::try_from(seq).unwrap_or(i64::MAX)) {
            let _ = tree.insert(item, anchor.as_str());
        }
    }
    tree
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_rows_never_exceed_budget(
        ops in prop::collection::vec((op_strategy(), any::<usize>()), 0..40)
    ) {
        let tree = build(&ops);
        prop_assert!(tree.check_row_budgets().is_ok());
        for node in tree.iter().filter(|n| n.item_type() == ItemType::Row) {
            prop_assert!(tree.used_width(node.id().as_str()).unwrap() <= MAX_WIDTH);
        }
    }

    #[test]
    fn prop_serialization_round_trips(
        ops in prop::collection::vec((op_strategy(), any::<usize>()), 0..40)
    ) {
        let tree = build(&ops);
        let value = tree.to_value().unwrap();
        let restored = Tree::from_value(&value).unwrap();
        prop_assert_eq!(restored.node_count(), tree.node_count());
        prop_assert_eq!(restored.to_value().unwrap(), value);
        prop_assert_eq!(restored.render(), tree.render());
    }

    #[test]
    fn prop_tree_shape_invariants(
        ops in prop::collection::vec((op_strategy(), any::<usize>()), 0..40)
    ) {
        let tree = build(&ops);
        prop_assert_eq!(tree.iter().count(), tree.node_count());
        for node in tree.iter() {
            let parent = tree.parent_of(node.id().as_str()).unwrap();
            match node.item_type() {
                ItemType::Root => prop_assert!(parent.is_none()),
                ItemType::Grid => prop_assert_eq!(parent.unwrap().item_type(), ItemType::Root),
                ItemType::Tab => prop_assert_eq!(parent.unwrap().item_type(), ItemType::Tabs),
                ItemType::Chart | ItemType::Markdown => {
                    let parent_type = parent.unwrap().item_type();
                    prop_assert!(matches!(parent_type, ItemType::Row | ItemType::Column));
                }
                _ => prop_assert!(parent.is_some()),
            }
            if !node.accepts_children() {
                prop_assert_eq!(node.child_count(), 0);
            }
        }
    }

    #[test]
    fn prop_failed_insert_leaves_tree_unchanged(
        ops in prop::collection::vec((op_strategy(), any::<usize>()), 0..30),
        width in 1u32..=12,
        pick in any::<usize>(),
    ) {
        let mut tree = build(&ops);
        let before = tree.to_value().unwrap();
        let anchors: Vec<ItemId> = tree.iter().map(|n| n.id().clone()).collect();
        let anchor = &anchors[pick % anchors.len()];
        if tree.insert(md(width, false), anchor.as_str()).is_err() {
            prop_assert_eq!(tree.to_value().unwrap(), before);
        }
    }
}
