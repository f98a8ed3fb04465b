//! # Block Kinds
//!
//! The set of block kinds is closed. Each composite kind has a static
//! [`CompositeConfig`] describing its named child chains, the order the
//! cursor walks them in, and which chain the cursor lands in when it enters
//! the block from either side. Matrices are the one dynamic case: their
//! configuration is derived from the `"RxC"` dimensions in the block data.
//!
//! Per-kind behavior (printing and how backspace/delete leave a child chain)
//! is dispatched through [`behavior`], a table of function pointers.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::{BlockId, Document, ModelError, ParentLink};
use crate::cursor::{CursorPosition, Direction, Side};
use crate::editing::removal;
use crate::printing::{Output, Printer, printer};

/// Largest matrix dimension accepted in either direction.
pub const MAX_MATRIX_DIM: usize = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Root,
    Blank,
    Atom,
    Fraction,
    Radical,
    SupSub,
    Integral,
    Derivative,
    Differential,
    Matrix,
    Function,
}

impl BlockKind {
    pub const ALL: [BlockKind; 11] = [
        BlockKind::Root,
        BlockKind::Blank,
        BlockKind::Atom,
        BlockKind::Fraction,
        BlockKind::Radical,
        BlockKind::SupSub,
        BlockKind::Integral,
        BlockKind::Derivative,
        BlockKind::Differential,
        BlockKind::Matrix,
        BlockKind::Function,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Root => "root",
            BlockKind::Blank => "blank",
            BlockKind::Atom => "atom",
            BlockKind::Fraction => "fraction",
            BlockKind::Radical => "radical",
            BlockKind::SupSub => "supSub",
            BlockKind::Integral => "integral",
            BlockKind::Derivative => "derivative",
            BlockKind::Differential => "differential",
            BlockKind::Matrix => "matrix",
            BlockKind::Function => "function",
        }
    }

    pub fn is_composite(self) -> bool {
        !matches!(self, BlockKind::Blank | BlockKind::Atom)
    }

    /// Child chain layout for this kind. `data` only matters for matrices.
    pub fn config(self, data: Option<&str>) -> Option<Cow<'static, CompositeConfig>> {
        let config: &'static CompositeConfig = match self {
            BlockKind::Blank | BlockKind::Atom => return None,
            BlockKind::Matrix => {
                let (rows, cols) = parse_dimensions(data).unwrap_or((1, 1));
                return Some(Cow::Owned(CompositeConfig::matrix(rows, cols)));
            }
            BlockKind::Root => &*ROOT,
            BlockKind::Fraction => &*FRACTION,
            BlockKind::Radical => &*RADICAL,
            BlockKind::SupSub => &*SUP_SUB,
            BlockKind::Integral => &*INTEGRAL,
            BlockKind::Derivative => &*DERIVATIVE,
            BlockKind::Differential => &*DIFFERENTIAL,
            BlockKind::Function => &*FUNCTION,
        };
        Some(Cow::Borrowed(config))
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse matrix dimensions such as `"2x3"`.
pub fn parse_dimensions(data: Option<&str>) -> Option<(usize, usize)> {
    let (rows, cols) = data?.split_once('x')?;
    let rows: usize = rows.trim().parse().ok()?;
    let cols: usize = cols.trim().parse().ok()?;
    let valid = 1..=MAX_MATRIX_DIM;
    (valid.contains(&rows) && valid.contains(&cols)).then_some((rows, cols))
}

/// Chain numbers of each composite kind.
pub mod slot {
    pub const BODY: usize = 0;

    pub const NUM: usize = 0;
    pub const DENOM: usize = 1;

    pub const RADICAL_INDEX: usize = 0;
    pub const RADICAL_INNER: usize = 1;

    pub const SUP: usize = 0;
    pub const SUB: usize = 1;

    pub const LEFT_BOUND: usize = 0;
    pub const RIGHT_BOUND: usize = 1;
    pub const INTEGRAND: usize = 2;
    pub const INTEGRAL_WRT: usize = 3;

    pub const DERIVATIVE_WRT: usize = 0;
    pub const DERIVATIVE_INNER: usize = 1;

    pub const DIFFERENTIAL_INNER: usize = 0;

    pub const ARGS: usize = 0;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildSpec {
    pub name: Cow<'static, str>,
    pub nullable: bool,
}

/// Lanes of chain numbers. Moving along a lane steps between its chains;
/// leaving the end of a lane leaves the block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CursorOrder {
    pub left_to_right: Vec<Vec<usize>>,
    pub up_to_down: Vec<Vec<usize>>,
}

/// Candidate chains, in priority order, for entering a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entries {
    pub up: Vec<usize>,
    pub across: Vec<usize>,
    pub down: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryRules {
    pub from_left: Entries,
    pub from_right: Entries,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeConfig {
    pub children: Vec<ChildSpec>,
    pub cursor_order: CursorOrder,
    pub entries: EntryRules,
}

impl CompositeConfig {
    fn new(children: &[(&'static str, bool)]) -> Self {
        Self {
            children: children
                .iter()
                .map(|&(name, nullable)| ChildSpec {
                    name: Cow::Borrowed(name),
                    nullable,
                })
                .collect(),
            cursor_order: CursorOrder::default(),
            entries: EntryRules::default(),
        }
    }

    fn lanes(mut self, left_to_right: &[&[usize]], up_to_down: &[&[usize]]) -> Self {
        self.cursor_order = CursorOrder {
            left_to_right: left_to_right.iter().map(|lane| lane.to_vec()).collect(),
            up_to_down: up_to_down.iter().map(|lane| lane.to_vec()).collect(),
        };
        self
    }

    fn from_left(mut self, up: &[usize], across: &[usize], down: &[usize]) -> Self {
        self.entries.from_left = Entries {
            up: up.to_vec(),
            across: across.to_vec(),
            down: down.to_vec(),
        };
        self
    }

    fn from_right(mut self, up: &[usize], across: &[usize], down: &[usize]) -> Self {
        self.entries.from_right = Entries {
            up: up.to_vec(),
            across: across.to_vec(),
            down: down.to_vec(),
        };
        self
    }

    /// Row-major `r{i}c{j}` cells; one left-to-right lane through every
    /// cell, one up-to-down lane per column.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        let (rows, cols) = (rows.max(1), cols.max(1));
        let last_row = (rows - 1) * cols;
        let last = rows * cols - 1;
        Self {
            children: (0..rows)
                .flat_map(|r| (0..cols).map(move |c| (r, c)))
                .map(|(r, c)| ChildSpec {
                    name: Cow::Owned(format!("r{r}c{c}")),
                    nullable: false,
                })
                .collect(),
            cursor_order: CursorOrder {
                left_to_right: vec![(0..rows * cols).collect()],
                up_to_down: (0..cols)
                    .map(|c| (0..rows).map(|r| r * cols + c).collect())
                    .collect(),
            },
            entries: EntryRules {
                from_left: Entries {
                    up: vec![0],
                    across: vec![0],
                    down: vec![last_row],
                },
                from_right: Entries {
                    up: vec![cols - 1],
                    across: vec![last],
                    down: vec![last],
                },
            },
        }
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|spec| spec.name == name)
    }

    pub fn name(&self, slot: usize) -> Option<&str> {
        self.children.get(slot).map(|spec| spec.name.as_ref())
    }

    pub fn is_nullable(&self, slot: usize) -> bool {
        self.children.get(slot).is_some_and(|spec| spec.nullable)
    }

    /// Entry candidates when the cursor arrives from `from` moving in `direction`.
    pub fn entry(&self, from: Side, direction: Direction) -> &[usize] {
        let entries = match from {
            Side::Before => &self.entries.from_left,
            Side::After => &self.entries.from_right,
        };
        match direction {
            Direction::Up => &entries.up,
            Direction::Down => &entries.down,
            Direction::Left | Direction::Right => &entries.across,
        }
    }

    /// The lane containing `slot` for movement along `direction`.
    pub fn lane(&self, slot: usize, direction: Direction) -> Option<&[usize]> {
        let lanes = if direction.is_horizontal() {
            &self.cursor_order.left_to_right
        } else {
            &self.cursor_order.up_to_down
        };
        lanes
            .iter()
            .find(|lane| lane.contains(&slot))
            .map(Vec::as_slice)
    }
}

static ROOT: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("body", false)])
        .lanes(&[&[0]], &[&[0]])
        .from_left(&[0], &[0], &[0])
        .from_right(&[0], &[0], &[0])
});

static FRACTION: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("num", false), ("denom", false)])
        .lanes(&[&[0], &[1]], &[&[0, 1]])
        .from_left(&[0], &[0], &[1])
        .from_right(&[0], &[0], &[1])
});

static RADICAL: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("index", true), ("inner", false)])
        .lanes(&[&[0, 1]], &[&[0, 1]])
        .from_left(&[0], &[0, 1], &[])
        .from_right(&[0], &[1], &[])
});

static SUP_SUB: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("sup", true), ("sub", true)])
        .lanes(&[&[0], &[1]], &[&[0, 1]])
        .from_left(&[0], &[0, 1], &[1])
        .from_right(&[0], &[0, 1], &[1])
});

static INTEGRAL: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[
        ("leftBound", true),
        ("rightBound", true),
        ("inner", false),
        ("wrt", false),
    ])
    .lanes(&[&[0, 1, 2, 3]], &[&[1, 0]])
    .from_left(&[1], &[0, 1, 2], &[0])
    .from_right(&[1], &[3], &[0])
});

static DERIVATIVE: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("wrt", false), ("inner", false)])
        .lanes(&[&[0, 1]], &[&[0], &[1]])
        .from_left(&[], &[0], &[0])
        .from_right(&[], &[1], &[0])
});

static DIFFERENTIAL: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("inner", false)])
        .lanes(&[&[0]], &[&[0]])
        .from_left(&[], &[0], &[])
        .from_right(&[], &[0], &[])
});

static FUNCTION: LazyLock<CompositeConfig> = LazyLock::new(|| {
    CompositeConfig::new(&[("args", false)])
        .lanes(&[&[0]], &[&[0]])
        .from_left(&[], &[0], &[])
        .from_right(&[], &[0], &[])
});

pub type PrintFn = fn(&Printer, &Document, BlockId) -> Output;

/// Handles backspace/delete pressed at the edge of a child chain. Returns
/// where the cursor lands, or `None` to leave it in place.
pub type RemoveFn = fn(&mut Document, ParentLink) -> Result<Option<CursorPosition>, ModelError>;

pub struct KindBehavior {
    pub kind: BlockKind,
    pub print: PrintFn,
    pub backspace_from_child: RemoveFn,
    pub delete_from_child: RemoveFn,
}

impl KindBehavior {
    fn resolve(kind: BlockKind) -> Self {
        let (print, backspace_from_child, delete_from_child): (PrintFn, RemoveFn, RemoveFn) =
            match kind {
                BlockKind::Root => (printer::print_root, removal::stay, removal::stay),
                BlockKind::Blank => (printer::print_blank, removal::stay, removal::stay),
                BlockKind::Atom => (printer::print_atom, removal::stay, removal::stay),
                BlockKind::Fraction => (
                    printer::print_fraction,
                    removal::backspace_fraction,
                    removal::delete_fraction,
                ),
                BlockKind::Radical => (
                    printer::print_radical,
                    removal::backspace_radical,
                    removal::delete_default,
                ),
                BlockKind::SupSub => (
                    printer::print_sup_sub,
                    removal::backspace_sup_sub,
                    removal::delete_sup_sub,
                ),
                BlockKind::Integral => (
                    printer::print_integral,
                    removal::backspace_integral,
                    removal::delete_default,
                ),
                BlockKind::Derivative => (
                    printer::print_derivative,
                    removal::backspace_derivative,
                    removal::delete_default,
                ),
                BlockKind::Differential => (
                    printer::print_differential,
                    removal::backspace_differential,
                    removal::delete_default,
                ),
                BlockKind::Matrix => (
                    printer::print_matrix,
                    removal::backspace_default,
                    removal::delete_default,
                ),
                BlockKind::Function => (
                    printer::print_function,
                    removal::backspace_default,
                    removal::delete_default,
                ),
            };
        Self {
            kind,
            print,
            backspace_from_child,
            delete_from_child,
        }
    }
}

static BEHAVIORS: LazyLock<[KindBehavior; 11]> =
    LazyLock::new(|| BlockKind::ALL.map(KindBehavior::resolve));

pub fn behavior(kind: BlockKind) -> &'static KindBehavior {
    &BEHAVIORS[kind as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn behavior_table_matches_kind_order() {
        for kind in BlockKind::ALL {
            assert_eq!(behavior(kind).kind, kind);
        }
    }

    #[rstest]
    #[case(BlockKind::Fraction, &["num", "denom"])]
    #[case(BlockKind::Radical, &["index", "inner"])]
    #[case(BlockKind::SupSub, &["sup", "sub"])]
    #[case(BlockKind::Integral, &["leftBound", "rightBound", "inner", "wrt"])]
    #[case(BlockKind::Derivative, &["wrt", "inner"])]
    #[case(BlockKind::Differential, &["inner"])]
    #[case(BlockKind::Function, &["args"])]
    fn child_names(#[case] kind: BlockKind, #[case] names: &[&str]) {
        let config = kind.config(None).unwrap();
        let actual: Vec<&str> = config.children.iter().map(|c| c.name.as_ref()).collect();
        assert_eq!(actual, names);
    }

    #[test]
    fn leaves_have_no_config() {
        assert!(BlockKind::Atom.config(None).is_none());
        assert!(BlockKind::Blank.config(None).is_none());
    }

    #[rstest]
    #[case(Some("2x3"), Some((2, 3)))]
    #[case(Some("1x1"), Some((1, 1)))]
    #[case(Some("0x3"), None)]
    #[case(Some("11x1"), None)]
    #[case(Some("2by3"), None)]
    #[case(None, None)]
    fn matrix_dimensions(#[case] data: Option<&str>, #[case] expected: Option<(usize, usize)>) {
        assert_eq!(parse_dimensions(data), expected);
    }

    #[test]
    fn matrix_lanes() {
        let config = BlockKind::Matrix.config(Some("2x2")).unwrap();
        assert_eq!(config.name(3), Some("r1c1"));
        assert_eq!(config.cursor_order.left_to_right, vec![vec![0, 1, 2, 3]]);
        assert_eq!(config.cursor_order.up_to_down, vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(config.entry(Side::After, Direction::Left), &[3]);
    }

    #[test]
    fn integral_entries_depend_on_side() {
        let config = BlockKind::Integral.config(None).unwrap();
        assert_eq!(config.entry(Side::Before, Direction::Right), &[0, 1, 2]);
        assert_eq!(config.entry(Side::After, Direction::Left), &[3]);
        assert_eq!(config.lane(1, Direction::Down), Some(&[1, 0][..]));
    }

    #[test]
    fn kinds_serialize_camel_case() {
        let json = serde_json::to_string(&BlockKind::SupSub).unwrap();
        assert_eq!(json, "\"supSub\"");
    }
}
