//! # View-State Synchronization
//!
//! Bridges live interactive grid state to the persisted [`View`] record.
//! Five pieces of state are owned here: sort, grouping, pagination, column
//! visibility, and column sizing. They are seeded from a view on
//! construction, and every mutation recomputes a composite snapshot that
//! is compared against the last one propagated outward — the `submit`
//! callback fires only when something actually changed, which keeps
//! render-driven re-evaluation from producing redundant persistence
//! writes.
//!
//! Row selection lives alongside the five pieces but is session-only: it
//! is never seeded from a view and never propagated into one.

use crate::model::{SortRule, View};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Fixed width of the synthetic row-selection column. It is not a data
/// column: its width is not configurable and never persisted.
pub const SELECT_COLUMN_WIDTH: u32 = 52;

/// Identifies a column of the interactive grid: the synthetic selection
/// column or a data column of the table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GridColumn {
    Select,
    Data(Uuid),
}

/// Interactive pagination state. Only the page size is persisted; the page
/// index restarts at zero whenever a view is applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: u32,
}

/// The composite snapshot of interactive grid state.
///
/// `sorting` and `grouping` are lists holding at most one entry each: an
/// empty list maps to "no sort"/"no group" in the view and vice versa.
#[derive(Clone, Debug, PartialEq)]
pub struct GridState {
    pub sorting: Vec<SortRule>,
    pub grouping: Vec<Uuid>,
    pub pagination: Pagination,
    pub column_visibility: HashMap<Uuid, bool>,
    pub column_sizing: HashMap<Uuid, u32>,
}

impl GridState {
    /// Maps a persisted view into interactive state. The page index always
    /// starts at zero.
    pub fn from_view(view: &View) -> GridState {
        GridState {
            sorting: view.sort.into_iter().collect(),
            grouping: view.group.into_iter().collect(),
            pagination: Pagination {
                page_index: 0,
                page_size: view.page_size,
            },
            column_visibility: view.column_visibility.clone(),
            column_sizing: view.column_sizing.clone(),
        }
    }

    /// Maps interactive state back into view shape. The page index is not
    /// part of the view.
    pub fn to_view(&self) -> View {
        View {
            sort: self.sorting.first().copied(),
            group: self.grouping.first().copied(),
            page_size: self.pagination.page_size,
            column_visibility: self.column_visibility.clone(),
            column_sizing: self.column_sizing.clone(),
        }
    }
}

/// Owns interactive grid state and propagates changes outward.
///
/// The outward callback receives the new state mapped into [`View`] shape,
/// exactly once per state transition that differs from the last propagated
/// snapshot.
pub struct ViewSync {
    state: GridState,
    selection: HashSet<Uuid>,
    last_propagated: GridState,
    submit: Box<dyn FnMut(View)>,
}

impl ViewSync {
    /// Seeds interactive state from a persisted view. Construction never
    /// invokes the callback.
    pub fn new(view: &View, submit: impl FnMut(View) + 'static) -> ViewSync {
        let state = GridState::from_view(view);
        ViewSync {
            last_propagated: state.clone(),
            state,
            selection: HashSet::new(),
            submit: Box::new(submit),
        }
    }

    /// Current composite state.
    pub fn state(&self) -> &GridState {
        &self.state
    }

    /// Current view shape of the state.
    pub fn view(&self) -> View {
        self.state.to_view()
    }

    /// Session-only row selection.
    pub fn selection(&self) -> &HashSet<Uuid> {
        &self.selection
    }

    /// Re-seeds every piece of state from a view, resetting the page index
    /// to zero. Applying a view is not a state transition: the callback
    /// does not fire, even if the applied view differs.
    pub fn apply_view(&mut self, view: &View) {
        self.state = GridState::from_view(view);
        self.last_propagated = self.state.clone();
    }

    /// Sets or clears the single active sort rule.
    pub fn set_sort(&mut self, sort: Option<SortRule>) {
        self.state.sorting = sort.into_iter().collect();
        self.propagate();
    }

    /// Sets or clears the single active group key.
    pub fn set_group(&mut self, group: Option<Uuid>) {
        self.state.grouping = group.into_iter().collect();
        self.propagate();
    }

    /// Moves to another page.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.state.pagination.page_index = page_index;
        self.propagate();
    }

    /// Changes the page size.
    pub fn set_page_size(&mut self, page_size: u32) {
        self.state.pagination.page_size = page_size.max(1);
        self.propagate();
    }

    /// Shows or hides one column.
    pub fn set_column_visible(&mut self, column_id: Uuid, visible: bool) {
        self.state.column_visibility.insert(column_id, visible);
        self.propagate();
    }

    /// Replaces the whole visibility map.
    pub fn set_column_visibility(&mut self, visibility: HashMap<Uuid, bool>) {
        self.state.column_visibility = visibility;
        self.propagate();
    }

    /// Replaces column widths from a resize gesture. The selection column
    /// is discarded: its width is fixed.
    pub fn resize_columns(&mut self, widths: impl IntoIterator<Item = (GridColumn, u32)>) {
        self.state.column_sizing = widths
            .into_iter()
            .filter_map(|(column, width)| match column {
                GridColumn::Select => None,
                GridColumn::Data(column_id) => Some((column_id, width)),
            })
            .collect();
        self.propagate();
    }

    /// Replaces the session-only row selection. Never propagated.
    pub fn set_selection(&mut self, selection: HashSet<Uuid>) {
        self.selection = selection;
    }

    /// Clears the session-only row selection. Never propagated.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Invokes the outward callback when the composite state differs from
    /// the last propagated snapshot.
    fn propagate(&mut self) {
        if self.state != self.last_propagated {
            self.last_propagated = self.state.clone();
            (self.submit)(self.state.to_view());
        }
    }
}
