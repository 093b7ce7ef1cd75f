//! Selection handling for a bound document container.
//!
//! The hosting UI owns the event loop; it calls
//! [`SelectionController::handle_pointer_up`] with whatever selection it has
//! when the pointer is released. The controller validates the selection
//! through the offset mapper and forwards accepted ranges to the caller's
//! callback as `(text, start, end)`.

use crate::error::AppError;
use crate::html::ContainerTree;
use crate::models::flag::Flag;
use crate::offsets::{locate_selection, ResolvedSelection, SelectionError, SelectionRange};
use std::sync::Arc;

/// Where the controller ended up after the last pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    SelectionDetected,
    Accepted,
    RejectedEmpty,
    RejectedOutOfBounds,
    RejectedOverlap,
}

/// Result of handling one pointer-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Nothing to do: no selection, a collapsed one, or no bound container.
    Idle,
    Accepted(ResolvedSelection),
    Rejected(SelectionError),
}

impl SelectionOutcome {
    /// Message to show the user, if this outcome needs one.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SelectionOutcome::Rejected(err) if err.is_user_visible() => Some(err.to_string()),
            _ => None,
        }
    }
}

impl From<&SelectionError> for SelectionState {
    fn from(err: &SelectionError) -> Self {
        match err {
            SelectionError::EmptySelection => SelectionState::RejectedEmpty,
            SelectionError::OutOfContainer | SelectionError::OffsetMismatch { .. } => {
                SelectionState::RejectedOutOfBounds
            }
            SelectionError::OverlapConflict { .. } => SelectionState::RejectedOverlap,
        }
    }
}

/// Turns pointer-up selections into validated flag ranges.
pub struct SelectionController<F>
where
    F: FnMut(&str, usize, usize),
{
    tree: Option<Arc<ContainerTree>>,
    on_select: F,
    check_overlap: bool,
    state: SelectionState,
}

impl<F> SelectionController<F>
where
    F: FnMut(&str, usize, usize),
{
    /// Create an unbound controller with overlap checking enabled.
    pub fn new(on_select: F) -> Self {
        Self {
            tree: None,
            on_select,
            check_overlap: true,
            state: SelectionState::Idle,
        }
    }

    /// Enable or disable the overlap check against existing flags.
    pub fn with_overlap_check(mut self, enabled: bool) -> Self {
        self.check_overlap = enabled;
        self
    }

    /// Bind to the container rendered from `content`.
    ///
    /// Rebinding with the content already bound is a no-op.
    ///
    /// # Returns
    /// `true` when the controller switched to a new container.
    ///
    /// # Errors
    /// Returns [`AppError::Html`] if `content` cannot be parsed; the previous
    /// binding is kept in that case.
    pub fn bind(&mut self, content: &str) -> Result<bool, AppError> {
        if self
            .tree
            .as_ref()
            .is_some_and(|tree| tree.source() == content)
        {
            return Ok(false);
        }
        let tree = ContainerTree::parse(content)?;
        self.bind_tree(Arc::new(tree));
        Ok(true)
    }

    /// Bind to an already parsed container.
    pub fn bind_tree(&mut self, tree: Arc<ContainerTree>) {
        tracing::debug!(nodes = tree.len(), "binding selection controller");
        self.tree = Some(tree);
        self.state = SelectionState::Idle;
    }

    /// Drop the current container; later pointer-ups are ignored.
    pub fn unbind(&mut self) {
        self.tree = None;
        self.state = SelectionState::Idle;
    }

    pub fn is_bound(&self) -> bool {
        self.tree.is_some()
    }

    /// Currently bound container.
    pub fn tree(&self) -> Option<&ContainerTree> {
        self.tree.as_deref()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Handle a pointer release.
    ///
    /// # Arguments
    /// - `selection`: The UI's current selection, if any.
    /// - `existing`: Flags already stored for the bound document.
    ///
    /// # Returns
    /// The outcome; accepted selections have also been passed to the
    /// callback.
    pub fn handle_pointer_up(
        &mut self,
        selection: Option<&SelectionRange>,
        existing: &[Flag],
    ) -> SelectionOutcome {
        self.state = SelectionState::Idle;
        let Some(tree) = self.tree.as_deref() else {
            return SelectionOutcome::Idle;
        };
        let Some(range) = selection else {
            return SelectionOutcome::Idle;
        };
        if range.is_collapsed()
            || !tree.contains(range.start.node)
            || !tree.contains(range.end.node)
        {
            return SelectionOutcome::Idle;
        }

        self.state = SelectionState::SelectionDetected;
        let existing = self.check_overlap.then_some(existing);
        match locate_selection(tree, range, existing) {
            Ok(resolved) => {
                tracing::debug!(start = resolved.start, end = resolved.end, "selection accepted");
                self.state = SelectionState::Accepted;
                (self.on_select)(&resolved.text, resolved.start, resolved.end);
                SelectionOutcome::Accepted(resolved)
            }
            Err(err) => {
                tracing::debug!(reason = err.kind(), "selection rejected");
                self.state = SelectionState::from(&err);
                SelectionOutcome::Rejected(err)
            }
        }
    }
}
