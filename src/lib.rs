//! Root crate facade for the textflag server and its core library.

pub use textflag_core::{
    config, constants, db, highlight, html, locate_range, locate_selection, models, offsets,
    render, selection, strip_markers, transfer, AppError, Config, ContainerTree, Database,
    DomPoint, DomRange, RenderedDocument, SelectionController, SelectionError, SelectionOutcome,
    SelectionRange, SelectionState, SkippedFlag,
};
pub use textflag_server::{create_app, error, handlers, serve_router, AppState};
