//! # rfcalc-io: Circuit Document and Result Formats
//!
//! File interfaces around the core and the engines:
//!
//! - [`document`] — the persisted circuit schema (JSON) and its mapping
//!   to the in-memory [`rfcalc_core::Schematic`]
//! - [`touchstone`] — `.s{N}p` export of sweep results
//! - [`tables`] — CSV trace exports, matching-range round-trip, and the
//!   Keysight-style VNA capture import

pub mod document;
pub mod tables;
pub mod touchstone;

pub use document::{
    load_schematic, save_schematic, schematic_from_json, schematic_to_json, CircuitDocument,
    DOCUMENT_VERSION,
};
pub use tables::{
    read_matching_csv, read_vna_csv, write_full_csv, write_matching_csv, write_single_param_csv,
    MatchingCsv, VnaKind, VnaTrace,
};
pub use touchstone::{export_touchstone, touchstone_string, write_touchstone};
