//! Low-level helpers shared by the spreadsheet reader and writer.

pub(crate) mod reference;
pub(crate) mod xml;
pub(crate) mod zip;
