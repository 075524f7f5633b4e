//! Plain-text listing of explicit and automatic bindings

use std::fmt::{self, Write};

use mockwire_di::Key;
use rustc_hash::FxHashSet;

use crate::collector::{BindingRecord, BoundTarget};

/// Writes one line per record whose key is not in `skip`; returns the keys written
pub fn write_bindings<W: Write>(
    out: &mut W,
    records: &[BindingRecord],
    skip: &FxHashSet<Key>,
) -> Result<FxHashSet<Key>, fmt::Error> {
    let mut reported = FxHashSet::default();
    for record in records {
        if skip.contains(&record.key) {
            continue;
        }
        reported.insert(record.key.clone());
        write!(out, "  {} --> ", record.key)?;
        match &record.target {
            BoundTarget::LinkedKey(key) if key == &record.key => out.write_str("Bound directly")?,
            BoundTarget::LinkedKey(key) => write!(out, "{key}")?,
            target => match target.instance_type() {
                Some(type_name) => write!(out, "Instance of {type_name}")?,
                None => out.write_str("NOTHING!?")?,
            },
        }
        out.write_str(" ### ")?;
        match &record.scope {
            Some(scope) => write!(out, "In scope {scope}")?,
            None => out.write_str("No scope")?,
        }
        out.write_char('\n')?;
    }
    Ok(reported)
}

/// Explicit bindings first, then every binding not listed yet
pub fn render_report(
    explicit: &[BindingRecord],
    all: &[BindingRecord],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    out.write_str("*** EXPLICIT BINDINGS ***\n")?;
    let reported = write_bindings(&mut out, explicit, &FxHashSet::default())?;
    out.write_char('\n')?;
    out.write_str("*** AUTOMATIC BINDINGS ***\n")?;
    write_bindings(&mut out, all, &reported)?;
    out.write_char('\n')?;
    Ok(out)
}
