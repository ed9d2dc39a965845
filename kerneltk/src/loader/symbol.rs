//! Extern symbol resolution: satisfying undefined references in the image
//! against caller-provided definitions, and reporting back anything the
//! image itself defines and exports.
//!
//! The original threads these through an intrusive singly-linked list
//! (`struct extern_symbol { name; addr; defined; next; }`) that the caller
//! builds by hand and the loader walks and mutates in place. A `&mut
//! [ExternSymbol]` slice is the direct safe equivalent here: the caller
//! still owns the backing storage and its lifetime, the loader still
//! mutates entries in place (setting `addr`/`defined` when it satisfies or
//! discovers a symbol), but there's no pointer-chasing and no manual
//! list-node lifetime to get wrong.

/// One entry in the caller-supplied symbol table: either a definition the
/// image's undefined references should resolve against, or (after loading)
/// a record of a symbol the image itself exports.
#[derive(Debug, Clone)]
pub struct ExternSymbol<'n> {
    pub name: &'n str,
    pub addr: u64,
    pub defined: bool,
}

impl<'n> ExternSymbol<'n> {
    pub fn new(name: &'n str) -> Self {
        ExternSymbol {
            name,
            addr: 0,
            defined: false,
        }
    }

    pub fn defined(name: &'n str, addr: u64) -> Self {
        ExternSymbol {
            name,
            addr,
            defined: true,
        }
    }
}

/// Looks up `name` in `table`, returning the matching entry's index.
pub fn find(table: &[ExternSymbol], name: &str) -> Option<usize> {
    table.iter().position(|s| s.name == name)
}

/// Records that the image defines `name` at `addr`, updating the first
/// still-*undefined* matching entry (mirroring `original_source/src/loader/
/// rmld.c:391`'s `if ((ext_sym->s_defined) || (strcmp(...) != 0)) continue;`)
/// or appending nothing — the loader never grows the caller's table,
/// matching the original's "caller allocates the extern_symbol nodes up
/// front" contract. An already-resolved entry is never clobbered by a
/// later-processed symbol of the same name.
pub fn record_definition(table: &mut [ExternSymbol], name: &str, addr: u64) -> bool {
    match table.iter_mut().find(|s| !s.defined && s.name == name) {
        Some(entry) => {
            entry.addr = addr;
            entry.defined = true;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_locates_entry_by_name() {
        let table = [ExternSymbol::new("foo"), ExternSymbol::defined("bar", 0x1000)];
        assert_eq!(find(&table, "bar"), Some(1));
        assert_eq!(find(&table, "missing"), None);
    }

    #[test]
    fn record_definition_updates_in_place() {
        let mut table = [ExternSymbol::new("foo")];
        assert!(record_definition(&mut table, "foo", 0x2000));
        assert!(table[0].defined);
        assert_eq!(table[0].addr, 0x2000);
    }

    #[test]
    fn record_definition_for_unknown_name_is_noop() {
        let mut table = [ExternSymbol::new("foo")];
        assert!(!record_definition(&mut table, "bar", 0x2000));
    }

    #[test]
    fn record_definition_never_clobbers_an_already_resolved_entry() {
        let mut table = [ExternSymbol::defined("foo", 0x1000), ExternSymbol::new("foo")];
        assert!(record_definition(&mut table, "foo", 0x2000));
        assert_eq!(table[0].addr, 0x1000);
        assert_eq!(table[1].addr, 0x2000);
        assert!(table[1].defined);
    }
}
